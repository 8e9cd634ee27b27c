use std::{
    borrow::Cow,
    task::{Context, Poll},
};

use chrono::{DateTime, Utc};
use tower::Service;
use tracing::Instrument;

use crate::{
    domain::{PointsEntry, PointsEntryType},
    ports::database::DatabasePort,
};

use super::{CommandFuture, DomainLogic, Error};

/// Points earned per whole currency unit spent on a booking
const POINTS_PER_UNIT_SPENT: f64 = 1.0;

pub struct AddPointsRequest {
    pub user_id: String,
    pub event: AddPointsEvent,
}

pub enum AddPointsEvent {
    /// The user paid for a booking
    BookingCompleted {
        booking_id: String,
        amount_spent: f64,
    },
    /// Manually adding points, e.g. for support
    Manual {
        points: u32,
        reason: Option<String>,
    },
}

impl AddPointsEvent {
    pub fn reason(&self) -> Cow<'static, str> {
        match self {
            AddPointsEvent::BookingCompleted { .. } => "Booking completed".into(),
            AddPointsEvent::Manual { reason, .. } => reason
                .as_ref()
                .cloned()
                .map(Into::into)
                .unwrap_or("Manual addition".into()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AddPointsResponse {
    pub user_id: String,
    /// Previous number of points
    pub old_points: u32,
    /// New number of points
    pub new_points: u32,
}

impl<D> Service<AddPointsRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    type Response = AddPointsResponse;
    type Error = Error;
    type Future = CommandFuture<AddPointsResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: AddPointsRequest) -> Self::Future {
        let database = self.database.clone();
        let now = self.clock.now();
        let span = tracing::info_span!("add_points", user_id = %req.user_id);
        Box::pin(
            async move {
                let entry = create_entry(&req.event, now);
                if entry.points == 0 {
                    return Err(Error::InvalidInput);
                }
                let points = entry.points;

                let updated = database.register_points_event(&req.user_id, entry).await?;
                tracing::info!(points, total = updated.points, "points added");

                Ok(AddPointsResponse {
                    user_id: updated.user_id,
                    old_points: updated.points.saturating_sub(points),
                    new_points: updated.points,
                })
            }
            .instrument(span),
        )
    }
}

fn create_entry(input: &AddPointsEvent, now: DateTime<Utc>) -> PointsEntry {
    let (points, reference_id) = match input {
        AddPointsEvent::BookingCompleted {
            booking_id,
            amount_spent,
        } => {
            // Negative or NaN amounts earn nothing
            let points = (amount_spent * POINTS_PER_UNIT_SPENT).floor().max(0.0) as u32;
            (points, Some(booking_id.clone()))
        }
        AddPointsEvent::Manual { points, .. } => (*points, None),
    };

    PointsEntry {
        points,
        entry_type: PointsEntryType::Earned,
        reason: input.reason().to_string(),
        reference_id,
        timestamp: now,
    }
}
