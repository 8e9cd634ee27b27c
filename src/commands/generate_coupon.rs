use std::task::{Context, Poll};

use rand::rngs::OsRng;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    domain::{Coupon, CouponType, PointsEntry, PointsEntryType},
    ports::database::DatabasePort,
};

use super::{CommandFuture, DomainLogic, Error};

const REDEMPTION_REASON: &str = "Coupon redemption";

pub struct GenerateCouponRequest {
    pub user_id: String,
    /// Coupon value, must be one of the catalog values
    pub value: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateCouponResponse {
    pub coupon: Coupon,
    /// Number of points before the purchase
    pub old_points: u32,
    /// Number of points after the purchase
    pub new_points: u32,
}

impl<D> Service<GenerateCouponRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    type Response = GenerateCouponResponse;
    type Error = Error;
    type Future = CommandFuture<GenerateCouponResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GenerateCouponRequest) -> Self::Future {
        let database = self.database.clone();
        let policy = self.policy.clone();
        let now = self.clock.now();
        let span = tracing::info_span!(
            "generate_coupon",
            user_id = %req.user_id,
            value = req.value
        );
        Box::pin(
            async move {
                if !policy.is_allowed_value(req.value) {
                    tracing::warn!("coupon value is not in the catalog");
                    return Err(Error::InvalidInput);
                }
                let required_points = policy.required_points(req.value);

                // Reject early on the current balance. The store checks it again inside the
                // transaction, which is the only check that counts.
                let user = database.get_user_points(&req.user_id).await?;
                if user.points < required_points {
                    tracing::warn!(
                        points = user.points,
                        required_points,
                        "not enough points for coupon"
                    );
                    return Err(Error::InsufficientPoints);
                }

                let coupon = Coupon {
                    id: Uuid::new_v4().to_string(),
                    code: policy.generate_code(req.value, now, &mut OsRng),
                    value: req.value,
                    coupon_type: CouponType::PointsReward,
                    created_at: now,
                    expiration_date: policy.expiration_of(now),
                    is_used: false,
                    used_date: None,
                    user_id: req.user_id.clone(),
                    used_in_booking: None,
                };
                let entry = PointsEntry {
                    points: required_points,
                    entry_type: PointsEntryType::Spent,
                    reason: REDEMPTION_REASON.to_string(),
                    reference_id: Some(coupon.id.clone()),
                    timestamp: now,
                };

                let updated = database
                    .create_coupon_with_points(&req.user_id, coupon.clone(), entry)
                    .await?;

                tracing::info!(
                    coupon_id = %coupon.id,
                    points = updated.points,
                    "coupon generated"
                );

                Ok(GenerateCouponResponse {
                    coupon,
                    old_points: updated.points.saturating_add(required_points),
                    new_points: updated.points,
                })
            }
            .instrument(span),
        )
    }
}
