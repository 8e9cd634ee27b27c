use std::task::{Context, Poll};

use tower::Service;
use tracing::Instrument;

use crate::{domain::Coupon, ports::database::DatabasePort};

use super::{validate_coupon::validate, CommandFuture, DomainLogic, Error};

pub struct RedeemCouponRequest {
    /// User applying the coupon, must be its owner
    pub user_id: String,
    pub code: String,
    pub booking_id: String,
}

impl<D> Service<RedeemCouponRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    /// The coupon, now marked as used
    type Response = Coupon;
    type Error = Error;
    type Future = CommandFuture<Coupon>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RedeemCouponRequest) -> Self::Future {
        let database = self.database.clone();
        let now = self.clock.now();
        let span = tracing::info_span!(
            "redeem_coupon",
            user_id = %req.user_id,
            booking_id = %req.booking_id
        );
        Box::pin(
            async move {
                let booking_id = req.booking_id.trim();
                if req.code.trim().is_empty() || booking_id.is_empty() {
                    return Err(Error::InvalidInput);
                }

                let coupon = validate(database.as_ref(), &req.code, now).await?;
                if coupon.user_id != req.user_id {
                    tracing::warn!(coupon_id = %coupon.id, "coupon belongs to another user");
                    return Err(Error::PermissionDenied);
                }

                let coupon = database
                    .mark_coupon_used(&coupon.id, booking_id, now)
                    .await?;
                tracing::info!(coupon_id = %coupon.id, "coupon redeemed");

                Ok(coupon)
            }
            .instrument(span),
        )
    }
}
