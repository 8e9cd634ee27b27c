use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use tower::Service;

use crate::{domain::Coupon, ports::database::DatabasePort};

use super::{CommandFuture, DomainLogic, Error};

pub struct ValidateCouponRequest {
    pub code: String,
}

impl<D> Service<ValidateCouponRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    type Response = Coupon;
    type Error = Error;
    type Future = CommandFuture<Coupon>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ValidateCouponRequest) -> Self::Future {
        let database = self.database.clone();
        let now = self.clock.now();
        Box::pin(async move { validate(database.as_ref(), &req.code, now).await })
    }
}

/// Look a coupon up and check it can still be redeemed
pub(super) async fn validate<D: DatabasePort + ?Sized>(
    database: &D,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Coupon, Error> {
    let code = code.trim();
    if code.is_empty() {
        return Err(Error::InvalidInput);
    }

    let coupon = database
        .get_coupon_by_code(code)
        .await?
        .ok_or(Error::CouponNotFound)?;

    check_redeemable(&coupon, now)?;

    Ok(coupon)
}

fn check_redeemable(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), Error> {
    if coupon.is_used {
        return Err(Error::CouponAlreadyUsed);
    }
    if coupon.is_expired(now) {
        return Err(Error::CouponExpired);
    }
    Ok(())
}
