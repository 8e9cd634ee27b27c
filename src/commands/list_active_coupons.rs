use std::task::{Context, Poll};

use tower::Service;

use crate::{domain::Coupon, ports::database::DatabasePort};

use super::{CommandFuture, DomainLogic, Error};

pub struct ListActiveCouponsRequest {
    pub user_id: String,
}

impl<D> Service<ListActiveCouponsRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    /// Redeemable coupons of the user, in store order
    type Response = Vec<Coupon>;
    type Error = Error;
    type Future = CommandFuture<Vec<Coupon>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ListActiveCouponsRequest) -> Self::Future {
        let database = self.database.clone();
        let policy = self.policy.clone();
        let now = self.clock.now();
        Box::pin(async move {
            let coupons = database.get_coupons_by_user(&req.user_id).await?;

            Ok(coupons
                .into_iter()
                .filter(|c| policy.is_valid(c, now))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::clock::FixedClock,
        domain::{policy::CouponPolicy, CouponType},
        ports::database::MockDatabasePort,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockall::predicate::*;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    fn coupon(id: &str, now: DateTime<Utc>, is_used: bool, expires_in: Duration) -> Coupon {
        Coupon {
            id: id.to_string(),
            code: format!("CODE-{id}"),
            value: 10,
            coupon_type: CouponType::PointsReward,
            created_at: now - Duration::days(100),
            expiration_date: now + expires_in,
            is_used,
            used_date: None,
            user_id: "user-1".to_string(),
            used_in_booking: None,
        }
    }

    #[tokio::test]
    async fn test_call() -> Result<(), BoxError> {
        // GIVEN a user with active, used and expired coupons
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let stored = vec![
            coupon("a", now, false, Duration::days(30)),
            coupon("b", now, true, Duration::days(30)),
            coupon("c", now, false, Duration::days(-1)),
            coupon("d", now, false, Duration::seconds(1)),
        ];
        let mut database = MockDatabasePort::new();
        database
            .expect_get_coupons_by_user()
            .times(1)
            .with(eq("user-1"))
            .returning(move |_| Ok(stored.clone()));
        let mut domain = DomainLogic::with_clock(
            Arc::new(database),
            CouponPolicy::default(),
            Arc::new(FixedClock::new(now)),
        );

        // WHEN listing active coupons
        let res = ServiceExt::<ListActiveCouponsRequest>::ready(&mut domain)
            .await?
            .call(ListActiveCouponsRequest {
                user_id: "user-1".to_string(),
            })
            .await?;

        // THEN only the redeemable ones are returned, in store order
        let ids: Vec<_> = res.iter().map(|c| c.id.as_str()).collect();
        assert_that!(ids).is_equal_to(vec!["a", "d"]);

        Ok(())
    }
}
