use std::task::{Context, Poll};

use tower::Service;

use crate::{domain::AvailableCoupon, ports::database::DatabasePort};

use super::{CommandFuture, DomainLogic, Error};

pub struct ListAvailableCouponsRequest {
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListAvailableCouponsResponse {
    /// Balance the catalog was computed for
    pub points: u32,
    pub coupons: Vec<AvailableCoupon>,
}

impl<D> Service<ListAvailableCouponsRequest> for DomainLogic<D>
where
    D: DatabasePort + 'static,
{
    type Response = ListAvailableCouponsResponse;
    type Error = Error;
    type Future = CommandFuture<ListAvailableCouponsResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ListAvailableCouponsRequest) -> Self::Future {
        let database = self.database.clone();
        let policy = self.policy.clone();
        Box::pin(async move {
            let user = database.get_user_points(&req.user_id).await?;

            Ok(ListAvailableCouponsResponse {
                points: user.points,
                coupons: policy.available_coupons(user.points),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::database::memory::MemoryDatabase, domain::policy::CouponPolicy};
    use rstest::*;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    #[rstest]
    #[case(0, vec![false, false, false])]
    #[case(50, vec![true, false, false])]
    #[case(100, vec![true, true, false])]
    #[case(150, vec![true, true, true])]
    #[tokio::test]
    async fn test_call(#[case] points: u32, #[case] expected: Vec<bool>) -> Result<(), BoxError> {
        // GIVEN a user with some points
        let database = MemoryDatabase::default();
        database.create_user("user-1", points)?;
        let mut domain = DomainLogic::new(Arc::new(database), CouponPolicy::default());

        // WHEN listing the catalog
        let res = ServiceExt::<ListAvailableCouponsRequest>::ready(&mut domain)
            .await?
            .call(ListAvailableCouponsRequest {
                user_id: "user-1".to_string(),
            })
            .await?;

        // THEN tiers are enabled according to the balance
        assert_that!(res.points).is_equal_to(points);
        let enabled: Vec<_> = res.coupons.iter().map(|c| c.is_enabled).collect();
        assert_that!(enabled).is_equal_to(expected);

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_user() -> Result<(), BoxError> {
        let mut domain = DomainLogic::new(
            Arc::new(MemoryDatabase::default()),
            CouponPolicy::default(),
        );

        let res = ServiceExt::<ListAvailableCouponsRequest>::ready(&mut domain)
            .await?
            .call(ListAvailableCouponsRequest {
                user_id: "nobody".to_string(),
            })
            .await;

        assert_that!(res).is_err().is_equal_to(Error::UserNotFound);

        Ok(())
    }
}
