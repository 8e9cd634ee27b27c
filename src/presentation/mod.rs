//! Observable coupon screen state
//!
//! [`CouponViewModel`] is the only writer of [`CouponState`]. Readers subscribe to a `watch`
//! channel and always see the latest state, including when they subscribe late. Outcomes of
//! user actions are pushed once on a separate `broadcast` channel.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tower::ServiceExt;

use crate::{
    commands::{
        generate_coupon::GenerateCouponRequest, list_active_coupons::ListActiveCouponsRequest,
        list_available_coupons::ListAvailableCouponsRequest,
        redeem_coupon::RedeemCouponRequest, DomainLogic, Error,
    },
    domain::{AvailableCoupon, Coupon},
    ports::{database::DatabasePort, session::SessionPort},
};

const EVENT_CAPACITY: usize = 16;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CouponState {
    pub user_points: u32,
    pub available_coupons: Vec<AvailableCoupon>,
    pub active_coupons: Vec<Coupon>,
    pub is_loading: bool,
}

impl CouponState {
    /// Whether at least one catalog entry can be bought
    pub fn can_redeem_coupons(&self) -> bool {
        self.available_coupons.iter().any(|c| c.is_enabled)
    }

    pub fn has_active_coupons(&self) -> bool {
        !self.active_coupons.is_empty()
    }
}

/// One-shot outcome of a user action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouponEvent {
    CouponGenerated(Coupon),
    CouponRedeemed(Coupon),
    /// The action failed, the error kind tells the UI which message to show
    Failed(Error),
}

pub struct CouponViewModel<D, S> {
    domain: DomainLogic<D>,
    session: Arc<S>,
    state: watch::Sender<CouponState>,
    events: broadcast::Sender<CouponEvent>,
}

impl<D, S> CouponViewModel<D, S>
where
    D: DatabasePort + 'static,
    S: SessionPort,
{
    pub fn new(domain: DomainLogic<D>, session: Arc<S>) -> Self {
        let (state, _) = watch::channel(CouponState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            domain,
            session,
            state,
            events,
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CouponState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CouponEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> CouponState {
        self.state.borrow().clone()
    }

    /// Reload the balance, the catalog and the active coupons
    pub async fn load_data(&self) {
        self.update_state(|state| CouponState {
            is_loading: true,
            ..state.clone()
        });
        match self.current_user().await {
            Ok(user_id) => self.load_coupons(&user_id).await,
            Err(err) => self.emit(CouponEvent::Failed(err)),
        }
        self.update_state(|state| CouponState {
            is_loading: false,
            ..state.clone()
        });
    }

    /// Buy a coupon of the selected value
    pub async fn on_coupon_selected(&self, value: u32) {
        self.update_state(|state| CouponState {
            is_loading: true,
            ..state.clone()
        });
        match self.generate(value).await {
            Ok((user_id, coupon)) => {
                self.emit(CouponEvent::CouponGenerated(coupon));
                self.load_coupons(&user_id).await;
            }
            Err(err) => self.emit(CouponEvent::Failed(err)),
        }
        self.update_state(|state| CouponState {
            is_loading: false,
            ..state.clone()
        });
    }

    /// Apply a coupon to a booking
    pub async fn redeem(&self, code: &str, booking_id: &str) {
        let res = match self.current_user().await {
            Ok(user_id) => self
                .domain
                .clone()
                .oneshot(RedeemCouponRequest {
                    user_id: user_id.clone(),
                    code: code.to_string(),
                    booking_id: booking_id.to_string(),
                })
                .await
                .map(|coupon| (user_id, coupon)),
            Err(err) => Err(err),
        };

        match res {
            Ok((user_id, coupon)) => {
                self.emit(CouponEvent::CouponRedeemed(coupon));
                self.load_coupons(&user_id).await;
            }
            Err(err) => self.emit(CouponEvent::Failed(err)),
        }
    }

    async fn generate(&self, value: u32) -> Result<(String, Coupon), Error> {
        let user_id = self.current_user().await?;
        let res = self
            .domain
            .clone()
            .oneshot(GenerateCouponRequest {
                user_id: user_id.clone(),
                value,
            })
            .await?;
        Ok((user_id, res.coupon))
    }

    async fn load_coupons(&self, user_id: &str) {
        let active = self
            .domain
            .clone()
            .oneshot(ListActiveCouponsRequest {
                user_id: user_id.to_string(),
            })
            .await;
        match active {
            Ok(active_coupons) => self.update_state(|state| CouponState {
                active_coupons,
                ..state.clone()
            }),
            Err(err) => self.emit(CouponEvent::Failed(err)),
        }

        let available = self
            .domain
            .clone()
            .oneshot(ListAvailableCouponsRequest {
                user_id: user_id.to_string(),
            })
            .await;
        match available {
            Ok(res) => self.update_state(|state| CouponState {
                user_points: res.points,
                available_coupons: res.coupons,
                ..state.clone()
            }),
            Err(err) => self.emit(CouponEvent::Failed(err)),
        }
    }

    async fn current_user(&self) -> Result<String, Error> {
        Ok(self.session.current_user_id().await?)
    }

    fn update_state<F>(&self, update: F)
    where
        F: FnOnce(&CouponState) -> CouponState,
    {
        self.state.send_modify(|state| *state = update(state));
    }

    fn emit(&self, event: CouponEvent) {
        if let Err(err) = self.events.send(event) {
            tracing::debug!(event = ?err.0, "no subscriber for coupon event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{database::memory::MemoryDatabase, session::MemorySession},
        domain::policy::CouponPolicy,
        ports::session::MockSessionPort,
    };
    use speculoos::prelude::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn view_model(
        points: u32,
    ) -> Result<CouponViewModel<MemoryDatabase, MemorySession>, crate::ports::database::Error>
    {
        let database = MemoryDatabase::default();
        database.create_user("user-1", points)?;
        let domain = DomainLogic::new(Arc::new(database), CouponPolicy::default());
        Ok(CouponViewModel::new(
            domain,
            Arc::new(MemorySession::signed_in("user-1")),
        ))
    }

    #[tokio::test]
    async fn test_load_data() -> Result<(), crate::ports::database::Error> {
        // GIVEN a signed-in user with 100 points
        let view_model = view_model(100)?;

        // WHEN loading the screen
        view_model.load_data().await;

        // THEN the catalog reflects the balance
        let state = view_model.state();
        assert_that!(state.user_points).is_equal_to(100);
        assert_that!(state.is_loading).is_false();
        assert_that!(state.can_redeem_coupons()).is_true();
        assert_that!(state.has_active_coupons()).is_false();
        let enabled: Vec<_> = state
            .available_coupons
            .iter()
            .map(|c| (c.value, c.is_enabled))
            .collect();
        assert_that!(enabled).is_equal_to(vec![(10, true), (20, true), (30, false)]);

        Ok(())
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_latest_state() -> Result<(), crate::ports::database::Error>
    {
        let view_model = view_model(70)?;
        view_model.load_data().await;

        let receiver = view_model.subscribe_state();

        assert_that!(receiver.borrow().user_points).is_equal_to(70);

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_refreshes_state() -> Result<(), crate::ports::database::Error> {
        let view_model = view_model(100)?;
        let mut events = view_model.subscribe_events();
        view_model.load_data().await;

        // WHEN buying the 20 coupon
        view_model.on_coupon_selected(20).await;

        // THEN
        // * the outcome is pushed once
        // * the state shows the new coupon and balance
        let event = events.try_recv();
        assert_that!(event)
            .is_ok()
            .matches(|event| matches!(event, CouponEvent::CouponGenerated(c) if c.value == 20));
        assert_that!(events.try_recv())
            .is_err()
            .is_equal_to(TryRecvError::Empty);
        let state = view_model.state();
        assert_that!(state.user_points).is_equal_to(0);
        assert_that!(state.active_coupons).has_length(1);
        assert_that!(state.can_redeem_coupons()).is_false();

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_failure() -> Result<(), crate::ports::database::Error> {
        let view_model = view_model(40)?;
        let mut events = view_model.subscribe_events();

        view_model.on_coupon_selected(10).await;

        assert_that!(events.try_recv())
            .is_ok()
            .is_equal_to(CouponEvent::Failed(Error::InsufficientPoints));
        assert_that!(view_model.state().is_loading).is_false();

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem() -> Result<(), crate::ports::database::Error> {
        let view_model = view_model(50)?;
        view_model.on_coupon_selected(10).await;
        let code = view_model
            .state()
            .active_coupons
            .first()
            .map(|c| c.code.clone())
            .unwrap_or_default();
        let mut events = view_model.subscribe_events();

        view_model.redeem(&code, "booking-1").await;

        assert_that!(events.try_recv())
            .is_ok()
            .matches(|event| matches!(event, CouponEvent::CouponRedeemed(c) if c.is_used));
        assert_that!(view_model.state().has_active_coupons()).is_false();

        Ok(())
    }

    #[tokio::test]
    async fn test_not_authenticated() {
        let mut session = MockSessionPort::new();
        session
            .expect_current_user_id()
            .returning(|| Err(crate::ports::session::Error::NotAuthenticated));
        let domain = DomainLogic::new(
            Arc::new(MemoryDatabase::default()),
            CouponPolicy::default(),
        );
        let view_model = CouponViewModel::new(domain, Arc::new(session));
        let mut events = view_model.subscribe_events();

        view_model.load_data().await;

        assert_that!(events.try_recv())
            .is_ok()
            .is_equal_to(CouponEvent::Failed(Error::NotAuthenticated));
        assert_that!(view_model.state()).is_equal_to(CouponState::default());
    }
}
