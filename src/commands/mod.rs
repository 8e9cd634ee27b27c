use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    adapters::clock::SystemClock,
    domain::policy::CouponPolicy,
    ports::{clock::Clock, database, session},
};

pub mod add_points;
pub mod generate_coupon;
pub mod list_active_coupons;
pub mod list_available_coupons;
pub mod redeem_coupon;
pub mod validate_coupon;

/// Boxed future returned by every workflow operation
pub type CommandFuture<T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send>>;

/// Coupon and points workflow
///
/// Each operation is a [`tower::Service`] implementation on this type.
pub struct DomainLogic<D> {
    database: Arc<D>,
    policy: Arc<CouponPolicy>,
    clock: Arc<dyn Clock>,
}

impl<D> DomainLogic<D> {
    pub fn new(database: Arc<D>, policy: CouponPolicy) -> Self {
        Self::with_clock(database, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(database: Arc<D>, policy: CouponPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            database,
            policy: Arc::new(policy),
            clock,
        }
    }
}

impl<D> Clone for DomainLogic<D> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            policy: self.policy.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Errors surfaced by the workflow
///
/// This set is closed: store and session faults are folded into it, so callers only ever have
/// to render one of these.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("you need to sign in first")]
    NotAuthenticated,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid input")]
    InvalidInput,
    #[error("not enough points")]
    InsufficientPoints,
    #[error("coupon not found")]
    CouponNotFound,
    #[error("coupon already used")]
    CouponAlreadyUsed,
    #[error("coupon expired")]
    CouponExpired,
    #[error("coupon already exists")]
    CouponAlreadyExists,
    #[error("permission denied")]
    PermissionDenied,
    #[error("no internet connection")]
    NoInternet,
    #[error("operation cancelled")]
    OperationCancelled,
    #[error("unknown error")]
    Unknown,
}

impl From<database::Error> for Error {
    fn from(err: database::Error) -> Self {
        match err {
            database::Error::UserNotFound(_) => Self::UserNotFound,
            database::Error::CouponNotFound(_) => Self::CouponNotFound,
            database::Error::NegativePointsTotal { .. } => Self::InsufficientPoints,
            database::Error::PointsOverflow { .. } => Self::InvalidInput,
            database::Error::AlreadyExists(_) => Self::CouponAlreadyExists,
            database::Error::CouponAlreadyUsed(_) => Self::CouponAlreadyUsed,
            database::Error::PermissionDenied => Self::PermissionDenied,
            database::Error::Unavailable => Self::NoInternet,
            database::Error::Cancelled => Self::OperationCancelled,
            database::Error::TransactionAborted { .. } | database::Error::Adapter(_) => {
                tracing::error!(error = %err, "database port failure");
                Self::Unknown
            }
        }
    }
}

impl From<session::Error> for Error {
    fn from(err: session::Error) -> Self {
        match err {
            session::Error::NotAuthenticated => Self::NotAuthenticated,
            session::Error::Adapter(_) => {
                tracing::error!(error = %err, "session port failure");
                Self::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    #[rstest]
    #[case(database::Error::UserNotFound("u".into()), Error::UserNotFound)]
    #[case(database::Error::CouponNotFound("c".into()), Error::CouponNotFound)]
    #[case(database::Error::NegativePointsTotal { current_points: 0, delta_points: -50 }, Error::InsufficientPoints)]
    #[case(database::Error::PointsOverflow { current_points: 1, delta_points: i64::from(u32::MAX) }, Error::InvalidInput)]
    #[case(database::Error::AlreadyExists("c".into()), Error::CouponAlreadyExists)]
    #[case(database::Error::CouponAlreadyUsed("c".into()), Error::CouponAlreadyUsed)]
    #[case(database::Error::PermissionDenied, Error::PermissionDenied)]
    #[case(database::Error::Unavailable, Error::NoInternet)]
    #[case(database::Error::Cancelled, Error::OperationCancelled)]
    #[case(database::Error::TransactionAborted { attempts: 5 }, Error::Unknown)]
    #[case(database::Error::Adapter("boom".into()), Error::Unknown)]
    fn test_database_error_mapping(#[case] err: database::Error, #[case] expected: Error) {
        assert_that!(Error::from(err)).is_equal_to(expected);
    }

    #[rstest]
    #[case(session::Error::NotAuthenticated, Error::NotAuthenticated)]
    #[case(session::Error::Adapter("boom".into()), Error::Unknown)]
    fn test_session_error_mapping(#[case] err: session::Error, #[case] expected: Error) {
        assert_that!(Error::from(err)).is_equal_to(expected);
    }
}
