use chrono::{DateTime, Utc};

use crate::domain::{Coupon, PointsEntry, UserPoints};

/// Document store holding points balances, points ledgers and coupons
///
/// Methods that touch more than one document are atomic: either every write lands or none
/// does. Implementations resolve write conflicts themselves and only report
/// [`Error::TransactionAborted`] once they gave up.
#[mockall::automock]
#[async_trait::async_trait]
pub trait DatabasePort: Send + Sync {
    async fn get_user_points(&self, user_id: &str) -> Result<UserPoints, Error>;

    /// Coupons owned by a user, in insertion order
    async fn get_coupons_by_user(&self, user_id: &str) -> Result<Vec<Coupon>, Error>;

    async fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, Error>;

    /// Store a new coupon, append the ledger entry and debit the balance as one unit
    ///
    /// The balance is read again inside the transaction. Returns the updated balance.
    async fn create_coupon_with_points(
        &self,
        user_id: &str,
        coupon: Coupon,
        entry: PointsEntry,
    ) -> Result<UserPoints, Error>;

    /// Mark a coupon as used for a booking
    ///
    /// Fails with [`Error::CouponAlreadyUsed`] if the coupon was used in the meantime.
    async fn mark_coupon_used(
        &self,
        coupon_id: &str,
        booking_id: &str,
        used_at: DateTime<Utc>,
    ) -> Result<Coupon, Error>;

    /// Append a ledger entry and apply it to the balance
    async fn register_points_event(
        &self,
        user_id: &str,
        entry: PointsEntry,
    ) -> Result<UserPoints, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("user {0} does not exist")]
    UserNotFound(String),

    #[error("coupon {0} does not exist")]
    CouponNotFound(String),

    /// Trying to remove too many points
    ///
    /// This would result in a negative number of points, which is not supported.
    #[error("trying to subtract too many points: {delta_points} from {current_points}")]
    NegativePointsTotal {
        current_points: u32,
        delta_points: i64,
    },

    /// Trying to add too many points
    ///
    /// The resulting balance would not fit in a points counter.
    #[error("trying to add too many points: {delta_points} to {current_points}")]
    PointsOverflow {
        current_points: u32,
        delta_points: i64,
    },

    /// A document with the same id or coupon code already exists
    #[error("document {0} already exists")]
    AlreadyExists(String),

    #[error("coupon {0} is already used")]
    CouponAlreadyUsed(String),

    #[error("permission denied")]
    PermissionDenied,

    /// The store could not be reached
    #[error("store unavailable")]
    Unavailable,

    #[error("operation cancelled")]
    Cancelled,

    /// The store kept hitting write conflicts and gave up
    #[error("transaction aborted after {attempts} attempt(s)")]
    TransactionAborted { attempts: u32 },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
