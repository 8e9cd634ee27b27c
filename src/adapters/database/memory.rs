use crate::{
    domain::{BalanceError, Coupon, PointsEntry, UserPoints},
    ports::database::{DatabasePort, Error},
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// In-memory document store
///
/// Multi-document writes use optimistic concurrency: the user document is read with its
/// version, the writes are staged, and the commit only goes through if the version did not move
/// in the meantime. Conflicting transactions are retried up to `max_attempts` times.
#[derive(Clone, Debug)]
pub struct MemoryDatabase {
    collections: Arc<Mutex<Collections>>,
    max_attempts: u32,
}

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<String, UserDocument>,
    /// Coupons in insertion order
    coupons: Vec<Coupon>,
}

#[derive(Debug)]
struct UserDocument {
    points: UserPoints,
    version: u64,
}

/// Writes staged by a transaction body
struct Staged {
    user: UserPoints,
    coupon: Option<Coupon>,
}

impl MemoryDatabase {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            collections: Arc::default(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create or replace a user document with the given balance
    pub fn create_user(&self, user_id: &str, points: u32) -> Result<(), Error> {
        let mut user = UserPoints::new(user_id);
        user.points = points;
        self.collections.lock()?.users.insert(
            user_id.to_string(),
            UserDocument {
                points: user,
                version: 0,
            },
        );
        Ok(())
    }

    fn read_user(&self, user_id: &str) -> Result<(UserPoints, u64), Error> {
        self.collections
            .lock()?
            .users
            .get(user_id)
            .map(|doc| (doc.points.clone(), doc.version))
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    /// Apply staged writes if the user document is still at `version`
    ///
    /// Returns `None` on a write conflict.
    fn commit(
        &self,
        user_id: &str,
        version: u64,
        staged: Staged,
    ) -> Result<Option<UserPoints>, Error> {
        let mut guard = self.collections.lock()?;
        let collections = &mut *guard;
        let doc = collections
            .users
            .get_mut(user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        if doc.version != version {
            return Ok(None);
        }

        if let Some(coupon) = staged.coupon {
            if collections
                .coupons
                .iter()
                .any(|c| c.id == coupon.id || c.code == coupon.code)
            {
                return Err(Error::AlreadyExists(coupon.code));
            }
            collections.coupons.push(coupon);
        }
        doc.points = staged.user;
        doc.version += 1;

        Ok(Some(doc.points.clone()))
    }

    async fn transaction<F>(&self, user_id: &str, mut stage: F) -> Result<UserPoints, Error>
    where
        F: FnMut(UserPoints) -> Result<Staged, Error> + Send,
    {
        for attempt in 1..=self.max_attempts {
            let (snapshot, version) = self.read_user(user_id)?;
            let staged = stage(snapshot)?;
            // Other tasks may write between the read and the commit
            tokio::task::yield_now().await;
            match self.commit(user_id, version, staged)? {
                Some(user) => return Ok(user),
                None => tracing::debug!(user_id, attempt, "write conflict, retrying transaction"),
            }
        }

        Err(Error::TransactionAborted {
            attempts: self.max_attempts,
        })
    }
}

/// Stage a ledger entry on a balance snapshot
fn stage_entry(mut user: UserPoints, entry: PointsEntry) -> Result<UserPoints, Error> {
    let current_points = user.points;
    let delta_points = entry.delta();
    match user.apply(entry) {
        Ok(_) => Ok(user),
        Err(BalanceError::Negative) => Err(Error::NegativePointsTotal {
            current_points,
            delta_points,
        }),
        Err(BalanceError::Overflow) => Err(Error::PointsOverflow {
            current_points,
            delta_points,
        }),
    }
}

#[async_trait::async_trait]
impl DatabasePort for MemoryDatabase {
    async fn get_user_points(&self, user_id: &str) -> Result<UserPoints, Error> {
        self.read_user(user_id).map(|(user, _)| user)
    }

    async fn get_coupons_by_user(&self, user_id: &str) -> Result<Vec<Coupon>, Error> {
        let coupons = self
            .collections
            .lock()?
            .coupons
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();

        Ok(coupons)
    }

    async fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, Error> {
        let coupon = self
            .collections
            .lock()?
            .coupons
            .iter()
            .find(|c| c.code == code)
            .cloned();

        Ok(coupon)
    }

    async fn create_coupon_with_points(
        &self,
        user_id: &str,
        coupon: Coupon,
        entry: PointsEntry,
    ) -> Result<UserPoints, Error> {
        self.transaction(user_id, |snapshot| {
            Ok(Staged {
                user: stage_entry(snapshot, entry.clone())?,
                coupon: Some(coupon.clone()),
            })
        })
        .await
    }

    async fn mark_coupon_used(
        &self,
        coupon_id: &str,
        booking_id: &str,
        used_at: DateTime<Utc>,
    ) -> Result<Coupon, Error> {
        let mut collections = self.collections.lock()?;
        let coupon = collections
            .coupons
            .iter_mut()
            .find(|c| c.id == coupon_id)
            .ok_or_else(|| Error::CouponNotFound(coupon_id.to_string()))?;
        if coupon.is_used {
            return Err(Error::CouponAlreadyUsed(coupon.code.clone()));
        }

        coupon.is_used = true;
        coupon.used_date = Some(used_at);
        coupon.used_in_booking = Some(booking_id.to_string());

        Ok(coupon.clone())
    }

    async fn register_points_event(
        &self,
        user_id: &str,
        entry: PointsEntry,
    ) -> Result<UserPoints, Error> {
        self.transaction(user_id, |snapshot| {
            Ok(Staged {
                user: stage_entry(snapshot, entry.clone())?,
                coupon: None,
            })
        })
        .await
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

/// We need to create a custom `From` implementation here for an error that's specific to this
/// adapter.
impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
