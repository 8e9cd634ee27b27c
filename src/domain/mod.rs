use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod policy;

/// Discount coupon bought with loyalty points
///
/// Field names are the persisted document names and must stay stable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Store-assigned identifier
    pub id: String,
    /// Code entered by the user when booking
    pub code: String,
    /// Discount value, in whole currency units
    pub value: u32,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub created_at: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub is_used: bool,
    pub used_date: Option<DateTime<Utc>>,
    /// Owner of the coupon
    pub user_id: String,
    /// Booking the coupon was applied to
    pub used_in_booking: Option<String>,
}

impl Coupon {
    /// A coupon can be redeemed only while unused and before its expiration date
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired(now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_date
    }

    /// Current lifecycle state
    ///
    /// `Expired` is never stored: it only depends on `now`. A used coupon stays `Used` even once
    /// its expiration date has passed.
    pub fn status(&self, now: DateTime<Utc>) -> CouponStatus {
        if self.is_used {
            CouponStatus::Used
        } else if self.is_expired(now) {
            CouponStatus::Expired
        } else {
            CouponStatus::Active
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    #[default]
    PointsReward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouponStatus {
    Active,
    Used,
    Expired,
}

/// Points balance of a user
#[derive(Clone, Debug)]
pub struct UserPoints {
    pub user_id: String,

    /// Current amount of loyalty points
    pub points: u32,

    /// Ledger entries for the user, oldest first
    pub history: Vec<PointsEntry>,
}

impl UserPoints {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            points: 0,
            history: Vec::default(),
        }
    }

    /// Apply a ledger entry to the balance
    ///
    /// Fails without touching the balance if the entry would take it out of range.
    pub fn apply(&mut self, entry: PointsEntry) -> Result<u32, BalanceError> {
        let points = match entry.entry_type {
            PointsEntryType::Earned => self
                .points
                .checked_add(entry.points)
                .ok_or(BalanceError::Overflow)?,
            PointsEntryType::Spent => self
                .points
                .checked_sub(entry.points)
                .ok_or(BalanceError::Negative)?,
        };
        self.points = points;
        self.history.push(entry);
        Ok(points)
    }
}

/// Reason a ledger entry cannot be applied to a balance
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    #[error("balance would become negative")]
    Negative,
    #[error("balance would exceed the maximum number of points")]
    Overflow,
}

/// Append-only record of a change to a points balance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsEntry {
    /// Magnitude of the change, the direction is given by `entry_type`
    pub points: u32,
    #[serde(rename = "type")]
    pub entry_type: PointsEntryType,
    /// Message explaining the reason for this entry.
    ///
    /// Since the reasons could evolve over time, we log this as a string instead of an enum.
    pub reason: String,
    /// Coupon or booking that caused this entry
    pub reference_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PointsEntry {
    /// Signed difference this entry makes to a balance
    pub fn delta(&self) -> i64 {
        match self.entry_type {
            PointsEntryType::Earned => i64::from(self.points),
            PointsEntryType::Spent => -i64::from(self.points),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointsEntryType {
    Earned,
    Spent,
}

/// Entry of the coupon catalog, computed from the tier table and never persisted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailableCoupon {
    pub value: u32,
    pub required_points: u32,
    pub description: String,
    /// Whether the current balance is enough to buy this coupon
    pub is_enabled: bool,
}

impl AvailableCoupon {
    pub fn can_be_redeemed(&self, user_points: u32) -> bool {
        self.is_enabled && user_points >= self.required_points
    }
}
