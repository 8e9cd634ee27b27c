//! Pure coupon rules: pricing in points, code format, expiration and the tier catalog.

use chrono::{DateTime, Months, Utc};
use rand::Rng;

use super::{AvailableCoupon, Coupon};

/// Characters used for the random segment of a coupon code
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouponPolicy {
    /// Points needed for one unit of coupon value
    pub points_multiplier: u32,
    /// Coupon values that can be bought, in catalog order
    pub coupon_values: Vec<u32>,
    pub random_code_length: usize,
    /// Minimum number of digits for the value suffix of a code
    pub value_code_length: usize,
    pub expiration_years: u32,
}

impl Default for CouponPolicy {
    fn default() -> Self {
        Self {
            points_multiplier: 5,
            coupon_values: vec![10, 20, 30],
            random_code_length: 4,
            value_code_length: 3,
            expiration_years: 1,
        }
    }
}

impl CouponPolicy {
    /// Number of points needed to buy a coupon of the given value
    ///
    /// Saturates rather than wrapping, so an absurd value can never look cheap.
    pub fn required_points(&self, value: u32) -> u32 {
        value.saturating_mul(self.points_multiplier)
    }

    pub fn is_allowed_value(&self, value: u32) -> bool {
        value > 0 && self.coupon_values.contains(&value)
    }

    /// Build a coupon code
    ///
    /// The code is the creation time in epoch milliseconds, followed by a random
    /// `[A-Z0-9]` segment and the zero-padded value. The time prefix keeps codes practically
    /// unique without a uniqueness constraint in the store.
    pub fn generate_code<R: Rng + ?Sized>(
        &self,
        value: u32,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> String {
        let random_part: String = (0..self.random_code_length)
            .map(|_| {
                let idx = rng.gen_range(0..CODE_CHARSET.len());
                char::from(CODE_CHARSET[idx])
            })
            .collect();

        format!(
            "{}{}{:0width$}",
            now.timestamp_millis(),
            random_part,
            value,
            width = self.value_code_length
        )
    }

    /// Expiration date of a coupon created at `created_at`
    pub fn expiration_of(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at
            .checked_add_months(Months::new(self.expiration_years.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_valid(&self, coupon: &Coupon, now: DateTime<Utc>) -> bool {
        coupon.is_valid(now)
    }

    /// Coupon catalog for a given balance
    pub fn available_coupons(&self, user_points: u32) -> Vec<AvailableCoupon> {
        self.coupon_values
            .iter()
            .map(|&value| {
                let required_points = self.required_points(value);
                AvailableCoupon {
                    value,
                    required_points,
                    description: format!("{value}€ discount"),
                    is_enabled: user_points >= required_points,
                }
            })
            .collect()
    }
}
