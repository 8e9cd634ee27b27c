//! Service configuration

use clap::Parser;

use crate::domain::policy::CouponPolicy;

/// Coupon service configuration
///
/// Every option can be set on the command line or through the environment.
#[derive(Clone, Debug, Parser)]
#[command(name = "salon-coupons", about = "Loyalty points and coupon service", long_about = None)]
pub struct CouponConfig {
    /// Points needed per unit of coupon value
    #[arg(long, env = "COUPON_POINTS_MULTIPLIER", default_value_t = 5)]
    pub points_multiplier: u32,

    /// Coupon values offered in the catalog
    #[arg(
        long,
        env = "COUPON_VALUES",
        value_delimiter = ',',
        default_values_t = [10, 20, 30]
    )]
    pub coupon_values: Vec<u32>,

    /// Length of the random segment of coupon codes
    #[arg(long, env = "COUPON_RANDOM_CODE_LENGTH", default_value_t = 4)]
    pub random_code_length: usize,

    /// Minimum number of digits for the value segment of coupon codes
    #[arg(long, env = "COUPON_VALUE_CODE_LENGTH", default_value_t = 3)]
    pub value_code_length: usize,

    /// Validity period of a coupon, in years
    #[arg(long, env = "COUPON_EXPIRATION_YEARS", default_value_t = 1)]
    pub expiration_years: u32,

    /// Attempts made by the store before giving up on a conflicting transaction
    #[arg(long, env = "STORE_MAX_TRANSACTION_ATTEMPTS", default_value_t = 5)]
    pub max_transaction_attempts: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl From<&CouponConfig> for CouponPolicy {
    fn from(config: &CouponConfig) -> Self {
        Self {
            points_multiplier: config.points_multiplier,
            coupon_values: config.coupon_values.clone(),
            random_code_length: config.random_code_length,
            value_code_length: config.value_code_length,
            expiration_years: config.expiration_years,
        }
    }
}
