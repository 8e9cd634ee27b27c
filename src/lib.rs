//! Loyalty points and discount coupons for salon bookings.
//!
//! Users exchange points for coupons, then apply a coupon to a booking. The debit of points,
//! the ledger entry and the coupon creation always land together.

pub mod adapters {
    pub mod clock;
    pub mod database {
        pub mod memory;
    }
    pub mod session;
}
pub mod commands;
pub mod config;
pub mod domain;
pub mod ports {
    pub mod clock;
    pub mod database;
    pub mod session;
}
pub mod presentation;
