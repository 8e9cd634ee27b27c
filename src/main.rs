//! Scripted coupon session against the in-memory store.
//!
//! Seeds a user with points, buys a coupon, then applies it to a booking.

use std::sync::Arc;

use clap::Parser;
use salon_coupon_service::{
    adapters::{database::memory::MemoryDatabase, session::MemorySession},
    commands::DomainLogic,
    config::CouponConfig,
    domain::policy::CouponPolicy,
    presentation::{CouponEvent, CouponViewModel},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct Args {
    #[command(flatten)]
    config: CouponConfig,

    /// User to run the session as
    #[arg(long, default_value = "demo-user")]
    user_id: String,

    /// Points given to the user before the session starts
    #[arg(long, default_value_t = 120)]
    seed_points: u32,

    /// Value of the coupon to buy
    #[arg(long, default_value_t = 20)]
    value: u32,

    /// Booking the coupon is applied to
    #[arg(long, default_value = "booking-1")]
    booking_id: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (ignore if missing)
    _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.config.log_level)),
        )
        .init();

    let database = MemoryDatabase::with_max_attempts(args.config.max_transaction_attempts);
    database.create_user(&args.user_id, args.seed_points)?;
    let domain = DomainLogic::new(Arc::new(database), CouponPolicy::from(&args.config));
    let session = MemorySession::signed_in(&args.user_id);
    let view_model = CouponViewModel::new(domain, Arc::new(session));
    let mut events = view_model.subscribe_events();

    view_model.load_data().await;
    let state = view_model.state();
    info!(points = state.user_points, "session started");
    for coupon in &state.available_coupons {
        info!(
            value = coupon.value,
            required_points = coupon.required_points,
            enabled = coupon.is_enabled,
            "{}",
            coupon.description
        );
    }

    view_model.on_coupon_selected(args.value).await;
    let code = match events.recv().await? {
        CouponEvent::CouponGenerated(coupon) => {
            info!(code = %coupon.code, expires = %coupon.expiration_date, "coupon bought");
            coupon.code
        }
        CouponEvent::Failed(err) => {
            warn!(%err, "could not buy coupon");
            return Ok(());
        }
        CouponEvent::CouponRedeemed(_) => return Ok(()),
    };
    info!(
        points = view_model.state().user_points,
        active = view_model.state().active_coupons.len(),
        "balance updated"
    );

    view_model.redeem(&code, &args.booking_id).await;
    match events.recv().await? {
        CouponEvent::CouponRedeemed(coupon) => {
            info!(code = %coupon.code, booking_id = ?coupon.used_in_booking, "coupon applied")
        }
        CouponEvent::Failed(err) => warn!(%err, "could not apply coupon"),
        CouponEvent::CouponGenerated(_) => {}
    }

    Ok(())
}
