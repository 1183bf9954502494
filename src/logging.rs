//! Tracing setup: `FmtSubscriber` initialization driven by `RUST_LOG` via
//! `EnvFilter` instead of a fixed level.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
