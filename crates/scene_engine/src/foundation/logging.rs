//! Logging facade
//!
//! Library code only uses the `log` macros; the binary decides the sink.

pub use log::{debug, error, info, trace, warn};

/// Initialize logging with a default filter when `RUST_LOG` is not set
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
