pub mod config;
pub mod logging;
pub mod retry;

pub use config::{Environment, env_flag, env_or};
pub use logging::setup_logging;
pub use retry::retry_with_backoff;
