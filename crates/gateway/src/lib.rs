//! HTTP façade of the robot camera: the live MJPEG feed, motion commands and
//! a status snapshot.

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod routes;
pub mod state;
pub mod stream;

pub use config::GatewayConfig;
pub use lifecycle::release_devices;
pub use routes::{router, run_server};
pub use state::AppState;
