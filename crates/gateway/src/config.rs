use common::env_or;
use std::net::SocketAddr;
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub addr: SocketAddr,
    /// How long a video stream waits for a new frame before giving up.
    pub stream_idle_timeout: Duration,
    /// Age of the last frame after which the camera is reported inactive.
    pub camera_stale_after: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            stream_idle_timeout: Duration::from_secs(5),
            camera_stale_after: Duration::from_secs(2),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let addr = match std::env::var("GATEWAY_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("GATEWAY_ADDR {:?} is not a socket address: {}", raw, e))?,
            Err(_) => defaults.addr,
        };

        Ok(Self {
            environment: Environment::from_env(),
            addr,
            stream_idle_timeout: Duration::from_millis(env_or(
                "GATEWAY_STREAM_IDLE_TIMEOUT_MS",
                defaults.stream_idle_timeout.as_millis() as u64,
            )),
            camera_stale_after: Duration::from_millis(env_or(
                "GATEWAY_CAMERA_STALE_MS",
                defaults.camera_stale_after.as_millis() as u64,
            )),
        })
    }
}
