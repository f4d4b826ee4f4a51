use common::env_or;
use std::env;
use std::time::Duration;

const DEFAULT_SERIAL_PATHS: [&str; 4] = [
    "/dev/ttyUSB0",
    "/dev/ttyACM0",
    "/dev/ttyAMA0",
    "/dev/serial0",
];

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Candidate device paths, tried in order.
    pub serial_paths: Vec<String>,
    pub baud_rate: u32,
    pub write_timeout: Duration,
    /// Pause between the final Stop and releasing the link.
    pub stop_grace: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            serial_paths: DEFAULT_SERIAL_PATHS.iter().map(|p| p.to_string()).collect(),
            baud_rate: 9600,
            write_timeout: Duration::from_millis(100),
            stop_grace: Duration::from_millis(100),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let serial_paths = env::var("ROBOT_SERIAL_PATHS")
            .ok()
            .map(|raw| parse_paths(&raw))
            .filter(|paths| !paths.is_empty())
            .unwrap_or(defaults.serial_paths);

        Self {
            serial_paths,
            baud_rate: env_or("ROBOT_BAUD_RATE", defaults.baud_rate),
            write_timeout: Duration::from_millis(env_or(
                "ROBOT_WRITE_TIMEOUT_MS",
                defaults.write_timeout.as_millis() as u64,
            )),
            stop_grace: Duration::from_millis(env_or(
                "ROBOT_STOP_GRACE_MS",
                defaults.stop_grace.as_millis() as u64,
            )),
        }
    }
}

fn parse_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
