use crate::config::GatewayConfig;
use bridge::FrameBuffer;
use controller::CommandChannel;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub frames: Arc<FrameBuffer>,
    pub commands: Arc<CommandChannel>,
    pub stream_idle_timeout: Duration,
    pub camera_stale_after: Duration,
    /// Flips to `true` once the server starts shutting down.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        frames: Arc<FrameBuffer>,
        commands: Arc<CommandChannel>,
        config: &GatewayConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            frames,
            commands,
            stream_idle_timeout: config.stream_idle_timeout,
            camera_stale_after: config.camera_stale_after,
            shutdown,
        }
    }

    pub fn camera_active(&self) -> bool {
        self.frames
            .last_publish_age()
            .is_some_and(|age| age <= self.camera_stale_after)
    }
}
