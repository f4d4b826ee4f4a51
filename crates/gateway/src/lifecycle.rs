use capture::{ProducerHandle, ProducerStats};
use controller::CommandChannel;

/// Release the robot and the camera at shutdown.
///
/// The robot goes first: Stop reaches the actuator even when the capture
/// thread is wedged on a camera that stopped delivering frames.
pub fn release_devices(producer: ProducerHandle, commands: &CommandChannel) -> ProducerStats {
    commands.close();

    let stats = producer.close();
    tracing::info!(
        published = stats.published,
        dropped = stats.dropped,
        "Capture stopped"
    );
    stats
}
