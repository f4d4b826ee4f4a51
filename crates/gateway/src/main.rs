use anyhow::Context;
use bridge::FrameBuffer;
use capture::{CaptureConfig, CapturePacing, FrameProducer, FrameTransform, Orientation, open_source};
use controller::{CommandChannel, ControllerConfig};
use gateway::{AppState, GatewayConfig, logging::setup_logging, release_devices, run_server};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Upper bound on waiting for blocking-pool tasks once the server is down.
const RUNTIME_DRAIN: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<()> {
    let gateway_config = GatewayConfig::from_env()?;
    setup_logging(&gateway_config);

    let capture_config = CaptureConfig::from_env()?;
    let controller_config = ControllerConfig::from_env();

    let frames = Arc::new(FrameBuffer::new());

    let source = open_source(&capture_config)?;
    let orientation = if capture_config.rotate_180 {
        Orientation::Rotate180
    } else {
        Orientation::Normal
    };
    let producer = FrameProducer::new(
        source,
        Arc::clone(&frames),
        FrameTransform::new(orientation)?,
        CapturePacing::new(capture_config.fps),
    )
    .spawn()?;

    let commands = Arc::new(CommandChannel::probe(&controller_config));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(
        Arc::clone(&frames),
        Arc::clone(&commands),
        &gateway_config,
        shutdown_rx,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let served = runtime.block_on(run_server(
        gateway_config.addr,
        state,
        shutdown_signal(shutdown_tx),
    ));
    runtime.shutdown_timeout(RUNTIME_DRAIN);

    release_devices(producer, &commands);

    tracing::info!("Shutdown complete");
    served
}

/// Resolve on SIGINT or SIGTERM and tell open video streams to finish.
async fn shutdown_signal(streams: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received, stopping gateway");
    streams.send_replace(true);
}
