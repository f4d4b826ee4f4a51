use crate::{command::Command, config::ControllerConfig, errors::CommandError};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::fmt::Display;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Byte sink towards the actuator (a serial port in production).
pub type Link = Box<dyn Write + Send>;

const NO_COMMAND: u8 = 0;

struct ActiveLink {
    device: String,
    writer: Link,
}

/// Serialized sender of motion commands.
///
/// All transmissions happen under one lock, so only one command is ever in
/// flight. The last accepted command is kept in an atomic and can be read by
/// status reporting without touching that lock.
pub struct CommandChannel {
    link: Mutex<Option<ActiveLink>>,
    connected: AtomicBool,
    last_command: AtomicU8,
    stop_grace: Duration,
}

impl CommandChannel {
    /// Open the first candidate serial device that accepts the configured
    /// settings, or fall back to simulated mode.
    pub fn probe(config: &ControllerConfig) -> Self {
        Self::probe_with(config, |path| open_serial(path, config))
    }

    /// Probe candidates with a caller-supplied opener.
    pub fn probe_with<F, E>(config: &ControllerConfig, mut open: F) -> Self
    where
        F: FnMut(&str) -> Result<Link, E>,
        E: Display,
    {
        for path in &config.serial_paths {
            match open(path) {
                Ok(writer) => {
                    tracing::info!(device = %path, baud = config.baud_rate, "Robot controller connected");
                    return Self::with_link(path, writer, config.stop_grace);
                }
                Err(e) => {
                    tracing::debug!(device = %path, error = %e, "Serial candidate unavailable");
                }
            }
        }

        tracing::warn!(
            candidates = ?config.serial_paths,
            "No robot controller found - running in simulated mode"
        );
        Self::simulated(config.stop_grace)
    }

    pub fn with_link(device: &str, writer: Link, stop_grace: Duration) -> Self {
        Self {
            link: Mutex::new(Some(ActiveLink {
                device: device.to_string(),
                writer,
            })),
            connected: AtomicBool::new(true),
            last_command: AtomicU8::new(NO_COMMAND),
            stop_grace,
        }
    }

    pub fn simulated(stop_grace: Duration) -> Self {
        Self {
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
            last_command: AtomicU8::new(NO_COMMAND),
            stop_grace,
        }
    }

    // A panic mid-write leaves at worst a partial token on the wire; the link
    // itself is still usable.
    fn lock(&self) -> MutexGuard<'_, Option<ActiveLink>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transmit one command. In simulated mode the command is only recorded.
    ///
    /// A failed write is reported to the caller and not retried; the link
    /// stays open for the next command.
    pub fn send(&self, command: Command) -> Result<(), CommandError> {
        let mut link = self.lock();

        match link.as_mut() {
            Some(active) => {
                transmit(&mut active.writer, command).map_err(|source| {
                    tracing::warn!(
                        device = %active.device,
                        command = %command,
                        error = %source,
                        "Command transmission failed"
                    );
                    CommandError::Transmission {
                        device: active.device.clone(),
                        source,
                    }
                })?;
                tracing::debug!(device = %active.device, command = %command, "Command sent");
            }
            None => {
                tracing::info!(command = %command, "Simulated command (no controller)");
            }
        }

        self.last_command.store(command as u8, Ordering::Release);
        Ok(())
    }

    /// Send Stop; meant for shutdown and error paths.
    pub fn emergency_stop(&self) -> Result<(), CommandError> {
        self.send(Command::Stop)
    }

    /// Issue a final Stop, give the controller a moment to act on it, then
    /// release the device. Later commands are simulated.
    pub fn close(&self) {
        // Only the first caller gets past this; the link stays in place
        // until its Stop has gone out.
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        if let Err(e) = self.emergency_stop() {
            tracing::error!(error = %e, "Failed to send stop before closing controller link");
        }
        std::thread::sleep(self.stop_grace);

        let released = self.lock().take();

        if let Some(active) = released {
            drop(active.writer);
            tracing::info!(device = %active.device, "Robot controller link closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn last_command(&self) -> Option<Command> {
        Command::from_u8(self.last_command.load(Ordering::Acquire))
    }
}

fn transmit(writer: &mut Link, command: Command) -> std::io::Result<()> {
    writer.write_all(&command.wire_bytes())?;
    writer.flush()
}

fn open_serial(path: &str, config: &ControllerConfig) -> serialport::Result<Link> {
    let port = serialport::new(path, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.write_timeout)
        .open()?;
    Ok(Box::new(port))
}
