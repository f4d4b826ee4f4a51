use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Failed to send command to {device}: {source}")]
    Transmission {
        device: String,
        #[source]
        source: io::Error,
    },
}
