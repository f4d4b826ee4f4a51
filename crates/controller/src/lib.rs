//! Motion commands for the robot's actuator controller.
//!
//! Commands travel as two-letter, newline-terminated tokens over a serial
//! link. With no link available the channel runs simulated: commands are
//! accepted and recorded but nothing is transmitted.

pub mod channel;
pub mod command;
pub mod config;
pub mod errors;

pub use channel::{CommandChannel, Link};
pub use command::Command;
pub use config::ControllerConfig;
pub use errors::CommandError;
