use crate::errors::CommandError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Forward = 1,
    Backward = 2,
    Left = 3,
    Right = 4,
    Stop = 5,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Forward,
        Command::Backward,
        Command::Left,
        Command::Right,
        Command::Stop,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Command::Forward),
            2 => Some(Command::Backward),
            3 => Some(Command::Left),
            4 => Some(Command::Right),
            5 => Some(Command::Stop),
            _ => None,
        }
    }

    /// Verb used on the HTTP surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::Left => "left",
            Command::Right => "right",
            Command::Stop => "stop",
        }
    }

    /// Two-letter token understood by the actuator firmware.
    pub fn wire_token(&self) -> &'static str {
        match self {
            Command::Forward => "fo",
            Command::Backward => "ba",
            Command::Left => "le",
            Command::Right => "ri",
            Command::Stop => "st",
        }
    }

    /// Token plus the terminating newline, as written to the link.
    pub fn wire_bytes(&self) -> [u8; 3] {
        let token = self.wire_token().as_bytes();
        [token[0], token[1], b'\n']
    }
}

impl FromStr for Command {
    type Err = CommandError;

    /// Exact, case-sensitive match on the lowercase verb.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| CommandError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
