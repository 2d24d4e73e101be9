use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification result for one decoded, terminator-stripped serial line.
///
/// Produced by the message classifier in `serimq-serial` and consumed by the
/// bridge run loop, which routes readings through the topic table and error
/// reports through the error channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedLine {
    /// A `sensor <hardware-id> <value>` line. The value is opaque text and
    /// may itself contain spaces.
    SensorReading { hardware_id: String, value: String },
    /// An `error <free text>` line. The message is the entire line, prefix
    /// included.
    ErrorReport { message: String },
    /// Anything else. Dropped without diagnostic; partial lines on device
    /// startup are expected traffic, not a fault.
    Malformed,
}

/// Global error type spanning configuration, broker, serial and lifecycle
/// failures.
///
/// Startup errors (`Config`, `BrokerConnection`, `SerialConnection`) abort the
/// process before any persistent I/O; the per-line failure modes (undecodable
/// bytes, malformed lines) are recovered inside the read loop and never
/// surface here.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("broker connection failed: {0}")]
    BrokerConnection(String),

    #[error("serial device unavailable: {0}")]
    SerialConnection(String),

    #[error("broker port must be a positive non-zero integer")]
    InvalidPort,

    #[error("baud rate must be a positive non-zero integer")]
    InvalidBaud,

    #[error("session identifier space exhausted")]
    IdSpaceExhausted,

    #[error("session 0x{id:05X} is already registered")]
    RegistrationConflict { id: u32 },

    #[error("run loop already started")]
    LoopAlreadyStarted,

    #[error("broker client error: {0}")]
    Client(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, BridgeError>;
