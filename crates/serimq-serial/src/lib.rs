//! `serimq-serial` – the device side of the bridge.
//!
//! Reads length-delimited text lines from a serial device, decodes them
//! under a configurable text encoding, and classifies each line against the
//! sensor wire protocol.
//!
//! # Modules
//!
//! - [`encoding`] – the configurable text encodings and their decode rules.
//! - [`reader`] – line framing over any byte source, with the serial-port
//!   opener.
//! - [`protocol`] – the line grammar: `error <message>` /
//!   `sensor <hardware-id> <value>`.

pub mod encoding;
pub mod protocol;
pub mod reader;

pub use encoding::TextEncoding;
pub use protocol::classify;
pub use reader::{LineEvent, LineReader, SerialReader, DEFAULT_BAUD_RATE};
