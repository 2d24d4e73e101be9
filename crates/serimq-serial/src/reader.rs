//! Line framing over a serial device.
//!
//! [`LineReader`] assembles newline-delimited frames from any byte source
//! and decodes them under a configured [`TextEncoding`]; [`SerialReader`] is
//! the production instantiation over an open serial port.
//!
//! The serial port is opened with a short read timeout. A timeout is not an
//! error: the reader reports it as [`LineEvent::Idle`] so the run loop can
//! check its cancellation flag between blocking reads. Partial frames
//! survive idle ticks and are completed by later reads.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use serimq_types::{BridgeError, Result};

use crate::encoding::TextEncoding;

/// Default baud rate for sensor microcontrollers.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout on the device; doubles as the cancellation poll tick of the
/// bridge run loop.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Size of the scratch buffer for each raw read.
const CHUNK_SIZE: usize = 256;

/// Outcome of one [`LineReader::read_line`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete decoded line, with exactly one trailing `\r\n` or `\n`
    /// stripped.
    Line(String),
    /// The read timed out before a full line arrived. Callers check their
    /// cancellation flag and call again; any partial frame is kept.
    Idle,
    /// The byte source reached end-of-stream.
    Closed,
}

/// Assembles and decodes newline-delimited frames from `R`.
pub struct LineReader<R: Read> {
    source: R,
    encoding: TextEncoding,
    pending: Vec<u8>,
}

impl<R: Read> std::fmt::Debug for LineReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader")
            .field("encoding", &self.encoding)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// A [`LineReader`] over an open serial device.
pub type SerialReader = LineReader<Box<dyn SerialPort>>;

impl LineReader<Box<dyn SerialPort>> {
    /// Open the serial device at `port` and wrap it in a reader.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::InvalidBaud`] when `baud` is zero.
    /// * [`BridgeError::SerialConnection`] when the device cannot be opened;
    ///   distinct from generic I/O errors so startup can report it as such.
    pub fn open(port: &str, baud: u32, encoding: TextEncoding) -> Result<Self> {
        if baud == 0 {
            return Err(BridgeError::InvalidBaud);
        }
        let device = serialport::new(port, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| BridgeError::SerialConnection(format!("{port}: {e}")))?;
        Ok(Self::new(device, encoding))
    }
}

impl<R: Read> LineReader<R> {
    /// Wrap an arbitrary byte source. Used directly in tests and by
    /// [`LineReader::open`] for real devices.
    pub fn new(source: R, encoding: TextEncoding) -> Self {
        Self {
            source,
            encoding,
            pending: Vec::new(),
        }
    }

    /// The encoding frames are decoded under.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Read the next complete line.
    ///
    /// Blocks until a full frame is available, the read times out
    /// ([`LineEvent::Idle`]), or the source ends ([`LineEvent::Closed`]).
    /// Frames whose bytes are invalid under the configured encoding are
    /// dropped and reading continues with the next frame.
    pub fn read_line(&mut self) -> Result<LineEvent> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let frame: Vec<u8> = self.pending.drain(..=pos).collect();
                match self.encoding.decode(&frame) {
                    Some(line) => return Ok(LineEvent::Line(strip_terminator(&line).to_string())),
                    None => {
                        debug!(
                            encoding = %self.encoding,
                            len = frame.len(),
                            "dropping undecodable frame"
                        );
                        continue;
                    }
                }
            }

            let mut chunk = [0u8; CHUNK_SIZE];
            match self.source.read(&mut chunk) {
                Ok(0) => return Ok(LineEvent::Closed),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    return Ok(LineEvent::Idle);
                }
                Err(e) => return Err(BridgeError::Io(e)),
            }
        }
    }
}

/// Strip exactly one trailing `\r\n` or, failing that, one trailing `\n`.
fn strip_terminator(line: &str) -> &str {
    if let Some(stripped) = line.strip_suffix("\r\n") {
        stripped
    } else if let Some(stripped) = line.strip_suffix('\n') {
        stripped
    } else {
        line
    }
}
