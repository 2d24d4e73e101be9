//! [`Bridge`] – the run loop joining the serial reader to the broker.
//!
//! One bridge owns the line reader, the routing table, the error channel and
//! the publisher. Its life is a single pass through
//! `Idle → Running → Stopped`: the loop blocks on the next serial line,
//! classifies it, and either dispatches a reading through the router or
//! forwards an error report through the error channel.
//!
//! Cancellation is a shared [`AtomicBool`] checked immediately before each
//! blocking read; the serial read timeout surfaces as an idle tick so a set
//! flag is observed within one tick even on a silent device. No
//! partial-message guarantees are made across cancellation.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, trace};

use serimq_serial::reader::{LineEvent, LineReader};
use serimq_serial::protocol::classify;
use serimq_types::{BridgeError, ParsedLine, Result};

use crate::error_channel::ErrorChannel;
use crate::router::{Publisher, TopicRouter};

/// Lifecycle of a bridge run loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed, not yet running.
    Idle,
    /// Inside [`Bridge::run`].
    Running,
    /// The loop has returned; the bridge cannot be restarted.
    Stopped,
}

/// The bridging engine.
///
/// `R` is the serial byte source (a real device in production, an in-memory
/// cursor in tests) and `P` the publisher readings are dispatched to.
pub struct Bridge<R: Read, P: Publisher> {
    reader: LineReader<R>,
    publisher: P,
    router: TopicRouter,
    errors: ErrorChannel,
    state: BridgeState,
}

impl<R: Read, P: Publisher> Bridge<R, P> {
    /// Build an idle bridge with an empty routing table and no error sinks.
    pub fn new(reader: LineReader<R>, publisher: P) -> Self {
        Self {
            reader,
            publisher,
            router: TopicRouter::new(),
            errors: ErrorChannel::new(),
            state: BridgeState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// The routing table, for configuration before [`Bridge::run`].
    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    /// Mutable routing table access.
    pub fn router_mut(&mut self) -> &mut TopicRouter {
        &mut self.router
    }

    /// The error channel, for configuration before [`Bridge::run`].
    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Mutable error-channel access.
    pub fn errors_mut(&mut self) -> &mut ErrorChannel {
        &mut self.errors
    }

    /// The publisher readings are dispatched to.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Run the bridge loop until `cancel` is set or the byte source closes.
    ///
    /// The flag is checked before every blocking read, so a cancellation
    /// delivered while the loop is parked on the device takes effect at the
    /// next read boundary. Returns `Ok(())` on a clean cancellation or
    /// end-of-stream.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::LoopAlreadyStarted`] when the bridge is not idle.
    /// * Publish failures and hard device I/O errors propagate and end the
    ///   loop; per-line decode failures and malformed lines do not.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<()> {
        if self.state != BridgeState::Idle {
            return Err(BridgeError::LoopAlreadyStarted);
        }
        self.state = BridgeState::Running;
        info!(routes = self.router.len(), "bridge loop running");

        let result = self.run_inner(cancel);

        self.state = BridgeState::Stopped;
        info!("bridge loop stopped");
        result
    }

    fn run_inner(&mut self, cancel: &AtomicBool) -> Result<()> {
        loop {
            if cancel.load(Ordering::SeqCst) {
                return Ok(());
            }
            match self.reader.read_line()? {
                LineEvent::Idle => continue,
                LineEvent::Closed => {
                    info!("serial byte source closed");
                    return Ok(());
                }
                LineEvent::Line(line) => self.handle_line(&line)?,
            }
        }
    }

    fn handle_line(&self, line: &str) -> Result<()> {
        match classify(line) {
            ParsedLine::SensorReading { hardware_id, value } => {
                self.router.dispatch(&hardware_id, &value, &self.publisher)
            }
            ParsedLine::ErrorReport { message } => {
                self.errors.forward(&message, &self.publisher)
            }
            ParsedLine::Malformed => {
                trace!(line, "discarding malformed line");
                Ok(())
            }
        }
    }
}
