//! [`SessionRegistry`] – allocation and tracking of broker session
//! identifiers.
//!
//! Every connection the process opens gets a random identifier from a
//! bounded integer space so that concurrent runs on the same broker are
//! distinguishable. The registry is an explicit value owned by whoever
//! creates sessions; there is no process-wide state. Identifier allocation
//! uses rejection sampling, which is expected O(1) while the space stays
//! sparse.

use std::collections::HashMap;
use std::fmt;

use serimq_types::{BridgeError, Result};

/// Size of the session identifier space. Identifiers are drawn from
/// `[0, SESSION_ID_SPACE)`.
pub const SESSION_ID_SPACE: u32 = 1 << 17;

/// A session identifier: a random integer distinguishing one broker
/// connection from others made by the same process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u32);

impl SessionId {
    /// The raw identifier value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:05X}", self.0)
    }
}

/// Connection metadata kept per registered session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub broker_host: String,
    pub broker_port: u16,
}

/// Tracks every session identifier currently in use by this process.
///
/// Invariant: identifiers are pairwise distinct among currently registered
/// sessions. [`SessionRegistry::generate_id`] samples until it finds a free
/// identifier and [`SessionRegistry::register`] refuses to overwrite an
/// existing entry, so the invariant can only be broken by registering the
/// same identifier from two places, which is a programming error and is
/// surfaced as such.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionRecord>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample a random identifier not currently registered.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::IdSpaceExhausted`] when every identifier in the
    /// space is taken. With a 17-bit space and one session per process run
    /// this is not expected in practice; callers should treat it as a fatal
    /// invariant violation.
    pub fn generate_id(&self) -> Result<SessionId> {
        if self.sessions.len() as u32 >= SESSION_ID_SPACE {
            return Err(BridgeError::IdSpaceExhausted);
        }
        loop {
            let id = SessionId(fastrand::u32(..SESSION_ID_SPACE));
            if !self.sessions.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    /// Register `record` under `id`.
    ///
    /// The check-then-insert here is not atomic; it relies on registration
    /// happening from a single thread, which the `&mut self` receiver
    /// enforces at compile time. A concurrent-creation design would need a
    /// true test-and-set instead.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::RegistrationConflict`] when `id` is already
    /// registered. Callers treat this as fatal and abort.
    pub fn register(&mut self, id: SessionId, record: SessionRecord) -> Result<()> {
        if self.sessions.contains_key(&id) {
            return Err(BridgeError::RegistrationConflict { id: id.value() });
        }
        self.sessions.insert(id, record);
        Ok(())
    }

    /// Remove `id` from the registry. Removing an unknown identifier is a
    /// no-op.
    pub fn release(&mut self, id: SessionId) {
        self.sessions.remove(&id);
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// The record registered under `id`, if any.
    pub fn record(&self, id: SessionId) -> Option<&SessionRecord> {
        self.sessions.get(&id)
    }

    /// Number of currently registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
