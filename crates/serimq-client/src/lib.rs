//! `serimq-client` – broker connectivity.
//!
//! Owns the session side of the bridge: a registry that hands out unique
//! session identifiers, and the MQTT session itself with its background
//! delivery loop.
//!
//! # Modules
//!
//! - [`registry`] – allocation and tracking of session identifiers drawn from
//!   a bounded integer space.
//! - [`session`] – one connection to the broker: connect, subscribe, publish,
//!   and the event-loop thread that dispatches connect/message callbacks.

pub mod registry;
pub mod session;

pub use registry::{SessionId, SessionRecord, SessionRegistry, SESSION_ID_SPACE};
pub use session::{ConnectCallback, MessageCallback, MqttSession, DEFAULT_MQTT_PORT};
