//! `serimq-bridge` – the bridging engine.
//!
//! Ties the serial side to the broker side: lines read from the device are
//! classified and then either routed through the topic table to a broker
//! publish, or forwarded through the error channel.
//!
//! # Modules
//!
//! - [`router`] – the mutable sensor-to-topic routing table and the
//!   [`Publisher`] seam it dispatches through.
//! - [`error_channel`] – the optional topic and/or callback that error
//!   reports are forwarded to.
//! - [`bridge`] – the run loop: blocking read, classify, route/forward,
//!   with cancellation.

pub mod bridge;
pub mod error_channel;
pub mod router;

pub use bridge::{Bridge, BridgeState};
pub use error_channel::{ErrorCallback, ErrorChannel};
pub use router::{Publisher, TopicRouter};

use serimq_client::MqttSession;
use serimq_types::Result;

impl Publisher for MqttSession {
    fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        MqttSession::publish(self, topic, payload)
    }
}
