//! [`ErrorChannel`] – the side channel for device error reports.
//!
//! Error reports can go to a broker topic, to an in-process callback, to
//! both, or nowhere. The two sinks are independently settable and both fire
//! for the same report when both are present.

use std::fmt;

use serimq_types::Result;

use crate::router::Publisher;

/// Invoked with the full error line for every forwarded report.
pub type ErrorCallback = Box<dyn Fn(&str) + Send + 'static>;

/// Optional topic and/or callback that error reports are forwarded to.
#[derive(Default)]
pub struct ErrorChannel {
    topic: Option<String>,
    callback: Option<ErrorCallback>,
}

impl ErrorChannel {
    /// Create a channel with neither sink set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the broker topic error reports are published to.
    pub fn set_topic(&mut self, topic: Option<&str>) {
        self.topic = topic.map(str::to_string);
    }

    /// The currently configured error topic, if any.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Set or clear the error callback.
    pub fn set_callback(&mut self, callback: Option<ErrorCallback>) {
        self.callback = callback;
    }

    /// Whether a callback is currently installed.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Forward one error report to whichever sinks are set.
    ///
    /// The callback fires first, then the publish; both are independent and
    /// neither is required.
    pub fn forward(&self, message: &str, publisher: &impl Publisher) -> Result<()> {
        if let Some(callback) = &self.callback {
            callback(message);
        }
        if let Some(topic) = &self.topic {
            publisher.publish(topic, message)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("topic", &self.topic)
            .field(
                "callback",
                if self.callback.is_some() { &"<set>" } else { &"<not set>" },
            )
            .finish()
    }
}
