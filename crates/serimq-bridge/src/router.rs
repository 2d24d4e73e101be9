//! [`TopicRouter`] – the sensor-to-topic routing table.
//!
//! Maps a sensor's hardware identifier to the broker topic its readings are
//! published on. Populated from the configuration before the run loop
//! starts; the routing API stays available afterwards, but reconfiguring a
//! running bridge requires exclusive access (`&mut`), which the borrow
//! checker enforces.

use std::collections::HashMap;

use tracing::{debug, trace};

use serimq_types::Result;

/// The bridge's view of something it can publish text messages to.
///
/// The broker session implements this; tests substitute an in-memory
/// recorder.
pub trait Publisher {
    /// Publish `payload` to `topic` as text.
    fn publish(&self, topic: &str, payload: &str) -> Result<()>;
}

/// Mutable mapping from sensor hardware identifier to broker topic.
///
/// Last write wins on reassignment; removal is idempotent.
#[derive(Debug, Default)]
pub struct TopicRouter {
    routes: HashMap<String, String>,
}

impl TopicRouter {
    /// Create an empty routing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the route for `hardware_id`.
    ///
    /// `Some(topic)` maps the sensor, replacing any existing route;
    /// `None` clears it, and clearing an unmapped id is a no-op.
    pub fn route(&mut self, hardware_id: &str, topic: Option<&str>) {
        match topic {
            Some(topic) => {
                if let Some(old) = self
                    .routes
                    .insert(hardware_id.to_string(), topic.to_string())
                {
                    debug!(hardware_id, old = %old, new = topic, "route replaced");
                }
            }
            None => {
                self.routes.remove(hardware_id);
            }
        }
    }

    /// The topic `hardware_id` is routed to, if any.
    pub fn topic_for(&self, hardware_id: &str) -> Option<&str> {
        self.routes.get(hardware_id).map(String::as_str)
    }

    /// Iterate over every routed topic (used to subscribe at startup).
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.routes.values().map(String::as_str)
    }

    /// Number of routed sensors.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Publish `value` to the topic routed for `hardware_id`.
    ///
    /// Readings from unmapped sensors are dropped silently; unmonitored
    /// sensors are expected traffic, not an error.
    pub fn dispatch(
        &self,
        hardware_id: &str,
        value: &str,
        publisher: &impl Publisher,
    ) -> Result<()> {
        match self.routes.get(hardware_id) {
            Some(topic) => publisher.publish(topic, value),
            None => {
                trace!(hardware_id, "dropping reading from unrouted sensor");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every publish instead of talking to a broker.
    #[derive(Default)]
    pub(crate) struct MockPublisher {
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl Publisher for MockPublisher {
        fn publish(&self, topic: &str, payload: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    #[test]
    fn dispatch_routes_mapped_sensor() {
        let mut router = TopicRouter::new();
        router.route("T1", Some("home/temp"));
        let publisher = MockPublisher::default();

        router.dispatch("T1", "23.5", &publisher).unwrap();

        let calls = publisher.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("home/temp".to_string(), "23.5".to_string())]);
    }

    #[test]
    fn dispatch_drops_unmapped_sensor() {
        let router = TopicRouter::new();
        let publisher = MockPublisher::default();

        router.dispatch("T2", "10", &publisher).unwrap();

        assert!(publisher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn reroute_overwrites_and_dispatches_to_latest() {
        let mut router = TopicRouter::new();
        router.route("T1", Some("A"));
        router.route("T1", Some("B"));
        let publisher = MockPublisher::default();

        router.dispatch("T1", "1", &publisher).unwrap();

        let calls = publisher.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("B".to_string(), "1".to_string())]);
    }

    #[test]
    fn clearing_twice_is_a_no_op() {
        let mut router = TopicRouter::new();
        router.route("T1", Some("home/temp"));
        router.route("T1", None);
        // Clearing an already-absent id must succeed silently.
        router.route("T1", None);
        assert!(router.is_empty());
        assert_eq!(router.topic_for("T1"), None);
    }

    #[test]
    fn topics_lists_routed_topics() {
        let mut router = TopicRouter::new();
        router.route("T1", Some("home/temp"));
        router.route("H1", Some("home/humidity"));

        let mut topics: Vec<&str> = router.topics().collect();
        topics.sort_unstable();
        assert_eq!(topics, vec!["home/humidity", "home/temp"]);
    }
}
