//! [`MqttSession`] – one client connection to the MQTT broker.
//!
//! The session wraps the synchronous `rumqttc` client. Construction is
//! fail-fast: [`MqttSession::connect`] drives the network event loop until
//! the broker answers the CONNECT packet, so a refused connection aborts
//! startup instead of surfacing minutes later inside the delivery loop.
//!
//! After construction the caller subscribes, installs callbacks, and hands
//! the event loop to a background thread with
//! [`MqttSession::start_background_loop`]. From then on two threads touch the
//! session: the background thread dispatching inbound events, and the bridge
//! thread publishing readings. The `rumqttc` client handle serialises
//! requests over an internal channel, so [`MqttSession::publish`] is safe
//! from both.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rumqttc::{
    Client, ConnAck, Connection, ConnectReturnCode, ConnectionError, Event, MqttOptions, Packet,
    QoS,
};
use tracing::{debug, error, info};

use serimq_types::{BridgeError, Result};

use crate::registry::{SessionId, SessionRecord, SessionRegistry};

/// Default MQTT broker port, used when the caller does not supply one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Keep-alive interval sent to the broker.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Pause between reconnect attempts after the delivery loop loses the
/// connection.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Request-channel capacity of the underlying client.
const CHANNEL_CAPACITY: usize = 64;

/// Invoked with the CONNACK result code; `0` means the broker accepted the
/// session.
pub type ConnectCallback = Box<dyn Fn(u8) + Send + 'static>;

/// Invoked with `(topic, payload)` for every message received on a
/// subscribed topic.
pub type MessageCallback = Box<dyn Fn(&str, &str) + Send + 'static>;

/// Callback slots shared between the session handle and the background
/// delivery thread. Each event kind has one optional function value;
/// absent means the event is only logged.
#[derive(Default)]
struct Callbacks {
    on_connect: Mutex<Option<ConnectCallback>>,
    on_message: Mutex<Option<MessageCallback>>,
}

/// A single connection to the broker.
///
/// Created once per process run at startup and kept alive for the process's
/// lifetime. Only the two callback slots are mutated after construction.
pub struct MqttSession {
    id: SessionId,
    host: String,
    port: u16,
    client: Client,
    // Taken by whichever loop variant starts first.
    connection: Option<Connection>,
    callbacks: Arc<Callbacks>,
}

impl MqttSession {
    /// Open a connection to `host`, registering the session in `registry`.
    ///
    /// `port` defaults to [`DEFAULT_MQTT_PORT`]. The call blocks until the
    /// broker answers the CONNECT packet.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::InvalidPort`] when `port` is zero.
    /// * [`BridgeError::BrokerConnection`] when the transport fails or the
    ///   broker refuses the session; the caller aborts startup.
    /// * [`BridgeError::RegistrationConflict`] on an identifier collision,
    ///   which signals a programming-invariant violation.
    pub fn connect(
        registry: &mut SessionRegistry,
        host: &str,
        port: Option<u16>,
    ) -> Result<Self> {
        let port = port.unwrap_or(DEFAULT_MQTT_PORT);
        if port == 0 {
            return Err(BridgeError::InvalidPort);
        }

        let id = registry.generate_id()?;
        let mut options = MqttOptions::new(format!("serimq-{:05X}", id.value()), host, port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut connection) = Client::new(options, CHANNEL_CAPACITY);
        wait_for_connack(&mut connection, id, host, port)?;

        registry.register(
            id,
            SessionRecord {
                broker_host: host.to_string(),
                broker_port: port,
            },
        )?;

        Ok(Self {
            id,
            host: host.to_string(),
            port,
            client,
            connection: Some(connection),
            callbacks: Arc::new(Callbacks::default()),
        })
    }

    /// The identifier this session is registered under.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Broker host this session is connected to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Broker port this session is connected to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Subscribe to `topic` at QoS 0.
    pub fn subscribe(&self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| BridgeError::Client(e.to_string()))
    }

    /// Publish `payload` to `topic` at QoS 0. The payload is always
    /// transmitted as text.
    ///
    /// Safe to call concurrently from the bridge thread and any callback
    /// running on the background thread.
    pub fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| BridgeError::Client(e.to_string()))
    }

    /// Install or clear the connect callback. Pass `None` to clear.
    pub fn set_connect_callback(&self, callback: Option<ConnectCallback>) {
        *lock(&self.callbacks.on_connect) = callback;
    }

    /// Whether a connect callback is currently installed.
    pub fn has_connect_callback(&self) -> bool {
        lock(&self.callbacks.on_connect).is_some()
    }

    /// Install or clear the message callback. Pass `None` to clear.
    pub fn set_message_callback(&self, callback: Option<MessageCallback>) {
        *lock(&self.callbacks.on_message) = callback;
    }

    /// Whether a message callback is currently installed.
    pub fn has_message_callback(&self) -> bool {
        lock(&self.callbacks.on_message).is_some()
    }

    /// Start the broker delivery loop on a background thread and return its
    /// handle. Non-blocking; the thread runs keepalive, reconnects, and
    /// callback dispatch until the session is dropped.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopAlreadyStarted`] when a loop variant already
    /// consumed the connection.
    pub fn start_background_loop(&mut self) -> Result<JoinHandle<()>> {
        let mut connection = self
            .connection
            .take()
            .ok_or(BridgeError::LoopAlreadyStarted)?;
        let callbacks = Arc::clone(&self.callbacks);
        let id = self.id;
        let host = self.host.clone();
        let port = self.port;

        let handle = thread::Builder::new()
            .name(format!("mqtt-session-{:05X}", id.value()))
            .spawn(move || drive(&mut connection, &callbacks, id, &host, port))?;
        Ok(handle)
    }

    /// Drive the broker delivery loop on the calling thread, blocking
    /// indefinitely. Used only when no serial loop is present; the combined
    /// bridge uses [`MqttSession::start_background_loop`] instead.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopAlreadyStarted`] when a loop variant already
    /// consumed the connection.
    pub fn run_forever(&mut self) -> Result<()> {
        let mut connection = self
            .connection
            .take()
            .ok_or(BridgeError::LoopAlreadyStarted)?;
        drive(&mut connection, &self.callbacks, self.id, &self.host, self.port);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event-loop internals
// ────────────────────────────────────────────────────────────────────────────

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Block until the broker answers the CONNECT packet.
///
/// `rumqttc` connects lazily, so the first events out of the loop tell us
/// whether the broker is reachable at all. A transport error or a
/// non-success CONNACK here becomes a construction failure.
fn wait_for_connack(
    connection: &mut Connection,
    id: SessionId,
    host: &str,
    port: u16,
) -> Result<()> {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => {
                        info!(session = %id, host, port, "connected to broker");
                        Ok(())
                    }
                    code => Err(BridgeError::BrokerConnection(format!(
                        "broker at {host}:{port} refused session {id}: {code:?}"
                    ))),
                };
            }
            Ok(_) => continue,
            Err(e) => {
                return Err(BridgeError::BrokerConnection(format!("{host}:{port}: {e}")));
            }
        }
    }
    Err(BridgeError::BrokerConnection(format!(
        "{host}:{port}: event loop ended before CONNACK"
    )))
}

/// The delivery loop proper: dispatches CONNACKs (from reconnects) and
/// inbound publishes, and keeps retrying on connection loss.
fn drive(
    connection: &mut Connection,
    callbacks: &Callbacks,
    id: SessionId,
    host: &str,
    port: u16,
) {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                dispatch_connect(callbacks, connack_code(&ack), id, host, port);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                dispatch_message(callbacks, &publish.topic, &publish.payload);
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                debug!(session = %id, "session dropped, delivery loop exiting");
                return;
            }
            Err(e) => {
                error!(session = %id, error = %e, "broker connection lost, retrying");
                thread::sleep(RECONNECT_PAUSE);
            }
        }
    }
}

/// Map a CONNACK to the MQTT 3.1.1 wire code: 0 is success.
fn connack_code(ack: &ConnAck) -> u8 {
    match ack.code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

fn dispatch_connect(callbacks: &Callbacks, code: u8, id: SessionId, host: &str, port: u16) {
    if code == 0 {
        info!(session = %id, host, port, "connected to broker");
    } else {
        error!(session = %id, host, port, code, "broker refused connection");
    }
    if let Some(cb) = &*lock(&callbacks.on_connect) {
        cb(code);
    }
}

fn dispatch_message(callbacks: &Callbacks, topic: &str, payload: &[u8]) {
    match std::str::from_utf8(payload) {
        Ok(text) => {
            if let Some(cb) = &*lock(&callbacks.on_message) {
                cb(topic, text);
            }
        }
        Err(_) => {
            debug!(topic, "dropping non-text payload on subscribed topic");
        }
    }
}
