//! Configuration document – the JSON object handed to the bridge at startup.
//!
//! ```json
//! {
//!     "broker": "localhost",
//!     "porta": 1883,
//!     "serial": { "porta": "/dev/ttyACM0", "baudrate": 9600, "codificacao": "ascii" },
//!     "topico_erros": "home/err",
//!     "sensores": {
//!         "temperature": { "nome": "Living room", "topico": "/dev/sensor/temp:0" }
//!     }
//! }
//! ```
//!
//! Only `broker` is required. Validation is by hand so a bad sensor entry
//! fails the whole load with the offending hardware-id named in the
//! diagnostic. Duplicate hardware-ids across separate entries are accepted:
//! JSON object parsing keeps the last one, and that is the documented
//! behavior.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use serimq_client::DEFAULT_MQTT_PORT;
use serimq_serial::{TextEncoding, DEFAULT_BAUD_RATE};
use serimq_types::{BridgeError, Result};

/// Validated configuration: broker address, serial settings, and the
/// sensor-to-topic mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub broker: String,
    pub broker_port: u16,
    pub serial: SerialConfig,
    /// Hardware-id → sensor entry.
    pub sensors: HashMap<String, SensorEntry>,
    /// Topic the error channel publishes to, if any.
    pub error_topic: Option<String>,
}

/// One `sensores` entry: a display name for diagnostics and the topic
/// readings are routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorEntry {
    pub name: String,
    pub topic: String,
}

/// The optional `serial` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path. Absent means interactive/automatic discovery.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub encoding: TextEncoding,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            encoding: TextEncoding::default(),
        }
    }
}

/// Load and validate the configuration at `path`.
pub fn load_from(path: &Path) -> Result<BridgeConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
    let doc: Value = serde_json::from_str(&raw)
        .map_err(|e| BridgeError::Config(format!("{}: {e}", path.display())))?;
    parse(&doc)
}

/// Validate an already-parsed configuration document.
pub fn parse(doc: &Value) -> Result<BridgeConfig> {
    let root = doc
        .as_object()
        .ok_or_else(|| config_err("document root must be an object"))?;

    let broker = match root.get("broker") {
        None => return Err(config_err("missing required key 'broker'")),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(config_err("'broker' must be a non-empty string")),
        Some(_) => return Err(config_err("'broker' must be a string")),
    };

    let broker_port = match root.get("porta") {
        None => DEFAULT_MQTT_PORT,
        Some(v) => v
            .as_u64()
            .filter(|p| (1..=u64::from(u16::MAX)).contains(p))
            .map(|p| p as u16)
            .ok_or_else(|| config_err("'porta' must be an integer in 1..=65535"))?,
    };

    let sensors = match root.get("sensores") {
        None => HashMap::new(),
        Some(Value::Object(map)) => {
            let mut sensors = HashMap::new();
            for (id, entry) in map {
                sensors.insert(id.clone(), parse_sensor(id, entry)?);
            }
            sensors
        }
        Some(_) => return Err(config_err("'sensores' must be an object")),
    };

    let serial = match root.get("serial") {
        None => SerialConfig::default(),
        Some(v) => parse_serial(v)?,
    };

    let error_topic = match root.get("topico_erros") {
        None => None,
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(_) => return Err(config_err("'topico_erros' must be a non-empty string")),
    };

    Ok(BridgeConfig {
        broker,
        broker_port,
        serial,
        sensors,
        error_topic,
    })
}

fn parse_sensor(id: &str, entry: &Value) -> Result<SensorEntry> {
    let obj = entry
        .as_object()
        .ok_or_else(|| config_err(&format!("sensor '{id}': entry must be an object")))?;
    Ok(SensorEntry {
        name: required_field(id, obj, "nome")?,
        topic: required_field(id, obj, "topico")?,
    })
}

fn required_field(
    id: &str,
    obj: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String> {
    match obj.get(key) {
        None => Err(config_err(&format!(
            "sensor '{id}': missing required key '{key}'"
        ))),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(config_err(&format!(
            "sensor '{id}': '{key}' must be a non-empty string"
        ))),
    }
}

fn parse_serial(value: &Value) -> Result<SerialConfig> {
    let obj = value
        .as_object()
        .ok_or_else(|| config_err("'serial' must be an object"))?;

    let port = match obj.get("porta") {
        None => None,
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(_) => return Err(config_err("serial: 'porta' must be a non-empty string")),
    };

    let baud_rate = match obj.get("baudrate") {
        None => DEFAULT_BAUD_RATE,
        Some(v) => v
            .as_u64()
            .filter(|b| (1..=u64::from(u32::MAX)).contains(b))
            .map(|b| b as u32)
            .ok_or_else(|| config_err("serial: 'baudrate' must be a positive integer"))?,
    };

    let encoding = match obj.get("codificacao") {
        None => TextEncoding::default(),
        Some(Value::String(s)) => s.parse()?,
        Some(_) => return Err(config_err("serial: 'codificacao' must be a string")),
    };

    Ok(SerialConfig {
        port,
        baud_rate,
        encoding,
    })
}

fn config_err(message: &str) -> BridgeError {
    BridgeError::Config(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse(&json!({ "broker": "localhost" })).unwrap();
        assert_eq!(cfg.broker, "localhost");
        assert_eq!(cfg.broker_port, DEFAULT_MQTT_PORT);
        assert!(cfg.sensors.is_empty());
        assert_eq!(cfg.serial, SerialConfig::default());
        assert_eq!(cfg.error_topic, None);
    }

    #[test]
    fn full_config_parses() {
        let cfg = parse(&json!({
            "broker": "broker.lan",
            "porta": 8883,
            "serial": { "porta": "/dev/ttyACM0", "baudrate": 115200, "codificacao": "utf-8" },
            "topico_erros": "home/err",
            "sensores": {
                "temperature": { "nome": "Living room", "topico": "/dev/sensor/temp:0" },
                "humidity":    { "nome": "Bathroom",    "topico": "/dev/sensor/humi:0" }
            }
        }))
        .unwrap();

        assert_eq!(cfg.broker_port, 8883);
        assert_eq!(cfg.serial.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cfg.serial.baud_rate, 115_200);
        assert_eq!(cfg.serial.encoding, TextEncoding::Utf8);
        assert_eq!(cfg.error_topic.as_deref(), Some("home/err"));
        assert_eq!(cfg.sensors.len(), 2);
        assert_eq!(cfg.sensors["temperature"].topic, "/dev/sensor/temp:0");
        assert_eq!(cfg.sensors["humidity"].name, "Bathroom");
    }

    #[test]
    fn missing_broker_fails() {
        let err = parse(&json!({})).unwrap_err();
        assert!(err.to_string().contains("'broker'"));
    }

    #[test]
    fn empty_broker_fails() {
        let err = parse(&json!({ "broker": "" })).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn non_string_broker_fails() {
        let err = parse(&json!({ "broker": 42 })).unwrap_err();
        assert!(err.to_string().contains("'broker' must be a string"));
    }

    #[test]
    fn sensor_missing_topic_names_the_offender() {
        let err = parse(&json!({
            "broker": "localhost",
            "sensores": {
                "ok":  { "nome": "Fine",   "topico": "a/b" },
                "bad": { "nome": "Broken" }
            }
        }))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'bad'"), "diagnostic must name the sensor: {message}");
        assert!(message.contains("'topico'"));
    }

    #[test]
    fn sensor_with_non_string_name_names_the_offender() {
        let err = parse(&json!({
            "broker": "localhost",
            "sensores": { "T1": { "nome": 7, "topico": "a/b" } }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("'T1'"));
    }

    #[test]
    fn sensor_entry_must_be_an_object() {
        let err = parse(&json!({
            "broker": "localhost",
            "sensores": { "T1": "not-an-object" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("'T1'"));
    }

    #[test]
    fn duplicate_hardware_ids_keep_the_last_entry() {
        // json! cannot express duplicate keys, so parse the raw document.
        let doc: Value = serde_json::from_str(
            r#"{
                "broker": "localhost",
                "sensores": {
                    "T1": { "nome": "First",  "topico": "A" },
                    "T1": { "nome": "Second", "topico": "B" }
                }
            }"#,
        )
        .unwrap();
        let cfg = parse(&doc).unwrap();
        assert_eq!(cfg.sensors.len(), 1);
        assert_eq!(cfg.sensors["T1"].topic, "B");
        assert_eq!(cfg.sensors["T1"].name, "Second");
    }

    #[test]
    fn zero_port_fails() {
        let err = parse(&json!({ "broker": "localhost", "porta": 0 })).unwrap_err();
        assert!(err.to_string().contains("'porta'"));
    }

    #[test]
    fn zero_baudrate_fails() {
        let err = parse(&json!({
            "broker": "localhost",
            "serial": { "baudrate": 0 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("'baudrate'"));
    }

    #[test]
    fn unknown_encoding_fails() {
        let err = parse(&json!({
            "broker": "localhost",
            "serial": { "codificacao": "ebcdic" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("ebcdic"));
    }

    #[test]
    fn load_from_reads_a_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("serimq.json");
        fs::write(
            &path,
            r#"{ "broker": "localhost", "sensores": { "T1": { "nome": "T", "topico": "home/temp" } } }"#,
        )
        .expect("write config");

        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.broker, "localhost");
        assert_eq!(cfg.sensors["T1"].topic, "home/temp");
    }

    #[test]
    fn load_from_missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn load_from_invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("serimq.json");
        fs::write(&path, "{ not json").expect("write config");
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
