//! Serial-port discovery.
//!
//! When the configuration does not pin a device path, the bridge looks for
//! the microcontroller itself: if exactly one USB port reports an Arduino
//! manufacturer it is chosen automatically, otherwise the operator picks
//! from a numbered list.

use std::io::{BufRead, Write};

use serialport::{SerialPortInfo, SerialPortType};
use tracing::info;

use serimq_types::{BridgeError, Result};

/// Manufacturer prefix that identifies a board we can auto-select.
const AUTO_MANUFACTURER_PREFIX: &str = "Arduino";

/// Resolve the serial device to bridge from.
///
/// Returns `Ok(None)` when no port could be resolved: nothing connected, or
/// the operator cancelled the prompt, or several candidates exist and
/// `interactive` is false (scripts must pin the port in the configuration
/// instead). The caller treats `None` as a startup failure.
///
/// # Errors
///
/// [`BridgeError::SerialConnection`] when the port list cannot be
/// enumerated at all.
pub fn resolve(interactive: bool) -> Result<Option<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| BridgeError::SerialConnection(format!("cannot enumerate serial ports: {e}")))?;

    if ports.is_empty() {
        return Ok(None);
    }

    if let Some(port) = auto_detect(&ports) {
        info!(%port, "auto-selected serial device");
        return Ok(Some(port));
    }

    if !interactive {
        return Ok(None);
    }
    Ok(prompt_selection(&ports))
}

/// Pick the device automatically when exactly one port looks like an
/// Arduino. Zero or several candidates defer to the operator.
fn auto_detect(ports: &[SerialPortInfo]) -> Option<String> {
    let mut candidate = None;
    for port in ports {
        let SerialPortType::UsbPort(usb) = &port.port_type else {
            continue;
        };
        let is_arduino = usb
            .manufacturer
            .as_deref()
            .is_some_and(|m| m.starts_with(AUTO_MANUFACTURER_PREFIX));
        if is_arduino {
            if candidate.is_some() {
                // More than one board connected; let the operator decide.
                return None;
            }
            candidate = Some(port.port_name.clone());
        }
    }
    candidate
}

/// Numbered interactive selection; `q` cancels.
fn prompt_selection(ports: &[SerialPortInfo]) -> Option<String> {
    let stdin = std::io::stdin();
    loop {
        println!("Serial ports:");
        for (n, port) in ports.iter().enumerate() {
            println!("  {n:>2}: {}", port.port_name);
        }
        print!("Port number (or q to cancel): ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() {
            return None;
        }
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("q") {
            return None;
        }
        if let Ok(index) = answer.parse::<usize>()
            && let Some(port) = ports.get(index)
        {
            return Some(port.port_name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb_port(name: &str, manufacturer: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x2341,
                pid: 0x0043,
                serial_number: None,
                manufacturer: manufacturer.map(str::to_string),
                product: None,
            }),
        }
    }

    fn unknown_port(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    #[test]
    fn single_arduino_is_auto_selected() {
        let ports = vec![
            unknown_port("/dev/ttyS0"),
            usb_port("/dev/ttyACM0", Some("Arduino LLC")),
        ];
        assert_eq!(auto_detect(&ports), Some("/dev/ttyACM0".to_string()));
    }

    #[test]
    fn several_arduinos_defer_to_the_operator() {
        let ports = vec![
            usb_port("/dev/ttyACM0", Some("Arduino LLC")),
            usb_port("/dev/ttyACM1", Some("Arduino SA")),
        ];
        assert_eq!(auto_detect(&ports), None);
    }

    #[test]
    fn non_arduino_usb_is_not_selected() {
        let ports = vec![usb_port("/dev/ttyUSB0", Some("FTDI"))];
        assert_eq!(auto_detect(&ports), None);
    }

    #[test]
    fn missing_manufacturer_is_not_selected() {
        let ports = vec![usb_port("/dev/ttyUSB0", None)];
        assert_eq!(auto_detect(&ports), None);
    }

    #[test]
    fn non_usb_ports_are_ignored() {
        let ports = vec![unknown_port("/dev/ttyS0"), unknown_port("/dev/ttyS1")];
        assert_eq!(auto_detect(&ports), None);
    }
}
