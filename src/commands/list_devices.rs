//! List available audio input devices.

use crate::capture::{CpalBackend, DeviceDescriptor, DeviceGateway, StreamConstraints};

/// Lists all available audio input devices on the system.
///
/// Enumeration failures are treated like an empty system, matching how the
/// studio's device selector degrades.
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let backend = CpalBackend::new();
    let default_name = backend.default_input_name();
    let mut gateway = DeviceGateway::new(Box::new(backend), StreamConstraints::default());
    let devices = gateway.list_devices();

    print!("{}", format_device_list(&devices, default_name.as_deref()));
    Ok(())
}

fn format_device_list(devices: &[DeviceDescriptor], default_name: Option<&str>) -> String {
    if devices.is_empty() {
        return "No audio input devices found on this system.\n".to_string();
    }

    let mut out = String::from("\nAvailable audio input devices:\n\n");
    for (index, device) in devices.iter().enumerate() {
        let default_indicator = if default_name == Some(device.id.as_str()) {
            " [DEFAULT]"
        } else {
            ""
        };
        out.push_str(&format!("  ID: {index}\n"));
        out.push_str(&format!("    Name: {}{}\n\n", device.label, default_indicator));
    }
    out.push_str("Set [audio] device in firstsound.toml to an ID or a name.\n");
    out
}
