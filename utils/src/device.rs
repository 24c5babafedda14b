use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device")),
        Some(target) => host
            .input_devices()?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("No target device found: {}", target)),
    }
}

pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    match device_name {
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device")),
        Some(target) => host
            .output_devices()?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("No target device found: {}", target)),
    }
}

fn describe(device: &Device, config: Option<cpal::SupportedStreamConfig>, default_name: Option<&str>) -> String {
    let d_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
    let mut d = match config {
        Some(cfg) => format!(" * {}({}ch, {}hz)", d_name, cfg.channels(), cfg.sample_rate().0),
        None => format!(" * {}(no default config)", d_name),
    };
    if default_name == Some(d_name.as_str()) {
        d.push_str(" [default]");
    }
    d
}

pub fn get_available_inputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_device = host.default_input_device().and_then(|d| d.name().ok());
    let device_names: Vec<String> = host
        .input_devices()?
        .map(|d| describe(&d, d.default_input_config().ok(), default_device.as_deref()))
        .collect();
    Ok(device_names.join("\n"))
}

pub fn get_available_outputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_device = host.default_output_device().and_then(|d| d.name().ok());
    let device_names: Vec<String> = host
        .output_devices()?
        .map(|d| describe(&d, d.default_output_config().ok(), default_device.as_deref()))
        .collect();
    Ok(device_names.join("\n"))
}
