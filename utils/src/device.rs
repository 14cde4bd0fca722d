use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

fn get_host() -> cpal::Host {
    cpal::default_host()
}

fn find_device(devices: impl Iterator<Item = Device>, target: &str) -> anyhow::Result<Device> {
    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow::anyhow!("No target device found: {}", target))
}

pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => find_device(host.input_devices()?, &target),
        None => host.default_input_device().context("No default input device"),
    }
}

pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => find_device(host.output_devices()?, &target),
        None => host.default_output_device().context("No default output device"),
    }
}

pub fn input_config(device: &Device) -> anyhow::Result<cpal::SupportedStreamConfig> {
    device.default_input_config().context("Device has no default input config")
}

pub fn output_config(device: &Device) -> anyhow::Result<cpal::SupportedStreamConfig> {
    device.default_output_config().context("Device has no default output config")
}

fn describe(device: &Device, config: Option<cpal::SupportedStreamConfig>, default_name: Option<&str>) -> String {
    let d_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
    let mut d = match config {
        Some(cfg) => format!(" * {}({}ch, {}hz)", d_name, cfg.channels(), cfg.sample_rate().0),
        None => format!(" * {}", d_name),
    };
    if default_name == Some(d_name.as_str()) {
        d.push_str(" [default]");
    }
    d
}

pub fn get_available_inputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host.default_input_device().and_then(|d| d.name().ok());
    let device_names: Vec<String> = host
        .input_devices()?
        .map(|device| {
            let config = device.default_input_config().ok();
            describe(&device, config, default_device.as_deref())
        })
        .collect();
    Ok(device_names.join("\n"))
}

pub fn get_available_outputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host.default_output_device().and_then(|d| d.name().ok());
    let device_names: Vec<String> = host
        .output_devices()?
        .map(|device| {
            let config = device.default_output_config().ok();
            describe(&device, config, default_device.as_deref())
        })
        .collect();
    Ok(device_names.join("\n"))
}
