//! Duplex device discovery and selection.
//!
//! Enumerates the default host's devices, profiles each one, and picks the
//! qualifying device (at least two input and two output channels) with the
//! lowest combined latency estimate. The selection heuristic itself is a
//! pure function over [`DeviceProfile`] values so it can be exercised
//! without hardware.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedBufferSize, SupportedStreamConfig};
use tracing::info;

use crate::error::Error;

/// Latency estimate used when a device does not report a buffer size range.
const FALLBACK_BUFFER_FRAMES: u32 = 1024;

/// Capabilities of one enumerated device, as seen by the selection
/// heuristic. Latencies are estimates in seconds derived from the smallest
/// buffer the device advertises.
#[derive(Clone, Debug)]
pub struct DeviceProfile {
    pub name: String,
    pub host: &'static str,
    pub input_channels: u16,
    pub output_channels: u16,
    pub sample_rate: u32,
    pub input_latency: f32,
    pub output_latency: f32,
}

impl DeviceProfile {
    fn from_configs(
        host: &'static str,
        name: String,
        input: Option<&SupportedStreamConfig>,
        output: Option<&SupportedStreamConfig>,
    ) -> Self {
        Self {
            name,
            host,
            input_channels: input.map_or(0, |c| c.channels()),
            output_channels: output.map_or(0, |c| c.channels()),
            sample_rate: output.or(input).map_or(0, |c| c.sample_rate().0),
            input_latency: input.map_or(f32::INFINITY, latency_estimate),
            output_latency: output.map_or(f32::INFINITY, latency_estimate),
        }
    }

    /// Input plus output latency, the quantity the selection minimizes.
    pub fn combined_latency(&self) -> f32 {
        self.input_latency + self.output_latency
    }

    /// Whether this device can carry a stereo capture and a stereo output.
    pub fn is_duplex(&self) -> bool {
        self.input_channels >= 2 && self.output_channels >= 2
    }
}

fn latency_estimate(config: &SupportedStreamConfig) -> f32 {
    let rate = config.sample_rate().0.max(1) as f32;
    let frames = match config.buffer_size() {
        SupportedBufferSize::Range { min, .. } => (*min).max(1),
        SupportedBufferSize::Unknown => FALLBACK_BUFFER_FRAMES,
    };
    frames as f32 / rate
}

/// Index of the duplex-capable profile with the lowest combined latency,
/// or `None` if nothing qualifies.
pub fn pick_duplex(profiles: &[DeviceProfile]) -> Option<usize> {
    profiles
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_duplex())
        .min_by(|(_, a), (_, b)| a.combined_latency().total_cmp(&b.combined_latency()))
        .map(|(i, _)| i)
}

/// A selected duplex device together with its default stream configs.
pub struct DuplexDevice {
    device: cpal::Device,
    input: SupportedStreamConfig,
    output: SupportedStreamConfig,
    profile: DeviceProfile,
}

impl DuplexDevice {
    /// Enumerate the default host and select the best duplex device.
    pub fn select() -> Result<Self, Error> {
        let host = cpal::default_host();
        let host_name = host.id().name();

        let mut devices = Vec::new();
        let mut profiles = Vec::new();

        for device in host.devices()? {
            let name = device.name().unwrap_or_else(|_| String::from("unknown"));
            let input = device.default_input_config().ok();
            let output = device.default_output_config().ok();
            let profile = DeviceProfile::from_configs(host_name, name, input.as_ref(), output.as_ref());

            info!(
                "{}: {} [{}] {} in / {} out, {} Hz, {:.1} ms combined latency",
                profiles.len(),
                profile.name,
                profile.host,
                profile.input_channels,
                profile.output_channels,
                profile.sample_rate,
                profile.combined_latency() * 1000.0,
            );

            devices.push((device, input, output));
            profiles.push(profile);
        }

        let best = pick_duplex(&profiles).ok_or(Error::NoDevice)?;
        let (device, input, output) = devices.swap_remove(best);
        let profile = profiles.swap_remove(best);

        // is_duplex implies both directions reported a config
        let input = input.ok_or(Error::NoDevice)?;
        let output = output.ok_or(Error::NoDevice)?;

        info!(
            "using {} with {:.1} ms combined latency",
            profile.name,
            profile.combined_latency() * 1000.0,
        );

        Ok(Self {
            device,
            input,
            output,
            profile,
        })
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn input_format(&self) -> SampleFormat {
        self.input.sample_format()
    }

    pub fn output_format(&self) -> SampleFormat {
        self.output.sample_format()
    }

    pub(crate) fn raw(&self) -> &cpal::Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, inputs: u16, outputs: u16, latency: f32) -> DeviceProfile {
        DeviceProfile {
            name: name.into(),
            host: "test",
            input_channels: inputs,
            output_channels: outputs,
            sample_rate: 44_100,
            input_latency: latency / 2.0,
            output_latency: latency / 2.0,
        }
    }

    #[test]
    fn picks_lowest_latency_duplex_device() {
        let profiles = [
            profile("slow duplex", 2, 2, 0.050),
            profile("fast duplex", 2, 2, 0.010),
            profile("fastest but mono in", 1, 2, 0.001),
        ];
        assert_eq!(pick_duplex(&profiles), Some(1));
    }

    #[test]
    fn skips_devices_without_stereo_io() {
        let profiles = [
            profile("output only", 0, 2, 0.001),
            profile("input only", 2, 0, 0.001),
            profile("mono both ways", 1, 1, 0.001),
            profile("qualifying", 2, 2, 0.100),
        ];
        assert_eq!(pick_duplex(&profiles), Some(3));
    }

    #[test]
    fn none_when_nothing_qualifies() {
        assert_eq!(pick_duplex(&[]), None);

        let profiles = [profile("mono", 1, 2, 0.01)];
        assert_eq!(pick_duplex(&profiles), None);
    }

    #[test]
    fn extra_channels_still_qualify() {
        let profiles = [
            profile("eight channel interface", 8, 8, 0.020),
            profile("stereo card", 2, 2, 0.030),
        ];
        assert_eq!(pick_duplex(&profiles), Some(0));
    }
}
