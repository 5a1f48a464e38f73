//! Error types for device setup and capture reads.

use cpal::{BuildStreamError, DevicesError, PlayStreamError, SampleFormat};

/// Everything that can go wrong while starting or reading the engine.
///
/// [`Error::Timeout`] is not a hard failure: it means no capture data became
/// available inside the read window, and the caller is expected to retry on
/// its own schedule.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device enumeration failed at the host level.
    #[error("device enumeration failed: {0}")]
    Devices(#[from] DevicesError),

    /// No device offered at least two input and two output channels.
    #[error("no duplex device with at least two input and two output channels")]
    NoDevice,

    /// The selected device wants a sample format we do not convert.
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(SampleFormat),

    /// Opening the input or output stream failed.
    #[error("failed to open stream: {0}")]
    BuildStream(#[from] BuildStreamError),

    /// Starting a built stream failed.
    #[error("failed to start stream: {0}")]
    PlayStream(#[from] PlayStreamError),

    /// No capture data arrived within the read window.
    #[error("timed out waiting for capture data")]
    Timeout,
}
