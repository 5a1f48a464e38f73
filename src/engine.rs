//! Capture engine: device setup, the two stream callbacks, and the
//! consumer-facing read.
//!
//! cpal has no duplex streams, so the engine runs one input and one output
//! stream on the selected device. The capture callback owns the whole
//! filter cascade; the playback callback only ever sees the envelope
//! atomics. Nothing on either callback allocates, and the single lock is
//! held for one frame push or one drain.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{error, info};

use crate::buffer::{CaptureBuffer, Frame};
use crate::device::DuplexDevice;
use crate::error::Error;
use crate::pipeline::{ControlMessage, Pipeline, ToneSynth};

/// Both streams run fixed stereo regardless of what the device could carry.
const CHANNELS: u16 = 2;

/// Sleep between buffer polls in [`Engine::read`].
const READ_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls before a read gives up, ~100 ms in total.
const READ_TIMEOUT_POLLS: u32 = 100;

/// Capacity of the setter → capture-callback message ring.
const CONTROL_QUEUE_CAPACITY: usize = 32;

/// Configuration consumed by [`Engine::start`].
///
/// The three cutoffs can be changed later through the engine's setters; the
/// sample rate and tone frequencies are fixed for the life of the session.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Target hardware sample rate in Hz.
    pub sample_rate: u32,
    /// Band filter high-pass cutoff in Hz.
    pub high_pass_hz: f32,
    /// Band filter low-pass cutoff in Hz.
    pub low_pass_hz: f32,
    /// Envelope smoothing cutoff in Hz.
    pub smoothing_hz: f32,
    /// Feedback tone frequency for the left channel in Hz.
    pub tone_left_hz: f32,
    /// Feedback tone frequency for the right channel in Hz.
    pub tone_right_hz: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            high_pass_hz: 30.0,
            low_pass_hz: 1_000.0,
            smoothing_hz: 30.0,
            tone_left_hz: 100.0,
            tone_right_hz: 100.0,
        }
    }
}

/// State shared between the stream callbacks and the consumer thread.
struct Shared {
    /// Envelope frames committed at the push cadence, drained by `read`.
    captured: Mutex<CaptureBuffer>,
    /// Latest envelope as f32 bits, published per frame for the playback
    /// callback and [`Engine::level`].
    level_left: AtomicU32,
    level_right: AtomicU32,
    /// Frames lost to ring overwrite because nobody drained in time.
    overwritten: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            captured: Mutex::new(CaptureBuffer::new()),
            level_left: AtomicU32::new(0),
            level_right: AtomicU32::new(0),
            overwritten: AtomicU64::new(0),
        }
    }

    fn level(&self) -> Frame {
        Frame::new(
            f32::from_bits(self.level_left.load(Ordering::Relaxed)),
            f32::from_bits(self.level_right.load(Ordering::Relaxed)),
        )
    }
}

/// The buffer only ever holds plain sample data, so a poisoned lock is
/// recovered rather than escalated.
fn lock(buffer: &Mutex<CaptureBuffer>) -> MutexGuard<'_, CaptureBuffer> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn drain_with_timeout(shared: &Shared, out: &mut [Frame]) -> Result<usize, Error> {
    let mut polls = READ_TIMEOUT_POLLS;
    while lock(&shared.captured).is_empty() {
        if polls == 0 {
            return Err(Error::Timeout);
        }
        polls -= 1;
        thread::sleep(READ_POLL_INTERVAL);
    }

    Ok(lock(&shared.captured).drain_newest(out))
}

/// Real-time stereo capture engine with tone feedback.
///
/// [`start`](Self::start) selects the lowest-latency duplex device and runs
/// two streams on it: the capture stream band-filters the line input,
/// extracts a smoothed envelope per channel, and commits one frame every
/// 10 ms; the playback stream renders one sine tone per channel whose
/// amplitude follows the live envelope. A consumer drains committed frames
/// with [`read`](Self::read).
pub struct Engine {
    streams: Option<(Stream, Stream)>,
    shared: Arc<Shared>,
    control: Producer<ControlMessage>,
    sample_rate: u32,
    device_name: String,
}

impl Engine {
    /// Select the best duplex device, open both streams at the configured
    /// rate, and start capturing.
    ///
    /// Fails if enumeration fails, no device offers stereo input and
    /// output, the device's sample format is one we do not convert, or a
    /// stream cannot be opened or started. On failure nothing is left
    /// half-open.
    pub fn start(config: EngineConfig) -> Result<Self, Error> {
        let device = DuplexDevice::select()?;

        let shared = Arc::new(Shared::new());
        let (control_tx, control_rx) = RingBuffer::new(CONTROL_QUEUE_CAPACITY);

        let stream_config = StreamConfig {
            channels: CHANNELS,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let pipeline = Pipeline::new(&config);
        let synth = ToneSynth::new(&config);

        let input = match device.input_format() {
            SampleFormat::F32 => build_capture_stream::<f32>(
                device.raw(),
                &stream_config,
                pipeline,
                shared.clone(),
                control_rx,
            )?,
            SampleFormat::I16 => build_capture_stream::<i16>(
                device.raw(),
                &stream_config,
                pipeline,
                shared.clone(),
                control_rx,
            )?,
            SampleFormat::U16 => build_capture_stream::<u16>(
                device.raw(),
                &stream_config,
                pipeline,
                shared.clone(),
                control_rx,
            )?,
            other => return Err(Error::UnsupportedFormat(other)),
        };

        let output = match device.output_format() {
            SampleFormat::F32 => {
                build_playback_stream::<f32>(device.raw(), &stream_config, synth, shared.clone())?
            }
            SampleFormat::I16 => {
                build_playback_stream::<i16>(device.raw(), &stream_config, synth, shared.clone())?
            }
            SampleFormat::U16 => {
                build_playback_stream::<u16>(device.raw(), &stream_config, synth, shared.clone())?
            }
            other => return Err(Error::UnsupportedFormat(other)),
        };

        input.play()?;
        output.play()?;

        info!(
            "capture running at {} Hz on {}",
            config.sample_rate,
            device.profile().name
        );

        Ok(Self {
            streams: Some((input, output)),
            shared,
            control: control_tx,
            sample_rate: config.sample_rate,
            device_name: device.profile().name.clone(),
        })
    }

    /// Drain committed envelope frames into `out`, waiting up to ~100 ms
    /// for data to arrive. [`Error::Timeout`] means nothing arrived; retry
    /// on your own schedule.
    ///
    /// On success returns the number of frames copied: the newest
    /// `out.len()` frames in chronological order. This is a destructive
    /// read — everything buffered is discarded afterwards, including
    /// frames beyond `out.len()`.
    pub fn read(&self, out: &mut [Frame]) -> Result<usize, Error> {
        drain_with_timeout(&self.shared, out)
    }

    /// Latest envelope pair straight from the capture path. Lock-free and
    /// non-destructive.
    pub fn level(&self) -> Frame {
        self.shared.level()
    }

    /// Frames lost to ring overwrite since the engine started.
    pub fn overwritten_frames(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Reconfigure the band low-pass cutoff. Negative values clamp to
    /// zero. Applied by the capture callback at its next block; dropped
    /// silently if the control queue is full.
    pub fn set_low_pass_cutoff(&mut self, hz: f32) {
        self.control
            .push(ControlMessage::LowPassCutoff(hz.max(0.0)))
            .ok();
    }

    /// Reconfigure the band high-pass cutoff. Same semantics as
    /// [`set_low_pass_cutoff`](Self::set_low_pass_cutoff).
    pub fn set_high_pass_cutoff(&mut self, hz: f32) {
        self.control
            .push(ControlMessage::HighPassCutoff(hz.max(0.0)))
            .ok();
    }

    /// Reconfigure the envelope smoothing cutoff. Same semantics as
    /// [`set_low_pass_cutoff`](Self::set_low_pass_cutoff).
    pub fn set_smoothing_cutoff(&mut self, hz: f32) {
        self.control
            .push(ControlMessage::SmoothingCutoff(hz.max(0.0)))
            .ok();
    }

    /// Stop and tear down both streams. A second call is a no-op.
    pub fn close(&mut self) {
        if let Some(streams) = self.streams.take() {
            drop(streams);
            info!("audio streams closed");
        }
    }
}

fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut pipeline: Pipeline,
    shared: Arc<Shared>,
    mut control: Consumer<ControlMessage>,
) -> Result<Stream, Error>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            while let Ok(msg) = control.pop() {
                pipeline.apply(msg);
            }

            for raw in data.chunks_exact(channels) {
                let input = Frame::new(raw[0].to_sample::<f32>(), raw[1].to_sample::<f32>());
                let envelope = pipeline.process_frame(input);

                shared
                    .level_left
                    .store(envelope.left.to_bits(), Ordering::Relaxed);
                shared
                    .level_right
                    .store(envelope.right.to_bits(), Ordering::Relaxed);

                if pipeline.tick() {
                    let overwrote = lock(&shared.captured).push(envelope);
                    if overwrote {
                        shared.overwritten.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        },
        |err| error!("capture stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

fn build_playback_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut synth: ToneSynth,
    shared: Arc<Shared>,
) -> Result<Stream, Error>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for raw in data.chunks_exact_mut(channels) {
                let out = synth.next(shared.level());
                raw[0] = T::from_sample(out.left);
                raw[1] = T::from_sample(out.right);
            }
        },
        |err| error!("playback stream error: {}", err),
        None,
    )?;

    Ok(stream)
}
