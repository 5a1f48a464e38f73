//! Per-sample signal path: band filtering, envelope extraction, the push
//! cadence, and feedback tone synthesis.
//!
//! Everything here is hardware-free state owned by a single stream
//! callback, which keeps it testable without a device.

use std::f32::consts::TAU;

use crate::buffer::Frame;
use crate::engine::EngineConfig;
use crate::filter::TwoPole;

/// Reconfiguration requests, applied by the capture callback at the start
/// of its next block. Frequencies are in Hz, already clamped non-negative
/// by the engine's setters.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ControlMessage {
    HighPassCutoff(f32),
    LowPassCutoff(f32),
    SmoothingCutoff(f32),
}

/// Filter cascade for one channel: band-limit, rectify, double-smooth.
#[derive(Clone, Copy, Debug, Default)]
struct ChannelChain {
    high_pass: TwoPole,
    low_pass: TwoPole,
    smooth_a: TwoPole,
    smooth_b: TwoPole,
}

impl ChannelChain {
    fn clear(&mut self) {
        self.high_pass.clear();
        self.low_pass.clear();
        self.smooth_a.clear();
        self.smooth_b.clear();
    }

    /// Mean-rectified envelope of one raw sample.
    #[inline]
    fn envelope(&mut self, x: f32) -> f32 {
        let band = self.low_pass.process(self.high_pass.process(x));
        let first = self.smooth_a.process(band.abs());
        self.smooth_b.process(first.abs()).abs()
    }
}

/// Capture-side DSP state: both channel chains plus the cadence that
/// commits one envelope frame per 10 ms of audio.
pub(crate) struct Pipeline {
    left: ChannelChain,
    right: ChannelChain,
    sample_rate: f32,
    high_pass_hz: f32,
    low_pass_hz: f32,
    smoothing_hz: f32,
    /// Frames between commits, derived from the sample rate.
    push_interval: u32,
    countdown: u32,
}

impl Pipeline {
    pub fn new(config: &EngineConfig) -> Self {
        let mut pipeline = Self {
            left: ChannelChain::default(),
            right: ChannelChain::default(),
            sample_rate: config.sample_rate as f32,
            high_pass_hz: config.high_pass_hz.max(0.0),
            low_pass_hz: config.low_pass_hz.max(0.0),
            smoothing_hz: config.smoothing_hz.max(0.0),
            push_interval: (config.sample_rate / 100).max(1),
            countdown: 0,
        };
        pipeline.reset();
        pipeline
    }

    /// Clear all filter history, restart the push cadence, and recompute
    /// every coefficient set from the current cutoff configuration.
    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.countdown = self.push_interval;
        self.refresh_high_pass();
        self.refresh_low_pass();
        self.refresh_smoothing();
    }

    /// Apply one reconfiguration request.
    pub fn apply(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::HighPassCutoff(hz) => {
                self.high_pass_hz = hz;
                self.refresh_high_pass();
            }
            ControlMessage::LowPassCutoff(hz) => {
                self.low_pass_hz = hz;
                self.refresh_low_pass();
            }
            ControlMessage::SmoothingCutoff(hz) => {
                self.smoothing_hz = hz;
                self.refresh_smoothing();
            }
        }
    }

    /// Envelope of one input frame.
    #[inline]
    pub fn process_frame(&mut self, input: Frame) -> Frame {
        Frame::new(self.left.envelope(input.left), self.right.envelope(input.right))
    }

    /// Advance the push cadence by one frame. True when an envelope frame
    /// is due to be committed to the capture buffer.
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = self.push_interval;
            true
        } else {
            false
        }
    }

    fn normalized(&self, hz: f32) -> f32 {
        2.0 * hz / self.sample_rate
    }

    fn refresh_high_pass(&mut self) {
        let cutoff = self.normalized(self.high_pass_hz);
        self.left.high_pass.set_high_pass(cutoff);
        self.right.high_pass.set_high_pass(cutoff);
    }

    fn refresh_low_pass(&mut self) {
        let cutoff = self.normalized(self.low_pass_hz);
        self.left.low_pass.set_low_pass(cutoff);
        self.right.low_pass.set_low_pass(cutoff);
    }

    fn refresh_smoothing(&mut self) {
        let cutoff = self.normalized(self.smoothing_hz);
        for stage in [
            &mut self.left.smooth_a,
            &mut self.left.smooth_b,
            &mut self.right.smooth_a,
            &mut self.right.smooth_b,
        ] {
            stage.set_low_pass(cutoff);
        }
    }
}

/// Feedback tones: one sine per channel, amplitude-modulated by the live
/// envelope. Phase is normalized to [0, 1) and wrapped every sample so it
/// never accumulates.
pub(crate) struct ToneSynth {
    phase_left: f32,
    phase_right: f32,
    step_left: f32,
    step_right: f32,
}

impl ToneSynth {
    pub fn new(config: &EngineConfig) -> Self {
        let rate = config.sample_rate as f32;
        Self {
            phase_left: 0.0,
            phase_right: 0.0,
            step_left: config.tone_left_hz / rate,
            step_right: config.tone_right_hz / rate,
        }
    }

    /// Next output frame for the given envelope level.
    #[inline]
    pub fn next(&mut self, level: Frame) -> Frame {
        let out = Frame::new(
            (self.phase_left * TAU).sin() * level.left,
            (self.phase_right * TAU).sin() * level.right,
        );

        self.phase_left += self.step_left;
        self.phase_left -= (self.phase_left >= 1.0) as u32 as f32;
        self.phase_right += self.step_right;
        self.phase_right -= (self.phase_right >= 1.0) as u32 as f32;

        out
    }
}
