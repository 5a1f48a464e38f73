//! pegel — stereo envelope capture with audible tone feedback.
//!
//! A line-in signal (e.g. from a biosensor rig) is band-filtered, rectified
//! and smoothed into a per-channel amplitude envelope in real time. One
//! envelope frame per 10 ms is committed to a fixed-capacity rolling buffer
//! that a consumer drains at its own pace, while the output channels render
//! sine tones whose loudness follows the same envelope.
//!
//! Design principles:
//! - The capture and playback callbacks never allocate and never wait on
//!   anything unbounded; the only lock is held for a single push or drain.
//! - Parameter changes reach the capture callback through a lock-free
//!   message ring, not through shared mutable filter state.
//! - The latest envelope crosses threads as atomic f32 bits.
//! - Device selection is a pure function over enumerated profiles.
//!
//! ```no_run
//! use pegel::{Engine, EngineConfig, Error, Frame};
//!
//! fn run() -> Result<(), Error> {
//!     let mut engine = Engine::start(EngineConfig::default())?;
//!     engine.set_smoothing_cutoff(10.0);
//!
//!     let mut frames = [Frame::default(); 256];
//!     for _ in 0..100 {
//!         match engine.read(&mut frames) {
//!             Ok(n) => println!("{:?}", &frames[..n]),
//!             Err(Error::Timeout) => continue,
//!             Err(e) => return Err(e),
//!         }
//!     }
//!
//!     engine.close();
//!     Ok(())
//! }
//! ```

mod buffer;
mod device;
mod engine;
mod error;
mod filter;
mod pipeline;

pub use buffer::{CaptureBuffer, Frame, CAPTURE_CAPACITY};
pub use device::{pick_duplex, DeviceProfile, DuplexDevice};
pub use engine::{Engine, EngineConfig};
pub use error::Error;
pub use filter::TwoPole;
