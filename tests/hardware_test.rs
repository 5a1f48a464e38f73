//! Smoke tests against real hardware. These need a duplex audio device
//! (and ideally a signal on the line input); run with
//! `cargo test -- --ignored`.

use std::thread::sleep;
use std::time::Duration;

use pegel::{Engine, EngineConfig, Error, Frame};

#[test]
#[ignore]
fn captures_frames_and_reconfigures() {
    tracing_subscriber::fmt().try_init().ok();

    let mut engine = Engine::start(EngineConfig::default()).expect("no duplex device");
    assert_eq!(engine.sample_rate(), 44_100);

    // one frame lands every 10 ms; give the stream some lead time
    sleep(Duration::from_millis(200));

    let mut frames = [Frame::default(); 256];
    let n = engine.read(&mut frames).expect("no data within the read window");
    assert!(n > 0 && n <= frames.len());
    for f in &frames[..n] {
        assert!(f.left >= 0.0 && f.right >= 0.0);
    }

    engine.set_low_pass_cutoff(500.0);
    engine.set_smoothing_cutoff(10.0);
    sleep(Duration::from_millis(100));
    let n = engine.read(&mut frames).expect("no data after reconfiguration");
    assert!(n > 0);

    engine.close();
    engine.close(); // second close is a no-op
}

#[test]
#[ignore]
fn read_times_out_once_closed() {
    let mut engine = Engine::start(EngineConfig::default()).expect("no duplex device");
    engine.close();

    // drain whatever landed before the close, then expect timeouts
    let mut frames = [Frame::default(); 1024];
    let _ = engine.read(&mut frames);
    assert!(matches!(engine.read(&mut frames), Err(Error::Timeout)));
}
