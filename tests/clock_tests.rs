//! Clock Integration Tests
//!
//! Timing properties of the playback clock and the engine built on it.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use beatstack::engine::{
    ClockState, FrameNumber, FrameRate, OutputCommand, PlaybackClock, PlaybackEngine,
    SilentOutput,
};
use beatstack::model::Song;
use tempfile::tempdir;

fn clock_with_channel(fps: u32) -> (PlaybackClock, mpsc::Receiver<FrameNumber>) {
    let clock = PlaybackClock::new(FrameRate::new(fps).unwrap());
    let (tx, rx) = mpsc::channel();
    clock.subscribe(move |frame| {
        let _ = tx.send(frame);
    });
    (clock, rx)
}

#[test]
fn test_running_clock_is_monotonic() {
    let (mut clock, rx) = clock_with_channel(100);
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    clock.stop();

    let frames: Vec<FrameNumber> = rx.try_iter().collect();
    assert!(frames.len() >= 5, "only {} ticks", frames.len());
    assert!(
        frames.windows(2).all(|w| w[0] <= w[1]),
        "frames went backwards: {:?}",
        frames
    );
    assert!(*frames.last().unwrap() >= 10);
}

#[test]
fn test_seek_while_running() {
    let (mut clock, rx) = clock_with_channel(30);
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(100));

    clock.set_clock_time(500);
    // The seek emission is queued by the time set_clock_time returns
    let queued: Vec<FrameNumber> = rx.try_iter().collect();
    let seek_at = queued.iter().rposition(|&f| f == 500).unwrap();

    let next = match queued.get(seek_at + 1) {
        Some(&frame) => frame,
        None => rx.recv_timeout(Duration::from_secs(1)).unwrap(),
    };
    assert!((next as i64 - 500).abs() <= 1, "next frame was {}", next);
    clock.stop();
}

#[test]
fn test_seek_while_stopped_then_start() {
    let (mut clock, rx) = clock_with_channel(30);
    clock.set_clock_time(90);
    assert_eq!(rx.try_recv().unwrap(), 90);
    assert_eq!(clock.state(), ClockState::Stopped);
    assert_eq!(clock.current_frame(), 90);

    clock.start().unwrap();
    let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!((90..=91).contains(&first), "first tick was {}", first);
    clock.stop();
}

#[test]
fn test_stop_then_restart_continues() {
    let (mut clock, rx) = clock_with_channel(100);
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    clock.stop();
    let stopped_at = clock.current_frame();
    assert!(stopped_at >= 5);
    let _: Vec<_> = rx.try_iter().collect();

    clock.start().unwrap();
    let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(first >= stopped_at);
    clock.stop();
    assert_eq!(clock.state(), ClockState::Stopped);
}

#[test]
fn test_engine_drives_output_and_clock() {
    let dir = tempdir().unwrap();
    let song = Song::from_samples("loop", vec![0.25; 8000 * 4], 8000, FrameRate::default()).unwrap();
    let output = SilentOutput::new();
    let mut engine = PlaybackEngine::new(
        FrameRate::default(),
        Box::new(output.clone()),
        dir.path().join("render"),
    );

    let rendered = engine.load_song(&song, None).unwrap();
    assert!(rendered.exists());

    engine.goto(60).unwrap();
    engine.play().unwrap();
    assert_eq!(engine.state(), ClockState::Running);
    thread::sleep(Duration::from_millis(50));
    engine.pause().unwrap();
    assert_eq!(engine.state(), ClockState::Paused);
    assert!(engine.time_label().starts_with("Frame: 6"));
    assert!(engine.time_label().ends_with("/120"));

    assert!(engine.goto(120).is_err());

    let history = output.history();
    assert!(history.contains(&OutputCommand::Seek(2000)));
    assert!(history.contains(&OutputCommand::Play));
    assert!(history.contains(&OutputCommand::Pause));

    drop(engine);
    assert!(!rendered.exists());
}
