use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::encode::config::{EncoderConfig, MIME_RAW};
use crate::encode::memory::InMemoryContainer;
use crate::encode::raw::RawVideoEncoder;
use crate::encode::session::SessionState;
use crate::foundation::core::{FrameIndex, Rgba8Premul};
use crate::foundation::error::ReelError;
use crate::frame::raster::FrameRGBA;
use crate::frame::source::FrameBounds;

/// Renders a flat color whose red channel is the frame index; fails at `fail_at` if set.
struct Counter {
    duration: u64,
    scale: f64,
    fail_at: Option<u64>,
}

impl Composition for Counter {
    fn intrinsic_size(&self) -> (f64, f64) {
        (8.0, 8.0)
    }

    fn duration_frames(&self) -> u64 {
        self.duration
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn set_scale(&mut self, scale: f64) -> ReelResult<()> {
        self.scale = scale;
        Ok(())
    }

    fn render(&mut self, frame: FrameIndex) -> ReelResult<FrameRGBA> {
        if self.fail_at == Some(frame.0) {
            return Err(ReelError::composition("broken frame"));
        }
        let side = (8.0 * self.scale).round() as u32;
        let mut raster = FrameRGBA::new(side, side);
        raster.clear(Rgba8Premul::from_straight_rgba(frame.0 as u8, 0, 0, 255));
        Ok(raster)
    }
}

fn operation(
    duration: u64,
    fail_at: Option<u64>,
    bounds: FrameBounds,
) -> (
    RecordingOperation<Counter, RawVideoEncoder, InMemoryContainer>,
    InMemoryContainer,
) {
    let comp = Counter {
        duration,
        scale: 1.0,
        fail_at,
    };
    let source = FrameSource::with_target_width(comp, 4.0)
        .unwrap()
        .with_bounds(bounds);
    let config = EncoderConfig::builder("memory.mp4")
        .mime(MIME_RAW)
        .size(4, 4)
        .fps(30)
        .build()
        .unwrap();
    let container = InMemoryContainer::new();
    let session =
        EncoderSession::start(config, RawVideoEncoder::with_latency(2), container.clone()).unwrap();
    (RecordingOperation::new(source, session), container)
}

#[test]
fn records_every_frame_and_completes_once() {
    let (mut op, container) = operation(5, None, FrameBounds::InclusiveEnd);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    op.on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let done = op.subscribe();
    assert!(op.is_recording());

    let summary = op.start().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(done.wait());

    assert_eq!(summary.frames, 6);
    assert_eq!(summary.samples_written, 6);
    assert_eq!(summary.bytes_written, 6 * 64);
    assert_eq!(summary.encoded_duration_us, 5 * 33_333);
    assert_eq!(summary.out_path, PathBuf::from("memory.mp4"));

    let log = container.snapshot();
    assert_eq!(log.tracks.len(), 1);
    assert!(log.stopped && log.released);
    let reds: Vec<u8> = log.samples.iter().map(|s| s.data[0]).collect();
    assert_eq!(reds, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn exclusive_bounds_record_one_frame_less() {
    let (op, container) = operation(5, None, FrameBounds::ExclusiveEnd);
    let summary = op.start().unwrap();
    assert_eq!(summary.frames, 5);
    assert_eq!(container.snapshot().samples.len(), 5);
}

#[test]
fn failure_aborts_without_completion() {
    let (mut op, container) = operation(5, Some(3), FrameBounds::InclusiveEnd);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    op.on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let done = op.subscribe();
    assert_eq!(op.session().state(), SessionState::Started);

    let err = op.start().unwrap_err();
    assert!(matches!(err, ReelError::Composition(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!done.wait());

    let log = container.snapshot();
    assert!(log.released);
    assert!(!log.stopped);
}

#[test]
fn empty_exclusive_range_is_rejected_before_encoding() {
    let (mut op, container) = operation(0, None, FrameBounds::ExclusiveEnd);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    op.on_complete(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let done = op.subscribe();
    assert!(!op.is_recording());

    let err = op.start().unwrap_err();
    assert!(matches!(err, ReelError::Composition(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!done.wait());

    let log = container.snapshot();
    assert!(log.samples.is_empty());
    assert!(log.released && !log.stopped);
}
