//! Recording feature for firstsound.
//!
//! Turns a live input stream into a sequence of chunks, assembles finished
//! takes into WAV artifacts, and drives the take lifecycle and its clock.

pub mod artifact;
pub mod chunk;
pub mod clock;
pub mod controller;
pub mod playback;

pub use clock::TICK_INTERVAL;
pub use controller::{Controls, RecordingController, RecordingObserver, RecordingState};
pub use playback::{CpalPlayback, PlaybackSink};
