//! Take lifecycle: `Idle → Recording → Finished`, and back to `Recording`.

use super::artifact::Artifact;
use super::chunk::{Chunk, ChunkRecorder};
#[cfg(test)]
use super::clock::ClockState;
use super::clock::SessionClock;
use super::playback::PlaybackSink;
use crate::capture::{CaptureError, StreamSource};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Finished,
}

impl RecordingState {
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Idle => "READY",
            Self::Recording => "RECORDING",
            Self::Finished => "FINISHED",
        }
    }
}

/// Which controls make sense in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start: bool,
    pub stop: bool,
    pub play: bool,
}

impl Controls {
    pub fn for_state(state: RecordingState) -> Self {
        match state {
            RecordingState::Idle => Self {
                start: true,
                stop: false,
                play: false,
            },
            RecordingState::Recording => Self {
                start: false,
                stop: true,
                play: false,
            },
            RecordingState::Finished => Self {
                start: true,
                stop: false,
                play: true,
            },
        }
    }
}

/// Receives controller notifications. Implemented by the UI.
pub trait RecordingObserver {
    fn on_transition(&mut self, state: RecordingState, controls: Controls);
    fn on_tick(&mut self, elapsed: &str);
    fn on_error(&mut self, error: &CaptureError);
}

/// Chunks collected for the take in progress.
struct RecordingSession {
    chunks: Vec<Chunk>,
    started_at: DateTime<Local>,
}

/// Drives one take at a time and owns the latest [`Artifact`].
pub struct RecordingController<O: RecordingObserver> {
    state: RecordingState,
    session: Option<RecordingSession>,
    recorder: Option<ChunkRecorder>,
    feed: Option<UnboundedReceiver<Chunk>>,
    artifact: Option<Arc<Artifact>>,
    clock: SessionClock,
    chunk_interval: Duration,
    observer: O,
}

impl<O: RecordingObserver> RecordingController<O> {
    pub fn new(observer: O, chunk_interval: Duration) -> Self {
        let mut controller = Self {
            state: RecordingState::Idle,
            session: None,
            recorder: None,
            feed: None,
            artifact: None,
            clock: SessionClock::new(),
            chunk_interval,
            observer,
        };
        controller
            .observer
            .on_transition(RecordingState::Idle, Controls::for_state(RecordingState::Idle));
        controller
    }

    /// Begins a new take on the source's stream.
    ///
    /// Calling this while already recording does nothing. If no stream can be
    /// obtained the observer is told and the state is left unchanged.
    ///
    /// # Errors
    /// - The acquisition error from the stream source
    pub fn start(
        &mut self,
        source: &mut dyn StreamSource,
        now: Instant,
    ) -> Result<(), CaptureError> {
        if self.state == RecordingState::Recording {
            tracing::debug!("Start ignored: already recording");
            return Ok(());
        }

        let stream = match source.stream() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Cannot start recording: {}", e);
                self.observer.on_error(&e);
                return Err(e);
            }
        };

        let (recorder, feed) = ChunkRecorder::start(&stream, self.chunk_interval).map_err(|e| {
            let error = CaptureError::Backend(format!("Failed to prepare WAV header: {e}"));
            tracing::error!("Cannot start recording: {}", error);
            self.observer.on_error(&error);
            error
        })?;

        self.artifact = None;
        self.session = Some(RecordingSession {
            chunks: Vec::new(),
            started_at: Local::now(),
        });
        self.recorder = Some(recorder);
        self.feed = Some(feed);
        self.transition(RecordingState::Recording);

        self.clock.start(now);
        let display = self.clock.display().to_string();
        self.observer.on_tick(&display);

        tracing::info!("Recording started on {}", stream.info().device);
        Ok(())
    }

    /// Waits for the next chunk of the current take.
    ///
    /// Pending forever when nothing is recording, so it can sit in a
    /// `select!` arm unconditionally. `None` means the feed closed.
    pub async fn next_chunk(&mut self) -> Option<Chunk> {
        match self.feed.as_mut() {
            Some(feed) => feed.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Adds a chunk to the take. Ignored unless recording.
    pub fn append(&mut self, chunk: Chunk) {
        if self.state != RecordingState::Recording {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.chunks.push(chunk);
        }
    }

    /// Handles the chunk feed closing on its own, e.g. when the stream dies.
    pub fn feed_closed(&mut self) {
        if self.state == RecordingState::Recording {
            tracing::warn!("Chunk feed closed while recording; finalizing take");
            self.stop();
        } else {
            self.feed = None;
        }
    }

    /// Ends the take and assembles the artifact. Does nothing unless recording.
    pub fn stop(&mut self) {
        if self.state != RecordingState::Recording {
            tracing::debug!("Stop ignored in state {:?}", self.state);
            return;
        }

        if let Some(mut recorder) = self.recorder.take() {
            recorder.stop();
        }

        let mut session = self.session.take().unwrap_or_else(|| RecordingSession {
            chunks: Vec::new(),
            started_at: Local::now(),
        });
        if let Some(mut feed) = self.feed.take() {
            loop {
                match feed.try_recv() {
                    Ok(chunk) => session.chunks.push(chunk),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        self.clock.stop();
        let chunk_count = session.chunks.len();
        let artifact = Artifact::assemble(session.chunks);
        tracing::info!(
            "Recording finished: {} chunks, {} bytes of {}, {} ms, started {}",
            chunk_count,
            artifact.len(),
            artifact.mime_type(),
            self.clock.state().elapsed_ms,
            session.started_at.format("%H:%M:%S")
        );
        self.artifact = Some(Arc::new(artifact));

        self.transition(RecordingState::Finished);
    }

    /// Hands the artifact to a playback sink.
    ///
    /// Returns `false` when there is nothing to play.
    pub fn play(&mut self, sink: &mut dyn PlaybackSink) -> Result<bool> {
        let Some(artifact) = self.artifact.as_ref() else {
            tracing::debug!("Play ignored: no artifact");
            return Ok(false);
        };

        sink.load(Arc::clone(artifact))?;
        sink.play()?;
        Ok(true)
    }

    /// Writes the artifact into `dir`. Returns `None` when there is nothing to save.
    pub fn save(&self, dir: &Path) -> Result<Option<PathBuf>> {
        match self.artifact.as_ref() {
            Some(artifact) => artifact.save(dir).map(Some),
            None => {
                tracing::debug!("Save ignored: no artifact");
                Ok(None)
            }
        }
    }

    /// Advances the clock and forwards the new reading to the observer.
    pub fn clock_tick(&mut self, now: Instant) {
        if let Some(display) = self.clock.tick(now) {
            let display = display.to_string();
            self.observer.on_tick(&display);
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    #[cfg(test)]
    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn artifact(&self) -> Option<&Arc<Artifact>> {
        self.artifact.as_ref()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn transition(&mut self, state: RecordingState) {
        tracing::debug!("Recording state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.observer.on_transition(state, Controls::for_state(state));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Observer that keeps every notification.
    #[derive(Default)]
    pub struct LogObserver {
        pub transitions: Vec<(RecordingState, Controls)>,
        pub ticks: Vec<String>,
        pub errors: Vec<CaptureError>,
    }

    impl RecordingObserver for LogObserver {
        fn on_transition(&mut self, state: RecordingState, controls: Controls) {
            self.transitions.push((state, controls));
        }

        fn on_tick(&mut self, elapsed: &str) {
            self.ticks.push(elapsed.to_string());
        }

        fn on_error(&mut self, error: &CaptureError) {
            self.errors.push(error.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::LogObserver;
    use super::*;
    use crate::capture::testing::gateway;
    use crate::recording::chunk::wav_header;
    use crate::recording::playback::testing::RecordingSink;

    fn controller() -> RecordingController<LogObserver> {
        RecordingController::new(LogObserver::default(), Duration::from_millis(250))
    }

    fn header_len() -> usize {
        wav_header(8000).unwrap().len()
    }

    async fn pump(controller: &mut RecordingController<LogObserver>) {
        while let Ok(Some(chunk)) =
            tokio::time::timeout(Duration::from_millis(1), controller.next_chunk()).await
        {
            controller.append(chunk);
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let controller = controller();
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(controller.state().status_label(), "READY");
        assert_eq!(
            controller.observer().transitions,
            vec![(RecordingState::Idle, Controls::for_state(RecordingState::Idle))]
        );
    }

    #[test]
    fn test_start_transitions_and_resets_clock() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();

        controller.start(&mut gateway, Instant::now()).unwrap();

        assert_eq!(controller.state(), RecordingState::Recording);
        let (state, controls) = *controller.observer().transitions.last().unwrap();
        assert_eq!(state, RecordingState::Recording);
        assert_eq!(
            controls,
            Controls {
                start: false,
                stop: true,
                play: false
            }
        );
        assert_eq!(controller.observer().ticks, vec!["00:00:00".to_string()]);
        assert!(controller.clock_state().running);
    }

    #[test]
    fn test_start_failure_keeps_prior_state() {
        let (mut gateway, script) = gateway();
        script
            .borrow_mut()
            .open_results
            .push(Err(CaptureError::PermissionDenied("denied".to_string())));
        let mut controller = controller();

        let err = controller.start(&mut gateway, Instant::now()).unwrap_err();

        assert!(matches!(err, CaptureError::PermissionDenied(_)));
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(controller.observer().errors.len(), 1);
        assert_eq!(controller.observer().transitions.len(), 1);
    }

    #[tokio::test]
    async fn test_artifact_length_is_sum_of_chunks() {
        let (mut gateway, script) = gateway();
        let mut controller = controller();
        controller.start(&mut gateway, Instant::now()).unwrap();

        let stream = script.borrow().streams[0].clone();
        // 8000 Hz * 250 ms = 2000 samples per chunk
        stream.push_mono(&[1; 2000]);
        stream.push_mono(&[2; 2000]);
        pump(&mut controller).await;
        stream.push_mono(&[3; 300]);
        controller.stop();

        let artifact = controller.artifact().unwrap();
        assert_eq!(artifact.mime_type(), "audio/wav");
        assert_eq!(artifact.len(), header_len() + (2000 + 2000 + 300) * 2);
        assert_eq!(controller.state(), RecordingState::Finished);
    }

    #[test]
    fn test_stop_drains_queued_chunks() {
        let (mut gateway, script) = gateway();
        let mut controller = controller();
        controller.start(&mut gateway, Instant::now()).unwrap();

        let stream = script.borrow().streams[0].clone();
        stream.push_mono(&[5; 2000]);
        stream.push_mono(&[6; 10]);
        controller.stop();

        let artifact = controller.artifact().unwrap();
        assert_eq!(artifact.len(), header_len() + 2010 * 2);
        assert_eq!(stream.sink_count(), 0);
    }

    #[test]
    fn test_stop_is_noop_when_idle_or_finished() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();

        let idle_clock = controller.clock_state();
        controller.stop();
        assert_eq!(controller.state(), RecordingState::Idle);
        assert!(controller.artifact().is_none());
        assert_eq!(controller.clock_state(), idle_clock);

        let start = Instant::now();
        controller.start(&mut gateway, start).unwrap();
        controller.clock_tick(start + Duration::from_millis(400));
        controller.stop();
        let first = Arc::clone(controller.artifact().unwrap());
        let transitions = controller.observer().transitions.len();
        let finished_clock = controller.clock_state();

        controller.stop();
        assert_eq!(controller.state(), RecordingState::Finished);
        assert!(Arc::ptr_eq(&first, controller.artifact().unwrap()));
        assert_eq!(controller.observer().transitions.len(), transitions);
        assert_eq!(controller.clock_state(), finished_clock);
        assert_eq!(finished_clock.elapsed_ms, 400);
    }

    #[test]
    fn test_finished_controls() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        controller.start(&mut gateway, Instant::now()).unwrap();
        controller.stop();

        let (state, controls) = *controller.observer().transitions.last().unwrap();
        assert_eq!(state, RecordingState::Finished);
        assert_eq!(
            controls,
            Controls {
                start: true,
                stop: false,
                play: true
            }
        );
        assert!(!controller.clock_state().running);
    }

    #[test]
    fn test_second_take_starts_with_fresh_buffer() {
        let (mut gateway, script) = gateway();
        let mut controller = controller();

        controller.start(&mut gateway, Instant::now()).unwrap();
        script.borrow().streams[0].push_mono(&[1; 500]);
        controller.stop();
        let first = Arc::clone(controller.artifact().unwrap());

        controller.start(&mut gateway, Instant::now()).unwrap();
        assert!(controller.artifact().is_none());
        script.borrow().streams[0].push_mono(&[2; 10]);
        controller.stop();

        let second = controller.artifact().unwrap();
        assert_eq!(first.len(), header_len() + 1000);
        assert_eq!(second.len(), header_len() + 20);
        // the stream was reused, not reacquired
        assert_eq!(script.borrow().opened.len(), 1);
    }

    #[test]
    fn test_double_start_is_noop() {
        let (mut gateway, script) = gateway();
        let mut controller = controller();
        let now = Instant::now();

        controller.start(&mut gateway, now).unwrap();
        let transitions = controller.observer().transitions.len();
        controller.start(&mut gateway, now).unwrap();

        assert_eq!(controller.state(), RecordingState::Recording);
        assert_eq!(controller.observer().transitions.len(), transitions);
        assert_eq!(script.borrow().streams[0].sink_count(), 1);
    }

    #[test]
    fn test_append_ignored_outside_recording() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        controller.append(Chunk::new(vec![1, 2, 3]));

        controller.start(&mut gateway, Instant::now()).unwrap();
        controller.stop();
        let len = controller.artifact().unwrap().len();
        controller.append(Chunk::new(vec![1, 2, 3]));
        assert_eq!(controller.artifact().unwrap().len(), len);
    }

    #[test]
    fn test_clock_ticks_then_freezes() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        let start = Instant::now();

        controller.start(&mut gateway, start).unwrap();
        controller.clock_tick(start + Duration::from_millis(1_230));
        controller.stop();
        controller.clock_tick(start + Duration::from_secs(9));

        assert_eq!(
            controller.observer().ticks,
            vec!["00:00:00".to_string(), "00:01:23".to_string()]
        );
        assert_eq!(controller.clock_state().elapsed_ms, 1_230);
    }

    #[test]
    fn test_play_hands_artifact_to_sink() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        let mut sink = RecordingSink::default();

        assert!(!controller.play(&mut sink).unwrap());
        assert_eq!(sink.plays, 0);

        controller.start(&mut gateway, Instant::now()).unwrap();
        controller.stop();
        assert!(controller.play(&mut sink).unwrap());
        assert_eq!(sink.plays, 1);
        assert!(Arc::ptr_eq(
            sink.loaded.as_ref().unwrap(),
            controller.artifact().unwrap()
        ));
    }

    #[test]
    fn test_superseded_artifact_released_after_sink_lets_go() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        let mut sink = RecordingSink::default();

        controller.start(&mut gateway, Instant::now()).unwrap();
        controller.stop();
        controller.play(&mut sink).unwrap();
        let weak = Arc::downgrade(controller.artifact().unwrap());

        controller.start(&mut gateway, Instant::now()).unwrap();
        assert!(weak.upgrade().is_some());

        sink.loaded = None;
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_save_without_artifact_is_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let controller = controller();
        assert_eq!(controller.save(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_save_writes_take() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        controller.start(&mut gateway, Instant::now()).unwrap();
        controller.stop();

        let path = controller.save(dir.path()).unwrap().unwrap();
        assert_eq!(
            std::fs::read(path).unwrap(),
            controller.artifact().unwrap().bytes()
        );
    }

    #[tokio::test]
    async fn test_dead_stream_finalizes_take() {
        let (mut gateway, script) = gateway();
        let mut controller = controller();
        controller.start(&mut gateway, Instant::now()).unwrap();

        let stream = script.borrow().streams[0].clone();
        stream.push_mono(&[4; 100]);
        stream.end();

        while let Some(chunk) = controller.next_chunk().await {
            controller.append(chunk);
        }
        controller.feed_closed();

        assert_eq!(controller.state(), RecordingState::Finished);
        assert_eq!(controller.artifact().unwrap().len(), header_len() + 200);
    }

    #[test]
    fn test_feed_closed_finalizes_take() {
        let (mut gateway, _) = gateway();
        let mut controller = controller();
        controller.start(&mut gateway, Instant::now()).unwrap();

        controller.feed_closed();
        assert_eq!(controller.state(), RecordingState::Finished);
        assert!(controller.artifact().is_some());
    }
}
