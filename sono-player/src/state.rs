//! Playback state machine
//!
//! Reacts to transport lifecycle events and user commands, owns the
//! equalizer pipeline and visual feed for the active stream, and drives
//! track advancement through the playlist order.

use crate::playlist::Playlist;
use crate::position::PositionSync;
use sono_analysis::{VisualFeed, VisualFrame};
use sono_audio::{EqualizerPipeline, GainSet};
use sono_library::{ScanError, TrackEntry};
use sono_transport::{MediaStatus, Transport, TransportEvent};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Lifecycle of the selected track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Recoverable conditions surfaced to the user as transient status text
///
/// None of these abort anything; commands that fail leave playback state
/// untouched.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("no track selected")]
    NoTrackSelected,
    #[error("no folder selected")]
    NoFolderSelected,
    #[error("track {0} does not exist")]
    InvalidIndex(usize),
    #[error("media failed to load")]
    MediaFailed,
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// The playback state machine
///
/// All mutation happens through commands and
/// [`handle_event`](Player::handle_event); nothing here blocks. The
/// `transitioning` flag is a re-entrancy guard, not a lock: it is set
/// around every transport command sequence that could synchronously
/// re-enter the lifecycle handler, and lifecycle events arriving while it
/// is set are dropped.
pub struct Player<T: Transport> {
    transport: T,
    playlist: Playlist,
    current: Option<usize>,
    state: PlayState,
    repeat: bool,
    transitioning: bool,
    pipeline: EqualizerPipeline,
    feed: Option<VisualFeed>,
    gains: GainSet,
    position: PositionSync,
}

impl<T: Transport> Player<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            playlist: Playlist::new(),
            current: None,
            state: PlayState::Idle,
            repeat: false,
            transitioning: false,
            pipeline: EqualizerPipeline::new(),
            feed: None,
            gains: GainSet::flat(),
            position: PositionSync::new(),
        }
    }

    // ---- folder / playlist -------------------------------------------

    /// Scan a folder and replace the playlist with its playable files
    pub fn open_folder(&mut self, dir: &Path) -> Result<usize, PlayerError> {
        let entries = sono_library::scan_folder(dir)?;
        Ok(self.load_entries(entries))
    }

    /// Replace the playlist with an explicit track set
    pub fn load_entries(&mut self, entries: Vec<TrackEntry>) -> usize {
        self.transport.stop();
        self.discard_stream_state();
        self.playlist.set_entries(entries);
        self.current = None;
        self.state = PlayState::Idle;
        self.playlist.len()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    // ---- track selection and advancement -----------------------------

    /// Explicit user pick from the track list
    pub fn select(&mut self, index: usize) -> Result<(), PlayerError> {
        self.load_track(index)
    }

    pub fn next(&mut self) -> Result<(), PlayerError> {
        let current = self.current.ok_or(PlayerError::NoTrackSelected)?;
        let target = self
            .playlist
            .next_index(current)
            .ok_or(PlayerError::NoTrackSelected)?;
        self.load_track(target)
    }

    pub fn previous(&mut self) -> Result<(), PlayerError> {
        let current = self.current.ok_or(PlayerError::NoTrackSelected)?;
        let target = self
            .playlist
            .previous_index(current)
            .ok_or(PlayerError::NoTrackSelected)?;
        self.load_track(target)
    }

    fn load_track(&mut self, index: usize) -> Result<(), PlayerError> {
        self.transitioning = true;
        let result = self.load_track_inner(index);
        self.transitioning = false;
        result
    }

    /// Stop, discard stale stream state, and start the new track.
    /// Callers must hold the `transitioning` guard.
    fn load_track_inner(&mut self, index: usize) -> Result<(), PlayerError> {
        let path = self
            .playlist
            .entry(index)
            .ok_or(PlayerError::InvalidIndex(index))?
            .path
            .clone();

        self.transport.stop();
        self.discard_stream_state();
        self.transport.load(&path);
        self.transport.play();

        self.current = Some(index);
        self.state = PlayState::Loading;
        debug!("loading track {index}: {}", path.display());
        Ok(())
    }

    /// Drop filter and analysis state so nothing bleeds into the next track
    fn discard_stream_state(&mut self) {
        self.pipeline.deconfigure();
        self.feed = None;
        self.position.reset();
    }

    // ---- mode toggles -------------------------------------------------

    /// Toggle shuffle; returns the new mode
    pub fn toggle_shuffle(&mut self) -> Result<bool, PlayerError> {
        if self.playlist.is_empty() {
            return Err(PlayerError::NoFolderSelected);
        }
        if self.playlist.is_shuffled() {
            self.playlist.disable_shuffle();
        } else {
            self.playlist.enable_shuffle();
        }
        Ok(self.playlist.is_shuffled())
    }

    /// Toggle repeat; returns the new mode
    pub fn toggle_repeat(&mut self) -> Result<bool, PlayerError> {
        if self.playlist.is_empty() {
            return Err(PlayerError::NoFolderSelected);
        }
        self.repeat = !self.repeat;
        Ok(self.repeat)
    }

    // ---- transport-facing controls ------------------------------------

    pub fn toggle_play(&mut self) -> Result<PlayState, PlayerError> {
        match self.state {
            PlayState::Playing => {
                self.transport.pause();
                self.state = PlayState::Paused;
            }
            PlayState::Paused => {
                self.transport.play();
                self.state = PlayState::Playing;
            }
            PlayState::Ended => {
                self.transport.set_position(0);
                self.transport.play();
                self.state = PlayState::Playing;
            }
            PlayState::Loading => {}
            PlayState::Idle => return Err(PlayerError::NoTrackSelected),
        }
        Ok(self.state)
    }

    /// Equalizer gains in integer-friendly dB, clamped to [-10, +10]
    pub fn set_gains(&mut self, bass_db: f32, mid_db: f32, treble_db: f32) {
        self.gains = GainSet::new(bass_db, mid_db, treble_db);
        self.pipeline.set_gains(self.gains);
    }

    pub fn gains(&self) -> GainSet {
        self.gains
    }

    /// Sink volume as a percentage, 0..=100
    pub fn set_volume(&mut self, percent: u8) {
        self.transport.set_volume(percent.min(100) as f32 / 100.0);
    }

    // ---- seek control --------------------------------------------------

    /// User pressed the seek control
    pub fn seek_pressed(&mut self) {
        let was_playing = self.state == PlayState::Playing;
        self.transport.pause();
        if was_playing {
            self.state = PlayState::Paused;
        }
        self.position.begin_seek(was_playing);
    }

    /// User dragged the control; updates the display only
    pub fn seek_dragged(&mut self, ms: u64) {
        self.position.drag(ms);
    }

    /// User released: commit the dragged position, resume if needed
    pub fn seek_released(&mut self) {
        let (ms, resume) = self.position.end_seek();
        self.transport.set_position(ms);
        if resume {
            self.transport.play();
            self.state = PlayState::Playing;
        }
    }

    // ---- event handling ------------------------------------------------

    /// Feed one transport event into the state machine
    pub fn handle_event(&mut self, event: TransportEvent) -> Result<(), PlayerError> {
        if self.transitioning {
            return Ok(());
        }
        match event {
            TransportEvent::DurationChanged(ms) => self.position.set_duration(ms),
            TransportEvent::PositionChanged(ms) => self.position.on_position(ms),
            TransportEvent::StatusChanged(status) => return self.on_status(status),
        }
        Ok(())
    }

    fn on_status(&mut self, status: MediaStatus) -> Result<(), PlayerError> {
        match status {
            MediaStatus::Loading | MediaStatus::Buffering => {}
            MediaStatus::Loaded => self.on_loaded(),
            MediaStatus::EndOfMedia => return self.on_end_of_media(),
            MediaStatus::InvalidMedia => {
                warn!("transport reported invalid media");
                self.discard_stream_state();
                self.state = PlayState::Idle;
                return Err(PlayerError::MediaFailed);
            }
        }
        Ok(())
    }

    /// Bind the pipeline and analyzer to the new stream format
    fn on_loaded(&mut self) {
        if let Some((sample_rate, channels)) = self.transport.audio_format() {
            if let Err(e) = self.pipeline.configure(sample_rate, channels) {
                // Pass-through beats no audio at all
                warn!("equalizer disabled for this stream: {e}");
            }
            self.pipeline.set_gains(self.gains);
            self.feed = Some(VisualFeed::new(sample_rate, channels));
        }
        self.state = PlayState::Playing;
    }

    fn on_end_of_media(&mut self) -> Result<(), PlayerError> {
        self.state = PlayState::Ended;
        self.transitioning = true;

        let result = if self.repeat {
            self.transport.set_position(0);
            self.transport.play();
            self.state = PlayState::Playing;
            Ok(())
        } else {
            match self.current.and_then(|c| self.playlist.next_index(c)) {
                Some(next) => self.load_track_inner(next),
                None => {
                    // Nothing to advance to; stay stopped
                    self.state = PlayState::Idle;
                    Ok(())
                }
            }
        };

        self.transitioning = false;
        result
    }

    // ---- per-iteration driving -----------------------------------------

    /// Move audio through the pipeline and drain pending transport events
    ///
    /// Call once per event-loop iteration. The first recoverable error is
    /// returned; remaining events are picked up on the next call.
    pub fn pump(&mut self) -> Result<(), PlayerError> {
        while let Some(chunk) = self.transport.next_chunk() {
            let processed = self.pipeline.process(&chunk);
            if let Some(feed) = &mut self.feed {
                feed.ingest(&processed);
            }
            self.transport.submit_chunk(processed);
        }

        while let Some(event) = self.transport.poll_event() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Timer-driven position poll for transports that do not push position
    pub fn poll_position(&mut self) {
        let ms = self.transport.position();
        self.position.on_position(ms);
    }

    /// Numeric frame for the visualization, once a stream is active
    pub fn visual_frame(&mut self) -> Option<VisualFrame> {
        self.feed.as_mut().map(|feed| feed.frame())
    }

    // ---- accessors ------------------------------------------------------

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn is_shuffled(&self) -> bool {
        self.playlist.is_shuffled()
    }

    pub fn position(&self) -> &PositionSync {
        &self.position
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(PathBuf),
        Play,
        Pause,
        Stop,
        SetPosition(u64),
        SetVolume(u32),
    }

    /// Scripted transport: records commands, replays queued events
    struct FakeTransport {
        calls: Vec<Call>,
        events: VecDeque<TransportEvent>,
        position: u64,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                events: VecDeque::new(),
                position: 0,
            }
        }
    }

    impl Transport for FakeTransport {
        fn load(&mut self, source: &Path) {
            self.calls.push(Call::Load(source.to_path_buf()));
        }
        fn play(&mut self) {
            self.calls.push(Call::Play);
        }
        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }
        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }
        fn set_position(&mut self, ms: u64) {
            self.position = ms;
            self.calls.push(Call::SetPosition(ms));
        }
        fn position(&self) -> u64 {
            self.position
        }
        fn set_volume(&mut self, volume: f32) {
            self.calls.push(Call::SetVolume((volume * 100.0).round() as u32));
        }
        fn audio_format(&self) -> Option<(u32, u16)> {
            Some((44100, 2))
        }
        fn next_chunk(&mut self) -> Option<Vec<i16>> {
            None
        }
        fn submit_chunk(&mut self, _chunk: Vec<i16>) {}
        fn poll_event(&mut self) -> Option<TransportEvent> {
            self.events.pop_front()
        }
    }

    fn entries(count: usize) -> Vec<TrackEntry> {
        (0..count)
            .map(|i| TrackEntry {
                path: PathBuf::from(format!("/music/{i:02}.mp3")),
                title: format!("{i:02}"),
            })
            .collect()
    }

    fn player_with_tracks(count: usize) -> Player<FakeTransport> {
        let mut player = Player::new(FakeTransport::new());
        player.load_entries(entries(count));
        player.transport.calls.clear();
        player
    }

    fn deliver(player: &mut Player<FakeTransport>, event: TransportEvent) {
        player.handle_event(event).unwrap();
    }

    fn start_track(player: &mut Player<FakeTransport>, index: usize) {
        player.select(index).unwrap();
        deliver(player, TransportEvent::StatusChanged(MediaStatus::Loaded));
    }

    #[test]
    fn select_issues_stop_load_play_and_configures_on_loaded() {
        let mut player = player_with_tracks(3);

        player.select(1).unwrap();
        assert_eq!(player.state(), PlayState::Loading);
        assert_eq!(
            player.transport.calls,
            vec![
                Call::Stop,
                Call::Load(PathBuf::from("/music/01.mp3")),
                Call::Play
            ]
        );

        deliver(&mut player, TransportEvent::StatusChanged(MediaStatus::Loaded));
        assert_eq!(player.state(), PlayState::Playing);
        assert_eq!(player.current(), Some(1));
    }

    #[test]
    fn next_from_last_track_wraps_to_first() {
        let mut player = player_with_tracks(5);
        start_track(&mut player, 4);
        player.transport.calls.clear();

        player.next().unwrap();
        assert_eq!(player.current(), Some(0));
        assert!(player
            .transport
            .calls
            .contains(&Call::Load(PathBuf::from("/music/00.mp3"))));
    }

    #[test]
    fn previous_from_first_track_wraps_to_last() {
        let mut player = player_with_tracks(5);
        start_track(&mut player, 0);

        player.previous().unwrap();
        assert_eq!(player.current(), Some(4));
    }

    #[test]
    fn advancement_without_selection_is_recoverable() {
        let mut player = player_with_tracks(5);
        assert!(matches!(player.next(), Err(PlayerError::NoTrackSelected)));
        assert!(matches!(
            player.previous(),
            Err(PlayerError::NoTrackSelected)
        ));
        assert_eq!(player.state(), PlayState::Idle);
    }

    #[test]
    fn mode_toggles_require_a_folder() {
        let mut player = Player::new(FakeTransport::new());
        assert!(matches!(
            player.toggle_shuffle(),
            Err(PlayerError::NoFolderSelected)
        ));
        assert!(matches!(
            player.toggle_repeat(),
            Err(PlayerError::NoFolderSelected)
        ));
    }

    #[test]
    fn repeat_replays_the_same_track_on_end() {
        let mut player = player_with_tracks(5);
        start_track(&mut player, 2);
        player.toggle_repeat().unwrap();
        player.transport.calls.clear();

        deliver(
            &mut player,
            TransportEvent::StatusChanged(MediaStatus::EndOfMedia),
        );

        assert_eq!(player.transport.calls, vec![Call::SetPosition(0), Call::Play]);
        assert_eq!(player.current(), Some(2));
        assert_eq!(player.state(), PlayState::Playing);
    }

    #[test]
    fn end_of_media_advances_to_the_next_track() {
        let mut player = player_with_tracks(3);
        start_track(&mut player, 0);
        player.transport.calls.clear();

        deliver(
            &mut player,
            TransportEvent::StatusChanged(MediaStatus::EndOfMedia),
        );

        assert_eq!(player.current(), Some(1));
        assert!(player
            .transport
            .calls
            .contains(&Call::Load(PathBuf::from("/music/01.mp3"))));
        assert_eq!(player.state(), PlayState::Loading);
        assert!(!player.transitioning);
    }

    #[test]
    fn events_are_dropped_while_transitioning() {
        let mut player = player_with_tracks(3);
        start_track(&mut player, 0);

        player.transitioning = true;
        deliver(
            &mut player,
            TransportEvent::StatusChanged(MediaStatus::EndOfMedia),
        );
        // Still on the same track in the same state
        assert_eq!(player.current(), Some(0));
        assert_eq!(player.state(), PlayState::Playing);
    }

    #[test]
    fn invalid_media_reverts_to_idle_but_keeps_the_playlist() {
        let mut player = player_with_tracks(5);
        player.select(1).unwrap();

        let result =
            player.handle_event(TransportEvent::StatusChanged(MediaStatus::InvalidMedia));
        assert!(matches!(result, Err(PlayerError::MediaFailed)));
        assert_eq!(player.state(), PlayState::Idle);
        assert_eq!(player.playlist().len(), 5);
        assert_eq!(player.current(), Some(1));
    }

    #[test]
    fn seek_drag_commits_on_release_and_resumes() {
        let mut player = player_with_tracks(2);
        start_track(&mut player, 0);
        deliver(&mut player, TransportEvent::DurationChanged(200_000));
        player.transport.calls.clear();

        player.seek_pressed();
        assert_eq!(player.transport.calls, vec![Call::Pause]);

        player.seek_dragged(100_000);
        // Live updates must not disturb the drag
        deliver(&mut player, TransportEvent::PositionChanged(42_000));
        assert_eq!(player.position().display_ms(), 100_000);

        player.seek_released();
        assert_eq!(
            player.transport.calls,
            vec![Call::Pause, Call::SetPosition(100_000), Call::Play]
        );
        assert_eq!(player.state(), PlayState::Playing);
    }

    #[test]
    fn seek_from_pause_stays_paused_on_release() {
        let mut player = player_with_tracks(2);
        start_track(&mut player, 0);
        deliver(&mut player, TransportEvent::DurationChanged(60_000));
        player.toggle_play().unwrap();
        player.transport.calls.clear();

        player.seek_pressed();
        player.seek_dragged(30_000);
        player.seek_released();

        assert_eq!(
            player.transport.calls,
            vec![Call::Pause, Call::SetPosition(30_000)]
        );
        assert_eq!(player.state(), PlayState::Paused);
    }

    #[test]
    fn volume_percent_maps_to_unit_range() {
        let mut player = player_with_tracks(1);
        player.set_volume(50);
        player.set_volume(200);
        assert_eq!(
            player.transport.calls,
            vec![Call::SetVolume(50), Call::SetVolume(100)]
        );
    }

    #[test]
    fn folder_reload_clears_selection_and_stops_playback() {
        let mut player = player_with_tracks(3);
        start_track(&mut player, 2);

        let count = player.load_entries(entries(7));
        assert_eq!(count, 7);
        assert_eq!(player.current(), None);
        assert_eq!(player.state(), PlayState::Idle);
        assert!(player.transport.calls.contains(&Call::Stop));
    }

    #[test]
    fn shuffled_advance_walks_the_permutation() {
        let mut player = player_with_tracks(6);
        start_track(&mut player, 0);
        player.toggle_shuffle().unwrap();

        let order = player.playlist().order_indices();
        let pos = order.iter().position(|&i| i == 0).unwrap();
        let expected = order[(pos + 1) % order.len()];

        player.next().unwrap();
        assert_eq!(player.current(), Some(expected));
    }
}
