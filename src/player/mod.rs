//! Playback state machine.
//!
//! A single [`Player`] instance lives for the whole process behind one
//! async lock; every transport operation and every engine command runs
//! under that lock, which also serializes access to the engine handle.

pub mod engine;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::PlayerError;
use crate::library;
use engine::{EngineState, MediaEngine};

/// Logical volume bounds on the caller-facing 0-10 scale.
pub const MAX_VOLUME: u8 = 10;

/// Status of a transport operation that cannot hard-fail.
///
/// Expected non-error conditions are values here, not errors; hard
/// failures ([`PlayerError`]) are reserved for security violations and
/// unexpected engine faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Done,
    /// The engine was never initialized; nothing to act on.
    NotInitialized,
    /// No track is loaded.
    NotPlaying,
    AlreadyPaused,
    NotPaused,
}

#[derive(Debug, Clone)]
pub struct PlaySummary {
    pub file: String,
    pub volume: u8,
    pub engine_state: &'static str,
    pub is_playing: bool,
}

#[derive(Debug, Clone)]
pub struct SeekSummary {
    /// Position after the clamped seek, in seconds.
    pub current_time_secs: u64,
    pub file: String,
}

#[derive(Debug, Clone)]
pub struct StatusSummary {
    pub status: &'static str,
    pub current_file: Option<String>,
    pub paused: bool,
    pub volume: u8,
    pub playlist_size: usize,
    /// 1-based "i/N", or "0/0" when nothing is current.
    pub current_position: String,
    /// "Xs / Ys" when the length is known, "0s / 0s" otherwise.
    pub time_position: String,
}

pub struct Player<E: MediaEngine> {
    root: PathBuf,
    extensions: Vec<String>,
    grace_period: Duration,
    volume: u8,
    playing: Option<String>,
    paused: bool,
    playlist: Vec<String>,
    current_index: Option<usize>,
    engine: Option<E>,
}

impl<E: MediaEngine> Player<E> {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.music_dir.clone(),
            extensions: config.extensions.clone(),
            grace_period: Duration::from_millis(config.grace_period_ms),
            volume: config.default_volume.min(MAX_VOLUME),
            playing: None,
            paused: false,
            playlist: Vec::new(),
            current_index: None,
            engine: None,
        }
    }

    /// Inject an already-created engine, bypassing lazy initialization.
    pub fn with_engine(config: &Config, engine: E) -> Self {
        let mut player = Self::new(config);
        player.engine = Some(engine);
        player
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn playing(&self) -> Option<&str> {
        self.playing.as_deref()
    }

    pub fn engine_initialized(&self) -> bool {
        self.engine.is_some()
    }

    fn scan(&self) -> Vec<String> {
        library::scan(&self.root, &self.extensions)
    }

    /// Lazily create the engine; once created it persists for the process
    /// lifetime.
    pub fn ensure_engine(&mut self) -> Result<(), PlayerError> {
        if self.engine.is_none() {
            let engine = E::create(i32::from(self.volume) * 10)?;
            self.engine = Some(engine);
        }
        Ok(())
    }

    /// Resolve a track reference to a validated absolute path plus its
    /// library-relative form.
    ///
    /// A reference containing a separator (or an absolute path) is taken
    /// as a direct path; a bare file name is matched against the basename
    /// of every scanned track, first hit in scan order winning.
    fn resolve(&self, track_ref: &str) -> Result<(PathBuf, String), PlayerError> {
        let candidate = if track_ref.contains('/')
            || track_ref.contains('\\')
            || Path::new(track_ref).is_absolute()
        {
            if Path::new(track_ref).is_absolute() {
                PathBuf::from(track_ref)
            } else {
                self.root.join(track_ref)
            }
        } else {
            let files = self.scan();
            let mut hits = files
                .iter()
                .filter(|f| library::name_of(f) == track_ref)
                .cloned();
            let first = hits
                .next()
                .ok_or_else(|| PlayerError::NotFound(track_ref.to_string()))?;
            if hits.next().is_some() {
                warn!("Multiple files named '{track_ref}' found, using: {first}");
            }
            self.root.join(first)
        };

        let absolute = candidate
            .canonicalize()
            .map_err(|_| PlayerError::NotFound(track_ref.to_string()))?;
        let root = self
            .root
            .canonicalize()
            .map_err(|_| PlayerError::NotFound(self.root.display().to_string()))?;
        if !absolute.starts_with(&root) {
            return Err(PlayerError::PathEscape(track_ref.to_string()));
        }

        let relative = absolute
            .strip_prefix(&root)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| track_ref.to_string());
        Ok((absolute, relative))
    }

    /// Load and start a track. State is committed only after the engine
    /// confirms playback; any failure leaves the previous state intact.
    pub async fn play(&mut self, track_ref: &str) -> Result<PlaySummary, PlayerError> {
        let (absolute, relative) = self.resolve(track_ref)?;

        self.ensure_engine()?;
        let volume_percent = i32::from(self.volume) * 10;
        let grace = self.grace_period;
        let engine = self.engine.as_mut().ok_or(PlayerError::PlaybackFailed(
            "engine unavailable".to_string(),
        ))?;

        if engine.is_playing()? {
            engine.stop()?;
        }

        engine.load(&absolute)?;
        engine.set_volume(volume_percent)?;
        engine.play()?;

        // The engine may report success asynchronously; give it a moment
        // before trusting its state.
        tokio::time::sleep(grace).await;

        let is_playing = engine.is_playing()?;
        let state = engine.state()?;
        if !is_playing && state != EngineState::Playing && state != EngineState::Opening {
            return Err(PlayerError::PlaybackFailed(format!(
                "engine state after grace period: {}",
                state.as_str()
            )));
        }

        self.playing = Some(relative.clone());
        self.paused = false;
        self.refresh_playlist();
        info!("Playing {relative} at volume {}/10", self.volume);

        Ok(PlaySummary {
            file: relative,
            volume: self.volume,
            engine_state: state.as_str(),
            is_playing,
        })
    }

    pub fn pause(&mut self) -> Result<Transport, PlayerError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(Transport::NotInitialized);
        };
        if self.playing.is_none() {
            return Ok(Transport::NotPlaying);
        }
        if self.paused {
            return Ok(Transport::AlreadyPaused);
        }
        engine.pause()?;
        self.paused = true;
        Ok(Transport::Done)
    }

    pub fn resume(&mut self) -> Result<Transport, PlayerError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(Transport::NotInitialized);
        };
        if self.playing.is_none() {
            return Ok(Transport::NotPlaying);
        }
        if !self.paused {
            return Ok(Transport::NotPaused);
        }
        engine.play()?;
        self.paused = false;
        Ok(Transport::Done)
    }

    pub fn stop(&mut self) -> Result<Transport, PlayerError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(Transport::NotInitialized);
        };
        engine.stop()?;
        self.playing = None;
        self.paused = false;
        Ok(Transport::Done)
    }

    /// Seek to an absolute position in seconds.
    pub fn seek_to(&mut self, position_secs: u64) -> Result<(Transport, Option<SeekSummary>), PlayerError> {
        // Saturate instead of casting: a value past i64::MAX must clamp to
        // the end of the track, not wrap negative and land at the start.
        let target_ms = i64::try_from(position_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        self.seek_ms(target_ms)
    }

    /// Skip relative to the current position; `delta_secs` may be negative.
    pub fn skip_by(&mut self, delta_secs: i64) -> Result<(Transport, Option<SeekSummary>), PlayerError> {
        let Some(engine) = self.engine.as_ref() else {
            return Ok((Transport::NotInitialized, None));
        };
        if self.playing.is_none() {
            return Ok((Transport::NotPlaying, None));
        }
        let current = engine.get_time()? as i64;
        self.seek_ms(current + delta_secs.saturating_mul(1000))
    }

    fn seek_ms(&mut self, target_ms: i64) -> Result<(Transport, Option<SeekSummary>), PlayerError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok((Transport::NotInitialized, None));
        };
        let Some(file) = self.playing.clone() else {
            return Ok((Transport::NotPlaying, None));
        };

        let mut target_ms = target_ms.max(0) as u64;
        // Stay one second short of the end when the length is known.
        if let Some(length) = engine.get_length()? {
            if length > 0 && target_ms > length.saturating_sub(1000) {
                target_ms = length.saturating_sub(1000);
            }
        }

        engine.set_time(target_ms)?;
        Ok((
            Transport::Done,
            Some(SeekSummary {
                current_time_secs: target_ms / 1000,
                file,
            }),
        ))
    }

    pub fn set_volume(&mut self, volume: i64) -> Result<(), PlayerError> {
        if !(0..=i64::from(MAX_VOLUME)).contains(&volume) {
            return Err(PlayerError::InvalidArgument(format!(
                "volume must be between 0 and {MAX_VOLUME}, got {volume}"
            )));
        }
        self.volume = volume as u8;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_volume(volume as i32 * 10)?;
        }
        Ok(())
    }

    /// Re-scan the library and recompute the current index from scratch.
    /// The index is never carried across a refresh.
    pub fn refresh_playlist(&mut self) {
        self.playlist = self.scan();
        self.current_index = match &self.playing {
            Some(playing) => self.playlist.iter().position(|f| f == playing),
            None => None,
        };
    }

    /// The playlist entry `step` away from the current one, with
    /// wraparound. With no current track, `+1` starts at the beginning and
    /// `-1` at the end.
    fn neighbor_index(&self, step: i64) -> Option<usize> {
        let len = self.playlist.len();
        if len == 0 {
            return None;
        }
        Some(match self.current_index {
            Some(index) => {
                (((index as i64 + step) % len as i64 + len as i64) % len as i64) as usize
            }
            None if step >= 0 => 0,
            None => len - 1,
        })
    }

    pub async fn next(&mut self) -> Result<(PlaySummary, String), PlayerError> {
        self.step(1).await
    }

    pub async fn previous(&mut self) -> Result<(PlaySummary, String), PlayerError> {
        self.step(-1).await
    }

    async fn step(&mut self, step: i64) -> Result<(PlaySummary, String), PlayerError> {
        self.refresh_playlist();
        let index = self.neighbor_index(step).ok_or(PlayerError::EmptyLibrary)?;
        let target = self.playlist[index].clone();
        let summary = self.play(&target).await?;
        let position = format!("{}/{}", index + 1, self.playlist.len());
        Ok((summary, position))
    }

    pub fn status(&mut self) -> Result<StatusSummary, PlayerError> {
        self.refresh_playlist();

        let mut is_playing = false;
        let mut current_ms = 0;
        let mut total_ms = None;
        if let Some(engine) = self.engine.as_ref() {
            is_playing = engine.is_playing()?;
            current_ms = engine.get_time()?;
            total_ms = engine.get_length()?;
        }

        let status = if is_playing && !self.paused {
            "playing"
        } else if self.paused {
            "paused"
        } else {
            "stopped"
        };

        let current_position = match self.current_index {
            Some(index) => format!("{}/{}", index + 1, self.playlist.len()),
            None => "0/0".to_string(),
        };
        let time_position = match total_ms {
            Some(total) if total > 0 => {
                format!("{}s / {}s", current_ms / 1000, total / 1000)
            }
            _ => "0s / 0s".to_string(),
        };

        Ok(StatusSummary {
            status,
            current_file: self.playing.clone(),
            paused: self.paused,
            volume: self.volume,
            playlist_size: self.playlist.len(),
            current_position,
            time_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Scripted engine double: records commands and reports whatever the
    /// test tells it to.
    struct FakeInner {
        calls: Vec<String>,
        playing: bool,
        state: EngineState,
        time_ms: u64,
        length_ms: Option<u64>,
        play_starts_playback: bool,
        play_enters_opening: bool,
    }

    impl Default for FakeInner {
        fn default() -> Self {
            Self {
                calls: Vec::new(),
                playing: false,
                state: EngineState::Idle,
                time_ms: 0,
                length_ms: None,
                play_starts_playback: false,
                play_enters_opening: false,
            }
        }
    }

    #[derive(Clone)]
    struct FakeEngine {
        inner: Arc<Mutex<FakeInner>>,
    }

    impl FakeEngine {
        fn cooperative() -> Self {
            let engine = Self {
                inner: Arc::new(Mutex::new(FakeInner::default())),
            };
            engine.inner.lock().unwrap().play_starts_playback = true;
            engine
        }

        fn broken() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeInner::default())),
            }
        }

        /// Play is accepted but the backend has not produced audio yet:
        /// `is_playing` stays false while the state reports `Opening`.
        fn slow_to_start() -> Self {
            let engine = Self {
                inner: Arc::new(Mutex::new(FakeInner::default())),
            };
            engine.inner.lock().unwrap().play_enters_opening = true;
            engine
        }

        fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        fn set_length(&self, ms: u64) {
            self.inner.lock().unwrap().length_ms = Some(ms);
        }

        fn set_time_now(&self, ms: u64) {
            self.inner.lock().unwrap().time_ms = ms;
        }
    }

    impl MediaEngine for FakeEngine {
        fn create(_initial_volume_percent: i32) -> Result<Self, EngineError> {
            Ok(Self::cooperative())
        }

        fn load(&mut self, path: &Path) -> Result<(), EngineError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("load:{}", path.display()));
            Ok(())
        }

        fn play(&mut self) -> Result<(), EngineError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("play".to_string());
            if inner.play_starts_playback {
                inner.playing = true;
                inner.state = EngineState::Playing;
            } else if inner.play_enters_opening {
                inner.playing = false;
                inner.state = EngineState::Opening;
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<(), EngineError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("pause".to_string());
            inner.playing = false;
            inner.state = EngineState::Paused;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("stop".to_string());
            inner.playing = false;
            inner.state = EngineState::Idle;
            Ok(())
        }

        fn set_volume(&mut self, percent: i32) -> Result<(), EngineError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("set_volume:{percent}"));
            Ok(())
        }

        fn get_time(&self) -> Result<u64, EngineError> {
            Ok(self.inner.lock().unwrap().time_ms)
        }

        fn set_time(&mut self, ms: u64) -> Result<(), EngineError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("set_time:{ms}"));
            inner.time_ms = ms;
            Ok(())
        }

        fn get_length(&self) -> Result<Option<u64>, EngineError> {
            Ok(self.inner.lock().unwrap().length_ms)
        }

        fn is_playing(&self) -> Result<bool, EngineError> {
            Ok(self.inner.lock().unwrap().playing)
        }

        fn state(&self) -> Result<EngineState, EngineError> {
            Ok(self.inner.lock().unwrap().state)
        }
    }

    fn library_with(files: &[&str]) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }
        let config = Config {
            music_dir: dir.path().to_path_buf(),
            extensions: vec!["mp3".into(), "flac".into()],
            grace_period_ms: 0,
            default_volume: 3,
        };
        (dir, config)
    }

    fn player_with(
        files: &[&str],
        engine: FakeEngine,
    ) -> (TempDir, Player<FakeEngine>) {
        let (dir, config) = library_with(files);
        (dir, Player::with_engine(&config, engine))
    }

    #[tokio::test]
    async fn play_commits_state_after_engine_confirms() {
        let engine = FakeEngine::cooperative();
        let (_dir, mut player) = player_with(&["a.mp3", "b.mp3"], engine.clone());

        let summary = player.play("a.mp3").await.unwrap();
        assert_eq!(summary.file, "a.mp3");
        assert!(summary.is_playing);
        assert_eq!(player.playing(), Some("a.mp3"));
        assert!(engine.calls().iter().any(|c| c.starts_with("load:")));
        assert!(engine.calls().contains(&"set_volume:30".to_string()));
    }

    #[tokio::test]
    async fn play_accepts_engine_still_opening_after_grace_period() {
        let (_dir, mut player) = player_with(&["a.mp3"], FakeEngine::slow_to_start());

        let summary = player.play("a.mp3").await.unwrap();
        assert!(!summary.is_playing);
        assert_eq!(summary.engine_state, "opening");
        assert_eq!(player.playing(), Some("a.mp3"));
    }

    #[tokio::test]
    async fn failed_play_leaves_state_unchanged() {
        let engine = FakeEngine::broken();
        let (_dir, mut player) = player_with(&["a.mp3"], engine);

        let err = player.play("a.mp3").await.unwrap_err();
        assert!(matches!(err, PlayerError::PlaybackFailed(_)));
        assert_eq!(player.playing(), None);

        let status = player.status().unwrap();
        assert_eq!(status.status, "stopped");
        assert_eq!(status.current_position, "0/0");
    }

    #[tokio::test]
    async fn play_unknown_name_is_not_found() {
        let (_dir, mut player) = player_with(&["a.mp3"], FakeEngine::cooperative());
        let err = player.play("missing.mp3").await.unwrap_err();
        assert!(matches!(err, PlayerError::NotFound(_)));
    }

    #[tokio::test]
    async fn play_rejects_paths_escaping_the_library() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("evil.mp3"), b"x").unwrap();

        let (dir, config) = library_with(&["a.mp3"]);
        let mut player = Player::with_engine(&config, FakeEngine::cooperative());

        // Reachable via `..` but outside the root.
        let escape = format!(
            "../{}/evil.mp3",
            outside.path().file_name().unwrap().to_string_lossy()
        );
        // Only meaningful when both tempdirs share a parent.
        if dir.path().parent() == outside.path().parent() {
            let err = player.play(&escape).await.unwrap_err();
            assert!(matches!(err, PlayerError::PathEscape(_)));
            assert_eq!(player.playing(), None);
        }

        let err = player
            .play(outside.path().join("evil.mp3").to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PlayerError::PathEscape(_)));
        assert_eq!(player.playing(), None);
    }

    #[tokio::test]
    async fn pause_resume_cycle_with_soft_statuses() {
        let (_dir, mut player) = player_with(&["a.mp3"], FakeEngine::cooperative());

        assert_eq!(player.pause().unwrap(), Transport::NotPlaying);
        assert_eq!(player.resume().unwrap(), Transport::NotPlaying);

        player.play("a.mp3").await.unwrap();
        assert_eq!(player.resume().unwrap(), Transport::NotPaused);
        assert_eq!(player.pause().unwrap(), Transport::Done);
        assert_eq!(player.pause().unwrap(), Transport::AlreadyPaused);
        assert_eq!(player.resume().unwrap(), Transport::Done);
    }

    #[tokio::test]
    async fn transport_without_engine_reports_not_initialized() {
        let (_dir, config) = library_with(&["a.mp3"]);
        let mut player: Player<FakeEngine> = Player::new(&config);

        assert_eq!(player.pause().unwrap(), Transport::NotInitialized);
        assert_eq!(player.stop().unwrap(), Transport::NotInitialized);
        assert_eq!(player.skip_by(30).unwrap().0, Transport::NotInitialized);
        assert!(!player.engine_initialized());
    }

    #[tokio::test]
    async fn stop_clears_playing() {
        let (_dir, mut player) = player_with(&["a.mp3"], FakeEngine::cooperative());
        player.play("a.mp3").await.unwrap();
        assert_eq!(player.stop().unwrap(), Transport::Done);
        assert_eq!(player.playing(), None);
    }

    #[tokio::test]
    async fn seek_clamps_to_one_second_before_the_end() {
        let engine = FakeEngine::cooperative();
        let (_dir, mut player) = player_with(&["a.mp3"], engine.clone());
        player.play("a.mp3").await.unwrap();
        engine.set_length(60_000);

        let (transport, summary) = player.seek_to(90).unwrap();
        assert_eq!(transport, Transport::Done);
        assert_eq!(summary.unwrap().current_time_secs, 59);
        assert!(engine.calls().contains(&"set_time:59000".to_string()));
    }

    #[tokio::test]
    async fn seek_far_past_numeric_range_clamps_to_end_not_start() {
        let engine = FakeEngine::cooperative();
        let (_dir, mut player) = player_with(&["a.mp3"], engine.clone());
        player.play("a.mp3").await.unwrap();
        engine.set_length(60_000);

        let (_, summary) = player.seek_to(u64::MAX / 500).unwrap();
        assert_eq!(summary.unwrap().current_time_secs, 59);
        assert!(engine.calls().contains(&"set_time:59000".to_string()));
    }

    #[tokio::test]
    async fn seek_passes_through_when_length_unknown() {
        let engine = FakeEngine::cooperative();
        let (_dir, mut player) = player_with(&["a.mp3"], engine.clone());
        player.play("a.mp3").await.unwrap();

        let (_, summary) = player.seek_to(90).unwrap();
        assert_eq!(summary.unwrap().current_time_secs, 90);
    }

    #[tokio::test]
    async fn skip_backward_clamps_at_zero() {
        let engine = FakeEngine::cooperative();
        let (_dir, mut player) = player_with(&["a.mp3"], engine.clone());
        player.play("a.mp3").await.unwrap();
        engine.set_time_now(5_000);

        let (_, summary) = player.skip_by(-10).unwrap();
        assert_eq!(summary.unwrap().current_time_secs, 0);
    }

    #[tokio::test]
    async fn volume_bounds() {
        let (_dir, mut player) = player_with(&["a.mp3"], FakeEngine::cooperative());
        assert!(matches!(
            player.set_volume(11).unwrap_err(),
            PlayerError::InvalidArgument(_)
        ));
        assert!(matches!(
            player.set_volume(-1).unwrap_err(),
            PlayerError::InvalidArgument(_)
        ));
        player.set_volume(0).unwrap();
        player.set_volume(10).unwrap();
        assert_eq!(player.volume(), 10);
    }

    #[tokio::test]
    async fn next_then_previous_returns_to_the_same_track() {
        let (_dir, mut player) =
            player_with(&["a.mp3", "b.mp3", "c.mp3"], FakeEngine::cooperative());

        player.play("b.mp3").await.unwrap();
        let before = player.playing().unwrap().to_string();

        player.next().await.unwrap();
        assert_ne!(player.playing().unwrap(), before);
        player.previous().await.unwrap();
        assert_eq!(player.playing().unwrap(), before);
    }

    #[tokio::test]
    async fn next_wraps_around_and_seeds_from_nothing() {
        let (_dir, mut player) = player_with(&["a.mp3", "b.mp3"], FakeEngine::cooperative());

        // No current track: next starts at the first entry.
        let (summary, position) = player.next().await.unwrap();
        let first = summary.file.clone();
        assert_eq!(position, "1/2");

        player.next().await.unwrap();
        let (summary, _) = player.next().await.unwrap();
        assert_eq!(summary.file, first);
    }

    #[tokio::test]
    async fn previous_from_nothing_starts_at_the_end() {
        let (_dir, mut player) = player_with(&["a.mp3", "b.mp3"], FakeEngine::cooperative());
        let (_, position) = player.previous().await.unwrap();
        assert_eq!(position, "2/2");
    }

    #[tokio::test]
    async fn next_on_empty_library_fails() {
        let (_dir, mut player) = player_with(&[], FakeEngine::cooperative());
        assert!(matches!(
            player.next().await.unwrap_err(),
            PlayerError::EmptyLibrary
        ));
    }

    #[tokio::test]
    async fn status_reports_position_within_playlist() {
        let engine = FakeEngine::cooperative();
        let (_dir, mut player) =
            player_with(&["a.mp3", "b.mp3", "c.mp3"], engine.clone());
        player.play("b.mp3").await.unwrap();
        engine.set_length(120_000);
        engine.set_time_now(30_000);

        let status = player.status().unwrap();
        assert_eq!(status.status, "playing");
        assert_eq!(status.playlist_size, 3);
        assert_eq!(status.time_position, "30s / 120s");
        assert!(status.current_position.ends_with("/3"));
    }
}
