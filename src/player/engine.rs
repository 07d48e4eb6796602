//! Playback engine abstraction and the rodio-backed implementation.
//!
//! `rodio`'s output stream is tied to the thread that opened it, so
//! [`RodioEngine`] runs a dedicated audio thread owning the stream and
//! sink, and the handle talks to it over a channel. Commands are cheap and
//! always serialized by the player lock, so replies use blocking receives.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use lofty::prelude::AudioFile;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Engine-reported playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No media loaded.
    Idle,
    /// Media accepted but the backend has not started producing audio yet.
    Opening,
    Playing,
    Paused,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Opening => "opening",
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
        }
    }
}

/// The opaque capabilities the playback state machine needs from a media
/// engine. Implementations must be cheap to call; long-running work happens
/// behind the scenes.
pub trait MediaEngine: Send {
    fn create(initial_volume_percent: i32) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// Load new media, replacing whatever was loaded before. Does not start
    /// playback.
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;
    fn play(&mut self) -> Result<(), EngineError>;
    fn pause(&mut self) -> Result<(), EngineError>;
    /// Stop and release the loaded media.
    fn stop(&mut self) -> Result<(), EngineError>;
    /// Volume on the engine's 0-100 scale.
    fn set_volume(&mut self, percent: i32) -> Result<(), EngineError>;
    /// Current position in milliseconds.
    fn get_time(&self) -> Result<u64, EngineError>;
    fn set_time(&mut self, ms: u64) -> Result<(), EngineError>;
    /// Total length in milliseconds, if known.
    fn get_length(&self) -> Result<Option<u64>, EngineError>;
    fn is_playing(&self) -> Result<bool, EngineError>;
    fn state(&self) -> Result<EngineState, EngineError>;
}

enum EngineCmd {
    Load(PathBuf, mpsc::Sender<Result<(), EngineError>>),
    Play(mpsc::Sender<Result<(), EngineError>>),
    Pause(mpsc::Sender<Result<(), EngineError>>),
    Stop(mpsc::Sender<Result<(), EngineError>>),
    SetVolume(i32, mpsc::Sender<Result<(), EngineError>>),
    GetTime(mpsc::Sender<u64>),
    SetTime(u64, mpsc::Sender<Result<(), EngineError>>),
    GetLength(mpsc::Sender<Option<u64>>),
    IsPlaying(mpsc::Sender<bool>),
    State(mpsc::Sender<EngineState>),
}

/// Handle to the audio thread. Lives for the rest of the process once
/// created; there is no teardown beyond dropping the handle.
pub struct RodioEngine {
    tx: mpsc::Sender<EngineCmd>,
}

impl RodioEngine {
    fn send<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<T>) -> EngineCmd,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| EngineError::Disconnected)?;
        reply_rx.recv().map_err(|_| EngineError::Disconnected)
    }
}

impl MediaEngine for RodioEngine {
    fn create(initial_volume_percent: i32) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), EngineError>>();

        thread::Builder::new()
            .name("tunebridge-audio".to_string())
            .spawn(move || audio_thread(rx, ready_tx, initial_volume_percent))
            .map_err(|e| EngineError::Output(e.to_string()))?;

        ready_rx.recv().map_err(|_| EngineError::Disconnected)??;
        info!("Audio engine initialized");
        Ok(Self { tx })
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.send(|reply| EngineCmd::Load(path.to_path_buf(), reply))?
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.send(EngineCmd::Play)?
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.send(EngineCmd::Pause)?
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.send(EngineCmd::Stop)?
    }

    fn set_volume(&mut self, percent: i32) -> Result<(), EngineError> {
        self.send(|reply| EngineCmd::SetVolume(percent, reply))?
    }

    fn get_time(&self) -> Result<u64, EngineError> {
        self.send(EngineCmd::GetTime)
    }

    fn set_time(&mut self, ms: u64) -> Result<(), EngineError> {
        self.send(|reply| EngineCmd::SetTime(ms, reply))?
    }

    fn get_length(&self) -> Result<Option<u64>, EngineError> {
        self.send(EngineCmd::GetLength)
    }

    fn is_playing(&self) -> Result<bool, EngineError> {
        self.send(EngineCmd::IsPlaying)
    }

    fn state(&self) -> Result<EngineState, EngineError> {
        self.send(EngineCmd::State)
    }
}

/// Open the output stream: preferred default-device configuration first,
/// then one minimal fallback attempt.
fn open_output() -> Result<OutputStream, EngineError> {
    match OutputStreamBuilder::from_default_device()
        .and_then(|builder| builder.open_stream())
    {
        Ok(stream) => Ok(stream),
        Err(e) => {
            warn!("Preferred audio output failed ({e}), trying fallback");
            OutputStreamBuilder::open_default_stream()
                .map_err(|e2| EngineError::Output(e2.to_string()))
        }
    }
}

fn audio_thread(
    rx: mpsc::Receiver<EngineCmd>,
    ready_tx: mpsc::Sender<Result<(), EngineError>>,
    initial_volume_percent: i32,
) {
    let stream = match open_output() {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume_to_gain(initial_volume_percent));
    let _ = ready_tx.send(Ok(()));

    let mut length_ms: Option<u64> = None;
    let mut loaded = false;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            EngineCmd::Load(path, reply) => {
                sink.stop();
                let result = load_into_sink(&sink, &path, &mut length_ms);
                loaded = result.is_ok();
                let _ = reply.send(result);
            }
            EngineCmd::Play(reply) => {
                sink.play();
                let _ = reply.send(Ok(()));
            }
            EngineCmd::Pause(reply) => {
                sink.pause();
                let _ = reply.send(Ok(()));
            }
            EngineCmd::Stop(reply) => {
                sink.stop();
                loaded = false;
                length_ms = None;
                let _ = reply.send(Ok(()));
            }
            EngineCmd::SetVolume(percent, reply) => {
                sink.set_volume(volume_to_gain(percent));
                let _ = reply.send(Ok(()));
            }
            EngineCmd::GetTime(reply) => {
                let _ = reply.send(sink.get_pos().as_millis() as u64);
            }
            EngineCmd::SetTime(ms, reply) => {
                let result = sink
                    .try_seek(Duration::from_millis(ms))
                    .map_err(|e| EngineError::Seek(e.to_string()));
                let _ = reply.send(result);
            }
            EngineCmd::GetLength(reply) => {
                let _ = reply.send(length_ms);
            }
            EngineCmd::IsPlaying(reply) => {
                let _ = reply.send(loaded && !sink.is_paused() && !sink.empty());
            }
            EngineCmd::State(reply) => {
                let state = if !loaded || sink.empty() {
                    EngineState::Idle
                } else if sink.is_paused() {
                    EngineState::Paused
                } else {
                    EngineState::Playing
                };
                let _ = reply.send(state);
            }
        }
    }
    debug!("Audio thread exiting");
}

fn load_into_sink(
    sink: &Sink,
    path: &Path,
    length_ms: &mut Option<u64>,
) -> Result<(), EngineError> {
    let file = File::open(path).map_err(|e| EngineError::Load(e.to_string()))?;
    let source =
        Decoder::new(BufReader::new(file)).map_err(|e| EngineError::Load(e.to_string()))?;

    // The decoder usually knows the total duration; tag properties are the
    // fallback for formats where it does not.
    *length_ms = source
        .total_duration()
        .map(|d| d.as_millis() as u64)
        .or_else(|| {
            lofty::read_from_path(path)
                .ok()
                .map(|tagged| tagged.properties().duration().as_millis() as u64)
        });

    sink.append(source);
    sink.pause();
    Ok(())
}

fn volume_to_gain(percent: i32) -> f32 {
    (percent.clamp(0, 100) as f32) / 100.0
}
