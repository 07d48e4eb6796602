use dotenvy::dotenv;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Extensions scanned for when no `TUNEBRIDGE_EXTENSIONS` override is set.
const DEFAULT_EXTENSIONS: &str = "mp3,wav,ogg,flac,opus,m4a,aac";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the music library. Every resolvable path must stay inside it.
    pub music_dir: PathBuf,
    /// Lowercased audio extensions included by the scanner.
    pub extensions: Vec<String>,
    /// How long to wait after issuing play before verifying engine state.
    pub grace_period_ms: u64,
    /// Logical volume on the 0-10 scale applied to a fresh engine.
    pub default_volume: u8,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let music_dir = match env::var("TUNEBRIDGE_MUSIC_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_music_dir(),
        };

        if !music_dir.exists() {
            warn!("Music directory does not exist: {}", music_dir.display());
            fs::create_dir_all(&music_dir)?;
            info!("Created music directory: {}", music_dir.display());
        }

        let extensions = parse_extensions(
            &env::var("TUNEBRIDGE_EXTENSIONS").unwrap_or_else(|_| DEFAULT_EXTENSIONS.to_string()),
        );
        if extensions.is_empty() {
            anyhow::bail!("TUNEBRIDGE_EXTENSIONS must name at least one extension");
        }

        Ok(Config {
            music_dir,
            extensions,
            grace_period_ms: env::var("TUNEBRIDGE_GRACE_PERIOD_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            default_volume: env::var("TUNEBRIDGE_DEFAULT_VOLUME")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        })
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Fallback music locations, tried in order when no env override is set.
fn default_music_dir() -> PathBuf {
    if let Some(dir) = dirs::audio_dir() {
        return dir;
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Music")
}
