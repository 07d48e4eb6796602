//! MCP tool surface.
//!
//! Every tool takes the single player lock, so playback commands are fully
//! serialized; read-only tools hold it only long enough to snapshot state.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};
use rand::Rng;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, ListResourcesResult, PaginatedRequestParam, RawResource,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::config::Config;
use crate::error::PlayerError;
use crate::genre;
use crate::library;
use crate::player::engine::RodioEngine;
use crate::player::{PlaySummary, Player, Transport};
use crate::search::{self, MatchResult, normalize};

const AUDIO_FILES_URI: &str = "audio://files";

/// Score threshold above which a search hit counts as an artist match when
/// filtering for random-by-artist playback.
const ARTIST_MATCH_THRESHOLD: f64 = 80.0;

struct ServerState {
    config: Config,
    player: tokio::sync::Mutex<Player<RodioEngine>>,
}

#[derive(Clone)]
pub struct TunebridgeServer {
    state: Arc<ServerState>,
    tool_router: ToolRouter<Self>,
}

fn tool_err(e: PlayerError) -> McpError {
    match e {
        PlayerError::InvalidArgument(_) => McpError::invalid_params(e.to_string(), None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn ok_json(value: &Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn round1(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

/// The enriched per-match object search tools return.
fn decorate_match(result: &MatchResult) -> Value {
    json!({
        "file": result.file_path,
        "name": library::name_of(&result.file_path),
        "folder": library::folder_of(&result.file_path),
        "score": round1(result.score),
        "match_type": result.match_type,
        "matched_text": result.match_text,
        "display_info": result.display_info(),
        "title": result.title,
        "artist": result.artist,
    })
}

fn play_summary_json(summary: &PlaySummary) -> Value {
    json!({
        "status": "playing",
        "file": summary.file,
        "volume": summary.volume,
        "engine_state": summary.engine_state,
        "is_playing": summary.is_playing,
    })
}

fn not_initialized() -> Value {
    json!({"status": "not_initialized", "message": "Audio system not initialized"})
}

fn not_playing() -> Value {
    json!({"status": "not_playing", "message": "No audio currently playing"})
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchSongsParams {
    #[schemars(description = "Search query matched against metadata and file names")]
    pub query: String,
    #[schemars(description = "Max results (default 10)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchAndPlayParams {
    #[schemars(description = "Search query; the best match starts playing")]
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlayAudioParams {
    #[schemars(description = "File name or library-relative path of the track to play")]
    pub filename: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SkipParams {
    #[schemars(description = "Seconds to skip")]
    pub seconds: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SeekParams {
    #[schemars(description = "Target position from the start of the track, in seconds")]
    pub position_seconds: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetVolumeParams {
    #[schemars(description = "Volume on a 0-10 scale")]
    pub volume: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchByGenreParams {
    #[schemars(description = "Genre to match, case-insensitively, exact or substring")]
    pub genre: String,
    #[schemars(description = "Max results (default 20)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenreParams {
    #[schemars(description = "Genre to pick a random track from")]
    pub genre: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ArtistParams {
    #[schemars(description = "Artist to pick a random track by")]
    pub artist: String,
}

#[tool_router]
impl TunebridgeServer {
    pub fn new(config: Config) -> Self {
        let player = Player::new(&config);
        Self {
            state: Arc::new(ServerState {
                config,
                player: tokio::sync::Mutex::new(player),
            }),
            tool_router: Self::tool_router(),
        }
    }

    fn scan(&self) -> Vec<String> {
        library::scan(&self.state.config.music_dir, &self.state.config.extensions)
    }

    /// Shared search used by `search_songs` and the play-random tools.
    fn run_search(&self, query: &str, limit: usize) -> (usize, Vec<MatchResult>) {
        let files = self.scan();
        let total = files.len();
        let matches = search::search(&self.state.config.music_dir, &files, query, limit);
        (total, matches)
    }

    async fn play_track(&self, track_ref: &str) -> Result<Value, McpError> {
        let mut player = self.state.player.lock().await;
        let summary = player.play(track_ref).await.map_err(tool_err)?;
        Ok(play_summary_json(&summary))
    }

    #[tool(description = "List all audio files in the music library")]
    async fn list_audio_files(&self) -> Result<CallToolResult, McpError> {
        let files = self.scan();
        info!("Found {} audio files across all subdirectories", files.len());

        let details: Vec<Value> = files
            .iter()
            .map(|file| {
                let extension = std::path::Path::new(file)
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                    .unwrap_or_default();
                json!({
                    "path": file,
                    "name": library::name_of(file),
                    "folder": library::folder_of(file),
                    "extension": extension,
                })
            })
            .collect();

        ok_json(&json!({
            "status": "success",
            "files": details,
            "count": files.len(),
            "base_directory": self.state.config.music_dir.display().to_string(),
        }))
    }

    #[tool(description = "List folders containing audio files, with file counts")]
    async fn list_folders(&self) -> Result<CallToolResult, McpError> {
        let files = self.scan();
        let folders: Vec<Value> = library::group_by_folder(&files)
            .iter()
            .map(|f| {
                json!({
                    "folder": f.folder,
                    "file_count": f.file_count,
                    "sample_files": f.sample_files,
                })
            })
            .collect();

        ok_json(&json!({
            "status": "success",
            "folders": folders,
            "total_folders": folders.len(),
            "total_files": files.len(),
            "base_directory": self.state.config.music_dir.display().to_string(),
        }))
    }

    #[tool(description = "Search for songs by fuzzy matching against metadata and file names")]
    async fn search_songs(
        &self,
        params: Parameters<SearchSongsParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = params.0.query;
        let limit = params.0.limit.unwrap_or(10);
        info!("Searching for songs with query: '{query}'");

        let (total, results) = self.run_search(&query, limit);
        if total == 0 {
            return ok_json(&json!({
                "status": "no_files",
                "message": "No audio files found in directory",
                "matches": [],
            }));
        }

        let matches: Vec<Value> = if query.trim().is_empty() {
            results
                .iter()
                .map(|r| {
                    json!({
                        "file": r.file_path,
                        "name": library::name_of(&r.file_path),
                        "folder": library::folder_of(&r.file_path),
                        "score": 100,
                        "match_type": "all",
                    })
                })
                .collect()
        } else {
            results.iter().map(decorate_match).collect()
        };

        ok_json(&json!({
            "status": "success",
            "query": query,
            "matches": matches,
            "total_files_searched": total,
        }))
    }

    #[tool(description = "Search for a song and play the best match")]
    async fn search_and_play(
        &self,
        params: Parameters<SearchAndPlayParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = params.0.query;
        let (_, results) = self.run_search(&query, 1);
        let Some(best) = results.first() else {
            return ok_json(&json!({
                "status": "no_matches",
                "message": format!("No songs found matching '{query}'"),
                "query": query,
            }));
        };

        let play_result = self.play_track(&best.file_path).await?;
        ok_json(&json!({
            "status": "search_and_play_success",
            "query": query,
            "matched_file": best.file_path,
            "match_score": round1(best.score),
            "match_type": best.match_type,
            "play_result": play_result,
        }))
    }

    #[tool(description = "Play an audio file by name or library-relative path")]
    async fn play_audio(
        &self,
        params: Parameters<PlayAudioParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.play_track(&params.0.filename).await?;
        ok_json(&result)
    }

    #[tool(description = "Stop playback")]
    async fn stop_playback(&self) -> Result<CallToolResult, McpError> {
        let mut player = self.state.player.lock().await;
        match player.stop().map_err(tool_err)? {
            Transport::NotInitialized => ok_json(&not_initialized()),
            _ => ok_json(&json!({"status": "stopped"})),
        }
    }

    #[tool(description = "Pause the current track")]
    async fn pause_playback(&self) -> Result<CallToolResult, McpError> {
        let mut player = self.state.player.lock().await;
        match player.pause().map_err(tool_err)? {
            Transport::NotInitialized => ok_json(&not_initialized()),
            Transport::NotPlaying => ok_json(&not_playing()),
            Transport::AlreadyPaused => ok_json(&json!({
                "status": "already_paused",
                "message": "Audio is already paused",
            })),
            _ => ok_json(&json!({"status": "paused", "file": player.playing()})),
        }
    }

    #[tool(description = "Resume a paused track")]
    async fn resume_playback(&self) -> Result<CallToolResult, McpError> {
        let mut player = self.state.player.lock().await;
        match player.resume().map_err(tool_err)? {
            Transport::NotInitialized => ok_json(&not_initialized()),
            Transport::NotPlaying => ok_json(&json!({
                "status": "no_audio",
                "message": "No audio loaded",
            })),
            Transport::NotPaused => ok_json(&json!({
                "status": "not_paused",
                "message": "Audio is not paused",
            })),
            _ => ok_json(&json!({"status": "resumed", "file": player.playing()})),
        }
    }

    #[tool(description = "Play the next song in the library, wrapping at the end")]
    async fn next_song(&self) -> Result<CallToolResult, McpError> {
        let mut player = self.state.player.lock().await;
        match player.next().await {
            Ok((summary, position)) => ok_json(&json!({
                "status": "next_song",
                "file": summary.file,
                "position": position,
            })),
            Err(PlayerError::EmptyLibrary) => ok_json(&json!({
                "status": "no_files",
                "message": "No audio files available",
            })),
            Err(e) => Err(tool_err(e)),
        }
    }

    #[tool(description = "Play the previous song in the library, wrapping at the start")]
    async fn previous_song(&self) -> Result<CallToolResult, McpError> {
        let mut player = self.state.player.lock().await;
        match player.previous().await {
            Ok((summary, position)) => ok_json(&json!({
                "status": "previous_song",
                "file": summary.file,
                "position": position,
            })),
            Err(PlayerError::EmptyLibrary) => ok_json(&json!({
                "status": "no_files",
                "message": "No audio files available",
            })),
            Err(e) => Err(tool_err(e)),
        }
    }

    #[tool(description = "Skip forward in the current track (default 30 seconds)")]
    async fn skip_forward(
        &self,
        params: Parameters<SkipParams>,
    ) -> Result<CallToolResult, McpError> {
        let seconds = params.0.seconds.unwrap_or(30);
        let mut player = self.state.player.lock().await;
        match player.skip_by(seconds).map_err(tool_err)? {
            (Transport::NotInitialized, _) => ok_json(&not_initialized()),
            (Transport::NotPlaying, _) => ok_json(&not_playing()),
            (_, Some(summary)) => ok_json(&json!({
                "status": "skip_forward",
                "seconds": seconds,
                "current_time": summary.current_time_secs,
                "file": summary.file,
            })),
            (_, None) => ok_json(&not_playing()),
        }
    }

    #[tool(description = "Skip backward in the current track (default 10 seconds)")]
    async fn skip_backward(
        &self,
        params: Parameters<SkipParams>,
    ) -> Result<CallToolResult, McpError> {
        let seconds = params.0.seconds.unwrap_or(10);
        let mut player = self.state.player.lock().await;
        match player.skip_by(-seconds).map_err(tool_err)? {
            (Transport::NotInitialized, _) => ok_json(&not_initialized()),
            (Transport::NotPlaying, _) => ok_json(&not_playing()),
            (_, Some(summary)) => ok_json(&json!({
                "status": "skip_backward",
                "seconds": seconds,
                "current_time": summary.current_time_secs,
                "file": summary.file,
            })),
            (_, None) => ok_json(&not_playing()),
        }
    }

    #[tool(description = "Seek to an absolute position in the current track")]
    async fn seek_to_position(
        &self,
        params: Parameters<SeekParams>,
    ) -> Result<CallToolResult, McpError> {
        let position = params.0.position_seconds;
        let mut player = self.state.player.lock().await;
        match player.seek_to(position).map_err(tool_err)? {
            (Transport::NotInitialized, _) => ok_json(&not_initialized()),
            (Transport::NotPlaying, _) => ok_json(&not_playing()),
            (_, Some(summary)) => ok_json(&json!({
                "status": "seeked",
                "position_seconds": position,
                "file": summary.file,
            })),
            (_, None) => ok_json(&not_playing()),
        }
    }

    #[tool(description = "Get the current playback status")]
    async fn get_playback_status(&self) -> Result<CallToolResult, McpError> {
        let mut player = self.state.player.lock().await;
        let status = player.status().map_err(tool_err)?;
        ok_json(&json!({
            "status": status.status,
            "current_file": status.current_file,
            "paused": status.paused,
            "volume": status.volume,
            "playlist_size": status.playlist_size,
            "current_position": status.current_position,
            "time_position": status.time_position,
        }))
    }

    #[tool(description = "Set playback volume (0-10)")]
    async fn set_volume(
        &self,
        params: Parameters<SetVolumeParams>,
    ) -> Result<CallToolResult, McpError> {
        let volume = params.0.volume;
        let mut player = self.state.player.lock().await;
        player.set_volume(volume).map_err(tool_err)?;
        info!("Volume set to {volume}/10");
        ok_json(&json!({
            "status": "volume_changed",
            "volume": volume,
            "file": player.playing(),
        }))
    }

    #[tool(description = "List all genres in the music collection with track counts")]
    async fn list_genres(&self) -> Result<CallToolResult, McpError> {
        let files = self.scan();
        let counts = genre::all_genres(&self.state.config.music_dir, &files);
        let total_files: usize = counts.values().sum();
        let unique_genres = counts.len();

        let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let genres: Vec<Value> = sorted
            .iter()
            .map(|(genre, count)| json!({"genre": genre, "count": count}))
            .collect();

        ok_json(&json!({
            "status": "success",
            "total_files": total_files,
            "unique_genres": unique_genres,
            "genres": genres,
        }))
    }

    #[tool(description = "Search for songs by genre")]
    async fn search_by_genre(
        &self,
        params: Parameters<SearchByGenreParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = params.0.genre;
        let limit = params.0.limit.unwrap_or(20);
        info!("Searching for songs in genre: '{query}'");

        let files = self.scan();
        let matches = genre::search_by_genre(&self.state.config.music_dir, &files, &query, limit);

        ok_json(&json!({
            "status": "success",
            "genre": query,
            "count": matches.len(),
            "matches": matches,
        }))
    }

    #[tool(description = "Play a random song from the given genre")]
    async fn play_random_from_genre(
        &self,
        params: Parameters<GenreParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = params.0.genre;
        let files = self.scan();
        let matches =
            genre::search_by_genre(&self.state.config.music_dir, &files, &query, 100);
        if matches.is_empty() {
            return ok_json(&json!({
                "status": "no_matches",
                "message": format!("No songs found in genre '{query}'"),
            }));
        }

        let pick = &matches[rand::thread_rng().gen_range(0..matches.len())];
        let mut play_result = self.play_track(&pick.file).await?;
        if play_result["status"] == "playing" {
            play_result["genre"] = json!(pick.genre);
            play_result["selected_from"] =
                json!(format!("{} songs in genre '{query}'", matches.len()));
        }
        ok_json(&play_result)
    }

    #[tool(description = "Play a random song by the given artist")]
    async fn play_random_song_by_artist(
        &self,
        params: Parameters<ArtistParams>,
    ) -> Result<CallToolResult, McpError> {
        let artist = params.0.artist;
        info!("Playing random song by artist: '{artist}'");

        let (_, results) = self.run_search(&artist, 100);
        if results.is_empty() {
            return ok_json(&json!({
                "status": "no_matches",
                "message": format!("No songs found by artist '{artist}'"),
            }));
        }

        // Prefer hits that look like genuine artist matches over plain
        // filename hits, falling back to the rest only when none qualify.
        let (artist_matches, other_matches): (Vec<&MatchResult>, Vec<&MatchResult>) =
            results.iter().partition(|m| {
                (!m.artist.is_empty()
                    && normalize::partial_ratio(&artist, &m.artist) >= ARTIST_MATCH_THRESHOLD)
                    || normalize::partial_ratio(&artist, &m.display_info())
                        >= ARTIST_MATCH_THRESHOLD
                    || m.match_type == "metadata"
            });
        let pool = if artist_matches.is_empty() {
            other_matches
        } else {
            artist_matches
        };

        let pick = pool[rand::thread_rng().gen_range(0..pool.len())];
        let mut play_result = self.play_track(&pick.file_path).await?;
        if play_result["status"] == "playing" {
            play_result["artist_searched"] = json!(artist);
            play_result["selected_from"] =
                json!(format!("{} songs by '{artist}'", pool.len()));
            play_result["match_score"] = json!(round1(pick.score));
            play_result["match_type"] = json!(pick.match_type);
            if !pick.artist.is_empty() {
                play_result["artist_metadata"] = json!(pick.artist);
            }
            if !pick.title.is_empty() {
                play_result["title_metadata"] = json!(pick.title);
            }
        }
        ok_json(&play_result)
    }

    #[tool(description = "Diagnose the audio output system")]
    async fn diagnose_audio_system(&self) -> Result<CallToolResult, McpError> {
        let mut diagnosis = json!({
            "backend": "rodio",
            "output_available": false,
            "engine_initialized": false,
            "output_devices": [],
            "error_details": [],
        });
        let mut errors: Vec<String> = Vec::new();

        match cpal::default_host().output_devices() {
            Ok(devices) => {
                let names: Vec<String> = devices
                    .map(|d| d.name().unwrap_or_else(|_| "unknown".to_string()))
                    .collect();
                diagnosis["output_available"] = json!(!names.is_empty());
                diagnosis["output_devices"] = json!(names);
            }
            Err(e) => errors.push(format!("Failed to enumerate output devices: {e}")),
        }

        {
            let mut player = self.state.player.lock().await;
            if !player.engine_initialized() {
                if let Err(e) = player.ensure_engine() {
                    errors.push(format!("Failed to initialize audio engine: {e}"));
                }
            }
            diagnosis["engine_initialized"] = json!(player.engine_initialized());
        }

        diagnosis["error_details"] = json!(errors);
        ok_json(&diagnosis)
    }
}

#[tool_handler]
impl ServerHandler for TunebridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Audio playback server for a local music library. Search songs by \
                 metadata or genre, play files, and control playback and volume."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new(AUDIO_FILES_URI, "Audio files").no_annotation(),
            ],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if request.uri != AUDIO_FILES_URI {
            return Err(McpError::resource_not_found(
                format!("unknown resource: {}", request.uri),
                None,
            ));
        }
        let files: Vec<Value> = self
            .scan()
            .iter()
            .map(|file| {
                json!({
                    "name": file,
                    "display_name": library::name_of(file),
                    "folder": library::folder_of(file),
                })
            })
            .collect();
        let text = serde_json::to_string(&json!({"files": files}))
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
