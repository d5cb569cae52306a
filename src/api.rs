// This module fetches player data from the official FPL API and gameweek history
// from the community archive, caching both as JSON on disk

use crate::error::{FplError, Result};
use crate::gameweek::{DataCache, GameweekCache, GameweekRecord, PlayerCache};
use crate::ingest;
use crate::player::{Player, Position, Stat};
use chrono::Datelike;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// FPL API base URL
const FPL_BASE_URL: &str = "https://fantasy.premierleague.com/api";

/// Merged gameweek archive, one csv per season
const GAMEWEEK_BASE_URL: &str = "https://raw.githubusercontent.com/vaastav/Fantasy-Premier-League/master/data";

/// Player photo CDN
const PHOTO_BASE_URL: &str = "https://resources.premierleague.com/premierleague/photos/players/110x140";

/// API client for fetching FPL data
pub struct ApiClient {
    client: reqwest::blocking::Client,
    cache_dir: String,
    cache_hours: i64,
}

impl ApiClient {
    pub fn new(cache_dir: &str, cache_hours: i64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("FPL-Manager/1.0")
            .build()?;

        // Create cache directory if it doesn't exist
        fs::create_dir_all(cache_dir)?;

        Ok(ApiClient {
            client,
            cache_dir: cache_dir.to_string(),
            cache_hours,
        })
    }

    /// Current player snapshot, served from cache while it is fresh
    pub fn load_players(&self) -> Result<Vec<Player>> {
        let cache_path = format!("{}/players.json", self.cache_dir);
        if let Some(cache) = load_cache::<Player>(&cache_path) {
            if !cache.is_stale(self.cache_hours) {
                info!("Using cached players from {} ({} players)", cache.last_updated, cache.rows.len());
                return Ok(cache.rows);
            }
            info!("Player cache is stale, refreshing...");
        }

        let players = self.fetch_players()?;
        save_cache(&cache_path, PlayerCache::new("bootstrap-static".to_string(), players.clone()))?;
        Ok(players)
    }

    /// Gameweek history for a season such as "2024-25"
    pub fn load_gameweek_history(&self, season: &str) -> Result<Vec<GameweekRecord>> {
        let cache_path = format!("{}/gameweeks_{}.json", self.cache_dir, season);
        if let Some(cache) = load_cache::<GameweekRecord>(&cache_path) {
            if !cache.is_stale(self.cache_hours) {
                info!("Using cached gameweeks from {} ({} rows)", cache.last_updated, cache.rows.len());
                return Ok(cache.rows);
            }
            info!("Gameweek cache is stale, refreshing...");
        }

        let records = self.fetch_gameweek_history(season)?;
        save_cache(&cache_path, GameweekCache::new(season.to_string(), records.clone()))?;
        Ok(records)
    }

    /// Download and parse the bootstrap-static payload
    pub fn fetch_players(&self) -> Result<Vec<Player>> {
        let url = format!("{}/bootstrap-static/", FPL_BASE_URL);
        let spinner = spinner(&format!("Fetching {}", url));
        let json: Value = self.client.get(&url).send()?.error_for_status()?.json()?;
        spinner.finish_and_clear();

        let players = parse_bootstrap(&json)?;
        info!("Fetched {} players from the FPL API", players.len());
        Ok(players)
    }

    /// Download and parse the merged gameweek csv for a season
    pub fn fetch_gameweek_history(&self, season: &str) -> Result<Vec<GameweekRecord>> {
        let url = format!("{}/{}/gws/merged_gw.csv", GAMEWEEK_BASE_URL, season);
        let spinner = spinner(&format!("Fetching {}", url));
        let body = self.client.get(&url).send()?.error_for_status()?.text()?;
        spinner.finish_and_clear();

        let records = ingest::read_gameweeks(csv::Reader::from_reader(body.as_bytes()))?;
        info!("Fetched {} gameweek rows for {}", records.len(), season);
        Ok(records)
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}"));
    pb.set_message(message.to_string());
    pb.enable_steady_tick(120);
    pb
}

/// Load cached rows from file
fn load_cache<T: serde::de::DeserializeOwned>(path: &str) -> Option<DataCache<T>> {
    if Path::new(path).exists() {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Ignoring unreadable cache {}: {}", path, e);
                None
            }
        }
    } else {
        None
    }
}

/// Save rows to cache file
fn save_cache<T: serde::Serialize>(path: &str, cache: DataCache<T>) -> Result<()> {
    let json = serde_json::to_string_pretty(&cache)?;
    fs::write(path, json)?;
    Ok(())
}

/// Turn the bootstrap-static JSON into player records.
///
/// Elements with an unknown `element_type` (managers) are skipped.
pub fn parse_bootstrap(json: &Value) -> Result<Vec<Player>> {
    let teams: HashMap<u64, String> = json
        .get("teams")
        .and_then(|t| t.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|team| {
                    let id = team.get("id")?.as_u64()?;
                    let name = team.get("name")?.as_str()?.to_string();
                    Some((id, name))
                })
                .collect()
        })
        .unwrap_or_default();

    let elements = json
        .get("elements")
        .and_then(|e| e.as_array())
        .ok_or_else(|| FplError::InvalidArgument("bootstrap payload has no elements".to_string()))?;

    let mut players = Vec::with_capacity(elements.len());
    for element in elements {
        if let Some(player) = parse_element(element, &teams) {
            players.push(player);
        }
    }
    Ok(players)
}

fn parse_element(element: &Value, teams: &HashMap<u64, String>) -> Option<Player> {
    let position = Position::from_element_type(element.get("element_type")?.as_u64()?)?;
    let id = element.get("id")?.as_u64()? as u32;
    let web_name = element.get("web_name")?.as_str()?.to_string();
    let first = element.get("first_name").and_then(|v| v.as_str()).unwrap_or("");
    let second = element.get("second_name").and_then(|v| v.as_str()).unwrap_or("");
    let mut full_name = format!("{} {}", first, second).trim().to_string();
    if full_name.is_empty() {
        full_name = web_name.clone();
    }
    let team_name = element
        .get("team")
        .and_then(|t| t.as_u64())
        .and_then(|t| teams.get(&t).cloned())
        .unwrap_or_default();

    let stat = |key: &str| -> Stat {
        element
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(Stat::MISSING)
    };

    // "223340.jpg" -> ".../p223340.png"
    let photo_url = element
        .get("photo")
        .and_then(|p| p.as_str())
        .and_then(|p| p.split('.').next())
        .filter(|code| !code.is_empty())
        .map(|code| format!("{}/p{}.png", PHOTO_BASE_URL, code))
        .unwrap_or_default();

    Some(Player {
        id,
        web_name,
        full_name,
        team_name,
        position,
        now_cost: stat("now_cost"),
        total_points: stat("total_points"),
        minutes: stat("minutes"),
        goals_scored: stat("goals_scored"),
        goals_conceded: stat("goals_conceded"),
        assists: stat("assists"),
        clean_sheets: stat("clean_sheets"),
        creativity: stat("creativity"),
        influence: stat("influence"),
        threat: stat("threat"),
        ict_index: stat("ict_index"),
        selected_by_percent: stat("selected_by_percent"),
        form: stat("form"),
        photo_url,
    })
}

/// Get the current FPL season string, e.g. "2024-25"
pub fn current_season() -> String {
    let now = chrono::Local::now();
    let year = now.year();

    // The season starts in August
    if now.month() < 8 {
        format!("{}-{:02}", year - 1, year % 100)
    } else {
        format!("{}-{:02}", year, (year + 1) % 100)
    }
}
