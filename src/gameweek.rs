// Per-gameweek player history (the community merged_gw.csv archive) and the
// cache envelope the API client stores it in

use crate::player::{Player, Stat};
use serde::{Deserialize, Serialize};

/// One player's line for a single gameweek
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameweekRecord {
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub team: String,
    #[serde(rename = "GW")]
    pub gameweek: u32,
    #[serde(default)]
    pub total_points: Stat,
    /// Expected points for the gameweek
    #[serde(rename = "xP", default)]
    pub expected_points: Stat,
    #[serde(default)]
    pub minutes: Stat,
    #[serde(default)]
    pub transfers_in: Stat,
    #[serde(default)]
    pub transfers_out: Stat,
    /// Price in tenths at the time of the gameweek
    #[serde(default)]
    pub value: Stat,
}

impl GameweekRecord {
    pub fn new(name: &str, gameweek: u32, total_points: f64, expected_points: f64) -> Self {
        GameweekRecord {
            name: name.to_string(),
            position: String::new(),
            team: String::new(),
            gameweek,
            total_points: Stat::present(total_points),
            expected_points: Stat::present(expected_points),
            minutes: Stat::MISSING,
            transfers_in: Stat::MISSING,
            transfers_out: Stat::MISSING,
            value: Stat::MISSING,
        }
    }

    /// Net transfers (in minus out), missing counts as zero
    pub fn transfer_balance(&self) -> f64 {
        self.transfers_in.value() - self.transfers_out.value()
    }
}

/// Cache metadata for stored downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCache<T> {
    pub key: String,
    pub last_updated: chrono::DateTime<chrono::Utc>,
    pub rows: Vec<T>,
}

impl<T> DataCache<T> {
    pub fn new(key: String, rows: Vec<T>) -> Self {
        DataCache {
            key,
            last_updated: chrono::Utc::now(),
            rows,
        }
    }

    /// Returns true if the cache is older than the specified hours
    pub fn is_stale(&self, hours: i64) -> bool {
        let age = chrono::Utc::now() - self.last_updated;
        age.num_hours() >= hours
    }
}

pub type PlayerCache = DataCache<Player>;
pub type GameweekCache = DataCache<GameweekRecord>;
