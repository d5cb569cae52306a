// Predicted points for the upcoming gameweek, read from the model's csv output

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::player::Player;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRow {
    pub web_name: String,
    pub team: String,
    #[serde(rename = "gw")]
    pub gameweek: u32,
    #[serde(rename = "pred_points_rounded", default)]
    pub predicted_points: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    rows: Vec<PredictionRow>,
}

impl PredictionTable {
    pub fn new(rows: Vec<PredictionRow>) -> Self {
        PredictionTable { rows }
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path.as_ref())?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let row: PredictionRow = result?;
            rows.push(row);
        }
        info!("Loaded {} predictions from {:?}", rows.len(), path.as_ref());
        Ok(PredictionTable { rows })
    }

    /// Missing prediction files leave every player at zero predicted points
    pub fn from_csv_or_empty<P: AsRef<Path>>(path: P) -> Self {
        Self::from_csv(path.as_ref()).unwrap_or_else(|e| {
            warn!("No predictions loaded from {:?}: {}", path.as_ref(), e);
            Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest-gameweek prediction for a player; 0 when nothing matches.
    ///
    /// Initials are stripped from the web name ("B.Fernandes" -> "Fernandes") and
    /// the remainder matched as a substring within the same team.
    pub fn predicted_points(&self, web_name: &str, team: &str) -> u32 {
        let fragment = name_fragment(web_name);
        if fragment.is_empty() {
            return 0;
        }
        self.rows
            .iter()
            .filter(|row| row.team == team && row.web_name.contains(fragment))
            .max_by_key(|row| row.gameweek)
            .map(|row| row.predicted_points.max(0.0).round() as u32)
            .unwrap_or(0)
    }

    pub fn for_player(&self, player: &Player) -> u32 {
        self.predicted_points(&player.web_name, &player.team_name)
    }

    pub fn team_total(&self, team: &[Player]) -> u32 {
        team.iter().map(|p| self.for_player(p)).sum()
    }
}

fn name_fragment(web_name: &str) -> &str {
    web_name.trim().rsplit('.').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Position;
    use std::io::Write;

    fn row(web_name: &str, team: &str, gameweek: u32, points: f64) -> PredictionRow {
        PredictionRow {
            web_name: web_name.to_string(),
            team: team.to_string(),
            gameweek,
            predicted_points: points,
        }
    }

    #[test]
    fn test_name_fragment() {
        assert_eq!(name_fragment("B.Fernandes"), "Fernandes");
        assert_eq!(name_fragment(" Saka "), "Saka");
        assert_eq!(name_fragment("J.P.Mateta"), "Mateta");
    }

    #[test]
    fn test_latest_gameweek_wins() {
        let table = PredictionTable::new(vec![
            row("Fernandes", "Man Utd", 10, 4.0),
            row("Fernandes", "Man Utd", 12, 6.0),
            row("Fernandes", "Man Utd", 11, 9.0),
        ]);
        assert_eq!(table.predicted_points("B.Fernandes", "Man Utd"), 6);
    }

    #[test]
    fn test_missing_prediction_defaults_to_zero() {
        let table = PredictionTable::new(vec![row("Fernandes", "Man Utd", 10, 4.0)]);
        // same name, different team
        assert_eq!(table.predicted_points("Fernandes", "Wolves"), 0);
        assert_eq!(table.predicted_points("Saka", "Arsenal"), 0);
        assert_eq!(table.predicted_points("", "Man Utd"), 0);
    }

    #[test]
    fn test_team_total() {
        let table = PredictionTable::new(vec![
            row("Saka", "Arsenal", 5, 7.0),
            row("Raya", "Arsenal", 5, 3.0),
        ]);
        let team = vec![
            Player::new(1, "Saka", "Bukayo Saka", "Arsenal", Position::Mid, 100, 180.0),
            Player::new(2, "Raya", "David Raya", "Arsenal", Position::Gkp, 55, 160.0),
            Player::new(3, "Palmer", "Cole Palmer", "Chelsea", Position::Mid, 110, 200.0),
        ];
        assert_eq!(table.team_total(&team), 10);
    }

    #[test]
    fn test_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "web_name,team,gw,pred_points,pred_points_rounded\nSaka,Arsenal,5,6.6,7\n").unwrap();
        let table = PredictionTable::from_csv(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.predicted_points("Saka", "Arsenal"), 7);

        let empty = PredictionTable::from_csv_or_empty("no/such/file.csv");
        assert!(empty.is_empty());
    }
}
