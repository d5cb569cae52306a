// This file ingests player and gameweek data from csv files and stores it in structs used by the rest of the program
// It also holds the immutable player dataset a session works against

use csv;
use fnv::{FnvHashMap, FnvHasher};
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::gameweek::GameweekRecord;
use crate::player::{Player, Position};

/// Immutable player snapshot for one session.
///
/// The content hash identifies the snapshot so derived results (similarity
/// rankings, embeddings) can be memoised against it.
#[derive(Debug, Clone)]
pub struct PlayerDataset {
    players: Vec<Player>,
    /// full name -> index of its first occurrence
    by_name: FnvHashMap<String, usize>,
    content_hash: u64,
}

impl PlayerDataset {
    pub fn new(players: Vec<Player>) -> PlayerDataset {
        let mut by_name: FnvHashMap<String, usize> = FnvHashMap::default();
        let mut hasher = FnvHasher::default();

        for (idx, player) in players.iter().enumerate() {
            player.hash(&mut hasher);
            if by_name.contains_key(&player.full_name) {
                debug!("Duplicate player name '{}' at row {}", player.full_name, idx);
                continue;
            }
            by_name.insert(player.full_name.clone(), idx);
        }

        PlayerDataset {
            players,
            by_name,
            content_hash: hasher.finish(),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Exact full-name lookup
    pub fn find(&self, full_name: &str) -> Option<&Player> {
        self.by_name.get(full_name).map(|&idx| &self.players[idx])
    }

    /// Full name first, then a case-insensitive match on full or web name
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        if let Some(player) = self.find(name) {
            return Some(player);
        }
        let needle = name.trim().to_lowercase();
        self.players.iter().find(|p| {
            p.full_name.to_lowercase() == needle || p.web_name.to_lowercase() == needle
        })
    }

    pub fn by_position(&self, position: Position) -> impl Iterator<Item = &Player> + '_ {
        self.players.iter().filter(move |p| p.position == position)
    }

    /// Player names sorted alphabetically, as offered in a picker
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.players.iter().map(|p| p.full_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Load a player export (one row per player, headers matching `Player` fields)
pub fn load_players_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Player>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let mut players = Vec::new();
    for result in rdr.deserialize() {
        let player: Player = result?;
        players.push(player);
    }
    info!("Loaded {} players from {:?}", players.len(), path.as_ref());
    Ok(players)
}

/// Write players in the same layout `load_players_csv` reads
pub fn write_players_csv<P: AsRef<Path>>(path: P, players: &[Player]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for player in players {
        wtr.serialize(player)?;
    }
    wtr.flush()?;
    info!("Wrote {} players to {:?}", players.len(), path.as_ref());
    Ok(())
}

/// Load the merged gameweek history archive
pub fn load_gameweek_csv<P: AsRef<Path>>(path: P) -> Result<Vec<GameweekRecord>> {
    let rdr = csv::Reader::from_path(path.as_ref())?;
    let records = read_gameweeks(rdr)?;
    info!("Loaded {} gameweek rows from {:?}", records.len(), path.as_ref());
    Ok(records)
}

/// Parse gameweek rows from any csv source (file or downloaded body)
pub fn read_gameweeks<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Vec<GameweekRecord>> {
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: GameweekRecord = result?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PLAYERS_CSV: &str = "\
id,web_name,full_name,team_name,position,now_cost,total_points,minutes,goals_scored,goals_conceded,assists,clean_sheets,creativity,influence,threat,ict_index,selected_by_percent,form,photo_url
1,Raya,David Raya,Arsenal,GKP,55,160,3420,0,34,0,16,10.1,900.2,0.0,91.0,25.3,4.5,
2,Saka,Bukayo Saka,Arsenal,MID,100,180,2900,14,30,11,12,1200.5,1100.0,1300.0,360.2,40.1,7.0,http://img/saka.png
3,Haaland,Erling Haaland,Man City,FWD,150,,2500,27,,5,,,,,,,,
";

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_players_with_empty_cells() {
        let file = write_temp(PLAYERS_CSV);
        let players = load_players_csv(file.path()).unwrap();
        assert_eq!(players.len(), 3);

        let haaland = &players[2];
        assert_eq!(haaland.position, Position::Fwd);
        assert_eq!(haaland.cost(), 150);
        assert!(haaland.total_points.is_missing());
        assert_eq!(haaland.points(), 0.0);
        assert_eq!(haaland.goals_scored.get(), Some(27.0));
        assert_eq!(players[1].photo_url, "http://img/saka.png");
    }

    #[test]
    fn test_players_csv_round_trip_preserves_hash() {
        let file = write_temp(PLAYERS_CSV);
        let players = load_players_csv(file.path()).unwrap();
        let out = tempfile::NamedTempFile::new().unwrap();
        write_players_csv(out.path(), &players).unwrap();
        let reloaded = load_players_csv(out.path()).unwrap();

        assert_eq!(
            PlayerDataset::new(players).content_hash(),
            PlayerDataset::new(reloaded).content_hash()
        );
    }

    #[test]
    fn test_dataset_lookup() {
        let file = write_temp(PLAYERS_CSV);
        let dataset = PlayerDataset::new(load_players_csv(file.path()).unwrap());
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.find("Bukayo Saka").unwrap().web_name, "Saka");
        assert!(dataset.find("saka").is_none());
        assert_eq!(dataset.find_by_name("saka").unwrap().full_name, "Bukayo Saka");
        assert!(dataset.find_by_name("Kane").is_none());
        assert_eq!(dataset.by_position(Position::Gkp).count(), 1);
        assert_eq!(dataset.sorted_names(), vec!["Bukayo Saka", "David Raya", "Erling Haaland"]);
    }

    #[test]
    fn test_content_hash_changes_with_data() {
        let a = PlayerDataset::new(vec![Player::new(1, "A", "Player A", "X", Position::Def, 45, 10.0)]);
        let b = PlayerDataset::new(vec![Player::new(1, "A", "Player A", "X", Position::Def, 46, 10.0)]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_load_gameweeks() {
        let csv = "\
name,position,team,xP,assists,GW,total_points,transfers_in,transfers_out,value,minutes,round
Bukayo Saka,MID,Arsenal,5.2,1,1,8,1000,200,100,90,1
Bukayo Saka,MID,Arsenal,4.8,0,2,2,,50,100,90,2
";
        let file = write_temp(csv);
        let rows = load_gameweek_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gameweek, 1);
        assert_eq!(rows[0].expected_points.get(), Some(5.2));
        assert!(rows[1].transfers_in.is_missing());
        assert_eq!(rows[1].transfer_balance(), -50.0);
    }
}
