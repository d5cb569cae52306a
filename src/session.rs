// Team-builder session: the active formation, the user's manual picks and the
// memoised best team.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::budget::{build_best_team, BudgetedTeam};
use crate::error::{FplError, Result, Shortfall};
use crate::formation::Formation;
use crate::ingest::PlayerDataset;
use crate::player::{Player, Position};
use crate::selection::rank_order;

#[derive(Debug, Clone)]
pub struct Session {
    formation_name: String,
    formation: Formation,
    /// Full names in pick order
    selected_players: BTreeMap<Position, Vec<String>>,
    /// keyed by (dataset hash, budget)
    best_team: Option<((u64, u32), BudgetedTeam)>,
}

fn lookup<'a>(players: &'a [Player], full_name: &str) -> Option<&'a Player> {
    players.iter().find(|p| p.full_name == full_name)
}

/// Cut `picks` down to the best-ranked `quota`, keeping the order they were made in.
/// Names missing from `players` rank below every known player.
pub fn truncate_picks(picks: &[String], quota: usize, players: &[Player]) -> Vec<String> {
    if picks.len() <= quota {
        return picks.to_vec();
    }

    let mut ranked: Vec<(usize, Option<&Player>)> =
        picks.iter().enumerate().map(|(i, name)| (i, lookup(players, name))).collect();
    ranked.sort_by(|a, b| match (a.1, b.1) {
        (Some(pa), Some(pb)) => rank_order(pa, pb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    let mut kept: Vec<usize> = ranked.into_iter().take(quota).map(|(i, _)| i).collect();
    kept.sort_unstable();
    kept.into_iter().map(|i| picks[i].clone()).collect()
}

impl Session {
    pub fn new(formation_name: &str, formation: Formation) -> Self {
        Session {
            formation_name: formation_name.to_string(),
            formation,
            selected_players: BTreeMap::new(),
            best_team: None,
        }
    }

    pub fn formation_name(&self) -> &str {
        &self.formation_name
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    pub fn picks(&self, position: Position) -> &[String] {
        self.selected_players.get(&position).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Switch formation, trimming over-quota picks. Returns whether anything changed.
    pub fn apply_formation(&mut self, name: &str, formation: Formation, players: &[Player]) -> bool {
        let mut changed = name != self.formation_name || formation != self.formation;

        for (position, quota) in formation.quotas() {
            if let Some(picks) = self.selected_players.get_mut(&position) {
                if picks.len() > quota {
                    let kept = truncate_picks(picks, quota, players);
                    debug!("Trimmed {} picks from {} to {}", position, picks.len(), kept.len());
                    *picks = kept;
                    changed = true;
                }
            }
        }

        if changed {
            info!("Formation set to {}", name);
            self.formation_name = name.to_string();
            self.formation = formation;
            self.best_team = None;
        }
        changed
    }

    pub fn pick(&mut self, position: Position, full_name: &str, players: &[Player]) -> Result<()> {
        let player = lookup(players, full_name).ok_or_else(|| FplError::PlayerNotFound(full_name.to_string()))?;
        if player.position != position {
            return Err(FplError::PositionMismatch {
                name: full_name.to_string(),
                expected: position,
                actual: player.position,
            });
        }

        let quota = self.formation.quota(position);
        let picks = self.selected_players.entry(position).or_default();
        if picks.iter().any(|p| p == full_name) {
            return Ok(());
        }
        if picks.len() >= quota {
            return Err(FplError::QuotaFull { position, quota });
        }
        picks.push(full_name.to_string());
        Ok(())
    }

    /// Returns whether the pick was present
    pub fn unpick(&mut self, position: Position, full_name: &str) -> bool {
        match self.selected_players.get_mut(&position) {
            Some(picks) => {
                let before = picks.len();
                picks.retain(|p| p != full_name);
                picks.len() != before
            }
            None => false,
        }
    }

    /// Records for the first `count` picks at a position; unknown names are skipped
    pub fn select_players_for_position(&self, position: Position, count: usize, players: &[Player]) -> Vec<Player> {
        self.picks(position)
            .iter()
            .take(count)
            .filter_map(|name| lookup(players, name).cloned())
            .collect()
    }

    /// The user's team in squad order, capped at each quota
    pub fn user_team(&self, players: &[Player]) -> Vec<Player> {
        self.formation
            .quotas()
            .flat_map(|(position, quota)| self.select_players_for_position(position, quota, players))
            .collect()
    }

    pub fn validate_selection(&self) -> Result<()> {
        let shortfalls: Vec<Shortfall> = self
            .formation
            .quotas()
            .filter_map(|(position, required)| {
                let selected = self.picks(position).len();
                (selected < required).then_some(Shortfall {
                    position,
                    selected,
                    required,
                })
            })
            .collect();

        if shortfalls.is_empty() {
            Ok(())
        } else {
            Err(FplError::IncompleteSelection(shortfalls))
        }
    }

    /// Budget-adjusted best team, rebuilt after a formation, budget or dataset change
    pub fn best_team(&mut self, dataset: &PlayerDataset, budget: u32) -> &BudgetedTeam {
        let key = (dataset.content_hash(), budget);
        if !matches!(&self.best_team, Some((cached, _)) if *cached == key) {
            self.best_team = None;
        }
        let formation = &self.formation;
        let (_, team) = self
            .best_team
            .get_or_insert_with(|| (key, build_best_team(dataset.players(), formation, budget)));
        team
    }
}
