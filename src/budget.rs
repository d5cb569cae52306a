// Budget repair for a selected team.
//
// Starting from the greedy best eleven, the weakest-value pick that has a cheaper
// unselected alternative at the same position is swapped for the best-ranked such
// alternative, until the team fits the budget or no cost-reducing swap is left.
// Every swap lowers the integer total, so the loop always ends; when it ends over
// budget each position already holds its cheapest players.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use crate::formation::Formation;
use crate::player::Player;
use crate::selection::{best_team, rank_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    Within,
    /// No swap sequence reaches the budget; the team is the cheapest lineup
    Infeasible { total_cost: u32, budget: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetedTeam {
    pub players: Vec<Player>,
    pub total_cost: u32,
    pub swaps: usize,
    pub status: BudgetStatus,
}

impl BudgetedTeam {
    pub fn is_within_budget(&self) -> bool {
        self.status == BudgetStatus::Within
    }
}

pub fn team_cost(team: &[Player]) -> u32 {
    team.iter().map(Player::cost).sum()
}

/// Worst points-per-cost first; among equals the dearer pick goes first
fn weakest_first(a: &Player, b: &Player) -> Ordering {
    a.value_ratio()
        .total_cmp(&b.value_ratio())
        .then_with(|| b.cost().cmp(&a.cost()))
        .then_with(|| a.web_name.cmp(&b.web_name))
        .then_with(|| a.full_name.cmp(&b.full_name))
}

/// Slot to replace and the player to bring in, if any swap lowers the cost
fn find_swap<'a>(team: &[Player], pool: &'a [Player]) -> Option<(usize, &'a Player)> {
    let mut order: Vec<usize> = (0..team.len()).collect();
    order.sort_by(|&a, &b| weakest_first(&team[a], &team[b]));

    for slot in order {
        let current = &team[slot];
        let replacement = pool
            .iter()
            .filter(|p| p.position == current.position && p.cost() < current.cost())
            .filter(|p| !team.iter().any(|t| t.same_as(p)))
            .min_by(|a, b| rank_order(a, b));
        if let Some(replacement) = replacement {
            return Some((slot, replacement));
        }
    }
    None
}

/// Swap players out until the team costs at most `budget` (tenths).
///
/// Best effort: an unreachable budget is reported through `BudgetStatus`,
/// with the minimum-cost lineup for the same position composition.
pub fn adjust_team_to_budget(team: Vec<Player>, budget: u32, pool: &[Player]) -> BudgetedTeam {
    let mut players = team;
    let mut total_cost = team_cost(&players);
    let mut swaps = 0;

    while total_cost > budget {
        let Some((slot, replacement)) = find_swap(&players, pool) else {
            break;
        };
        let outgoing = std::mem::replace(&mut players[slot], replacement.clone());
        debug!(
            "Swapped {} ({}) for {} ({})",
            outgoing.web_name,
            outgoing.cost(),
            replacement.web_name,
            replacement.cost()
        );
        total_cost = team_cost(&players);
        swaps += 1;
    }

    let status = if total_cost <= budget {
        BudgetStatus::Within
    } else {
        warn!(
            "The best team exceeds the budget constraints: {} > {}",
            total_cost, budget
        );
        BudgetStatus::Infeasible { total_cost, budget }
    };

    BudgetedTeam {
        players,
        total_cost,
        swaps,
        status,
    }
}

/// Greedy best eleven for a formation, repaired to the budget
pub fn build_best_team(pool: &[Player], formation: &Formation, budget: u32) -> BudgetedTeam {
    let team = best_team(pool, formation);
    info!(
        "Best {} team before budget repair costs {} (budget {})",
        formation,
        team_cost(&team),
        budget
    );
    adjust_team_to_budget(team, budget, pool)
}
