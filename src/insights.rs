// Chart-ready data for the player comparison and team builder views.
// Nothing here renders; every function returns plain serialisable rows.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::budget::{team_cost, BudgetedTeam};
use crate::error::{FplError, Result};
use crate::gameweek::GameweekRecord;
use crate::ingest::PlayerDataset;
use crate::player::{Player, Position, Stat};
use crate::predict::PredictionTable;

/// Metrics on the head-to-head player radar
pub const COMPARISON_METRICS: [&str; 7] = [
    "total_points",
    "minutes",
    "goals_scored",
    "assists",
    "clean_sheets",
    "goals_conceded",
    "selected_by_percent",
];

/// Metrics summed for the team radar
pub const TEAM_RADAR_METRICS: [&str; 5] = ["now_cost", "total_points", "goals_conceded", "creativity", "form"];

fn stat_for<'a>(player: &'a Player, metric: &str) -> Option<&'a Stat> {
    let stat = match metric {
        "now_cost" => &player.now_cost,
        "total_points" => &player.total_points,
        "minutes" => &player.minutes,
        "goals_scored" => &player.goals_scored,
        "goals_conceded" => &player.goals_conceded,
        "assists" => &player.assists,
        "clean_sheets" => &player.clean_sheets,
        "creativity" => &player.creativity,
        "influence" => &player.influence,
        "threat" => &player.threat,
        "ict_index" => &player.ict_index,
        "selected_by_percent" => &player.selected_by_percent,
        "form" => &player.form,
        _ => return None,
    };
    Some(stat)
}

/// Value of a named metric; missing values read as zero
pub fn metric_value(player: &Player, metric: &str) -> Result<f64> {
    stat_for(player, metric)
        .map(Stat::value)
        .ok_or_else(|| FplError::InvalidArgument(format!("unknown metric '{}'", metric)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub first: f64,
    pub second: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerComparison {
    pub first: String,
    pub second: String,
    pub metrics: Vec<MetricRow>,
}

pub fn player_comparison(
    dataset: &PlayerDataset,
    first: &str,
    second: &str,
    metrics: &[&str],
) -> Result<PlayerComparison> {
    let a = dataset
        .find(first)
        .ok_or_else(|| FplError::PlayerNotFound(first.to_string()))?;
    let b = dataset
        .find(second)
        .ok_or_else(|| FplError::PlayerNotFound(second.to_string()))?;

    let rows = metrics
        .iter()
        .map(|&metric| {
            Ok(MetricRow {
                metric: metric.to_string(),
                first: metric_value(a, metric)?,
                second: metric_value(b, metric)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PlayerComparison {
        first: first.to_string(),
        second: second.to_string(),
        metrics: rows,
    })
}

/// Player cost as a percentage of the budget
pub fn budget_share(player: &Player, budget: u32) -> f64 {
    if budget == 0 {
        return 0.0;
    }
    player.cost() as f64 * 100.0 / budget as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub players: usize,
    pub total_cost: u32,
    /// Negative when over budget
    pub remaining_budget: i64,
    pub predicted_points: u32,
    pub over_budget: bool,
}

pub fn team_summary(team: &[Player], budget: u32, predictions: &PredictionTable) -> TeamSummary {
    let total_cost = team_cost(team);
    TeamSummary {
        players: team.len(),
        total_cost,
        remaining_budget: budget as i64 - total_cost as i64,
        predicted_points: predictions.team_total(team),
        over_budget: total_cost > budget,
    }
}

/// Total cost per position; positions with no players are left out
pub fn cost_breakdown_by_position(team: &[Player]) -> BTreeMap<Position, u32> {
    let mut breakdown = BTreeMap::new();
    for player in team {
        *breakdown.entry(player.position).or_insert(0) += player.cost();
    }
    breakdown
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPoints {
    pub web_name: String,
    pub position: Position,
    pub total_points: f64,
}

pub fn points_by_player(team: &[Player]) -> Vec<PlayerPoints> {
    team.iter()
        .map(|p| PlayerPoints {
            web_name: p.web_name.clone(),
            position: p.position,
            total_points: p.points(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTotal {
    pub metric: String,
    pub total: f64,
}

pub fn team_radar(team: &[Player]) -> Vec<MetricTotal> {
    TEAM_RADAR_METRICS
        .iter()
        .map(|&metric| MetricTotal {
            metric: metric.to_string(),
            total: team
                .iter()
                .filter_map(|p| stat_for(p, metric))
                .map(Stat::value)
                .sum(),
        })
        .collect()
}

/// Web names in both teams, sorted
pub fn shared_players(a: &[Player], b: &[Player]) -> Vec<String> {
    let first: BTreeSet<&str> = a.iter().map(|p| p.web_name.as_str()).collect();
    let second: BTreeSet<&str> = b.iter().map(|p| p.web_name.as_str()).collect();
    first.intersection(&second).map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnershipPoint {
    pub web_name: String,
    pub position: Position,
    pub selected_by_percent: f64,
    pub total_points: f64,
    pub cost_millions: f64,
}

pub fn ownership_vs_points(players: &[Player], min_ownership_pct: f64) -> Vec<OwnershipPoint> {
    players
        .iter()
        .filter(|p| p.selected_by_percent.value() >= min_ownership_pct)
        .map(|p| OwnershipPoint {
            web_name: p.web_name.clone(),
            position: p.position,
            selected_by_percent: p.selected_by_percent.value(),
            total_points: p.points(),
            cost_millions: p.cost_millions(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostPoint {
    pub web_name: String,
    pub position: Position,
    pub cost_millions: f64,
    pub total_points: f64,
}

pub fn points_vs_cost(players: &[Player], min_points: f64) -> Vec<CostPoint> {
    players
        .iter()
        .filter(|p| p.points() >= min_points)
        .map(|p| CostPoint {
            web_name: p.web_name.clone(),
            position: p.position,
            cost_millions: p.cost_millions(),
            total_points: p.points(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferPoint {
    pub gameweek: u32,
    pub transfers_in: f64,
    pub transfers_out: f64,
    pub balance: f64,
}

/// Transfers per gameweek for one player; double gameweeks are summed
pub fn transfers_by_gameweek(history: &[GameweekRecord], name: &str) -> Vec<TransferPoint> {
    let mut by_gameweek: BTreeMap<u32, (f64, f64)> = BTreeMap::new();
    for record in history.iter().filter(|r| r.name == name) {
        let entry = by_gameweek.entry(record.gameweek).or_insert((0.0, 0.0));
        entry.0 += record.transfers_in.value();
        entry.1 += record.transfers_out.value();
    }
    by_gameweek
        .into_iter()
        .map(|(gameweek, (transfers_in, transfers_out))| TransferPoint {
            gameweek,
            transfers_in,
            transfers_out,
            balance: transfers_in - transfers_out,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameweekPoints {
    pub gameweek: u32,
    pub total_points: f64,
    pub expected_points: f64,
}

pub fn points_by_gameweek(history: &[GameweekRecord], name: &str) -> Vec<GameweekPoints> {
    let mut by_gameweek: BTreeMap<u32, (f64, f64)> = BTreeMap::new();
    for record in history.iter().filter(|r| r.name == name) {
        let entry = by_gameweek.entry(record.gameweek).or_insert((0.0, 0.0));
        entry.0 += record.total_points.value();
        entry.1 += record.expected_points.value();
    }
    by_gameweek
        .into_iter()
        .map(|(gameweek, (total_points, expected_points))| GameweekPoints {
            gameweek,
            total_points,
            expected_points,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelRow {
    pub name: String,
    pub total_points: f64,
    pub expected_points: f64,
}

/// Season totals of actual against expected points, one row per requested name
pub fn performance_funnel(history: &[GameweekRecord], names: &[&str]) -> Vec<FunnelRow> {
    names
        .iter()
        .map(|&name| {
            let rows = history.iter().filter(|r| r.name == name);
            let (total_points, expected_points) = rows.fold((0.0, 0.0), |(t, x), r| {
                (t + r.total_points.value(), x + r.expected_points.value())
            });
            FunnelRow {
                name: name.to_string(),
                total_points,
                expected_points,
            }
        })
        .collect()
}

/// The gameweek after the latest one in the history; 1 for an empty history
pub fn next_gameweek(history: &[GameweekRecord]) -> u32 {
    history.iter().map(|r| r.gameweek).max().map_or(1, |gw| gw + 1)
}

/// Players below this many total points are left off the points-vs-cost scatter
pub const POINTS_VS_COST_MIN_POINTS: f64 = 500.0;

/// Ownership floor for the ownership-vs-points scatter
pub const MIN_OWNERSHIP_PCT: f64 = 10.0;

/// One side of a head-to-head comparison
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSide {
    pub full_name: String,
    pub photo_url: String,
    pub budget_share: f64,
    pub transfers: Vec<TransferPoint>,
    pub points: Vec<GameweekPoints>,
}

impl PlayerSide {
    fn build(player: &Player, history: &[GameweekRecord], budget: u32) -> Self {
        PlayerSide {
            full_name: player.full_name.clone(),
            photo_url: player.photo_url.clone(),
            budget_share: budget_share(player, budget),
            transfers: transfers_by_gameweek(history, &player.full_name),
            points: points_by_gameweek(history, &player.full_name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub comparison: PlayerComparison,
    pub first: PlayerSide,
    pub second: PlayerSide,
    pub funnel: Vec<FunnelRow>,
    pub next_gameweek: u32,
}

/// Everything the player comparison view shows for two players.
/// Gameweek history is matched on full name.
pub fn comparison_report(
    dataset: &PlayerDataset,
    history: &[GameweekRecord],
    first: &str,
    second: &str,
    budget: u32,
) -> Result<ComparisonReport> {
    let comparison = player_comparison(dataset, first, second, &COMPARISON_METRICS)?;
    let a = dataset
        .find(first)
        .ok_or_else(|| FplError::PlayerNotFound(first.to_string()))?;
    let b = dataset
        .find(second)
        .ok_or_else(|| FplError::PlayerNotFound(second.to_string()))?;

    Ok(ComparisonReport {
        comparison,
        first: PlayerSide::build(a, history, budget),
        second: PlayerSide::build(b, history, budget),
        funnel: performance_funnel(history, &[first, second]),
        next_gameweek: next_gameweek(history),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamReport {
    pub formation: String,
    pub user_team: Vec<Player>,
    pub user_summary: TeamSummary,
    pub user_points: Vec<PlayerPoints>,
    pub user_radar: Vec<MetricTotal>,
    pub best_team: BudgetedTeam,
    pub best_summary: TeamSummary,
    pub best_points: Vec<PlayerPoints>,
    pub best_radar: Vec<MetricTotal>,
    pub cost_by_position: BTreeMap<Position, u32>,
    pub best_cost_by_position: BTreeMap<Position, u32>,
    pub shared_players: Vec<String>,
    pub points_vs_cost: Vec<CostPoint>,
    pub ownership_vs_points: Vec<OwnershipPoint>,
}

/// The team builder view: the user's picks against the best team, plus the
/// league-wide scatters
pub fn team_report(
    formation: &str,
    user_team: Vec<Player>,
    best_team: BudgetedTeam,
    players: &[Player],
    budget: u32,
    predictions: &PredictionTable,
) -> TeamReport {
    TeamReport {
        formation: formation.to_string(),
        user_summary: team_summary(&user_team, budget, predictions),
        user_points: points_by_player(&user_team),
        user_radar: team_radar(&user_team),
        best_summary: team_summary(&best_team.players, budget, predictions),
        best_points: points_by_player(&best_team.players),
        best_radar: team_radar(&best_team.players),
        cost_by_position: cost_breakdown_by_position(&user_team),
        best_cost_by_position: cost_breakdown_by_position(&best_team.players),
        shared_players: shared_players(&user_team, &best_team.players),
        points_vs_cost: points_vs_cost(players, POINTS_VS_COST_MIN_POINTS),
        ownership_vs_points: ownership_vs_points(players, MIN_OWNERSHIP_PCT),
        user_team,
        best_team,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::PredictionRow;

    fn team() -> Vec<Player> {
        let mut salah = Player::new(1, "M.Salah", "Mohamed Salah", "Liverpool", Position::Mid, 130, 250.0);
        salah.selected_by_percent = Stat::present(55.0);
        salah.creativity = Stat::present(1100.0);
        let mut raya = Player::new(2, "Raya", "David Raya Martin", "Arsenal", Position::Gkp, 55, 150.0);
        raya.selected_by_percent = Stat::present(8.0);
        raya.goals_conceded = Stat::present(30.0);
        let saliba = Player::new(3, "Saliba", "William Saliba", "Arsenal", Position::Def, 60, 140.0);
        vec![salah, raya, saliba]
    }

    fn history() -> Vec<GameweekRecord> {
        let mut rows = vec![
            GameweekRecord::new("Mohamed Salah", 2, 8.0, 6.5),
            GameweekRecord::new("Mohamed Salah", 1, 12.0, 7.0),
            GameweekRecord::new("Mohamed Salah", 2, 3.0, 2.5),
            GameweekRecord::new("William Saliba", 1, 6.0, 4.0),
        ];
        rows[0].transfers_in = Stat::present(1000.0);
        rows[0].transfers_out = Stat::present(400.0);
        rows[2].transfers_in = Stat::present(50.0);
        rows
    }

    #[test]
    fn test_player_comparison() {
        let dataset = PlayerDataset::new(team());
        let cmp = player_comparison(&dataset, "Mohamed Salah", "David Raya Martin", &COMPARISON_METRICS).unwrap();
        assert_eq!(cmp.metrics.len(), 7);
        assert_eq!(cmp.metrics[0], MetricRow { metric: "total_points".to_string(), first: 250.0, second: 150.0 });
        // missing minutes read as zero
        assert_eq!(cmp.metrics[1].first, 0.0);

        assert!(matches!(
            player_comparison(&dataset, "Mohamed Salah", "Nobody", &COMPARISON_METRICS),
            Err(FplError::PlayerNotFound(_))
        ));
        assert!(matches!(
            player_comparison(&dataset, "Mohamed Salah", "William Saliba", &["height"]),
            Err(FplError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_budget_share_and_summary() {
        let team = team();
        assert_eq!(budget_share(&team[0], 1000), 13.0);
        assert_eq!(budget_share(&team[0], 0), 0.0);

        let predictions = PredictionTable::new(vec![PredictionRow {
            web_name: "Salah".to_string(),
            team: "Liverpool".to_string(),
            gameweek: 3,
            predicted_points: 7.0,
        }]);
        let summary = team_summary(&team, 200, &predictions);
        assert_eq!(summary.total_cost, 245);
        assert_eq!(summary.remaining_budget, -45);
        assert!(summary.over_budget);
        assert_eq!(summary.predicted_points, 7);
    }

    #[test]
    fn test_team_breakdowns() {
        let team = team();
        let breakdown = cost_breakdown_by_position(&team);
        assert_eq!(breakdown.get(&Position::Mid), Some(&130));
        assert_eq!(breakdown.get(&Position::Fwd), None);

        let points = points_by_player(&team);
        assert_eq!(points[1].web_name, "Raya");
        assert_eq!(points[1].total_points, 150.0);

        let radar = team_radar(&team);
        assert_eq!(radar.len(), TEAM_RADAR_METRICS.len());
        assert_eq!(radar[0].total, 245.0);
        assert_eq!(radar[2].total, 30.0);
        assert_eq!(radar[3].total, 1100.0);
        assert_eq!(radar[4].total, 0.0);

        let other = vec![team[2].clone(), team[0].clone()];
        assert_eq!(shared_players(&team, &other), vec!["M.Salah", "Saliba"]);
        assert!(shared_players(&team, &[]).is_empty());
    }

    #[test]
    fn test_scatter_filters() {
        let team = team();
        let owned = ownership_vs_points(&team, 10.0);
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].cost_millions, 13.0);

        let scorers = points_vs_cost(&team, 145.0);
        let names: Vec<&str> = scorers.iter().map(|p| p.web_name.as_str()).collect();
        assert_eq!(names, vec!["M.Salah", "Raya"]);
    }

    #[test]
    fn test_gameweek_series() {
        let history = history();
        let transfers = transfers_by_gameweek(&history, "Mohamed Salah");
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].gameweek, 1);
        assert_eq!(transfers[1].transfers_in, 1050.0);
        assert_eq!(transfers[1].balance, 650.0);

        let points = points_by_gameweek(&history, "Mohamed Salah");
        assert_eq!(points[1], GameweekPoints { gameweek: 2, total_points: 11.0, expected_points: 9.0 });
        assert!(points_by_gameweek(&history, "Nobody").is_empty());

        let funnel = performance_funnel(&history, &["Mohamed Salah", "William Saliba"]);
        assert_eq!(funnel[0].total_points, 23.0);
        assert_eq!(funnel[0].expected_points, 16.0);
        assert_eq!(funnel[1].expected_points, 4.0);

        assert_eq!(next_gameweek(&history), 3);
        assert_eq!(next_gameweek(&[]), 1);
    }

    #[test]
    fn test_comparison_report_covers_both_players() {
        let dataset = PlayerDataset::new(team());
        let history = history();
        let report =
            comparison_report(&dataset, &history, "Mohamed Salah", "William Saliba", 1000).unwrap();

        assert_eq!(report.comparison.metrics.len(), COMPARISON_METRICS.len());
        assert_eq!(report.first.budget_share, 13.0);
        assert_eq!(report.first.transfers.len(), 2);
        assert_eq!(report.first.points.len(), 2);
        assert_eq!(report.second.full_name, "William Saliba");
        assert_eq!(report.second.points, vec![GameweekPoints { gameweek: 1, total_points: 6.0, expected_points: 4.0 }]);
        assert_eq!(report.second.transfers.len(), 1);

        let names: Vec<&str> = report.funnel.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Mohamed Salah", "William Saliba"]);
        assert_eq!(report.next_gameweek, 3);

        assert!(matches!(
            comparison_report(&dataset, &history, "Mohamed Salah", "Nobody", 1000),
            Err(FplError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_team_report_includes_points_and_scatters() {
        let mut players = team();
        let mut star = Player::new(4, "Palmer", "Cole Palmer", "Chelsea", Position::Mid, 110, 520.0);
        star.selected_by_percent = Stat::present(60.0);
        players.push(star);

        let user_team = vec![players[0].clone(), players[1].clone()];
        let best = crate::budget::adjust_team_to_budget(vec![players[3].clone(), players[1].clone()], 1000, &players);
        let report = team_report("4-4-2", user_team, best, &players, 1000, &PredictionTable::default());

        assert_eq!(report.formation, "4-4-2");
        assert_eq!(report.user_points.len(), 2);
        assert_eq!(report.best_points[0].web_name, "Palmer");
        assert_eq!(report.shared_players, vec!["Raya"]);
        assert_eq!(report.best_cost_by_position.get(&Position::Mid), Some(&110));

        let scatter: Vec<&str> = report.points_vs_cost.iter().map(|p| p.web_name.as_str()).collect();
        assert_eq!(scatter, vec!["Palmer"]);
        let owned: Vec<&str> = report.ownership_vs_points.iter().map(|p| p.web_name.as_str()).collect();
        assert_eq!(owned, vec!["M.Salah", "Palmer"]);
    }
}
