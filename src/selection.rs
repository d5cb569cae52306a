// Greedy team selection: the highest point-scorers per position under a formation

use std::cmp::Ordering;

use crate::formation::Formation;
use crate::player::{Player, Position};

/// Ranking used everywhere a "best" player is needed.
///
/// Total points descending, then cheaper first, then web name, full name and id
/// so equal scorers always come out in the same order.
pub fn rank_order(a: &Player, b: &Player) -> Ordering {
    b.points()
        .total_cmp(&a.points())
        .then_with(|| a.cost().cmp(&b.cost()))
        .then_with(|| a.web_name.cmp(&b.web_name))
        .then_with(|| a.full_name.cmp(&b.full_name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Every player at a position, best first
pub fn ranked_for_position(players: &[Player], position: Position) -> Vec<&Player> {
    let mut ranked: Vec<&Player> = players.iter().filter(|p| p.position == position).collect();
    ranked.sort_by(|a, b| rank_order(a, b));
    ranked
}

/// Top `count` players at a position; all of them when fewer exist
pub fn top_players_for_position(players: &[Player], position: Position, count: usize) -> Vec<Player> {
    ranked_for_position(players, position)
        .into_iter()
        .take(count)
        .cloned()
        .collect()
}

/// Best eleven ignoring cost, in squad order (GKP, DEF, MID, FWD)
pub fn best_team(players: &[Player], formation: &Formation) -> Vec<Player> {
    formation
        .quotas()
        .flat_map(|(position, count)| top_players_for_position(players, position, count))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::formation::SQUAD_SIZE;

    /// 50 players per position with points and costs that do not line up
    pub(crate) fn sample_pool() -> Vec<Player> {
        let mut players = Vec::new();
        let mut id = 0;
        for position in Position::ALL {
            for i in 0..50u32 {
                id += 1;
                let points = ((i * 37) % 50) as f64 * 4.0;
                let cost = 40 + (i * 13) % 60;
                let name = format!("{}{:02}", position, i);
                players.push(Player::new(id, &name, &format!("{} Player", name), "Team", position, cost, points));
            }
        }
        players
    }

    #[test]
    fn test_top_players_sorted_and_distinct() {
        let pool = sample_pool();
        for position in Position::ALL {
            let top = top_players_for_position(&pool, position, 5);
            assert_eq!(top.len(), 5);
            assert!(top.iter().all(|p| p.position == position));
            for pair in top.windows(2) {
                assert!(pair[0].points() >= pair[1].points());
            }
            for (i, a) in top.iter().enumerate() {
                assert!(top.iter().skip(i + 1).all(|b| !a.same_as(b)));
            }
        }
    }

    #[test]
    fn test_ties_break_on_cost_then_name() {
        let pool = vec![
            Player::new(1, "Bravo", "Bravo B", "X", Position::Mid, 80, 100.0),
            Player::new(2, "Alpha", "Alpha A", "X", Position::Mid, 80, 100.0),
            Player::new(3, "Cheap", "Cheap C", "X", Position::Mid, 50, 100.0),
            Player::new(4, "Star", "Star S", "X", Position::Mid, 120, 150.0),
        ];
        let names: Vec<String> = top_players_for_position(&pool, Position::Mid, 4)
            .into_iter()
            .map(|p| p.web_name)
            .collect();
        assert_eq!(names, vec!["Star", "Cheap", "Alpha", "Bravo"]);

        // input order does not matter
        let mut reversed = pool.clone();
        reversed.reverse();
        assert_eq!(
            top_players_for_position(&pool, Position::Mid, 4),
            top_players_for_position(&reversed, Position::Mid, 4)
        );
    }

    #[test]
    fn test_fewer_players_than_requested() {
        let pool = vec![
            Player::new(1, "Only", "Only Keeper", "X", Position::Gkp, 45, 20.0),
            Player::new(2, "Mid", "Some Mid", "X", Position::Mid, 45, 20.0),
        ];
        let top = top_players_for_position(&pool, Position::Gkp, 3);
        assert_eq!(top.len(), 1);
        assert!(top_players_for_position(&pool, Position::Fwd, 2).is_empty());
    }

    #[test]
    fn test_best_team_honours_quotas() {
        let pool = sample_pool();
        let formation = Formation::new(4, 4, 2);
        let team = best_team(&pool, &formation);
        assert_eq!(team.len(), SQUAD_SIZE);
        for (position, quota) in formation.quotas() {
            assert_eq!(team.iter().filter(|p| p.position == position).count(), quota);
        }
        // squad order
        assert_eq!(team[0].position, Position::Gkp);
        assert_eq!(team[10].position, Position::Fwd);
    }
}
