// Similar-player search.
//
// Position-specific features are standardised over every player that has all of
// them, embedded into the plane, and candidates of the same position are ranked
// by distance to the target in that plane. Embeddings and rankings are memoised
// against the dataset's content hash.

use fnv::FnvHashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

use crate::embedding::{embed, pairwise_distances, TsneParams};
use crate::error::{FplError, Result};
use crate::ingest::PlayerDataset;
use crate::player::{Player, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    CostMillions,
    TotalPoints,
    Minutes,
    GoalsScored,
    GoalsConceded,
    Assists,
    CleanSheets,
    Creativity,
    Influence,
    Threat,
    IctIndex,
}

impl Feature {
    /// `None` when the player has no value for this feature
    pub fn read(&self, player: &Player) -> Option<f64> {
        match self {
            Feature::CostMillions => player.now_cost.get().map(|c| c / 10.0),
            Feature::TotalPoints => player.total_points.get(),
            Feature::Minutes => player.minutes.get(),
            Feature::GoalsScored => player.goals_scored.get(),
            Feature::GoalsConceded => player.goals_conceded.get(),
            Feature::Assists => player.assists.get(),
            Feature::CleanSheets => player.clean_sheets.get(),
            Feature::Creativity => player.creativity.get(),
            Feature::Influence => player.influence.get(),
            Feature::Threat => player.threat.get(),
            Feature::IctIndex => player.ict_index.get(),
        }
    }
}

/// Keepers are compared on defensive output only; outfield sets add attacking stats
pub fn features_for(position: Position) -> &'static [Feature] {
    use Feature::*;
    match position {
        Position::Gkp => &[CostMillions, TotalPoints, Minutes, GoalsConceded, CleanSheets, IctIndex],
        Position::Def => &[
            CostMillions, TotalPoints, Minutes, GoalsConceded, CleanSheets, Assists, Creativity,
            GoalsScored, IctIndex,
        ],
        Position::Mid => &[
            CostMillions, TotalPoints, Minutes, GoalsScored, Assists, Creativity, Influence, Threat,
            GoalsConceded, CleanSheets, IctIndex,
        ],
        Position::Fwd => &[
            CostMillions, TotalPoints, Minutes, GoalsScored, Assists, Creativity, Influence, Threat,
            IctIndex,
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPlayer {
    pub full_name: String,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    /// Distance in the embedding; smaller is more similar
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingPoint {
    pub full_name: String,
    pub position: Position,
    pub x: f64,
    pub y: f64,
}

/// Players with a complete feature row, and their distances in the embedding
#[derive(Debug)]
struct Embedded {
    /// indices into the dataset, in row order
    rows: Vec<usize>,
    points: Vec<[f64; 2]>,
    distances: Vec<f64>,
}

impl Embedded {
    fn build(dataset: &PlayerDataset, features: &[Feature], params: &TsneParams) -> Embedded {
        let mut rows = Vec::new();
        let mut matrix: Vec<Vec<f64>> = Vec::new();
        for (idx, player) in dataset.players().iter().enumerate() {
            let row: Option<Vec<f64>> = features.iter().map(|f| f.read(player)).collect();
            if let Some(row) = row {
                rows.push(idx);
                matrix.push(row);
            }
        }
        debug!("{} of {} players have every feature", rows.len(), dataset.len());

        standardize(&mut matrix);
        let points = embed(&matrix, params);
        let distances = pairwise_distances(&points);
        Embedded {
            rows,
            points,
            distances,
        }
    }
}

/// Zero mean, unit variance per column; constant columns become zero
pub fn standardize(matrix: &mut [Vec<f64>]) {
    let Some(width) = matrix.first().map(Vec::len) else {
        return;
    };
    let n = matrix.len() as f64;
    for col in 0..width {
        let mean = matrix.iter().map(|r| r[col]).sum::<f64>() / n;
        let variance = matrix.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let stdev = variance.sqrt();
        for row in matrix.iter_mut() {
            row[col] = if stdev > 1e-12 { (row[col] - mean) / stdev } else { 0.0 };
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RankingKey {
    dataset: u64,
    player: String,
    position: Position,
    top_n: usize,
}

/// Dataset snapshots kept in the caches; the oldest is evicted first
pub const MAX_CACHED_DATASETS: usize = 4;

pub struct SimilarityEngine {
    params: TsneParams,
    embeddings: FnvHashMap<(u64, Position), Arc<Embedded>>,
    rankings: FnvHashMap<RankingKey, Vec<SimilarPlayer>>,
    /// content hashes with cached entries, oldest first
    snapshots: VecDeque<u64>,
}

impl SimilarityEngine {
    pub fn new(params: TsneParams) -> Self {
        SimilarityEngine {
            params,
            embeddings: FnvHashMap::default(),
            rankings: FnvHashMap::default(),
            snapshots: VecDeque::new(),
        }
    }

    /// Track `hash` as cached, dropping every entry of the oldest snapshots past the limit
    fn remember(&mut self, hash: u64) {
        if self.snapshots.contains(&hash) {
            return;
        }
        self.snapshots.push_back(hash);
        while self.snapshots.len() > MAX_CACHED_DATASETS {
            if let Some(evicted) = self.snapshots.pop_front() {
                debug!("Evicting cached similarity results for dataset {:016x}", evicted);
                self.embeddings.retain(|(h, _), _| *h != evicted);
                self.rankings.retain(|key, _| key.dataset != evicted);
            }
        }
    }

    pub fn cached_rankings(&self) -> usize {
        self.rankings.len()
    }

    pub fn cached_embeddings(&self) -> usize {
        self.embeddings.len()
    }

    fn embedding(&mut self, dataset: &PlayerDataset, position: Position) -> Arc<Embedded> {
        let key = (dataset.content_hash(), position);
        if let Some(embedded) = self.embeddings.get(&key) {
            return Arc::clone(embedded);
        }
        info!("Embedding players on {} features", position);
        let embedded = Arc::new(Embedded::build(dataset, features_for(position), &self.params));
        self.remember(key.0);
        self.embeddings.insert(key, Arc::clone(&embedded));
        embedded
    }

    /// The `top_n` players of `position` closest to `player_name`, nearest first.
    ///
    /// Fails with `PlayerNotFound` when the player is missing from the dataset or
    /// lacks one of the position's features.
    pub fn similar_players(
        &mut self,
        dataset: &PlayerDataset,
        player_name: &str,
        position: Position,
        top_n: usize,
    ) -> Result<Vec<SimilarPlayer>> {
        if top_n == 0 {
            return Err(FplError::InvalidArgument("top_n must be at least 1".to_string()));
        }

        let key = RankingKey {
            dataset: dataset.content_hash(),
            player: player_name.to_string(),
            position,
            top_n,
        };
        if let Some(cached) = self.rankings.get(&key) {
            debug!("Similarity cache hit for {}", player_name);
            return Ok(cached.clone());
        }

        let embedded = self.embedding(dataset, position);
        let players = dataset.players();
        let target = embedded
            .rows
            .iter()
            .position(|&idx| players[idx].full_name == player_name)
            .ok_or_else(|| FplError::PlayerNotFound(player_name.to_string()))?;

        let n = embedded.rows.len();
        let mut candidates: Vec<(f64, &Player)> = embedded
            .rows
            .iter()
            .enumerate()
            .filter(|&(row, &idx)| row != target && players[idx].position == position)
            .map(|(row, &idx)| (embedded.distances[target * n + row], &players[idx]))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.full_name.cmp(&b.1.full_name)));

        let ranking: Vec<SimilarPlayer> = candidates
            .into_iter()
            .take(top_n)
            .map(|(distance, p)| SimilarPlayer {
                full_name: p.full_name.clone(),
                web_name: p.web_name.clone(),
                team_name: p.team_name.clone(),
                position: p.position,
                distance,
            })
            .collect();

        self.rankings.insert(key, ranking.clone());
        Ok(ranking)
    }

    /// Embedded coordinates of every complete row, for scatter plots
    pub fn embedding_points(&mut self, dataset: &PlayerDataset, position: Position) -> Vec<EmbeddingPoint> {
        let embedded = self.embedding(dataset, position);
        let players = dataset.players();
        embedded
            .rows
            .iter()
            .zip(&embedded.points)
            .map(|(&idx, point)| EmbeddingPoint {
                full_name: players[idx].full_name.clone(),
                position: players[idx].position,
                x: point[0],
                y: point[1],
            })
            .collect()
    }
}
