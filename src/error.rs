// Error types shared by the loaders, the team builder and the similarity engine

use crate::player::Position;
use thiserror::Error;

/// A position that has fewer manual picks than its formation quota
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    pub position: Position,
    pub selected: usize,
    pub required: usize,
}

#[derive(Error, Debug)]
pub enum FplError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Player '{0}' not found in the dataset")]
    PlayerNotFound(String),

    #[error("Unknown formation '{0}'")]
    UnknownFormation(String),

    #[error("Formation '{name}' has {total} players, expected 11")]
    InvalidFormation { name: String, total: usize },

    #[error("Unknown position '{0}'")]
    UnknownPosition(String),

    #[error("Player '{name}' plays {actual}, not {expected}")]
    PositionMismatch {
        name: String,
        expected: Position,
        actual: Position,
    },

    #[error("All {quota} {position} slots are already filled")]
    QuotaFull { position: Position, quota: usize },

    #[error("Please select all required players for each position: {}", describe_shortfalls(.0))]
    IncompleteSelection(Vec<Shortfall>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, FplError>;

fn describe_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| format!("{} {}/{}", s.position, s.selected, s.required))
        .collect::<Vec<_>>()
        .join(", ")
}
