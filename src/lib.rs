//! Fantasy Premier League analytics: similar-player search, greedy team
//! selection under a formation, budget repair and manual team building.

pub mod api;
pub mod budget;
pub mod config;
pub mod embedding;
pub mod error;
pub mod formation;
pub mod gameweek;
pub mod ingest;
pub mod insights;
pub mod player;
pub mod predict;
pub mod selection;
pub mod session;
pub mod similarity;

pub use config::Config;
pub use error::{FplError, Result};
pub use formation::Formation;
pub use ingest::PlayerDataset;
pub use player::{Player, Position};
