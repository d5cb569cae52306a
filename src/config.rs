// Configuration module for the FPL manager
// Supports YAML configuration files for the budget, formations, similarity and data settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{FplError, Result};
use crate::formation::{default_formations, Formation};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub team: TeamSettings,
    #[serde(default)]
    pub similarity: SimilaritySettings,
    #[serde(default)]
    pub data: DataSettings,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(FplError::Config(format!("Config file not found: {}", path)));
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load_or_default(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::from_file(p).unwrap_or_else(|e| {
                warn!("{}", e);
                warn!("Using default configuration.");
                Self::default()
            }),
            None => {
                for default_path in &["fpl.yaml", "fpl.yml", ".fpl-config.yaml"] {
                    if Path::new(default_path).exists() {
                        match Self::from_file(default_path) {
                            Ok(config) => {
                                info!("Loaded configuration from {}", default_path);
                                return config;
                            }
                            Err(e) => warn!("Ignoring {}: {}", default_path, e),
                        }
                    }
                }
                Self::default()
            }
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Every formation must field eleven players and the default must exist
    pub fn validate(&self) -> Result<()> {
        if self.team.formations.is_empty() {
            return Err(FplError::Config("No formations configured".to_string()));
        }
        for (name, formation) in &self.team.formations {
            formation.validate(name)?;
        }
        self.formation(&self.team.default_formation)?;
        if self.similarity.top_n == 0 {
            return Err(FplError::Config("similarity.top_n must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn formation(&self, name: &str) -> Result<Formation> {
        self.team
            .formations
            .get(name)
            .copied()
            .ok_or_else(|| FplError::UnknownFormation(name.to_string()))
    }
}

/// Squad-building settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSettings {
    /// Budget ceiling in tenths of a million, same unit as player costs
    #[serde(default = "default_budget")]
    pub budget: u32,

    #[serde(default = "default_formation_name")]
    pub default_formation: String,

    /// Named formation -> per-position quotas
    #[serde(default = "default_formations")]
    pub formations: BTreeMap<String, Formation>,
}

impl Default for TeamSettings {
    fn default() -> Self {
        TeamSettings {
            budget: default_budget(),
            default_formation: default_formation_name(),
            formations: default_formations(),
        }
    }
}

fn default_budget() -> u32 { 1000 }
fn default_formation_name() -> String { "4-4-2".to_string() }

/// Similarity engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilaritySettings {
    /// Number of similar players returned
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Effective neighbourhood size of the embedding
    #[serde(default = "default_perplexity")]
    pub perplexity: f64,

    #[serde(default = "default_iterations")]
    pub iterations: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_early_exaggeration")]
    pub early_exaggeration: f64,

    /// Seed for the embedding initialisation
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        SimilaritySettings {
            top_n: default_top_n(),
            perplexity: default_perplexity(),
            iterations: default_iterations(),
            learning_rate: default_learning_rate(),
            early_exaggeration: default_early_exaggeration(),
            seed: default_seed(),
        }
    }
}

fn default_top_n() -> usize { 5 }
fn default_perplexity() -> f64 { 5.0 }
fn default_iterations() -> usize { 500 }
fn default_learning_rate() -> f64 { 200.0 }
fn default_early_exaggeration() -> f64 { 12.0 }
fn default_seed() -> u64 { 42 }

/// Data source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Player CSV export; the FPL API is used when unset
    #[serde(default)]
    pub players_csv: Option<String>,

    /// Merged gameweek CSV; downloaded for `season` when unset
    #[serde(default)]
    pub gameweek_csv: Option<String>,

    #[serde(default = "default_predictions_csv")]
    pub predictions_csv: String,

    /// Season in the archive's format, e.g. "2024-25"
    #[serde(default = "default_season")]
    pub season: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Downloads older than this are refreshed
    #[serde(default = "default_cache_hours")]
    pub cache_hours: i64,
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            players_csv: None,
            gameweek_csv: None,
            predictions_csv: default_predictions_csv(),
            season: default_season(),
            cache_dir: default_cache_dir(),
            cache_hours: default_cache_hours(),
        }
    }
}

fn default_predictions_csv() -> String { "data/predicted_df.csv".to_string() }
fn default_season() -> String { "2024-25".to_string() }
fn default_cache_dir() -> String { ".fpl-cache".to_string() }
fn default_cache_hours() -> i64 { 6 }

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    r#"# FPL Manager Configuration
# All values shown are defaults - uncomment and modify as needed

team:
  # Budget ceiling in tenths of a million (1000 = 100.0m)
  budget: 1000
  default_formation: "4-4-2"
  # Named formations; quotas must add up to 11
  formations:
    "3-4-3": { GKP: 1, DEF: 3, MID: 4, FWD: 3 }
    "3-5-2": { GKP: 1, DEF: 3, MID: 5, FWD: 2 }
    "4-3-3": { GKP: 1, DEF: 4, MID: 3, FWD: 3 }
    "4-4-2": { GKP: 1, DEF: 4, MID: 4, FWD: 2 }
    "4-5-1": { GKP: 1, DEF: 4, MID: 5, FWD: 1 }
    "5-3-2": { GKP: 1, DEF: 5, MID: 3, FWD: 2 }
    "5-4-1": { GKP: 1, DEF: 5, MID: 4, FWD: 1 }

# Similar-player search
similarity:
  # Number of similar players returned
  top_n: 5
  # Neighbourhood size of the 2-D embedding
  perplexity: 5.0
  iterations: 500
  learning_rate: 200.0
  early_exaggeration: 12.0
  # Fixed seed keeps neighbour rankings stable between runs
  seed: 42

# Data sources
data:
  # players_csv: "data/players.csv"
  # gameweek_csv: "data/merged_gw.csv"
  predictions_csv: "data/predicted_df.csv"
  season: "2024-25"
  cache_dir: ".fpl-cache"
  cache_hours: 6
"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Position;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.team.budget, 1000);
        assert_eq!(config.similarity.top_n, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.formation("4-4-2").unwrap().quota(Position::Def), 4);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
team:
  budget: 950
similarity:
  seed: 7
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.team.budget, 950);
        assert_eq!(config.similarity.seed, 7);
        // Defaults should still work
        assert_eq!(config.similarity.perplexity, 5.0);
        assert_eq!(config.team.formations.len(), 7);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = serde_yaml::from_str(&generate_sample_config()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.team.formations, default_formations());
    }

    #[test]
    fn test_invalid_formation_rejected() {
        let yaml = r#"
team:
  default_formation: "4-4-3"
  formations:
    "4-4-3": { GKP: 1, DEF: 4, MID: 4, FWD: 3 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(FplError::InvalidFormation { total: 12, .. })
        ));
    }

    #[test]
    fn test_unknown_default_formation() {
        let mut config = Config::default();
        config.team.default_formation = "2-2-6".to_string();
        assert!(matches!(config.validate(), Err(FplError::UnknownFormation(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fpl.yaml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.team.budget = 900;
        config.save_to_file(path).unwrap();

        let loaded = Config::from_file(path).unwrap();
        assert_eq!(loaded.team.budget, 900);
        assert!(Config::from_file("does-not-exist.yaml").is_err());
    }
}
