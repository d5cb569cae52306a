use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fpl_manager::api::{self, ApiClient};
use fpl_manager::budget::build_best_team;
use fpl_manager::config::{generate_sample_config, Config};
use fpl_manager::embedding::TsneParams;
use fpl_manager::gameweek::GameweekRecord;
use fpl_manager::insights;
use fpl_manager::predict::PredictionTable;
use fpl_manager::session::Session;
use fpl_manager::similarity::SimilarityEngine;
use fpl_manager::{ingest, FplError, Player, PlayerDataset, Result};

#[derive(Parser)]
#[command(name = "fpl")]
#[command(about = "Fantasy Premier League player comparison and team builder", long_about = None)]
struct Cli {
    /// Config file path (defaults to fpl.yaml, fpl.yml or .fpl-config.yaml)
    #[arg(short, long)]
    config: Option<String>,

    /// Player CSV; overrides the config and skips the FPL API
    #[arg(long)]
    players: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Players most similar to the given one, within their position
    Similar {
        /// Full name, or web name
        player: String,
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },
    /// Head-to-head comparison of two players
    Compare { first: String, second: String },
    /// Best team for a formation, repaired to the budget
    BestTeam {
        #[arg(short, long)]
        formation: Option<String>,
        /// Budget in tenths of a million
        #[arg(short, long)]
        budget: Option<u32>,
    },
    /// Build a team from manual picks and compare it with the best team
    Team {
        #[arg(short, long)]
        formation: Option<String>,
        /// Full player names; the position is taken from the player
        #[arg(short, long = "pick")]
        picks: Vec<String>,
    },
    /// Gameweek series for a player
    History { player: String },
    /// Download the current player snapshot
    Fetch {
        /// Also write the snapshot to this CSV path
        #[arg(long)]
        export: Option<String>,
    },
    /// Print or write a sample configuration
    Config {
        #[arg(long)]
        sample: bool,
        /// Write the effective configuration to this path
        #[arg(long)]
        save: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_players(cli: &Cli, config: &Config) -> Result<PlayerDataset> {
    let csv_path = cli.players.as_ref().or(config.data.players_csv.as_ref());
    let players = match csv_path {
        Some(path) => ingest::load_players_csv(path)?,
        None => ApiClient::new(&config.data.cache_dir, config.data.cache_hours)?.load_players()?,
    };
    info!("Loaded {} players", players.len());
    Ok(PlayerDataset::new(players))
}

fn load_history(config: &Config) -> Result<Vec<GameweekRecord>> {
    match &config.data.gameweek_csv {
        Some(path) => ingest::load_gameweek_csv(path),
        None => ApiClient::new(&config.data.cache_dir, config.data.cache_hours)?
            .load_gameweek_history(&config.data.season),
    }
}

fn resolve<'a>(dataset: &'a PlayerDataset, name: &str) -> Result<&'a Player> {
    dataset
        .find(name)
        .or_else(|| dataset.find_by_name(name))
        .ok_or_else(|| FplError::PlayerNotFound(name.to_string()))
}

#[derive(Serialize)]
struct HistoryReport {
    player: String,
    next_gameweek: u32,
    points: Vec<insights::GameweekPoints>,
    transfers: Vec<insights::TransferPoint>,
    funnel: Vec<insights::FunnelRow>,
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref());

    match &cli.command {
        Commands::Similar { player, top } => {
            let dataset = load_players(&cli, &config)?;
            let target = resolve(&dataset, player)?;
            let top_n = top.unwrap_or(config.similarity.top_n);
            let mut engine = SimilarityEngine::new(TsneParams::from(&config.similarity));
            let similar = engine.similar_players(&dataset, &target.full_name, target.position, top_n)?;
            print_json(&similar)
        }
        Commands::Compare { first, second } => {
            let dataset = load_players(&cli, &config)?;
            let a = resolve(&dataset, first)?;
            let b = resolve(&dataset, second)?;
            let history = load_history(&config)?;
            let report = insights::comparison_report(&dataset, &history, &a.full_name, &b.full_name, config.team.budget)?;
            print_json(&report)
        }
        Commands::BestTeam { formation, budget } => {
            let dataset = load_players(&cli, &config)?;
            let name = formation.as_deref().unwrap_or(&config.team.default_formation);
            let formation = config.formation(name)?;
            let team = build_best_team(dataset.players(), &formation, budget.unwrap_or(config.team.budget));
            print_json(&team)
        }
        Commands::Team { formation, picks } => {
            let dataset = load_players(&cli, &config)?;
            let players = dataset.players();
            let predictions = PredictionTable::from_csv_or_empty(&config.data.predictions_csv);
            let budget = config.team.budget;

            let name = formation.as_deref().unwrap_or(&config.team.default_formation);
            let mut session = Session::new(name, config.formation(name)?);
            for pick in picks {
                let player = resolve(&dataset, pick)?;
                session.pick(player.position, &player.full_name, players)?;
            }
            session.validate_selection()?;

            let user_team = session.user_team(players);
            let best_team = session.best_team(&dataset, budget).clone();
            print_json(&insights::team_report(
                session.formation_name(),
                user_team,
                best_team,
                players,
                budget,
                &predictions,
            ))
        }
        Commands::History { player } => {
            let history = load_history(&config)?;
            print_json(&HistoryReport {
                player: player.clone(),
                next_gameweek: insights::next_gameweek(&history),
                points: insights::points_by_gameweek(&history, player),
                transfers: insights::transfers_by_gameweek(&history, player),
                funnel: insights::performance_funnel(&history, &[player.as_str()]),
            })
        }
        Commands::Fetch { export } => {
            let client = ApiClient::new(&config.data.cache_dir, config.data.cache_hours)?;
            let players = client.fetch_players()?;
            if let Some(path) = export {
                ingest::write_players_csv(path, &players)?;
                info!("Wrote {} players to {}", players.len(), path);
            }
            println!("Fetched {} players for {}", players.len(), api::current_season());
            Ok(())
        }
        Commands::Config { sample, save } => {
            if *sample {
                print!("{}", generate_sample_config());
            }
            if let Some(path) = save {
                config.save_to_file(path)?;
                info!("Saved configuration to {}", path);
            }
            if !*sample && save.is_none() {
                print!("{}", serde_yaml::to_string(&config)?);
            }
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
