use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use hexweather::cli::commands::{self, ForecastRequest, GenerateRequest};
use hexweather::config::simulation::SimulationConfig;
use hexweather::persistence;

#[derive(Parser)]
#[command(name = "hexweather")]
#[command(about = "Procedural per-hex weather generation, forecasting and simulation for hex maps")]
#[command(version)]
struct Cli {
    /// Path to the configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available climate templates
    Climates,

    /// Generate one weather state
    Generate {
        /// Climate template name (defaults to the configured climate)
        #[arg(long)]
        climate: Option<String>,

        /// Day of year, 1-366
        #[arg(long, default_value_t = 1)]
        day: u32,

        /// Hour of day, 0-23
        #[arg(long, default_value_t = 12)]
        hour: u32,

        /// Seed for reproducible output
        #[arg(long, allow_hyphen_values = true)]
        seed: Option<i64>,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        q: i32,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        r: i32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Forecast the coming days for one hex
    Forecast {
        #[arg(long)]
        climate: Option<String>,

        /// Starting date, YYYY-MM-DD (defaults to the configured start date)
        #[arg(long)]
        date: Option<String>,

        /// Days ahead (defaults to the configured forecast length)
        #[arg(long)]
        days: Option<u32>,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        q: i32,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        r: i32,

        #[arg(long)]
        json: bool,
    },

    /// Run the day-by-day simulation until interrupted
    Run {
        /// Path to a specific snapshot to resume from
        #[arg(short, long)]
        snapshot: Option<String>,
    },

    /// Inspect a hex from the latest snapshot
    Inspect {
        #[arg(long, allow_hyphen_values = true)]
        q: i32,

        #[arg(long, allow_hyphen_values = true)]
        r: i32,
    },

    /// Manage simulation snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List available snapshots
    List {
        /// Snapshot directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Restore and display a simulation from a snapshot file
    Restore {
        /// Path to the snapshot file
        file: String,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &str) -> SimulationConfig {
    match SimulationConfig::from_file_or_default(Path::new(path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    }
}

fn exit_on_error(result: Result<(), String>) {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_tracing(&config.log_level, cli.log_json);

    match cli.command {
        Commands::Climates => exit_on_error(commands::list_climates(&config)),

        Commands::Generate {
            climate,
            day,
            hour,
            seed,
            q,
            r,
            json,
        } => {
            let request = GenerateRequest {
                climate,
                day_of_year: day,
                hour_of_day: hour,
                seed,
                q,
                r,
                json,
            };
            exit_on_error(commands::generate(&config, &request));
        }

        Commands::Forecast {
            climate,
            date,
            days,
            q,
            r,
            json,
        } => {
            let request = ForecastRequest {
                climate,
                date,
                days,
                q,
                r,
                json,
            };
            exit_on_error(commands::forecast(&config, &request));
        }

        Commands::Run { snapshot } => {
            if let Err(e) = commands::run_simulation(&config, snapshot.as_deref()).await {
                eprintln!("Simulation error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Inspect { q, r } => exit_on_error(commands::inspect(&config, q, r)),

        Commands::Snapshots { action } => match action {
            SnapshotAction::List { dir } => {
                let dir = dir.unwrap_or_else(|| config.snapshot_directory.clone());
                let snapshot_dir = Path::new(&dir);
                match persistence::list_snapshots(snapshot_dir) {
                    Ok(snapshots) => {
                        if snapshots.is_empty() {
                            println!("No snapshots found in {}", snapshot_dir.display());
                        } else {
                            println!("{:<40} {:>8} {:>12}", "File", "Day", "Size");
                            println!("{}", "-".repeat(62));
                            for s in &snapshots {
                                let name = s
                                    .path
                                    .file_name()
                                    .and_then(|n| n.to_str())
                                    .unwrap_or("?");
                                let size_kb = s.file_size / 1024;
                                println!("{:<40} {:>8} {:>9} KB", name, s.day_count, size_kb);
                            }
                            println!(
                                "\n{} snapshot(s) in {}",
                                snapshots.len(),
                                snapshot_dir.display()
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Error listing snapshots: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            SnapshotAction::Restore { file } => {
                let path = Path::new(&file);
                match persistence::load_snapshot(path) {
                    Ok(state) => {
                        println!("Restored simulation from {}", path.display());
                        commands::describe_state(&state);
                    }
                    Err(e) => {
                        eprintln!("Error restoring snapshot: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
    }
}
