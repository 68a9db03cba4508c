//! mimesis CLI - dataset preparation and sample generation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimesis::{
    fetch_robot_patterns, prepare_fingerprint_files, prepare_header_files, BrowserOption,
    FingerprintGenerator, FingerprintGeneratorOptions, HeaderGenerator, HeaderGeneratorOptions,
    RecordValidator, DEFAULT_ROBOTS_URL,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mimesis")]
#[command(version)]
#[command(about = "Statistical synthesis of HTTP headers and browser fingerprints")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare header-generator data files from a raw capture dataset
    PrepareHeaders {
        /// Path to the raw dataset (JSON array of records)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Directory with the *-network-structure.zip files
        #[arg(short, long)]
        structures: PathBuf,

        /// Directory the browser helper file is written to
        #[arg(short, long)]
        out: PathBuf,

        /// Skip fetching the robot user-agent list
        #[arg(long)]
        no_robots: bool,
    },

    /// Prepare fingerprint records from a raw capture dataset
    PrepareFingerprints {
        /// Path to the raw dataset (JSON array of records)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Directory with the *-network-structure.zip files
        #[arg(short, long)]
        structures: PathBuf,

        /// Skip fetching the robot user-agent list
        #[arg(long)]
        no_robots: bool,
    },

    /// Generate ordered header sets
    Headers {
        /// Directory with the generator data files
        #[arg(short, long)]
        data: PathBuf,

        /// Browsers to sample from (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        browsers: Option<Vec<String>>,

        /// Operating systems to sample from (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        operating_systems: Option<Vec<String>>,

        /// HTTP version, "1" or "2"
        #[arg(long)]
        http_version: Option<String>,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// How many header sets to generate
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Generate a browser fingerprint with matching headers
    Fingerprint {
        /// Directory with the generator data files
        #[arg(short, long)]
        data: PathBuf,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

async fn robot_validator(no_robots: bool) -> RecordValidator {
    if no_robots {
        return RecordValidator::new(Vec::new());
    }
    match fetch_robot_patterns(DEFAULT_ROBOTS_URL).await {
        Ok(patterns) => RecordValidator::new(patterns),
        Err(error) => {
            warn!(%error, "Couldn't fetch the robot user-agent list; validating without it");
            RecordValidator::new(Vec::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::PrepareHeaders {
            dataset,
            structures,
            out,
            no_robots,
        } => {
            let validator = robot_validator(no_robots).await;
            let prepared = prepare_header_files(&dataset, &structures, &out, &validator)
                .context("Failed to prepare header data files")?;

            println!("\n=== Header Preparation Complete ===");
            println!("Records:   {}/{} valid", prepared.valid_records, prepared.total_records);
            println!("Browsers:  {}", prepared.unique_browser_http.len());
            println!("Output:    {:?}", out.join("browser-helper-file.json"));
        }

        Commands::PrepareFingerprints {
            dataset,
            structures,
            no_robots,
        } => {
            let validator = robot_validator(no_robots).await;
            let prepared = prepare_fingerprint_files(&dataset, &structures, &validator)
                .context("Failed to prepare fingerprint records")?;

            println!("\n=== Fingerprint Preparation Complete ===");
            println!("Records:   {}/{} valid", prepared.valid_records, prepared.total_records);
        }

        Commands::Headers {
            data,
            browsers,
            operating_systems,
            http_version,
            seed,
            count,
        } => {
            let options = HeaderGeneratorOptions {
                browsers: browsers
                    .map(|names| names.iter().map(|name| name.as_str().into()).collect::<Vec<BrowserOption>>()),
                operating_systems,
                http_version,
                ..Default::default()
            };
            let mut generator = match seed {
                Some(seed) => HeaderGenerator::with_seed(&options, &data, seed)?,
                None => HeaderGenerator::new(&options, &data)?,
            };

            for index in 0..count {
                if index > 0 {
                    println!();
                }
                let headers = generator.get_headers(None, &HashMap::new(), &[])?;
                for (name, value) in headers {
                    println!("{name}: {value}");
                }
            }
        }

        Commands::Fingerprint { data, seed } => {
            let options = FingerprintGeneratorOptions::default();
            let mut generator = match seed {
                Some(seed) => FingerprintGenerator::with_seed(&options, &data, seed)?,
                None => FingerprintGenerator::new(&options, &data)?,
            };

            let result = generator.get_fingerprint(None, &HashMap::new())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
