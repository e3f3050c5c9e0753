use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use imgdupdetect_core::config::LogLevel;
use imgdupdetect_core::{logging, Config, DupDetector, ScanMode};
use log::{info, warn, LevelFilter};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imgdupdetect")]
#[command(about = "Find visually duplicate images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories and report duplicate images
    Scan {
        /// Directories to scan for duplicate images
        #[arg(required = true)]
        directories: Vec<PathBuf>,

        /// Number of fingerprint workers (0 = one per CPU)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Capacity of the pipeline queues (0 = hand over one at a time)
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Show a progress spinner while storing
        #[arg(long)]
        progress: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Report duplicate groups already recorded in the store
    Duplicates {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Remove every record of the selected collection
    Clear {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print every stored record as tab-separated text
    Dump {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "imgdupdetect.json")]
        path: PathBuf,
    },
}

/// Options shared by every command that opens the store
#[derive(Args)]
struct CommonArgs {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the store database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Digest used to group files
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Collection name, defaults to the mode's name
    #[arg(long)]
    collection: Option<String>,

    /// Write logs to rolling files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Middle row and column pixel fingerprint
    Fingerprint,
    /// Whole-file checksum
    Checksum,
}

impl From<Mode> for ScanMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fingerprint => ScanMode::Fingerprint,
            Mode::Checksum => ScanMode::Checksum,
        }
    }
}

impl CommonArgs {
    /// Load the config file, if any, and apply command line overrides
    fn resolve(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(collection) = &self.collection {
            config.collection = Some(collection.clone());
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }

        // Set log level based on verbosity
        config.log_level = match self.verbose {
            0 => config.log_level,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let level = LevelFilter::from(config.log_level);
    match &config.log_dir {
        Some(dir) => logging::init_logger(dir, level)
            .map_err(|e| anyhow!("failed to initialise file logging: {}", e)),
        None => {
            env_logger::Builder::from_env(
                env_logger::Env::default()
                    .filter_or(logging::LOG_ENV, level.as_str()),
            )
            .init();
            Ok(())
        }
    }
}

fn open(common: &CommonArgs) -> anyhow::Result<DupDetector> {
    let config = common.resolve()?;
    init_logging(&config)?;
    let detector = DupDetector::new(config)?;
    Ok(detector)
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            directories,
            threads,
            queue_capacity,
            progress,
            json,
            common,
        } => {
            let mut config = common.resolve()?;
            if let Some(threads) = threads {
                config.threads = threads;
            }
            if let Some(capacity) = queue_capacity {
                config.queue_capacity = capacity;
            }
            config.show_progress |= progress;
            init_logging(&config)?;

            let detector = DupDetector::new(config)?;
            let token = detector.cancellation_token();
            ctrlc::set_handler(move || {
                warn!("Interrupt received, stopping scan...");
                token.cancel();
            })?;

            info!("Starting duplicate scan...");
            let report = detector.scan(&directories)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let mut out = io::stdout().lock();
                for group in &report.groups {
                    writeln!(out, "{}", group.fingerprint)?;
                    for file in &group.files {
                        writeln!(out, "  {}", file)?;
                    }
                }
                writeln!(out, "{}", report.summary)?;
            }

            if detector.cancellation_token().is_cancelled() {
                warn!("Scan was interrupted; results are partial");
            }
            Ok(())
        }

        Commands::Duplicates { json, common } => {
            let detector = open(&common)?;
            let report = detector.duplicates()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let mut out = io::stdout().lock();
                for group in &report.groups {
                    writeln!(out, "{}", group.fingerprint)?;
                    for file in &group.files {
                        writeln!(out, "  {}", file)?;
                    }
                }
                writeln!(
                    out,
                    "{} fingerprints; {} duplicates found",
                    report.fingerprint_count,
                    report.duplicate_count()
                )?;
            }
            Ok(())
        }

        Commands::Clear { common } => {
            let detector = open(&common)?;
            let removed = detector.clear()?;
            println!(
                "Removed {} files from collection {}",
                removed,
                detector.config().collection_name()
            );
            Ok(())
        }

        Commands::Dump { common } => {
            let detector = open(&common)?;
            let lines = detector.dump(&mut io::stdout().lock())?;
            info!("Dumped {} records", lines);
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
