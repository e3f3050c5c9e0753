use log::{error, info, warn, LevelFilter};
use std::path::Path;

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Environment variable that overrides the configured file log level
pub const LOG_ENV: &str = "IMGDUPDETECT_LOG";

/// Size at which the active log file is rolled
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// Number of archived log files kept
const ARCHIVE_COUNT: u32 = 5;

/// Initialize the logger with timestamp, log level, and module path.
///
/// Logs are written to `<log_dir>/imgdupdetect.log` only, so they never
/// interfere with progress output on the terminal.
pub fn init_logger(log_dir: &Path, level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let log_file_path = log_dir.join("imgdupdetect.log");
    let archived_logs_pattern = log_dir.join("imgdupdetect.{}.log");

    let file_trigger = SizeTrigger::new(ROLL_SIZE);
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern.to_string_lossy(), ARCHIVE_COUNT)
        .map_err(|e| format!("Failed to create log roller: {}", e))?;
    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{T}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file_path, Box::new(compound_policy))
        .map_err(|e| format!("Failed to create log appender: {}", e))?;

    let level = level_from_env().unwrap_or(level);
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| format!("Failed to build log config: {}", e))?;

    log4rs::init_config(config).map_err(|e| format!("Failed to initialize log4rs: {}", e))?;

    info!("imgdupdetect started");
    info!("Logging to file: {}", log_file_path.display());
    Ok(())
}

/// Level named by `IMGDUPDETECT_LOG`, if set and valid
pub fn level_from_env() -> Option<LevelFilter> {
    std::env::var(LOG_ENV).ok()?.parse().ok()
}

/// Log file operation that failed
pub fn log_file_error(path: &Path, operation: &str, error: &dyn std::error::Error) {
    error!(
        "File operation failed - Operation: {}, Path: {}, Error: {}",
        operation,
        path.display(),
        error
    );
}

/// Log fingerprint computation error
pub fn log_fingerprint_error(path: &Path, error: &dyn std::error::Error) {
    error!(
        "Fingerprint computation failed - Path: {}, Error: {}",
        path.display(),
        error
    );
}

/// Log a store write that was dropped
pub fn log_store_error(collection: &str, filename: &str, error: &dyn std::error::Error) {
    warn!(
        "Store write failed - Collection: {}, File: {}, Error: {}",
        collection, filename, error
    );
}
