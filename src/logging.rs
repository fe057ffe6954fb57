//! File logging through `log4rs`.
//!
//! The terminal is owned by the UI, so nothing may be written to stdout or
//! stderr while it runs.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::config::LoggingConfig;

pub const LOG4RS_FILE: &str = "config/log4rs.yaml";
const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l:<5} {t} - {m}{n}";

/// Installs the global logger. A `config/log4rs.yaml` file takes precedence
/// over the `[logging]` section.
pub fn init(settings: &LoggingConfig) -> Result<()> {
    let yaml = Path::new(LOG4RS_FILE);
    if yaml.exists() {
        log4rs::init_file(yaml, Default::default())
            .map_err(|err| anyhow!("Failed to load {}: {}", yaml.display(), err))?;
        return Ok(());
    }
    let config = build_config(settings)?;
    log4rs::init_config(config).context("Failed to install logger")?;
    Ok(())
}

fn build_config(settings: &LoggingConfig) -> Result<Config> {
    let level: LevelFilter = settings
        .level
        .parse()
        .with_context(|| format!("Unknown log level '{}'", settings.level))?;

    // Rolled files are gzip-compressed because the pattern ends in `.gz`.
    let archive_pattern = format!("{}.{{}}.gz", settings.file.display());
    let roller = FixedWindowRoller::builder()
        .build(&archive_pattern, settings.archives)
        .map_err(|err| anyhow!("Failed to build log roller: {}", err))?;
    let trigger = SizeTrigger::new(settings.max_size_kb.saturating_mul(1024));
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(&settings.file, Box::new(policy))
        .with_context(|| format!("Failed to open log file {}", settings.file.display()))?;

    Config::builder()
        .appender(Appender::builder().build("file", Box::new(appender)))
        .build(Root::builder().appender("file").build(level))
        .context("Invalid logger configuration")
}
