use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::Append;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::api::config::DagConfig;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {level} [{thread}] {target} - {m}{n}";
const LOG_FILE_NAME: &str = "dagflow.log";

/// init log4rs
/// console appender without `log_dir`, rolling file `{log_dir}/dagflow.log` otherwise
/// level value: ["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"], ignore ascii case
pub fn init_log(config: &DagConfig) -> anyhow::Result<()> {
    let log4rs_config = build_log_config(config)?;
    log4rs::init_config(log4rs_config).map_err(|e| anyhow!("init log4rs error. {}", e))?;
    Ok(())
}

fn build_log_config(config: &DagConfig) -> anyhow::Result<Config> {
    let default_level = LevelFilter::from_str(config.log_level.as_str())
        .map_err(|_e| anyhow!("can not parse log level `{}`", config.log_level))?;

    let encoder = PatternEncoder::new(LOG_PATTERN);

    let (name, appender) = match &config.log_dir {
        Some(log_dir) => (
            "rolling_file",
            create_rolling_file_appender(PathBuf::from(log_dir), encoder)?,
        ),
        None => ("console", create_console_appender(encoder)),
    };

    Config::builder()
        .appender(Appender::builder().build(name, appender))
        .build(Root::builder().appender(name).build(default_level))
        .map_err(|e| anyhow!("build log config error. {}", e))
}

fn create_console_appender(encoder: PatternEncoder) -> Box<dyn Append> {
    let stdout = ConsoleAppender::builder()
        .target(Target::Stdout)
        .encoder(Box::new(encoder))
        .build();
    Box::new(stdout)
}

fn create_rolling_file_appender(
    log_dir: PathBuf,
    encoder: PatternEncoder,
) -> anyhow::Result<Box<dyn Append>> {
    let path = log_dir.join(LOG_FILE_NAME);
    let roll_path = format!("{}.{{}}", path.to_string_lossy());

    let trigger = SizeTrigger::new(50 * 1024 * 1024);

    let roll = FixedWindowRoller::builder()
        .base(1)
        .build(roll_path.as_str(), 20)
        .map_err(|e| anyhow!("log roll error. {}", e))?;

    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roll));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(encoder))
        .append(true)
        .build(path, Box::new(policy))?;
    Ok(Box::new(rolling_file))
}

#[cfg(test)]
mod tests {
    use crate::api::config::DagConfig;
    use crate::runtime::logger::build_log_config;

    #[test]
    pub fn build_log_config_test() {
        let mut config = DagConfig::default();
        config.log_level = "debug".to_string();
        let log_config = build_log_config(&config).unwrap();
        assert_eq!(log_config.appenders().len(), 1);
        assert_eq!(log_config.appenders()[0].name(), "console");

        config.log_level = "verbose".to_string();
        assert!(build_log_config(&config).is_err());

        let dir = std::env::temp_dir().join(format!("dagflow-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        config.log_level = "INFO".to_string();
        config.log_dir = Some(dir.to_string_lossy().to_string());
        let log_config = build_log_config(&config).unwrap();
        assert_eq!(log_config.appenders()[0].name(), "rolling_file");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
