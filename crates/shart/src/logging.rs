//! Stderr diagnostics. Stdout carries decoded packets only.

use clap::ValueEnum;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `RUST_LOG` directives, when present, take precedence over `--log-level`.
fn build_filter(level: LogLevel, directives: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::from(level).into());
    match directives.map(str::trim) {
        Some(directives) if !directives.is_empty() => builder.parse_lossy(directives),
        _ => builder.parse_lossy(""),
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let directives = std::env::var("RUST_LOG").ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, directives.as_deref()))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().flatten_event(true).try_init();
        }
    }
}
