use colored::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Step,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Step => "STEP",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    fn color(self) -> Color {
        match self {
            LogLevel::Step => Color::Magenta,
            LogLevel::Info => Color::Cyan,
            LogLevel::Success => Color::Green,
            LogLevel::Warning => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }
}

const ALL_LEVELS: [LogLevel; 5] = [
    LogLevel::Step,
    LogLevel::Info,
    LogLevel::Success,
    LogLevel::Warning,
    LogLevel::Error,
];

// "[ LABEL ]" plus one column of padding, sized to the widest label.
static PREFIX_WIDTH: Lazy<usize> = Lazy::new(|| {
    ALL_LEVELS
        .iter()
        .map(|l| l.label().len())
        .max()
        .unwrap_or(7)
        + 5
});

static LOG_PREFIXES: Lazy<HashMap<LogLevel, String>> = Lazy::new(|| {
    colored::control::set_override(true);

    ALL_LEVELS
        .iter()
        .map(|level| {
            let label = level.label();
            let padding = PREFIX_WIDTH.saturating_sub(label.len() + 4);
            let colored_label = format!(" {} ", label).color(level.color()).bold();
            (*level, format!("[{}]{}", colored_label, " ".repeat(padding)))
        })
        .collect()
});

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }

    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_level(false)
        .with_target(false)
        .compact();

    tracing_subscriber::fmt()
        .event_format(format)
        .with_ansi(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

pub fn log(level: LogLevel, message: &str) {
    let prefix = LOG_PREFIXES
        .get(&level)
        .cloned()
        .unwrap_or_else(|| format!("[{:<7}] ", level.label()));

    match level {
        LogLevel::Step => tracing::info!(target: "step", "{}{}", prefix, message),
        LogLevel::Info | LogLevel::Success => tracing::info!("{}{}", prefix, message),
        LogLevel::Warning => tracing::warn!("{}{}", prefix, message),
        LogLevel::Error => tracing::error!("{}{}", prefix, message),
    }
}

/// One event per failed attempt, with the retry decision as structured fields.
pub fn log_retry(target: &str, attempt: u32, max_retries: u32, delay: Duration, reason: &str) {
    let prefix = LOG_PREFIXES
        .get(&LogLevel::Warning)
        .cloned()
        .unwrap_or_default();
    tracing::warn!(
        target: "fetch",
        fetch_target = target,
        attempt = attempt + 1,
        max_retries,
        delay_ms = delay.as_millis() as u64,
        reason,
        "{}{}: retry #{}/{} in {:.1}s ({})",
        prefix,
        target,
        attempt + 1,
        max_retries,
        delay.as_secs_f32(),
        reason
    );
}

pub fn log_exhausted(target: &str, attempts: u32, reason: &str) {
    let prefix = LOG_PREFIXES
        .get(&LogLevel::Error)
        .cloned()
        .unwrap_or_default();
    tracing::error!(
        target: "fetch",
        fetch_target = target,
        attempts,
        reason,
        "{}{}: giving up after {} attempt(s) ({})",
        prefix,
        target,
        attempts,
        reason
    );
}
