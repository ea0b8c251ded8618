//! Structured logging selected from the environment.

use pilot_adapters::{JsonLogger, LogSink, StderrLogSink};
use pilot_ports::{LogFields, LogLevel, LoggerPort, log_fields};
use pilot_shared::RequestContext;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `json` enables the JSON logger; anything else leaves logging off.
pub const LOG_FORMAT_ENV: &str = "PILOT_LOG_FORMAT";
/// Minimum level: `debug`, `info` (default), `warn`, `error`.
pub const LOG_LEVEL_ENV: &str = "PILOT_LOG_LEVEL";

/// Logger configured from the process environment.
#[must_use]
pub fn logger_from_env() -> Option<Arc<dyn LoggerPort>> {
    let env: BTreeMap<String, String> = [LOG_FORMAT_ENV, LOG_LEVEL_ENV]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_owned(), value)))
        .collect();
    logger_from_map(&env, Arc::new(StderrLogSink))
}

/// Logger configured from `env`, writing to `sink`.
#[must_use]
pub fn logger_from_map(
    env: &BTreeMap<String, String>,
    sink: Arc<dyn LogSink>,
) -> Option<Arc<dyn LoggerPort>> {
    let json = env
        .get(LOG_FORMAT_ENV)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("json"));
    if !json {
        return None;
    }
    let level = env
        .get(LOG_LEVEL_ENV)
        .and_then(|value| LogLevel::parse(value.trim()))
        .unwrap_or(LogLevel::Info);
    Some(Arc::new(JsonLogger::new(sink).with_min_level(level)))
}

/// Child logger tagged with the request's correlation id.
#[must_use]
pub fn scope_logger(
    logger: Option<&Arc<dyn LoggerPort>>,
    ctx: &RequestContext,
) -> Option<Arc<dyn LoggerPort>> {
    let logger = logger?;
    let fields: LogFields = log_fields! { "correlationId" => ctx.correlation_id().as_str() };
    Some(Arc::from(logger.child(fields)))
}
