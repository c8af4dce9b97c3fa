use std::{fs::OpenOptions, path::Path, sync::Mutex, time::Duration};

use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

use crate::{
    agent::Agent,
    config::CanyonConfig,
    error::{CanyonError, Result},
    llm::Provider,
    tools::{ToolContext, ToolSet},
};

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod store;
pub mod tools;

/// Installs the fmt subscriber on stderr. `RUST_LOG` overrides `default_level`.
/// With `log_file` set, every debug-level event is also appended to that file.
pub fn init_logging(default_level: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CanyonError::io(format!("opening log file {}", path.display()), e))?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_filter(LevelFilter::DEBUG);
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CanyonError::InvalidState(format!("logging already initialised: {e}")))
}

pub fn open_tool_context(config: &CanyonConfig) -> Result<ToolContext> {
    ToolContext::open(&config.data, &config.agent)
}

/// Opens the stores and the configured model backend.
pub fn build_agent(config: &CanyonConfig) -> Result<Agent<Provider>> {
    let context = open_tool_context(config)?;
    let model = Provider::from_config(&config.model)?;
    info!(
        provider = config.model.provider.as_str(),
        model = %config.model.model,
        db_path = %config.data.db_path().display(),
        max_tool_rounds = config.agent.max_tool_rounds,
        "agent_ready"
    );
    Ok(Agent::new(model, ToolSet::new(context), config.agent.clone()))
}

pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let millis = d.subsec_millis();
    let mins = total_secs / 60;
    let secs = total_secs % 60;

    if mins > 0 {
        format!("{mins}m {secs}s {millis}ms")
    } else if secs > 0 {
        format!("{secs}s {millis}ms")
    } else {
        format!("{millis}ms")
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_the_largest_unit() {
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(3_250)), "3s 250ms");
        assert_eq!(format_duration(Duration::from_millis(125_007)), "2m 5s 7ms");
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
    }
}
