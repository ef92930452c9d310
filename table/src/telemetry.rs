use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::Level;

pub fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).with_context(|| format!("Invalid log level {level:?}"))
}

/// Install the global fmt subscriber. JSON output is meant for log shippers.
pub fn init_tracing(level: Level, json: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_levels() {
        assert_eq!(parse_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" warn ").unwrap(), Level::WARN);
        assert_eq!(parse_level("trace").unwrap(), Level::TRACE);
    }

    #[test]
    fn test_rejects_unknown_level() {
        let err = parse_level("loud").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }
}
