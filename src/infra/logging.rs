//! Stderr tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt};

/// Env var holding an explicit filter directive
pub const LOG_ENV: &str = "PGATE_LOG";

/// Pick the filter directive: env var, then `-v` count, then config level.
pub fn filter_directive(
    env: Option<&str>,
    verbose: u8,
    config_level: &str,
) -> String
{
    if let Some(directive) = env.filter(|d| !d.trim().is_empty())
    {
        return directive.to_string();
    }
    match verbose
    {
        0 if config_level
            .trim()
            .is_empty() =>
        {
            "warn".to_string()
        }
        0 => config_level.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber; a second call is a no-op.
pub fn init(
    verbose: u8,
    config_level: &str,
    ansi: bool,
)
{
    let env = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env.as_deref(), verbose, config_level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid log filter '{}', using 'warn'", directive);
        EnvFilter::new("warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn precedence_env_then_verbosity_then_config()
    {
        assert_eq!(filter_directive(Some("patchgate=trace"), 2, "info"), "patchgate=trace");
        assert_eq!(filter_directive(Some("  "), 1, "info"), "debug");
        assert_eq!(filter_directive(None, 3, "info"), "trace");
        assert_eq!(filter_directive(None, 0, "info"), "info");
        assert_eq!(filter_directive(None, 0, ""), "warn");
    }
}
