use std::env;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// `--log-level` wins, then `CHUNKSUM_LOG`, then `RUST_LOG`.
fn filter_directive(cli_level: Option<&str>) -> String {
    cli_level
        .map(str::to_string)
        .or_else(|| non_empty_var("CHUNKSUM_LOG"))
        .or_else(|| non_empty_var("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
pub fn init(cli_level: Option<&str>) {
    let directive = filter_directive(cli_level);
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
