//! CLI subcommand implementations for the quarry binary.

pub mod extract_cmd;
pub mod serve_cmd;

/// Initialize the global tracing subscriber.
///
/// Serve mode always calls this; one-shot extraction only with
/// `--verbose`, so pretty output stays clean.
pub fn init_tracing(verbose: bool) {
    let directive = if verbose { "quarry=debug" } else { "quarry=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .init();
}
