// Copyright 2026 Quarry Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use quarry::cli;
use quarry::cli::extract_cmd::ExtractOpts;
use quarry::cli::serve_cmd::ServeOpts;
use quarry::config::DEFAULT_TIMEOUT_MS;

#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Extract rendered web page content with full JavaScript support",
    version,
    args_conflicts_with_subcommands = true,
    after_help = "Run 'quarry <command> --help' for details on each command.\nRunning 'quarry URL...' is shorthand for 'quarry extract URL...'."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Bare-URL shorthand for `extract`
    #[command(flatten)]
    extract: ExtractArgs,
}

#[derive(Args)]
struct ExtractArgs {
    /// URLs to extract
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Page load timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout: u64,

    /// User-Agent override
    #[arg(long)]
    user_agent: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Print rendered HTML instead of plain text
    #[arg(long)]
    html: bool,

    /// Force PDF extraction
    #[arg(long)]
    pdf: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot URL extraction
    Extract(ExtractArgs),
    /// Run as an HTTP extraction server
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 8766)]
        port: u16,
        /// Page load timeout in milliseconds
        #[arg(long, env = "TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout: u64,
        /// User-Agent override
        #[arg(long, env = "USER_AGENT")]
        user_agent: Option<String>,
        /// Require this Bearer token on every request except /health
        #[arg(long, env = "API_KEY")]
        api_key: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Extract(args)) => run_extract(args, cli.verbose).await,
        Some(Commands::Serve {
            host,
            port,
            timeout,
            user_agent,
            api_key,
        }) => {
            cli::serve_cmd::run(
                ServeOpts {
                    host,
                    port,
                    timeout_ms: timeout,
                    user_agent: user_agent.filter(|ua| !ua.is_empty()),
                    api_key,
                },
                cli.verbose,
            )
            .await
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "quarry", &mut std::io::stdout());
            Ok(())
        }
        // Bare-URL invocation: `quarry https://example.com`
        None if !cli.extract.urls.is_empty() => run_extract(cli.extract, cli.verbose).await,
        None => {
            Cli::command().print_help()?;
            std::process::exit(1);
        }
    };

    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    result
}

async fn run_extract(args: ExtractArgs, verbose: bool) -> Result<()> {
    if verbose {
        cli::init_tracing(true);
    }
    cli::extract_cmd::run(ExtractOpts {
        urls: args.urls,
        timeout_ms: args.timeout,
        user_agent: args.user_agent,
        json: args.json,
        html: args.html,
        pdf: args.pdf,
    })
    .await
}
