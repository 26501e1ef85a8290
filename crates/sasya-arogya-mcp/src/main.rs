//! Sasya Arogya tool server: entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use sasya_arogya_mcp::config::{dispatcher_from, load_reference, resolve_data_source};
use sasya_arogya_mcp::transport::StdioTransport;
use sasya_arogya_mcp::SERVER_NAME;

#[derive(Parser)]
#[command(
    name = "sasya-arogya-mcp",
    about = "Tool server for Sasya Arogya: crop insurance tools over stdio and HTTP",
    version
)]
struct Cli {
    /// Directory holding crop_premiums.json and insurance_companies.json.
    /// Also reads from SASYA_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the line channel over stdio (default).
    Serve,

    /// Serve over HTTP with SSE streaming.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port). Also reads from SASYA_HTTP_ADDR.
        #[arg(long)]
        addr: Option<String>,

        /// Deadline per invocation in seconds; 0 disables it.
        /// Also reads from SASYA_TIMEOUT_SECS.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Maximum concurrently executing tool requests.
        #[arg(long, default_value_t = sasya_arogya_mcp::transport::http::DEFAULT_MAX_CONCURRENT)]
        max_concurrent: usize,

        /// Capacity of each stream's event buffer.
        #[arg(long, default_value_t = sasya_arogya_mcp::protocol::DEFAULT_STREAM_BUFFER)]
        stream_buffer: usize,
    },

    /// Print server name, version and tools as JSON.
    Info,

    /// Load the reference tables and report row counts.
    Validate,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   sasya-arogya-mcp completions bash > ~/.local/share/bash-completion/completions/sasya-arogya-mcp
    ///   sasya-arogya-mcp completions zsh > ~/.zfunc/_sasya-arogya-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // stdout belongs to the line channel.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = cli.data_dir.as_deref();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let dispatcher = dispatcher_from(data_dir)?;
            StdioTransport::new(dispatcher).run().await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp {
            addr,
            timeout_secs,
            max_concurrent,
            stream_buffer,
        } => {
            use sasya_arogya_mcp::config::{resolve_http_addr, resolve_timeout};
            use sasya_arogya_mcp::transport::{HttpConfig, HttpTransport};

            let addr = resolve_http_addr(addr.as_deref());
            let config = HttpConfig {
                timeout: resolve_timeout(timeout_secs)?,
                max_concurrent,
                stream_buffer,
            };
            tracing::info!("{SERVER_NAME} v{}", env!("CARGO_PKG_VERSION"));
            if let Some(timeout) = config.timeout {
                tracing::info!("Invocation timeout: {}s", timeout.as_secs());
            }

            let dispatcher = dispatcher_from(data_dir)?;
            HttpTransport::new(dispatcher, config).run(&addr).await?;
        }

        Commands::Info => {
            let dispatcher = dispatcher_from(data_dir)?;
            let registry = dispatcher.registry();
            let info = serde_json::json!({
                "server": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "tools": registry.names().collect::<Vec<_>>(),
                "tool_count": registry.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Validate => {
            let source = resolve_data_source(data_dir);
            match load_reference(&source) {
                Ok(tables) => {
                    println!("Valid reference data: {source}");
                    println!("  Crop rows: {}", tables.crop_count());
                    println!("  Insurers:  {}", tables.company_count());
                }
                Err(e) => {
                    eprintln!("Invalid reference data in {source}: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sasya-arogya-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let dispatcher = dispatcher_from(data_dir)?;
            let handle = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || sasya_arogya_mcp::repl::run(dispatcher, handle))
                .await??;
        }
    }

    Ok(())
}
