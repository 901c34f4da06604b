//! vhostd: serves directory trees per host name.
//!
//! ```text
//!     Client Request
//!         → http server (request ID, trace span, timeout)
//!         → Domain     (first subdomain label, "*" fallback)
//!         → Subdomain  (deeper labels, optional)
//!         → Static     (pre-filters, hidden check, stat)
//!              directory → index file or listing
//!              file      → extension handler (Cached / Dynamic) or raw stream
//!         → response sender (content type, gzip/deflate)
//! ```

use std::path::PathBuf;

use clap::Parser;

use vhost_dispatch::lifecycle::{startup, Overrides};

#[derive(Parser)]
#[command(name = "vhostd")]
#[command(about = "Host-routed static file server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Serve this directory for every host.
    #[arg(short, long)]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = startup::resolve_config(&Overrides {
        config: cli.config,
        bind: cli.bind,
        root: cli.root,
    })?;

    let _logging = startup::init_logging(&config)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        sites = config.domains.len(),
        "vhostd starting"
    );

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Server failed");
        return Err(e.into());
    }
    Ok(())
}
