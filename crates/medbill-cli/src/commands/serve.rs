//! Serve command - run the extraction HTTP service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use tracing::info;

use medbill_core::{DocumentFetcher, Extractor};

use super::{build_acquirer, load_config, ExtractionOverrides};
use crate::server::{self, AppState};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (default from config, 0.0.0.0:8000)
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory served under /static
    #[arg(long)]
    static_dir: Option<PathBuf>,

    #[command(flatten)]
    overrides: ExtractionOverrides,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    args.overrides.apply(&mut config);
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = dir;
    }

    let extractor = Extractor::from_config(&config)?;
    let state = Arc::new(AppState {
        acquirer: Arc::new(build_acquirer(&config)?),
        extractor,
        fetcher: DocumentFetcher::new(Duration::from_secs(config.server.fetch_timeout_secs))?,
    });

    info!(
        "Serving with {} extractor, static files from {}",
        state.extractor.name(),
        config.server.static_dir.display()
    );

    let app = server::router(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    println!(
        "{} Listening on http://{}",
        style("✓").green(),
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;

    Ok(())
}
