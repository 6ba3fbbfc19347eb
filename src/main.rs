mod app;
mod service;
mod theme;
mod ui;

use std::{env, sync::Arc};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::service::AlgoliaService;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let api: Arc<dyn service::SearchApi> = Arc::new(AlgoliaService::new());
    let terminal = ratatui::init();
    let result = App::new(api).run(terminal).await;
    ratatui::restore();
    return result;
}

// Stdout belongs to the terminal UI, so logs only go to a file when one is
// configured through SPYHOPPER_LOG_FILE.
fn init_tracing() -> Result<()> {
    let path = match env::var("SPYHOPPER_LOG_FILE") {
        Ok(path) => path,
        Err(_) => return Ok(()),
    };
    let file = std::fs::File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
