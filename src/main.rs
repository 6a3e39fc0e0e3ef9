use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use research_catalog::config::Config;
use research_catalog::db::{self, DatasetRepository, UserRepository};
use research_catalog::db::{MemoryDatasetRepository, MemoryUserRepository, PgDatasetRepository, PgUserRepository};
use research_catalog::metrics;
use research_catalog::routers::make_routes;
use research_catalog::state::AppState;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Migrate => {
            let pool = db::init_pool(config.require_database_url()?)
                .await
                .context("connect to database")?;
            db::migrate(&pool).await.context("create schema")?;
            info!("Database schema is up to date");
        }
        Commands::Serve {
            bind,
            media_root,
            in_memory,
        } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(media_root) = media_root {
                config.media_root = media_root;
            }
            serve(config, in_memory).await?;
        }
    }
    Ok(())
}

async fn serve(config: Config, in_memory: bool) -> Result<()> {
    if let Some(addr) = config.metrics_addr {
        metrics::install_exporter(addr)?;
    }

    let (datasets, users): (Arc<dyn DatasetRepository>, Arc<dyn UserRepository>) = if in_memory {
        info!("Using in-memory repositories; nothing is persisted");
        (
            Arc::new(MemoryDatasetRepository::new()),
            Arc::new(MemoryUserRepository::new()),
        )
    } else {
        let pool = db::init_pool(config.require_database_url()?)
            .await
            .context("connect to database")?;
        db::migrate(&pool).await.context("create schema")?;
        (
            Arc::new(PgDatasetRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool)),
        )
    };

    let bind_addr = config.bind_addr;
    let state = AppState::new(datasets, users, config);
    state
        .store
        .init()
        .await
        .with_context(|| format!("create media root {}", state.store.root().display()))?;

    let app = make_routes(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("bind {}", bind_addr))?;
    info!("Research catalog listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
