pub mod api;
pub mod config;
pub mod error;
pub mod pagination;
pub mod period;
pub mod schema;
pub mod time_range;
pub mod utils;
pub mod db {
    #[cfg(test)]
    pub mod memory;
    pub mod models;
    pub mod store;
}
pub mod services {
    pub mod ingest;
    pub mod query;
    pub mod summary;
}

use crate::api::AppState;
use crate::config::Config;
use diesel::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::{error, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Applying database migrations failed: {}", e))?;
    if applied.is_empty() {
        info!("Database schema is up to date");
    } else {
        let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        info!("Applied {} database migration(s): {}", applied.len(), names);
    }
    Ok(())
}

pub fn run() -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (listen={}, pool_size={}, per_page={}, raw_max={}, summary_max={})",
        cfg.listen_addr,
        cfg.db_pool_size,
        cfg.page_limits.default_per_page,
        cfg.page_limits.raw_max_per_page,
        cfg.page_limits.summary_max_per_page
    );

    let pool = db::store::build_pool(&cfg.database_url, cfg.db_pool_size)?;
    {
        let mut conn = pool.get().map_err(|e| format!("DB connection failed: {}", e))?;
        info!("Connected to database");
        apply_database_migrations(&mut conn)?;
    }

    let state = AppState {
        pool,
        api_token: cfg.api_token,
        page_limits: cfg.page_limits,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Tokio runtime setup failed: {}", e))?;
    runtime.block_on(api::serve(cfg.listen_addr, state))?;
    info!("Server stopped");
    Ok(())
}

fn main() {
    let loaded_env = match config::load_env_from_args(std::env::args().skip(1)) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // After the env file so RUST_LOG from .env is honoured.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(source) = loaded_env.as_ref() {
        let origin = if source.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, source.path.display());
    }

    info!(
        "sensei-server {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
