// src/db/mod.rs

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

pub async fn connect(cfg: &Config) -> anyhow::Result<Pool<Postgres>> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(max_connections = cfg.db_max_connections, "connected to PostgreSQL");
    Ok(pool)
}
