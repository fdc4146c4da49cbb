use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};

pub fn init_tracing() {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
}

/// Opens a private in-memory SQLite database with all migrations applied.
///
/// A single pooled connection keeps every query on the same in-memory database.
#[allow(dead_code)]
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    init_tracing();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[allow(dead_code)]
pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    init_tracing();
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

#[allow(dead_code)]
pub async fn setup_postgres_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
