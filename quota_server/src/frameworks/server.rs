// Framework bootstrap for the quota service runtime.

use crate::frameworks::{config, db};
use crate::interface_adapters::generators::{FallbackGenerator, TemplateGenerator, UpstreamGenerator};
use crate::interface_adapters::routes;
use crate::interface_adapters::state::{
    AppState, InMemoryUsageStore, PostgresUsageStore, StaticMemberTokens, UsageBackend,
};

use std::io::Result;
use std::net::SocketAddr;

fn init_runtime() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let state = build_state().await?;
    serve(listener, state).await
}

// Serves an already-built state; callers own every backend choice.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    let address = listener.local_addr()?;
    let app = routes::app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking.
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<AppState> {
    let usage = match config::database_url() {
        Some(database_url) => {
            let pool = db::connect_pool(&database_url).await.map_err(|e| {
                tracing::error!(error = %e, "failed to connect to database");
                std::io::Error::other(format!("failed to connect to database: {e}"))
            })?;
            db::run_migrations(&pool).await.map_err(|e| {
                tracing::error!(error = %e, "failed to run migrations");
                std::io::Error::other(format!("failed to run migrations: {e}"))
            })?;
            tracing::info!("usage counters stored in postgres");
            UsageBackend::Postgres(PostgresUsageStore { db: pool })
        }
        None => {
            tracing::warn!("DATABASE_URL not set; usage counters are kept in memory");
            UsageBackend::Memory(InMemoryUsageStore::default())
        }
    };

    let primary = match config::upstream_generator_url() {
        Some(base_url) => {
            let timeout = config::upstream_generator_timeout();
            let client = UpstreamGenerator::new(base_url.clone(), timeout).map_err(|e| {
                std::io::Error::other(format!("failed to initialize upstream generator: {e}"))
            })?;
            tracing::debug!(
                upstream_url = %base_url,
                timeout_ms = timeout.as_millis(),
                "upstream generator configured"
            );
            Some(client)
        }
        None => {
            tracing::info!("no upstream generator configured; serving template output");
            None
        }
    };

    let members = StaticMemberTokens::new(config::member_access_tokens());
    if members.is_empty() {
        tracing::warn!("MEMBER_ACCESS_TOKENS not set; member requests will be rejected");
    }

    Ok(AppState {
        usage,
        generator: FallbackGenerator {
            primary,
            fallback: TemplateGenerator,
        },
        members,
    })
}
