//! Tierlock Server
//!
//! HTTP service for entitlement checks, link resolution, view counting and
//! moderation intake.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use tierlock_core::config::{self, AnonymousViewPolicy};
use tierlock_core::tracing_init::init_tracing;

use tierlock_server::auth::JwtManager;
use tierlock_server::intake::ModerationIntake;
use tierlock_server::ledger::EngagementLedger;
use tierlock_server::routes::{AppState, build_router};
use tierlock_server::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "tierlock-server")]
#[command(
    version,
    about = "Tierlock server - entitlement, link resolution and engagement ledger"
)]
struct Args {
    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret used to verify bearer tokens.
    #[arg(
        long,
        env = "TIERLOCK_JWT_SECRET",
        default_value = "dev-secret-change-me"
    )]
    jwt_secret: String,

    /// Lifetime of tokens issued by this secret, in seconds.
    #[arg(long, default_value_t = 3600)]
    token_ttl: i64,

    /// Deadline for ledger and intake writes, in milliseconds (overrides config).
    #[arg(long)]
    storage_timeout_ms: Option<u64>,

    /// Whether anonymous views are counted: `reject` or `per_session`
    /// (overrides config).
    #[arg(long)]
    anonymous_views: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cwd = std::env::current_dir()?;
    let mut config = config::load_config(Some(&cwd))?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr.to_string();
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if let Some(ms) = args.storage_timeout_ms {
        config.server.storage_timeout_ms = ms;
    }
    if let Some(policy) = &args.anonymous_views {
        config.engagement.anonymous_views = policy.parse()?;
    }

    init_tracing(&config.server.log_level, args.log_json)?;

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    let anonymous = config.engagement.anonymous_views;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        anonymous_views = ?anonymous,
        storage_timeout_ms = config.server.storage_timeout_ms,
        log_level = %config.server.log_level,
        "Starting tierlock-server"
    );
    if anonymous == AnonymousViewPolicy::PerSession {
        info!("Anonymous views are counted per session; dedup is per session, not per account");
    }

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => config::default_database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine data directory"))?,
    };
    info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).await?;

    let timeout = config.server.storage_timeout();
    let state = AppState {
        jwt: Arc::new(JwtManager::new(args.jwt_secret.as_bytes(), args.token_ttl)),
        ledger: EngagementLedger::new(db.clone(), timeout, anonymous),
        intake: ModerationIntake::new(db.clone(), timeout),
        db,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Server stopped");
    Ok(())
}
