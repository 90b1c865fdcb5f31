//! Placeholder HTTP services. Every ORM package ships one; each answers
//! `GET /` with a fixed greeting and nothing else.

pub mod error;

use axum::routing::get;
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use tower_http::trace::TraceLayer;

pub use error::{Result, ServiceError};

/// Identity and port defaults for one service binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceProfile {
    /// Used in the startup log line.
    pub name: &'static str,
    pub greeting: &'static str,
    pub port_env: &'static str,
    pub default_port: u16,
}

impl ServiceProfile {
    pub const ROOT: ServiceProfile = ServiceProfile {
        name: "Server",
        greeting: "Hello World",
        port_env: "SERVICE_PORT",
        default_port: 3000,
    };

    pub const PRISMA: ServiceProfile = ServiceProfile {
        name: "Prisma service",
        greeting: "Prisma Service",
        port_env: "SERVICE_PORT_PRISMA",
        default_port: 3001,
    };

    pub const TYPEORM: ServiceProfile = ServiceProfile {
        name: "TypeORM service",
        greeting: "TypeORM Service",
        port_env: "SERVICE_PORT_TYPEORM",
        default_port: 3002,
    };

    pub const SEQUELIZE: ServiceProfile = ServiceProfile {
        name: "Sequelize service",
        greeting: "Sequelize Service",
        port_env: "SERVICE_PORT_SEQUELIZE",
        default_port: 3003,
    };

    pub const DRIZZLE: ServiceProfile = ServiceProfile {
        name: "Drizzle service",
        greeting: "Drizzle Service",
        port_env: "SERVICE_PORT_DRIZZLE",
        default_port: 4004,
    };
}

/// Port from the profile's environment variable. Unset, unparsable and
/// zero values all fall back to the profile default.
pub fn resolve_port(profile: &ServiceProfile, lookup: impl Fn(&str) -> Option<String>) -> u16 {
    match lookup(profile.port_env) {
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                tracing::warn!(
                    var = profile.port_env,
                    value = %raw,
                    default = profile.default_port,
                    "ignoring invalid port"
                );
                profile.default_port
            }
        },
        None => profile.default_port,
    }
}

/// Build the axum Router for one service.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(profile: &ServiceProfile) -> Router {
    let greeting = profile.greeting;
    Router::new()
        .route("/", get(move || async move { greeting }))
        .layer(TraceLayer::new_for_http())
}

/// Serve `profile` on a pre-bound listener until SIGINT or SIGTERM.
pub async fn serve_on(profile: &ServiceProfile, listener: tokio::net::TcpListener) -> Result<()> {
    let app = build_router(profile);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("{} stopped", profile.name);
    Ok(())
}

/// Entry point shared by every service binary.
pub fn run(profile: ServiceProfile) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let result = tokio::runtime::Runtime::new()
        .map_err(ServiceError::from)
        .and_then(|rt| rt.block_on(start(profile)));
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn start(profile: ServiceProfile) -> Result<()> {
    let port = resolve_port(&profile, |key| std::env::var(key).ok());
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind { addr, source })?;

    let local = listener.local_addr()?;
    tracing::info!("{} is running on http://{local}", profile.name);

    serve_on(&profile, listener).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
