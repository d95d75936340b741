use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::app_state::AppState;
use crate::db::{self, RedisDb};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Keyed by logical database name.
    pub databases: BTreeMap<&'static str, DatabaseHealth>,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub reachable: bool,
    pub latency_ms: Option<u64>,
}

async fn ping_database(database: RedisDb, client: &redis::Client) -> DatabaseHealth {
    let start = Instant::now();
    match db::ping(client).await {
        Ok(()) => DatabaseHealth {
            reachable: true,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(database = database.name(), error = %e, "Redis ping failed");
            DatabaseHealth {
                reachable: false,
                latency_ms: None,
            }
        }
    }
}

/// GET /health: Connectivity of every Redis database the service uses.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut databases = BTreeMap::new();
    for (database, client) in &state.redis {
        databases.insert(database.name(), ping_database(*database, client).await);
    }

    let (code, status) = if databases.values().all(|d| d.reachable) {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            databases,
        }),
    )
}
