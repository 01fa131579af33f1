//! Health check.

use std::sync::Arc;

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::database::connection::health_check;
use crate::errors::{ApiResponse, ApiResult};
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub uptime_secs: u64,
    pub database: DatabaseHealth,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub pool_size: u32,
    pub response_time_ms: f64,
}

/// Public liveness probe. A failing database degrades the status, it never errors.
pub async fn get_health_status(State(state): State<Arc<AppState>>) -> ApiResult<HealthStatus> {
    let start = std::time::Instant::now();

    let database = match health_check(&state.db).await {
        Ok(()) => DatabaseHealth {
            status: "healthy".to_string(),
            pool_size: state.db.size(),
            response_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        },
        Err(e) => {
            tracing::error!(target: "HEALTH_CHECK", error = %e, "database health check failed");
            DatabaseHealth {
                status: "unhealthy".to_string(),
                pool_size: 0,
                response_time_ms: 0.0,
            }
        }
    };

    let status = if database.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Ok(ApiResponse::ok(HealthStatus {
        status: status.to_string(),
        version: state.config.version.clone(),
        environment: state.config.environment.as_str().to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        database,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
