use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: String,
    pub slot_interval_minutes: u32,
    pub buffer_minutes: u32,
    pub booking_horizon_days: u32,
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Appointly API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Appointment scheduling and booking engine for service marketplaces",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "api": "/api",
            "public": "/public"
        }
    }))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query("SELECT 1").execute(&state.service_context.db_pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check database ping failed: {}", e);
            "unavailable"
        }
    };

    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(json!({
        "status": if database == "ok" { "healthy" } else { "degraded" },
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn api_info(State(state): State<AppState>) -> impl IntoResponse {
    let scheduling = &state.settings.scheduling;
    Json(ApiInfo {
        name: "Appointly API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Appointment scheduling and booking engine for service marketplaces".to_string(),
        status: "operational".to_string(),
        slot_interval_minutes: scheduling.slot_interval_minutes,
        buffer_minutes: scheduling.buffer_minutes,
        booking_horizon_days: scheduling.booking_horizon_days,
    })
}
