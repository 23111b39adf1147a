use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use serde_json::json;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{context::EstimatorContext, pipeline, types::TripRequest};

// ---------- Response ----------

#[derive(Serialize, Debug)]
pub struct EstimateOut {
    pub t: i64,
    pub peak_hour: f64,
    pub duration_minutes: f64,
    pub fare: f64,
}

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<EstimatorContext>,
}

// ---------- Handler ----------

async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<TripRequest>,
) -> Result<Json<EstimateOut>, (StatusCode, Json<serde_json::Value>)> {
    let result = pipeline::estimate(&state.ctx, &req).map_err(|e| {
        let status = if e.is_user_facing() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            tracing::error!("estimate failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": e.to_string() })))
    })?;

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    Ok(Json(EstimateOut {
        t: now_ms,
        peak_hour: result.peak_hour,
        duration_minutes: result.duration_minutes,
        fare: result.fare,
    }))
}

pub fn router(ctx: Arc<EstimatorContext>) -> Router {
    Router::new()
        .route("/estimate", post(estimate))
        .with_state(AppState { ctx })
}

pub async fn serve(ctx: Arc<EstimatorContext>, port: u16) -> anyhow::Result<()> {
    let app = router(ctx);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
