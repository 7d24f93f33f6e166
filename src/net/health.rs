use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use super::AppState;

pub(super) fn router() -> Router<AppState> {
	Router::new().route("/health", get(handler))
}

async fn handler(State(state): State<AppState>) -> Json<Value> {
	let snapshot = state.registry.current();
	Json(json!({
		"status": if snapshot.fallback { "degraded" } else { "ok" },
		"generation": snapshot.generation,
		"entities": snapshot.entities.len(),
		"fallback": snapshot.fallback,
	}))
}
