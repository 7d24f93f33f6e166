use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use super::AppState;
use crate::err::Error;

const TARGET: &str = "formgraph::net::reload";

pub(super) fn router() -> Router<AppState> {
	Router::new().route("/reload", post(handler))
}

/// Queues a schema reload, answering before it completes
async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
	if !state.reloader.notify() {
		return Err(Error::ReloaderStopped);
	}
	debug!(target: TARGET, "Schema reload requested");
	Ok((StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))))
}
