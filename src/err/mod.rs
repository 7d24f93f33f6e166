use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use formgraph_core::gql::GqlError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("The schema could not be generated: {0}")]
	Gql(#[from] GqlError),

	#[error("There was a problem with the datastore: {0}")]
	Db(#[from] anyhow::Error),

	#[error("Couldn't open the specified file: {0}")]
	Io(#[from] std::io::Error),

	#[error("There was an error serializing to JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Unable to set up logging: {0}")]
	Telemetry(String),

	#[error("The schema reloader has stopped")]
	ReloaderStopped,

	#[error("{0}")]
	Other(String),
}

#[derive(Serialize)]
struct Message {
	code: u16,
	details: &'static str,
	information: String,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, details) = match &self {
			Error::ReloaderStopped => (StatusCode::SERVICE_UNAVAILABLE, "The server is shutting down"),
			Error::Json(_) => (StatusCode::BAD_REQUEST, "Request problems detected"),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "There was a problem with the server"),
		};
		let body = Message {
			code: status.as_u16(),
			details,
			information: self.to_string(),
		};
		(status, Json(body)).into_response()
	}
}
