mod gql;
mod health;
mod reload;
mod signals;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use formgraph_core::gql::{Reloader, SchemaRegistry};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::err::Error;

const TARGET: &str = "formgraph::net";

/// Shared by every request handler
#[derive(Clone, Debug)]
pub struct AppState {
	pub registry: Arc<SchemaRegistry>,
	pub reloader: Reloader,
}

pub(crate) fn router(state: AppState) -> Router {
	let cors = CorsLayer::new()
		.allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
		.allow_headers(Any)
		.allow_origin(Any);
	Router::new()
		.merge(gql::router())
		.merge(health::router())
		.merge(reload::router())
		.layer(TraceLayer::new_for_http())
		.layer(cors)
		.with_state(state)
}

pub async fn init(bind: SocketAddr, state: AppState) -> Result<(), Error> {
	let reloader = state.reloader.clone();
	let listener = TcpListener::bind(bind).await?;
	info!(target: TARGET, "Started web server on {}", listener.local_addr()?);
	axum::serve(listener, router(state)).with_graceful_shutdown(signals::shutdown(reloader)).await?;
	info!(target: TARGET, "Web server stopped");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use formgraph_core::catalog::{EntityDefinition, FieldDescriptor, FieldKind, MemoryCatalog};
	use formgraph_core::gql::StaticBase;
	use formgraph_core::kvs::Datastore;
	use http_body_util::BodyExt;
	use serde_json::{Value, json};
	use test_log::test;
	use tower::ServiceExt;

	async fn state() -> (Arc<MemoryCatalog>, AppState) {
		let catalog = Arc::new(MemoryCatalog::new(vec![
			EntityDefinition::resource("customers", "Customer")
				.with_field(FieldDescriptor::new("name", FieldKind::Text)),
		]));
		let ds = Arc::new(Datastore::memory(catalog.clone()));
		let registry = Arc::new(SchemaRegistry::new(ds, Arc::new(StaticBase), None).await.unwrap());
		let (reloader, _) = Reloader::spawn(registry.clone());
		(catalog, AppState {
			registry,
			reloader,
		})
	}

	async fn json(response: axum::response::Response) -> Value {
		let body = response.into_body().collect().await.unwrap().to_bytes();
		serde_json::from_slice(&body).unwrap()
	}

	fn graphql(query: &str) -> Request<Body> {
		Request::post("/graphql")
			.header("content-type", "application/json")
			.body(Body::from(json!({ "query": query }).to_string()))
			.unwrap()
	}

	#[test(tokio::test)]
	async fn answers_graphql_requests() {
		let (_, state) = state().await;
		let response = router(state).oneshot(graphql("{ _generation allCustomers { id } }")).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = json(response).await;
		assert_eq!(body["data"]["_generation"], 1);
		assert_eq!(body["data"]["allCustomers"], json!([]));
	}

	#[test(tokio::test)]
	async fn reports_health() {
		let (_, state) = state().await;
		let request = Request::get("/health").body(Body::empty()).unwrap();
		let response = router(state).oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = json(response).await;
		assert_eq!(body["generation"], 1);
		assert_eq!(body["entities"], 1);
		assert_eq!(body["fallback"], false);
	}

	#[test(tokio::test)]
	async fn reload_endpoint_swaps_the_schema() {
		let (catalog, state) = state().await;
		catalog.upsert(EntityDefinition::resource("invoices", "Invoice")).await;
		let registry = state.registry.clone();
		let request = Request::post("/reload").body(Body::empty()).unwrap();
		let response = router(state.clone()).oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::ACCEPTED);
		for _ in 0..100 {
			if registry.current().generation > 1 {
				break;
			}
			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}
		let response = router(state).oneshot(graphql("{ _generation allInvoices { id } }")).await.unwrap();
		let body = json(response).await;
		assert_eq!(body["data"]["_generation"], 2);
	}
}
