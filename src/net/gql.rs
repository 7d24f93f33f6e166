use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{MethodRouter, get, post};

use super::AppState;
use crate::cnf::{GRAPHQL_DASHBOARD, GRAPHQL_PATH};

const TARGET: &str = "formgraph::net::gql";

pub(super) fn router() -> Router<AppState> {
	let route: MethodRouter<AppState> = if *GRAPHQL_DASHBOARD {
		warn!(target: TARGET, "The GraphiQL dashboard is enabled on {GRAPHQL_PATH}");
		get(graphiql).post(handler)
	} else {
		post(handler)
	};
	Router::new().route(GRAPHQL_PATH, route)
}

async fn handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
	state.registry.execute(req.into_inner()).await.into()
}

async fn graphiql() -> impl IntoResponse {
	Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}
