use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::str::FromStr;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod schema;
mod state;

pub use config::ServerConfig;
pub use error::{field_error, GatewayServerError};
pub use schema::build_schema;
pub use state::AppState;

/// Creates the routes of the gateway.
///
/// - `GET /graphql` serves GraphiQL.
/// - `POST /graphql` executes GraphQL requests.
/// - `GET /health` reports liveness.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from_str(&config.bind)?;
    let state = AppState::new(config.engine)?;

    let app = create_router(state);
    let app = if config.cors {
        app.layer(tower_http::cors::CorsLayer::permissive())
    } else {
        app
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening for GraphQL requests");
    Ok(axum::serve(listener, app).await?)
}

async fn graphql(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    // Only the caller's credentials are forwarded to the SPARQL services.
    let mut forwarded = HeaderMap::new();
    if let Some(authorization) = headers.get(AUTHORIZATION) {
        forwarded.insert(AUTHORIZATION, authorization.clone());
    }

    let context = state.engine.request_context(forwarded);
    state
        .schema
        .execute(request.into_inner().data(context))
        .await
        .into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health() -> &'static str {
    "OK"
}
