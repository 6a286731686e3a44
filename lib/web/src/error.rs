use async_graphql::{value, ErrorExtensions};
use rdf_gateway_engine::error::ResolveError;

#[derive(thiserror::Error, Debug)]
pub enum GatewayServerError {
    #[error("Invalid GraphQL schema: {0}")]
    Schema(#[from] async_graphql::dynamic::SchemaError),
}

/// Turns a failed field resolution into a GraphQL error.
///
/// The error carries a machine-readable `code` and an `http.status` hint in its extensions.
pub fn field_error(error: &ResolveError) -> async_graphql::Error {
    tracing::error!(%error, "Field resolution failed");
    async_graphql::Error::new(error.to_string()).extend_with(|_, extensions| {
        extensions.set("code", error.code());
        extensions.set("http", value!({ "status": error.status_hint() }));
    })
}
