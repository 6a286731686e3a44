use crate::error::GatewayServerError;
use crate::schema::build_schema;
use async_graphql::dynamic::Schema;
use rdf_gateway_engine::Engine;
use std::sync::Arc;

/// Shared state of all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub schema: Schema,
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Builds the executable schema of `engine`.
    pub fn new(engine: Arc<Engine>) -> Result<Self, GatewayServerError> {
        let schema = build_schema(Arc::clone(&engine))?;
        Ok(Self { schema, engine })
    }
}
