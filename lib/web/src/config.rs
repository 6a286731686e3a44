use rdf_gateway_engine::Engine;
use std::sync::Arc;

/// Holds the configuration for a gateway web server.
pub struct ServerConfig {
    /// The engine that resolves all queries.
    pub engine: Arc<Engine>,
    /// The IP address or DNS name that the socket binds to.
    pub bind: String,
    /// Whether CORS is enabled.
    pub cors: bool,
}
