use axum::{
    Router,
    routing::{delete, get, post},
};

use super::AppState;
use super::{api_keys, integrations, retrieve};

/// V1 API routes
///
/// ## Integrations (API Key Required)
/// - POST /integrations - Connect a source for an organization
/// - GET  /integrations/list - List an organization's integrations
/// - DELETE /integrations/{integration_id} - Disconnect an integration
///
/// ## Data Retrieval (API Key Required)
/// - POST /data/retrieve - Pull data from one integration or fan out
///   across all of them
///
/// ## API Key Management (Admin Token Required)
/// - POST /api-keys - Create API key
/// - GET  /api-keys - List API keys for an organization
/// - DELETE /api-keys/{key_id} - Revoke API key
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        // ========================================
        // Integrations: API key auth
        // ========================================
        .route("/integrations", post(integrations::connect_integration))
        .route("/integrations/list", get(integrations::list_integrations))
        .route(
            "/integrations/{integration_id}",
            delete(integrations::disconnect_integration),
        )
        // ========================================
        // Data Retrieval: API key auth
        // ========================================
        .route("/data/retrieve", post(retrieve::retrieve_data))
        // ========================================
        // API Key Management: Admin token
        // ========================================
        .route("/api-keys", post(api_keys::create_api_key))
        .route("/api-keys", get(api_keys::list_api_keys))
        .route("/api-keys/{key_id}", delete(api_keys::revoke_api_key))
}
