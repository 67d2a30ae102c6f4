pub mod auth;

pub use auth::{
    ApiKeyInfo, ErrorResponse, require_admin_token, require_api_key_from_headers,
    require_org_access,
};
