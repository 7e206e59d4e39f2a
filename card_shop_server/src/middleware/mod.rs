mod admin_auth;

pub use admin_auth::{AdminTokenMiddlewareFactory, AdminTokenMiddlewareService, ADMIN_TOKEN_HEADER};
