use crate::state::AppState;
use axum::Router;

pub(crate) mod claims;
mod dto;
pub mod extractors;
pub mod google;
pub mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub mod repo_types;
mod services;

pub use extractors::AuthUser;

/// Routes reachable without a token.
pub fn public_router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Routes that sit behind the authentication gate.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
