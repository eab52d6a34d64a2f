use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role given to every account unless set otherwise in the store.
pub const DEFAULT_ROLE: &str = "user";

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,    // user ID
    pub role: String, // account role
    pub iat: usize,   // issued at (unix timestamp)
    pub exp: usize,   // expires at (unix timestamp)
    pub iss: String,  // issuer
    pub aud: String,  // audience
}
