use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use spin_sdk::http::Request;
use spin_sdk::key_value::Store;

use crate::config;
use crate::models::models::User;

/// Claims carried by the identity provider's bearer tokens. The subject is
/// the provider-side id; profile fields seed the first sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

fn bearer_from_header(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

pub fn decode_with_secret(token: &str, secret: &str, leeway: u64) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.leeway = leeway;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims)
}

pub fn validate_token(req: &Request) -> Option<Claims> {
    let header = req.header("Authorization").and_then(|h| h.as_str());
    let token = bearer_from_header(header)?;
    decode_with_secret(token, &config::jwt_secret(), config::token_leeway_secs())
}

/// Resolve the token subject to its synced user record, if any.
pub fn current_user(store: &Store, claims: &Claims) -> anyhow::Result<Option<User>> {
    let user_id: Option<String> = store.get_json(&config::auth_key(&claims.sub))?;
    match user_id {
        Some(id) => Ok(store.get_json::<User>(&config::user_key(&id))?),
        None => Ok(None),
    }
}
