//! Bearer-token identity resolution
//!
//! The identity collaborator is deliberately simple: opaque tokens mapped
//! to actors, resolved once per request and trusted for its duration.

use std::collections::HashMap;

use axum::http::HeaderMap;
use stockpile_core::models::{Actor, Role};

use crate::error::AppError;

/// Maps opaque bearer tokens to authenticated actors
pub struct TokenRegistry {
    tokens: HashMap<String, Actor>,
}

impl TokenRegistry {
    /// Parse a spec of the form `token=actor:role[,token=actor:role...]`
    pub fn from_spec(spec: &str) -> Result<Self, AppError> {
        let mut tokens = HashMap::new();
        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (token, identity) = entry.split_once('=').ok_or_else(|| {
                AppError::Config(format!("Token entry missing `=`: {entry}"))
            })?;
            let (actor_id, role) = identity.split_once(':').ok_or_else(|| {
                AppError::Config(format!("Token entry missing `:role`: {entry}"))
            })?;
            let role: Role = role
                .parse()
                .map_err(|error: String| AppError::Config(error))?;

            let token = token.trim();
            if token.is_empty() {
                return Err(AppError::Config("Empty token in spec".to_string()));
            }
            tokens.insert(token.to_string(), Actor::new(actor_id.trim(), role));
        }

        if tokens.is_empty() {
            return Err(AppError::Config("Token spec contains no entries".to_string()));
        }
        Ok(Self { tokens })
    }

    /// Resolve a token to its actor; unknown tokens are unauthorized
    pub fn resolve(&self, token: &str) -> Result<Actor, AppError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Unknown bearer token"))
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}
