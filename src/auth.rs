//! Session extraction from the `user_data` cookie.
//!
//! The cookie holds the logged-in user as URL-encoded JSON
//! (`{"id":1,"role":"admin",...}`). Issuing it belongs to the login flow,
//! which lives elsewhere; handlers here only read it.

use crate::errors::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use serde::Deserialize;

pub const SESSION_COOKIE: &str = "user_data";

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = cookie_value(&parts.headers, SESSION_COOKIE)
            .ok_or_else(|| AppError::unauthorized("login required"))?;
        parse_session(&raw).ok_or_else(|| AppError::unauthorized("invalid session"))
    }
}

/// Decode a raw cookie value into a session.
pub fn parse_session(raw: &str) -> Option<SessionUser> {
    let decoded = percent_decode(raw)?;
    serde_json::from_str(&decoded).ok()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = bytes.get(idx + 1..idx + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).ok()
}
