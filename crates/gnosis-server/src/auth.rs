//! Gateway API key check for both HTTP and websocket endpoints.

use std::collections::HashSet;
use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;

use crate::error::AppError;

/// Query parameter accepted in place of the `Authorization` header, since
/// browser websockets cannot set headers.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

#[derive(Clone, Default)]
pub struct ApiKeyAuth {
    keys: Arc<HashSet<String>>,
}

impl ApiKeyAuth {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|key| key.as_ref().trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        Self {
            keys: Arc::new(keys),
        }
    }

    /// No keys configured means every request is accepted.
    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn validate(&self, token: &str) -> bool {
        !self.is_enabled() || self.keys.contains(token)
    }

    pub fn authorize(&self, req: &HttpRequest) -> Result<(), AppError> {
        if !self.is_enabled() {
            return Ok(());
        }
        match extract_token(req) {
            Some(token) if self.validate(&token) => Ok(()),
            Some(_) => Err(AppError::Unauthorized("invalid API key".to_string())),
            None => Err(AppError::Unauthorized("missing API key".to_string())),
        }
    }
}

/// Token from `Authorization: Bearer|Token <key>`, else from the
/// `access_token` query parameter.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            let scheme = scheme.to_ascii_lowercase();
            (scheme == "bearer" || scheme == "token").then(|| token.trim().to_string())
        })
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        url::form_urlencoded::parse(req.query_string().as_bytes())
            .find(|(name, _)| name == ACCESS_TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty())
    })
}
