// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Catalog session: token, headers and cookies sent with every catalog call.
//!
//! Built once at startup and passed by reference to the catalog client.

use std::fmt;

use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, USER_AGENT};

use crate::config::CatalogConfig;
use crate::errors::CatalogError;
use crate::utils::mask_sensitive;

/// Sent unless the configuration overrides it.
const DEFAULT_USER_AGENT: &str = concat!("trackhaul/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct Session {
    token: String,
    headers: IndexMap<String, String>,
    cookies: IndexMap<String, String>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        let mut headers = IndexMap::new();
        headers.insert(
            CONTENT_TYPE.as_str().to_string(),
            "application/json; charset=UTF-8".to_string(),
        );
        headers.insert(USER_AGENT.as_str().to_string(), DEFAULT_USER_AGENT.to_string());
        headers.insert("x-requested-with".to_string(), "XMLHttpRequest".to_string());

        Self {
            token: token.into(),
            headers,
            cookies: IndexMap::new(),
        }
    }

    /// Build the session from the catalog section of the config.
    ///
    /// `token_override` (from the command line or environment) wins over the
    /// configured token.
    pub fn from_config(
        config: &CatalogConfig,
        token_override: Option<&str>,
    ) -> Result<Self, CatalogError> {
        let token = token_override
            .or(config.token.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CatalogError::NotConfigured("no session token".into()))?;

        let mut session = Self::new(token);
        for (name, value) in &config.headers {
            session = session.with_header(name, value);
        }
        for (name, value) in &config.cookies {
            session = session.with_cookie(name, value);
        }
        Ok(session)
    }

    /// Add or replace a header. Names are case-insensitive.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// `Cookie` header value, or `None` when no cookies are set.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        Some(pairs.join("; "))
    }

    /// Headers and cookies as a reqwest default header map.
    pub fn header_map(&self) -> Result<HeaderMap, CatalogError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| CatalogError::NotConfigured(format!("invalid header name {:?}", name)))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                CatalogError::NotConfigured(format!("invalid value for header {}", name))
            })?;
            map.insert(header, value);
        }
        if let Some(cookies) = self.cookie_header() {
            let value = HeaderValue::from_str(&cookies)
                .map_err(|_| CatalogError::NotConfigured("invalid cookie value".into()))?;
            map.insert(COOKIE, value);
        }
        Ok(map)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &mask_sensitive(&self.token, 4))
            .field("headers", &self.headers)
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}
