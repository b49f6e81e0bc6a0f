// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Catalog API client
//!
//! Resolves a package id into metadata and per-track download URIs. The plan
//! builder only sees the [`CatalogClient`] trait; [`HttpCatalog`] is the
//! implementation that talks to the real service.
//!
//! Every call is a POST of `{"token": ..., "dat": {...}}` and every reply
//! carries its payload under `dat`.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::errors::CatalogError;
use crate::session::Session;

pub use types::{PackageInfo, TrackInfo};
use types::{Envelope, MediaQuery, MediaUrl, PackageQuery, Request};

/// Default timeout for catalog requests (in seconds).
const REQUEST_TIMEOUT_SECS: u64 = 30;

const PACKAGE_ENDPOINT: &str = "package/top";
const MEDIA_ENDPOINT: &str = "cdn/hls_url";

/// Source of package metadata and download URIs.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the raw package description.
    async fn package_info(&self, package_id: u64) -> Result<PackageInfo, CatalogError>;

    /// Resolve a track id into the URI the transfer daemon should fetch.
    async fn media_uri(&self, media_id: &str) -> Result<String, CatalogError>;

    /// Absolute URL for a thumbnail path.
    fn artwork_url(&self, thumb: &str) -> String;
}

/// Catalog client over HTTP, bound to one session.
#[derive(Debug)]
pub struct HttpCatalog<'s> {
    api_base: String,
    image_base: String,
    session: &'s Session,
    client: reqwest::Client,
}

impl<'s> HttpCatalog<'s> {
    pub fn new(
        api_base: impl Into<String>,
        image_base: impl Into<String>,
        session: &'s Session,
    ) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(session.header_map()?)
            .build()
            .map_err(|e| CatalogError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.into(),
            image_base: image_base.into(),
            session,
            client,
        })
    }

    /// Build a client from the `catalog` config section.
    pub fn from_config(config: &CatalogConfig, session: &'s Session) -> Result<Self, CatalogError> {
        let api_base = config
            .api_base_url
            .as_deref()
            .ok_or_else(|| CatalogError::NotConfigured("catalog.api_base_url is not set".into()))?;
        let image_base = config
            .image_base_url
            .as_deref()
            .ok_or_else(|| CatalogError::NotConfigured("catalog.image_base_url is not set".into()))?;
        Self::new(api_base, image_base, session)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    async fn post<Q, T>(&self, path: &str, query: Q) -> Result<T, CatalogError>
    where
        Q: Serialize + Send,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(url = %url, "Catalog request");

        let body = Request {
            token: self.session.token(),
            dat: query,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CatalogError::Unreachable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Rejected(format!("HTTP {} from {}", status, path)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CatalogError::Unreachable(format!("{}: {}", url, e)))?;
        let envelope: Envelope<serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::Malformed(format!("{}: {}", path, e)))?;

        match envelope.dat {
            Some(serde_json::Value::Null) | None => Err(CatalogError::Malformed(format!(
                "{}: response has no payload",
                path
            ))),
            Some(dat) => serde_json::from_value(dat)
                .map_err(|e| CatalogError::Malformed(format!("{}: {}", path, e))),
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalog<'_> {
    async fn package_info(&self, package_id: u64) -> Result<PackageInfo, CatalogError> {
        self.post(
            PACKAGE_ENDPOINT,
            PackageQuery {
                package_id: package_id.to_string(),
            },
        )
        .await
    }

    async fn media_uri(&self, media_id: &str) -> Result<String, CatalogError> {
        let reply: MediaUrl = self
            .post(
                MEDIA_ENDPOINT,
                MediaQuery {
                    media_id: format!("{}:0", media_id),
                },
            )
            .await?;
        upgrade_media_uri(&reply.url).ok_or_else(|| {
            CatalogError::Malformed(format!("media url {:?} has no path", reply.url))
        })
    }

    fn artwork_url(&self, thumb: &str) -> String {
        format!(
            "{}/{}",
            self.image_base.trim_end_matches('/'),
            thumb.trim_start_matches('/')
        )
    }
}

/// Turn a streaming URL into the directory the daemon should fetch.
///
/// Swaps the 128k quality segment for 320k and drops the final path segment
/// (the playlist file), keeping the trailing slash.
pub fn upgrade_media_uri(url: &str) -> Option<String> {
    let upgraded = url.replace("quality/128/", "quality/320/");
    let (dir, _) = upgraded.rsplit_once('/')?;
    Some(format!("{}/", dir))
}
