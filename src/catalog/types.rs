// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wire types for the catalog API.

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Every catalog response wraps its payload in `dat`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub dat: Option<T>,
}

/// Every catalog request carries the session token next to the payload.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a, T> {
    pub token: &'a str,
    pub dat: T,
}

#[derive(Debug, Serialize)]
pub(crate) struct PackageQuery {
    pub package_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MediaQuery {
    pub media_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaUrl {
    pub url: String,
}

/// Package metadata as returned by `package/top`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub title: String,
    pub artist_name: String,
    /// Release date, `YYYYMMDD` or `YYYY-MM-DD`.
    pub release: String,
    #[serde(default)]
    pub copyright: Option<String>,
    /// Cover path relative to the image base URL.
    pub thumb: String,
    /// Discs, each an ordered list of tracks.
    pub list: Vec<Vec<TrackInfo>>,
}

/// One entry of a disc's track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub track_id: String,
    pub title: String,
    #[serde(default)]
    pub artist_name: Option<String>,
    /// Album title as credited on this track.
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub tieup: Option<String>,
}

impl PackageInfo {
    /// Reject data that would produce a broken or empty plan.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.title.trim().is_empty() {
            return Err(CatalogError::Malformed("package has no title".into()));
        }
        if self.artist_name.trim().is_empty() {
            return Err(CatalogError::Malformed("package has no artist".into()));
        }
        if self.release.chars().count() < 4 {
            return Err(CatalogError::Malformed(format!(
                "release date {:?} is too short",
                self.release
            )));
        }
        if !self.thumb.contains('.') {
            return Err(CatalogError::Malformed(format!(
                "cover path {:?} has no extension",
                self.thumb
            )));
        }
        if self.list.is_empty() {
            return Err(CatalogError::Malformed("package has no discs".into()));
        }
        for (disc_index, disc) in self.list.iter().enumerate() {
            if disc.is_empty() {
                return Err(CatalogError::Malformed(format!(
                    "disc {} has no tracks",
                    disc_index + 1
                )));
            }
            if let Some(track) = disc.iter().find(|t| t.track_id.trim().is_empty()) {
                return Err(CatalogError::Malformed(format!(
                    "track {:?} on disc {} has no id",
                    track.title,
                    disc_index + 1
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageInfo {
        serde_json::from_value(serde_json::json!({
            "title": "Album",
            "artist_name": "Artist",
            "release": "20180502",
            "thumb": "1/2/3.jpg",
            "list": [[
                {"track_id": "T1", "title": "One", "artist_name": "Artist", "package_name": "Album"},
                {"track_id": "T2", "title": "Two", "tieup": "CM song"}
            ]]
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_optional_fields() {
        let info = sample();
        assert_eq!(info.copyright, None);
        assert_eq!(info.list[0][1].artist_name, None);
        assert_eq!(info.list[0][1].tieup.as_deref(), Some("CM song"));
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_structures() {
        let mut info = sample();
        info.list.clear();
        assert!(matches!(info.validate(), Err(CatalogError::Malformed(_))));

        let mut info = sample();
        info.list.push(vec![]);
        let err = info.validate().unwrap_err();
        assert_eq!(err, CatalogError::Malformed("disc 2 has no tracks".into()));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut info = sample();
        info.release = "18".into();
        assert!(info.validate().is_err());

        let mut info = sample();
        info.thumb = "noext".into();
        assert!(info.validate().is_err());

        let mut info = sample();
        info.list[0][0].track_id = " ".into();
        assert!(info.validate().is_err());
    }

    #[test]
    fn test_missing_list_fails_to_deserialize() {
        let result: Result<PackageInfo, _> = serde_json::from_value(serde_json::json!({
            "title": "Album",
            "artist_name": "Artist",
            "release": "20180502",
            "thumb": "1.jpg"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = Request {
            token: "tok",
            dat: PackageQuery { package_id: "42".into() },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"token": "tok", "dat": {"package_id": "42"}})
        );
    }
}
