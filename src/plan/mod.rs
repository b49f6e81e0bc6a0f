// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download plan: the Package → Disc → Track hierarchy built from catalog data.
//!
//! Indices are zero-based internally and computed exactly once here; tag
//! numbering and filenames derive from them, so nothing downstream may
//! renumber. The only later mutation is attaching job ids.

mod naming;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::{CatalogClient, PackageInfo};
use crate::download::JobId;
use crate::errors::CatalogError;

pub use naming::{cover_file_name, directory_name, sized_thumb, track_file_name, TRACK_EXTENSION};

/// Owner of a transfer job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Artwork,
    Track { disc: usize, track: usize },
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artwork => f.write_str("artwork"),
            Self::Track { disc, track } => write!(f, "disc {} track {}", disc + 1, track + 1),
        }
    }
}

/// Shared cover art for the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub url: String,
    pub file_name: String,
    pub job: Option<JobId>,
}

impl Artwork {
    /// Extension taken from the cover URL (`jpg`, `png`, ...).
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or_default()
    }
}

/// One track to download and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Album title as the catalog reports it for this track.
    pub album: String,
    /// Tie-up text, written as the comment tag.
    pub tieup: Option<String>,
    pub media_id: String,
    pub download_uri: String,
    pub file_name: String,
    pub disc_index: usize,
    pub track_index: usize,
    /// Number of tracks on this track's disc.
    pub disc_track_count: usize,
    /// Number of discs in the package.
    pub disc_count: usize,
    pub job: Option<JobId>,
}

impl Track {
    pub fn slot(&self) -> Slot {
        Slot::Track {
            disc: self.disc_index,
            track: self.track_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disc {
    pub index: usize,
    pub tracks: Vec<Track>,
}

/// One release, fully resolved and ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub package_id: u64,
    pub title: String,
    pub artist: String,
    /// Release date as reported by the catalog.
    pub release: String,
    pub copyright: String,
    pub directory: PathBuf,
    pub artwork: Artwork,
    pub discs: Vec<Disc>,
}

impl Package {
    pub fn disc_count(&self) -> usize {
        self.discs.len()
    }

    pub fn track_count(&self) -> usize {
        self.discs.iter().map(|d| d.tracks.len()).sum()
    }

    /// Tracks plus the artwork.
    pub fn job_count(&self) -> usize {
        self.track_count() + 1
    }

    /// Tracks in (disc, track) order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.discs.iter().flat_map(|d| d.tracks.iter())
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.discs.iter_mut().flat_map(|d| d.tracks.iter_mut())
    }

    pub fn track(&self, slot: Slot) -> Option<&Track> {
        match slot {
            Slot::Artwork => None,
            Slot::Track { disc, track } => self.discs.get(disc)?.tracks.get(track),
        }
    }

    /// Release year: the first four characters of the release date.
    pub fn year(&self) -> &str {
        match self.release.char_indices().nth(4) {
            Some((idx, _)) => &self.release[..idx],
            None => &self.release,
        }
    }

    pub fn track_path(&self, track: &Track) -> PathBuf {
        self.directory.join(&track.file_name)
    }

    pub fn artwork_path(&self) -> PathBuf {
        self.directory.join(&self.artwork.file_name)
    }

    /// Display name for a slot, used in logs and the final accounting.
    pub fn slot_name(&self, slot: Slot) -> String {
        match slot {
            Slot::Artwork => self.artwork.file_name.clone(),
            Slot::Track { .. } => self
                .track(slot)
                .map(|t| t.file_name.clone())
                .unwrap_or_else(|| slot.to_string()),
        }
    }
}

/// Resolve `package_id` into a full plan.
///
/// Every track costs one extra catalog round-trip for its download URI. The
/// destination directory is computed under `output_root` but not created.
pub async fn build_plan<C>(
    catalog: &C,
    package_id: u64,
    output_root: &Path,
) -> Result<Package, CatalogError>
where
    C: CatalogClient + ?Sized,
{
    let info = catalog.package_info(package_id).await?;
    info.validate()?;
    let PackageInfo {
        title,
        artist_name,
        release,
        copyright,
        thumb,
        list,
    } = info;

    let cover_url = catalog.artwork_url(&sized_thumb(&thumb));
    let artwork = Artwork {
        file_name: cover_file_name(&cover_url),
        url: cover_url,
        job: None,
    };

    let directory = output_root.join(directory_name(&release, &title, &artist_name));
    let disc_count = list.len();
    info!(
        package_id,
        title = %title,
        discs = disc_count,
        tracks = list.iter().map(Vec::len).sum::<usize>(),
        "Resolved package"
    );

    let mut discs = Vec::with_capacity(disc_count);
    for (disc_index, disc) in list.into_iter().enumerate() {
        let disc_track_count = disc.len();
        let mut tracks = Vec::with_capacity(disc_track_count);

        for (track_index, info) in disc.into_iter().enumerate() {
            let download_uri = catalog.media_uri(&info.track_id).await?;
            let file_name = track_file_name(disc_index, track_index, disc_count, &info.title);
            debug!(file = %file_name, uri = %download_uri, "Planned track");

            tracks.push(Track {
                album: info.package_name.unwrap_or_else(|| title.clone()),
                artist: info.artist_name.unwrap_or_else(|| artist_name.clone()),
                title: info.title,
                tieup: info.tieup.filter(|t| !t.trim().is_empty()),
                media_id: info.track_id,
                download_uri,
                file_name,
                disc_index,
                track_index,
                disc_track_count,
                disc_count,
                job: None,
            });
        }

        discs.push(Disc {
            index: disc_index,
            tracks,
        });
    }

    Ok(Package {
        package_id,
        title,
        artist: artist_name,
        release,
        copyright: copyright.unwrap_or_default(),
        directory,
        artwork,
        discs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackInfo;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeCatalog {
        info: Result<PackageInfo, CatalogError>,
        uri_calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn new(info: Result<PackageInfo, CatalogError>) -> Self {
            Self {
                info,
                uri_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn package_info(&self, _package_id: u64) -> Result<PackageInfo, CatalogError> {
            self.info.clone()
        }

        async fn media_uri(&self, media_id: &str) -> Result<String, CatalogError> {
            self.uri_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://media.test/{}/", media_id))
        }

        fn artwork_url(&self, thumb: &str) -> String {
            format!("https://img.test/{}", thumb)
        }
    }

    fn track(id: &str, title: &str) -> TrackInfo {
        TrackInfo {
            track_id: id.into(),
            title: title.into(),
            artist_name: Some("Track Artist".into()),
            package_name: Some("Album".into()),
            tieup: None,
        }
    }

    fn info(list: Vec<Vec<TrackInfo>>) -> PackageInfo {
        PackageInfo {
            title: "Album".into(),
            artist_name: "Artist".into(),
            release: "20180502".into(),
            copyright: Some("(C) 2018 Label".into()),
            thumb: "a/b/cover.jpg".into(),
            list,
        }
    }

    #[tokio::test]
    async fn test_single_disc_plan() {
        let catalog = FakeCatalog::new(Ok(info(vec![vec![
            track("t1", "One"),
            track("t2", "Two"),
            track("t3", "Three"),
        ]])));
        let package = build_plan(&catalog, 42, Path::new("/music")).await.unwrap();

        assert_eq!(package.disc_count(), 1);
        assert_eq!(package.track_count(), 3);
        assert_eq!(package.job_count(), 4);
        assert_eq!(package.directory, Path::new("/music/[180502]Album - Artist"));
        assert_eq!(package.artwork.url, "https://img.test/a/b/cover_640_640.jpg");
        assert_eq!(package.artwork.file_name, "cover.jpg");
        assert_eq!(package.year(), "2018");
        assert_eq!(catalog.uri_calls.load(Ordering::SeqCst), 3);

        let names: Vec<_> = package.tracks().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, vec!["01 - One.m4a", "02 - Two.m4a", "03 - Three.m4a"]);

        let second = package.track(Slot::Track { disc: 0, track: 1 }).unwrap();
        assert_eq!(second.download_uri, "https://media.test/t2/");
        assert_eq!(second.disc_track_count, 3);
        assert_eq!(second.disc_count, 1);
        assert!(second.job.is_none());
    }

    #[tokio::test]
    async fn test_multi_disc_positions_and_prefixes() {
        let catalog = FakeCatalog::new(Ok(info(vec![
            vec![track("a", "A1"), track("b", "A2")],
            vec![track("c", "B1")],
        ])));
        let package = build_plan(&catalog, 7, Path::new("out")).await.unwrap();

        let positions: Vec<_> = package
            .tracks()
            .map(|t| (t.file_name.clone(), t.disc_index, t.track_index, t.disc_track_count, t.disc_count))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("1.01 - A1.m4a".to_string(), 0, 0, 2, 2),
                ("1.02 - A2.m4a".to_string(), 0, 1, 2, 2),
                ("2.01 - B1.m4a".to_string(), 1, 0, 1, 2),
            ]
        );
        assert_eq!(package.discs[1].index, 1);
    }

    #[tokio::test]
    async fn test_titles_differing_only_by_illegal_chars_stay_unique() {
        let catalog = FakeCatalog::new(Ok(info(vec![vec![
            track("a", "AC/DC"),
            track("b", "ACDC"),
            track("c", "AC:DC?"),
        ]])));
        let package = build_plan(&catalog, 1, Path::new("out")).await.unwrap();

        let names: HashSet<_> = package.tracks().map(|t| t.file_name.clone()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains("01 - ACDC.m4a"));
        assert!(names.contains("02 - ACDC.m4a"));
    }

    #[tokio::test]
    async fn test_track_fields_fall_back_to_package() {
        let mut bare = track("a", "Song");
        bare.artist_name = None;
        bare.package_name = None;
        bare.tieup = Some("  ".into());
        let catalog = FakeCatalog::new(Ok(info(vec![vec![bare]])));
        let package = build_plan(&catalog, 1, Path::new("out")).await.unwrap();

        let t = package.tracks().next().unwrap();
        assert_eq!(t.artist, "Artist");
        assert_eq!(t.album, "Album");
        assert_eq!(t.tieup, None);
    }

    #[tokio::test]
    async fn test_malformed_package_resolves_no_uris() {
        let catalog = FakeCatalog::new(Ok(info(vec![])));
        let err = build_plan(&catalog, 1, Path::new("out")).await.unwrap_err();

        assert!(matches!(err, CatalogError::Malformed(_)));
        assert_eq!(catalog.uri_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_catalog_error_propagates() {
        let catalog = FakeCatalog::new(Err(CatalogError::Unreachable("dns".into())));
        let err = build_plan(&catalog, 1, Path::new("out")).await.unwrap_err();
        assert_eq!(err, CatalogError::Unreachable("dns".into()));
    }

    #[test]
    fn test_year_handles_short_release() {
        let mut package = Package {
            package_id: 1,
            title: String::new(),
            artist: String::new(),
            release: "2018-05-02".into(),
            copyright: String::new(),
            directory: PathBuf::new(),
            artwork: Artwork {
                url: String::new(),
                file_name: "cover.png".into(),
                job: None,
            },
            discs: vec![],
        };
        assert_eq!(package.year(), "2018");
        assert_eq!(package.artwork.extension(), "png");

        package.release = "99".into();
        assert_eq!(package.year(), "99");
    }
}
