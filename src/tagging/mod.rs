// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metadata stamper
//!
//! Writes tags into every track whose download succeeded. Runs strictly
//! after the orchestrator, so no file is touched while the daemon may still
//! be writing it. A failure on one file never stops the others.

mod writer;

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::download::CompletionReport;
use crate::errors::TagWriteError;
use crate::plan::{Package, Slot, Track};

pub use writer::{LoftyTagWriter, TagWriter};

/// Image format of the cover, decided by the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverMime {
    Png,
    Jpeg,
}

impl CoverMime {
    /// PNG for a `png` extension (any case), JPEG for anything else.
    pub fn from_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }
}

/// Cover art bytes, read once per package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime: CoverMime,
}

/// The complete tag set for one track. Numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags<'a> {
    pub title: &'a str,
    pub album: &'a str,
    pub artist: &'a str,
    pub album_artist: &'a str,
    pub year: &'a str,
    /// Empty when the catalog has no copyright line.
    pub copyright: &'a str,
    /// Tie-up text. `None` clears any existing comment.
    pub comment: Option<&'a str>,
    pub track_number: u32,
    pub track_total: u32,
    pub disc_number: u32,
    pub disc_total: u32,
    /// Replaces the front cover when present; left untouched otherwise.
    pub cover: Option<&'a CoverImage>,
}

impl<'a> TrackTags<'a> {
    pub fn for_track(package: &'a Package, track: &'a Track, cover: Option<&'a CoverImage>) -> Self {
        Self {
            title: &track.title,
            album: &track.album,
            artist: &track.artist,
            album_artist: &package.artist,
            year: package.year(),
            copyright: &package.copyright,
            comment: track.tieup.as_deref().filter(|t| !t.is_empty()),
            track_number: to_tag_number(track.track_index + 1),
            track_total: to_tag_number(track.disc_track_count),
            disc_number: to_tag_number(track.disc_index + 1),
            disc_total: to_tag_number(track.disc_count),
            cover,
        }
    }
}

fn to_tag_number(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// What happened to one track during stamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Tagged,
    /// The download failed or was never accepted; the file was not touched.
    DownloadFailed,
    TagFailed(TagWriteError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackResult {
    pub slot: Slot,
    pub file_name: String,
    pub outcome: TrackOutcome,
}

/// Per-track outcomes of a stamping pass, in (disc, track) order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StampReport {
    pub tracks: Vec<TrackResult>,
    /// True when a cover was embedded into the tagged tracks.
    pub artwork_embedded: bool,
}

impl StampReport {
    pub fn tagged_count(&self) -> usize {
        self.count(|o| matches!(o, TrackOutcome::Tagged))
    }

    pub fn download_failed_count(&self) -> usize {
        self.count(|o| matches!(o, TrackOutcome::DownloadFailed))
    }

    pub fn tag_failed_count(&self) -> usize {
        self.count(|o| matches!(o, TrackOutcome::TagFailed(_)))
    }

    /// Tracks that did not end up tagged, for either reason.
    pub fn failures(&self) -> impl Iterator<Item = &TrackResult> {
        self.tracks
            .iter()
            .filter(|r| !matches!(r.outcome, TrackOutcome::Tagged))
    }

    fn count(&self, pred: impl Fn(&TrackOutcome) -> bool) -> usize {
        self.tracks.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Read the cover if its download succeeded.
fn load_cover(package: &Package, report: &CompletionReport) -> Option<CoverImage> {
    let job = package.artwork.job.as_ref()?;
    if !report.is_succeeded(job) {
        info!("Cover download failed, tagging without artwork");
        return None;
    }

    let path: PathBuf = package.artwork_path();
    match fs::read(&path) {
        Ok(data) => Some(CoverImage {
            data,
            mime: CoverMime::from_extension(package.artwork.extension()),
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read downloaded cover");
            None
        }
    }
}

/// Tag every successfully downloaded track of `package`.
///
/// Safe to run again on the same files: every field is overwritten, the
/// comment is cleared when there is no tie-up and the front cover replaced.
pub fn stamp<W>(package: &Package, report: &CompletionReport, writer: &mut W) -> StampReport
where
    W: TagWriter + ?Sized,
{
    let cover = load_cover(package, report);
    let mut stamp_report = StampReport {
        tracks: Vec::with_capacity(package.track_count()),
        artwork_embedded: false,
    };

    for track in package.tracks() {
        let downloaded = track
            .job
            .as_ref()
            .map(|job| report.is_succeeded(job))
            .unwrap_or(false);

        let outcome = if !downloaded {
            warn!("{} download failed.", track.file_name);
            TrackOutcome::DownloadFailed
        } else {
            let tags = TrackTags::for_track(package, track, cover.as_ref());
            match writer.write(&package.track_path(track), &tags) {
                Ok(()) => {
                    stamp_report.artwork_embedded |= cover.is_some();
                    TrackOutcome::Tagged
                }
                Err(err) => {
                    warn!("{}", err);
                    TrackOutcome::TagFailed(err)
                }
            }
        };

        stamp_report.tracks.push(TrackResult {
            slot: track.slot(),
            file_name: track.file_name.clone(),
            outcome,
        });
    }

    info!(
        tagged = stamp_report.tagged_count(),
        skipped = stamp_report.download_failed_count(),
        errors = stamp_report.tag_failed_count(),
        "Tagging finished"
    );
    stamp_report
}
