// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Deterministic names for everything written into a package directory.

use crate::utils::sanitize_filename;

/// Container extension of the downloaded tracks.
pub const TRACK_EXTENSION: &str = "m4a";

/// Size suffix the image CDN expects before the extension.
const COVER_SIZE_SUFFIX: &str = "_640_640.";

/// Destination filename for a track.
///
/// Numbers are 1-based in the name. The disc prefix only appears when the
/// package has more than one disc; the two-digit track number keeps names
/// unique even when sanitizing makes titles collide.
pub fn track_file_name(disc_index: usize, track_index: usize, disc_count: usize, title: &str) -> String {
    let name = if disc_count > 1 {
        format!(
            "{}.{:02} - {}.{}",
            disc_index + 1,
            track_index + 1,
            title,
            TRACK_EXTENSION
        )
    } else {
        format!("{:02} - {}.{}", track_index + 1, title, TRACK_EXTENSION)
    };
    sanitize_filename(&name)
}

/// Directory name for a release: `[{release minus its first two chars}]{title} - {artist}`.
pub fn directory_name(release: &str, title: &str, artist: &str) -> String {
    let short_release: String = release.chars().skip(2).collect();
    sanitize_filename(&format!("[{}]{} - {}", short_release, title, artist))
}

/// Thumbnail path rewritten to the 640x640 rendition.
pub fn sized_thumb(thumb: &str) -> String {
    thumb.replace('.', COVER_SIZE_SUFFIX)
}

/// Local filename for the cover: `cover.{ext}` with the URL's extension.
pub fn cover_file_name(cover_url: &str) -> String {
    let ext = cover_url.rsplit('.').next().unwrap_or_default();
    format!("cover.{}", ext)
}
