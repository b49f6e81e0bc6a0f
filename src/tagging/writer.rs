// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tag writers.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};

use super::{CoverMime, TrackTags};
use crate::errors::TagWriteError;

/// Persists a tag set into one audio file.
pub trait TagWriter {
    fn write(&mut self, path: &Path, tags: &TrackTags<'_>) -> Result<(), TagWriteError>;
}

/// Writes the file's native tag format through `lofty` (ilst atoms for MP4).
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    pub fn new() -> Self {
        Self
    }
}

impl TagWriter for LoftyTagWriter {
    fn write(&mut self, path: &Path, tags: &TrackTags<'_>) -> Result<(), TagWriteError> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| TagWriteError::new(path, format!("failed to open: {}", e)))?
            .read()
            .map_err(|e| TagWriteError::new(path, format!("failed to read: {}", e)))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file.tag_mut(tag_type).ok_or_else(|| {
            TagWriteError::new(path, format!("file does not support {:?} tags", tag_type))
        })?;

        apply(tag, tags);

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| TagWriteError::new(path, format!("failed to write: {}", e)))
    }
}

/// Overwrite every managed field so repeated runs converge on the same tags.
fn apply(tag: &mut Tag, tags: &TrackTags<'_>) {
    tag.set_title(tags.title.to_string());
    tag.set_album(tags.album.to_string());
    tag.set_artist(tags.artist.to_string());
    tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.to_string());
    tag.insert_text(ItemKey::RecordingDate, tags.year.to_string());

    tag.set_track(tags.track_number);
    tag.set_track_total(tags.track_total);
    tag.set_disk(tags.disc_number);
    tag.set_disk_total(tags.disc_total);

    // lofty drops empty text items on save, so an empty copyright is stored as absent.
    if tags.copyright.is_empty() {
        tag.remove_key(&ItemKey::CopyrightMessage);
    } else {
        tag.insert_text(ItemKey::CopyrightMessage, tags.copyright.to_string());
    }

    match tags.comment {
        Some(comment) => tag.set_comment(comment.to_string()),
        None => tag.remove_comment(),
    }

    if let Some(cover) = tags.cover {
        let mime = match cover.mime {
            CoverMime::Png => MimeType::Png,
            CoverMime::Jpeg => MimeType::Jpeg,
        };
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime),
            None,
            cover.data.clone(),
        ));
    }
}
