// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Utility functions for trackhaul.
//!
//! This module provides common utility functions used across the codebase.

/// Characters that are rejected by at least one of the filesystems we write to.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Strip characters that are illegal in destination filenames.
///
/// Nothing is substituted in their place, so `"AC/DC"` becomes `"ACDC"`.
///
/// # Examples
///
/// ```
/// use trackhaul::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("01 - What? Why: \"Now\".m4a"), "01 - What Why Now.m4a");
/// ```
pub fn sanitize_filename(value: &str) -> String {
    value
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

/// Mask a sensitive string (like RPC secrets or session tokens) for logging.
///
/// Shows only the first `visible_prefix` characters and replaces the rest with "...".
/// Inputs no longer than the prefix come back as a bare "...".
///
/// # Examples
///
/// ```
/// use trackhaul::utils::mask_sensitive;
///
/// let secret = "3fa9c0d1e2b34f5a@@NOLOGIN";
/// let masked = mask_sensitive(secret, 4);
/// assert_eq!(masked, "3fa9...");
/// ```
pub fn mask_sensitive(input: &str, visible_prefix: usize) -> String {
    if input.chars().count() <= visible_prefix {
        return "...".to_string();
    }

    let prefix: String = input.chars().take(visible_prefix).collect();
    format!("{}...", prefix)
}
