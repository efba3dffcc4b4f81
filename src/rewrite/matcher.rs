//! Rule matching logic.
//!
//! # Responsibilities
//! - Decide which groups apply to a response (media type + request path)
//! - Preserve configuration order of the eligible groups
//!
//! # Design Decisions
//! - Media type matching is exact on the lowercased essence (`type/subtype`)
//! - Path matching is an unanchored search; use `^`/`$` in the pattern to
//!   anchor it
//! - A group with no items never matches
//! - No sorting, no deduplication

use crate::rewrite::rules::{SubstGroup, Substitutions};

impl SubstGroup {
    /// Returns true if this group applies to a response of `media_type`
    /// served for `path`.
    pub fn is_match(&self, media_type: &str, path: &str) -> bool {
        if media_type.is_empty() || self.items().is_empty() {
            return false;
        }
        if !self.media_types().contains(media_type) {
            return false;
        }
        self.path_pattern().is_match(path)
    }
}

impl Substitutions {
    /// Eligible groups for a response, in configuration order.
    pub fn matching<'a>(&'a self, media_type: &str, path: &str) -> Vec<&'a SubstGroup> {
        if media_type.is_empty() {
            return Vec::new();
        }
        self.groups()
            .iter()
            .filter(|group| group.is_match(media_type, path))
            .collect()
    }
}
