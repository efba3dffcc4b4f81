//! Substitution engine.
//!
//! Applies matched groups to a decoded body. Every item runs a global
//! replace against the output of the previous item, so substitutions
//! compose sequentially.

use std::borrow::Cow;

use regex::bytes::NoExpand;

use crate::rewrite::rules::{SubstGroup, SubstItem, SubstItems};

impl SubstItem {
    /// Replace all non-overlapping occurrences in `data`.
    pub fn replace_all(&self, data: Vec<u8>) -> Vec<u8> {
        let rewritten = {
            let replaced = if self.is_literal() {
                self.pattern().replace_all(&data, NoExpand(self.replacement()))
            } else {
                self.pattern().replace_all(&data, self.replacement())
            };
            match replaced {
                Cow::Borrowed(_) => None,
                Cow::Owned(rewritten) => Some(rewritten),
            }
        };
        // Borrowed means nothing matched.
        rewritten.unwrap_or(data)
    }
}

impl SubstItems {
    pub fn replace_all(&self, data: Vec<u8>) -> Vec<u8> {
        self.iter().fold(data, |data, item| item.replace_all(data))
    }
}

impl SubstGroup {
    pub fn replace_all(&self, data: Vec<u8>) -> Vec<u8> {
        self.items().replace_all(data)
    }
}

/// Apply `groups` in order to `data` and return the rewritten buffer.
pub fn apply(groups: &[&SubstGroup], data: Vec<u8>) -> Vec<u8> {
    groups.iter().fold(data, |data, group| group.replace_all(data))
}
