//! Substitution rule definitions and compilation.
//!
//! The substitution file is a JSON array of groups:
//!
//! ```json
//! [
//!   {
//!     "mediaTypes": ["text/html"],
//!     "path": "^/001/[^/]*\\.html$",
//!     "items": [
//!       { "src": "This is (\\d+) YEN", "rep": "$1 JPY" },
//!       { "src": "(c)", "rep": "&copy;", "literal": true }
//!     ]
//!   }
//! ]
//! ```
//!
//! Deserialization produces the raw `*Config` types; [`Substitutions::compile`]
//! turns them into the immutable, ready-to-run rule set.

use std::collections::HashSet;

use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media type used when a group does not list any.
pub const DEFAULT_MEDIA_TYPE: &str = "text/html";

/// Error raised while loading or compiling substitution rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The substitution file is not valid JSON for the expected schema.
    #[error("malformed substitution rules: {0}")]
    Json(#[from] serde_json::Error),

    /// A group's `path` pattern does not compile.
    #[error("group #{group}: invalid path pattern {pattern:?}: {source}")]
    PathPattern {
        group: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An item's `src` pattern does not compile.
    #[error("group #{group} item #{item}: invalid src pattern {pattern:?}: {source}")]
    ItemPattern {
        group: usize,
        item: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A literal item with an empty `src` would match between every byte.
    #[error("group #{group} item #{item}: literal src must not be empty")]
    EmptyLiteral { group: usize, item: usize },
}

/// Raw item as written in the substitution file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubstItemConfig {
    /// Pattern to search for.
    pub src: String,

    /// Replacement template (`$1`, `${name}` expand for regex items).
    pub rep: String,

    /// Treat `src` as a plain string instead of a regular expression.
    #[serde(default)]
    pub literal: bool,
}

/// Raw group as written in the substitution file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SubstGroupConfig {
    /// Accepted media types; empty means `text/html`.
    #[serde(default)]
    pub media_types: Vec<String>,

    /// Regular expression searched (unanchored) within the request path.
    #[serde(default)]
    pub path: String,

    /// Ordered replacements.
    #[serde(default)]
    pub items: Vec<SubstItemConfig>,
}

/// A single compiled replacement.
#[derive(Debug, Clone)]
pub struct SubstItem {
    pattern: BytesRegex,
    replacement: Vec<u8>,
    literal: bool,
}

impl SubstItem {
    /// Compile a regular-expression item. The replacement is a template.
    pub fn regex(src: &str, rep: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: BytesRegex::new(src)?,
            replacement: rep.as_bytes().to_vec(),
            literal: false,
        })
    }

    /// Build a literal item: `src` is matched byte for byte and `rep` is
    /// inserted verbatim.
    pub fn literal(src: &str, rep: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: BytesRegex::new(&regex::escape(src))?,
            replacement: rep.as_bytes().to_vec(),
            literal: true,
        })
    }

    pub fn pattern(&self) -> &BytesRegex {
        &self.pattern
    }

    pub fn replacement(&self) -> &[u8] {
        &self.replacement
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }
}

/// Ordered list of items. Order is application order.
#[derive(Debug, Clone, Default)]
pub struct SubstItems(Vec<SubstItem>);

impl SubstItems {
    pub fn new(items: Vec<SubstItem>) -> Self {
        Self(items)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubstItem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a SubstItems {
    type Item = &'a SubstItem;
    type IntoIter = std::slice::Iter<'a, SubstItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A set of items scoped by media type and request path.
#[derive(Debug, Clone)]
pub struct SubstGroup {
    media_types: HashSet<String>,
    path: Regex,
    items: SubstItems,
}

impl SubstGroup {
    /// Build a group. Media types are normalized to lowercase; an empty
    /// list falls back to [`DEFAULT_MEDIA_TYPE`].
    pub fn new<I, S>(media_types: I, path: &str, items: SubstItems) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut types: HashSet<String> = media_types
            .into_iter()
            .map(|t| t.as_ref().trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if types.is_empty() {
            types.insert(DEFAULT_MEDIA_TYPE.to_string());
        }

        Ok(Self {
            media_types: types,
            path: Regex::new(path)?,
            items,
        })
    }

    pub fn media_types(&self) -> &HashSet<String> {
        &self.media_types
    }

    pub fn path_pattern(&self) -> &Regex {
        &self.path
    }

    pub fn items(&self) -> &SubstItems {
        &self.items
    }
}

/// The complete, compiled rule set. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    groups: Vec<SubstGroup>,
}

impl Substitutions {
    pub fn new(groups: Vec<SubstGroup>) -> Self {
        Self { groups }
    }

    /// Parse and compile a substitution file's contents.
    pub fn from_json(content: &str) -> Result<Self, RuleError> {
        let configs: Vec<SubstGroupConfig> = serde_json::from_str(content)?;
        Self::compile(configs)
    }

    /// Compile raw groups. Fails on the first invalid pattern; nothing
    /// partially compiled is ever returned.
    pub fn compile(configs: Vec<SubstGroupConfig>) -> Result<Self, RuleError> {
        let mut groups = Vec::with_capacity(configs.len());

        for (gi, group) in configs.into_iter().enumerate() {
            let mut items = Vec::with_capacity(group.items.len());
            for (ii, item) in group.items.iter().enumerate() {
                let compiled = if item.literal {
                    if item.src.is_empty() {
                        return Err(RuleError::EmptyLiteral { group: gi, item: ii });
                    }
                    SubstItem::literal(&item.src, &item.rep)
                } else {
                    SubstItem::regex(&item.src, &item.rep)
                };
                let compiled = compiled.map_err(|source| RuleError::ItemPattern {
                    group: gi,
                    item: ii,
                    pattern: item.src.clone(),
                    source,
                })?;
                items.push(compiled);
            }

            let compiled = SubstGroup::new(&group.media_types, &group.path, SubstItems::new(items))
                .map_err(|source| RuleError::PathPattern {
                    group: gi,
                    pattern: group.path.clone(),
                    source,
                })?;
            groups.push(compiled);
        }

        Ok(Self::new(groups))
    }

    pub fn groups(&self) -> &[SubstGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of items across all groups.
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }
}
