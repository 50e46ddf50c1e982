use std::collections::HashSet;

use crate::cell::strip_inline_tags;
use crate::options::KeyStyle;

pub const KEY_SEPARATOR: &str = "_";

const FALLBACK_LABEL: &str = "column";

#[must_use]
pub fn sanitize_label(label: &str) -> String {
    strip_inline_tags(label)
}

/// Hands out column keys that are unique within one table.
///
/// Each path walks the same ladder: start at the style's context depth, add
/// shallower labels until the key is free, then fall back to `_2`, `_3`, ...
#[derive(Debug, Clone)]
pub struct KeyAllocator {
    style: KeyStyle,
    used: HashSet<String>,
}

impl KeyAllocator {
    #[must_use]
    pub fn new(style: KeyStyle) -> Self {
        Self {
            style,
            used: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_reserved<I, S>(style: KeyStyle, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            style,
            used: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Claims `key` as is. Returns false when it is already taken.
    pub fn reserve(&mut self, key: &str) -> bool {
        self.used.insert(key.to_string())
    }

    pub fn allocate(&mut self, path: &[String]) -> String {
        let mut labels = path
            .iter()
            .map(|label| sanitize_label(label))
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>();
        if labels.is_empty() {
            labels.push(FALLBACK_LABEL.to_string());
        }

        let start = match self.style {
            KeyStyle::FullPath => labels.len(),
            KeyStyle::Leaf => 1,
        };
        for context in start..=labels.len() {
            let candidate = labels[labels.len() - context..].join(KEY_SEPARATOR);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }

        let base = labels.join(KEY_SEPARATOR);
        let mut suffix = 2_usize;
        loop {
            let candidate = format!("{base}{KEY_SEPARATOR}{suffix}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

#[must_use]
pub fn derive_keys(paths: &[Vec<String>], style: KeyStyle) -> Vec<String> {
    let mut allocator = KeyAllocator::new(style);
    paths.iter().map(|path| allocator.allocate(path)).collect()
}
