//! Table of contents types

use serde::{Deserialize, Serialize};

/// A single entry in the table of contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TocEntry {
    /// Display title
    pub title: String,

    /// Target as a full archive path, with optional fragment
    pub href: String,

    /// Child entries for nested TOC
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    /// Create a new TOC entry
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    /// Add child entries
    pub fn with_children(mut self, children: Vec<TocEntry>) -> Self {
        self.children = children;
        self
    }

    /// Depth of the subtree rooted here (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TocEntry::depth).max().unwrap_or(0)
    }

    /// Href without its fragment
    pub fn target_path(&self) -> &str {
        self.href.split('#').next().unwrap_or(&self.href)
    }

    /// Visit this entry and all descendants, depth first
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a TocEntry>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}
