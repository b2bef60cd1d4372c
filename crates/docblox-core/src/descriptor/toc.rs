//! Tables of contents.
//!
//! Entries are stored flat; tree structure is expressed through URLs. An
//! entry's `parent` is the URL of its parent entry and `children` are the
//! URLs of its children, so renderers can group by parent URL without
//! following object links.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl Entry {
    pub fn new(url: impl Into<String>, title: impl Into<String>, parent: Option<String>) -> Self {
        Entry {
            url: url.into(),
            title: title.into(),
            parent,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocDescriptor {
    pub name: String,
    entries: Vec<Entry>,
}

impl TocDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        TocDescriptor {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add an entry, registering it as a child of its parent entry.
    pub fn add_entry(&mut self, entry: Entry) {
        if let Some(parent_url) = &entry.parent {
            if let Some(parent) = self.entries.iter_mut().find(|e| &e.url == parent_url) {
                parent.children.push(entry.url.clone());
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, url: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.url == url)
    }

    /// Entries without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.parent.is_none())
    }

    /// Entries whose parent is `url`.
    pub fn children_of<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.parent.as_deref() == Some(url))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_linkage_is_by_url() {
        let mut toc = TocDescriptor::new("Namespaces");
        toc.add_entry(Entry::new("namespaces/My.html", "\\My", None));
        toc.add_entry(Entry::new(
            "namespaces/My.Space.html",
            "\\My\\Space",
            Some("namespaces/My.html".to_string()),
        ));

        assert_eq!(toc.roots().count(), 1);
        let children: Vec<_> = toc.children_of("namespaces/My.html").collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title, "\\My\\Space");
        assert_eq!(
            toc.get("namespaces/My.html").map(|e| e.children.clone()),
            Some(vec!["namespaces/My.Space.html".to_string()])
        );
    }
}
