//! Descriptor metadata (authors and description).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: Option<String>, email: Option<String>) -> Self {
        Self {
            name: name.filter(|s| !s.trim().is_empty()),
            email: email.map(|e| strip_mailto(&e)).filter(|s| !s.is_empty()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), None)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

fn strip_mailto(s: &str) -> String {
    s.trim().trim_start_matches("mailto:").to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorMetadata {
    pub authors: Vec<Author>,
    pub description: Option<String>,
    /// Descriptor language version, when the handler can tell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,
}

impl DescriptorMetadata {
    pub fn push_author(&mut self, author: Author) {
        if !author.is_empty() && !self.authors.contains(&author) {
            self.authors.push(author);
        }
    }

    /// Pair comma-separated author names with comma-separated emails.
    ///
    /// Emails are only attached when both lists have the same length.
    pub fn push_author_list(&mut self, names: Option<&str>, emails: Option<&str>) {
        let split = |s: &str| -> Vec<String> {
            s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
        };
        let names = names.map(split).unwrap_or_default();
        let emails = emails.map(split).unwrap_or_default();

        if names.len() == emails.len() {
            for (n, e) in names.into_iter().zip(emails) {
                self.push_author(Author::new(Some(n), Some(e)));
            }
        } else if names.is_empty() {
            for e in emails {
                self.push_author(Author::new(None, Some(e)));
            }
        } else {
            for n in names {
                self.push_author(Author::named(n));
            }
        }
    }
}
