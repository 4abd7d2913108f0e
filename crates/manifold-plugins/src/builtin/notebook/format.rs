//! The subset of the nbformat document the handler reads.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// nbformat before 4 kept cells under `worksheets[0]`.
const WORKSHEET_FORMAT_BEFORE: u32 = 4;

pub const DEFAULT_LANGUAGE: &str = "python";

#[derive(Debug, Error)]
pub enum NotebookFormatError {
    #[error("Notebook does not contain any content.")]
    Empty,
    #[error("Notebook is missing the 'metadata' field")]
    MissingMetadata,
    #[error("Notebook is missing the 'cells' field")]
    MissingCells,
    #[error("Notebook format fields are missing or malformed")]
    MissingFormat,
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    #[serde(rename = "nbformat")]
    pub format_major: Option<u32>,
    #[serde(rename = "nbformat_minor")]
    pub format_minor: Option<u32>,
    pub metadata: Option<NotebookMetadata>,
    #[serde(default)]
    cells: Option<Vec<Value>>,
    #[serde(default)]
    worksheets: Option<Vec<Worksheet>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default)]
    pub authors: Vec<NotebookAuthor>,
    pub language_info: Option<LanguageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotebookAuthor {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageInfo {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Worksheet {
    cells: Option<Vec<Value>>,
}

impl Notebook {
    pub fn parse(content: &str) -> Result<Self, NotebookFormatError> {
        if content.trim().is_empty() {
            return Err(NotebookFormatError::Empty);
        }
        let nb: Option<Notebook> = serde_json::from_str(content)?;
        let nb = nb.ok_or(NotebookFormatError::Empty)?;
        if nb.metadata.is_none() {
            return Err(NotebookFormatError::MissingMetadata);
        }
        if nb.cells().is_none() {
            return Err(NotebookFormatError::MissingCells);
        }
        if nb.format_major.is_none() || nb.format_minor.is_none() {
            return Err(NotebookFormatError::MissingFormat);
        }
        Ok(nb)
    }

    pub fn cells(&self) -> Option<&[Value]> {
        let legacy = self
            .format_major
            .is_some_and(|m| m < WORKSHEET_FORMAT_BEFORE)
            .then(|| self.worksheets.as_ref()?.first()?.cells.as_deref())
            .flatten();
        legacy.or(self.cells.as_deref())
    }

    /// `major.minor`, when both are present.
    pub fn format_version(&self) -> Option<String> {
        Some(format!("{}.{}", self.format_major?, self.format_minor?))
    }

    /// Programming language named by `language_info`, `python` when absent.
    pub fn language(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.language_info.as_ref())
            .and_then(|l| l.name.as_deref())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn author_names(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .iter()
            .flat_map(|m| m.authors.iter())
            .filter_map(|a| a.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_notebook() {
        let nb = Notebook::parse(
            r#"{"nbformat": 4, "nbformat_minor": 5, "cells": [{}],
                "metadata": {"authors": [{"name": "Ada"}, {"name": ""}], "language_info": {"name": "R"}}}"#,
        )
        .unwrap();
        assert_eq!(nb.format_version().as_deref(), Some("4.5"));
        assert_eq!(nb.language(), "R");
        assert_eq!(nb.author_names().collect::<Vec<_>>(), vec!["Ada"]);
        assert_eq!(nb.cells().map(<[Value]>::len), Some(1));
    }

    #[test]
    fn legacy_cells_live_in_the_first_worksheet() {
        let nb = Notebook::parse(
            r#"{"nbformat": 3, "nbformat_minor": 0, "metadata": {}, "worksheets": [{"cells": [{}, {}]}]}"#,
        )
        .unwrap();
        assert_eq!(nb.cells().map(<[Value]>::len), Some(2));
        assert_eq!(nb.language(), DEFAULT_LANGUAGE);
    }

    #[test]
    fn structural_errors() {
        let err = |s: &str| Notebook::parse(s).unwrap_err().to_string();
        assert_eq!(err("null"), "Notebook does not contain any content.");
        assert_eq!(err(r#"{"nbformat": 4, "nbformat_minor": 2, "cells": []}"#), "Notebook is missing the 'metadata' field");
        assert_eq!(err(r#"{"nbformat": 4, "nbformat_minor": 2, "metadata": {}}"#), "Notebook is missing the 'cells' field");
        assert_eq!(err(r#"{"metadata": {}, "cells": []}"#), "Notebook format fields are missing or malformed");
        assert!(Notebook::parse("{ nope").is_err());
    }
}
