//! Canonical paper identifiers
//!
//! Every paper in a graph is keyed by one canonical string:
//! `doi:<doi>`, `arxiv:<id>`, `title:<hash>` or `s2:<provider id>`.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

const DOI_PREFIX: &str = "doi:";
const ARXIV_PREFIX: &str = "arxiv:";
const TITLE_PREFIX: &str = "title:";
const EXTERNAL_PREFIX: &str = "s2:";

fn doi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("static DOI pattern"))
}

fn arxiv_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[a-z]{2})?/\d{7})(?:v\d+)?$")
            .expect("static arXiv pattern")
    })
}

/// Kind of a canonical identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Doi,
    Arxiv,
    Synthetic,
    External,
}

/// Canonical paper identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    /// Canonical DOI identifier, if `raw` is a DOI in any common spelling
    pub fn doi(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let stripped = strip_prefix_ci(raw, "https://doi.org/")
            .or_else(|| strip_prefix_ci(raw, "http://doi.org/"))
            .or_else(|| strip_prefix_ci(raw, "https://dx.doi.org/"))
            .or_else(|| strip_prefix_ci(raw, "http://dx.doi.org/"))
            .or_else(|| strip_prefix_ci(raw, DOI_PREFIX))
            .unwrap_or(raw)
            .trim()
            .to_lowercase();

        doi_pattern()
            .is_match(&stripped)
            .then(|| PaperId(format!("{DOI_PREFIX}{stripped}")))
    }

    /// Canonical arXiv identifier with the version suffix removed
    pub fn arxiv(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        let mut candidate = lower.as_str();

        for marker in ["arxiv.org/abs/", "arxiv.org/pdf/"] {
            if let Some(pos) = candidate.find(marker) {
                candidate = &candidate[pos + marker.len()..];
            }
        }
        candidate = candidate.strip_prefix(ARXIV_PREFIX).unwrap_or(candidate);
        candidate = candidate.strip_suffix(".pdf").unwrap_or(candidate);

        arxiv_pattern()
            .captures(candidate.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| PaperId(format!("{ARXIV_PREFIX}{}", m.as_str())))
    }

    /// Deterministic fallback from the lower-cased title and year
    pub fn synthetic(title: &str, year: Option<i32>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_title(title).as_bytes());
        hasher.update(b"|");
        match year {
            Some(year) => hasher.update(year.to_string().as_bytes()),
            None => hasher.update(b"unknown"),
        }
        let hash = hex::encode(hasher.finalize());
        PaperId(format!("{TITLE_PREFIX}{}", &hash[..16]))
    }

    /// Opaque provider identifier (Semantic Scholar paperId and friends)
    pub fn external(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = strip_prefix_ci(raw, EXTERNAL_PREFIX).unwrap_or(raw);
        PaperId(format!("{EXTERNAL_PREFIX}{raw}"))
    }

    /// Canonicalise a lookup string in any supported spelling
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(hash) = strip_prefix_ci(trimmed, TITLE_PREFIX) {
            return PaperId(format!("{TITLE_PREFIX}{}", hash.to_ascii_lowercase()));
        }
        if strip_prefix_ci(trimmed, EXTERNAL_PREFIX).is_some() {
            return Self::external(trimmed);
        }

        Self::doi(trimmed)
            .or_else(|| Self::arxiv(trimmed))
            .unwrap_or_else(|| Self::external(trimmed))
    }

    pub fn kind(&self) -> IdKind {
        if self.0.starts_with(DOI_PREFIX) {
            IdKind::Doi
        } else if self.0.starts_with(ARXIV_PREFIX) {
            IdKind::Arxiv
        } else if self.0.starts_with(TITLE_PREFIX) {
            IdKind::Synthetic
        } else {
            IdKind::External
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, drop punctuation, collapse whitespace
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
