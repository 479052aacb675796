//! Paper record normalizer
//!
//! Turns provider-specific JSON into the canonical [`Paper`]. Nothing past this
//! module sees a source-specific shape.
//!
//! Identifier resolution order: DOI, arXiv id, synthetic title+year hash,
//! provider id.

use citenet_common::errors::{AppError, Result};
use citenet_common::models::{normalize_topic, Paper, PaperId, SourceTag};
use serde_json::Value;
use std::collections::BTreeSet;

const UNKNOWN_TITLE: &str = "Unknown Title";

/// Fields pulled out of one raw record before identity is resolved
#[derive(Debug, Default)]
struct Extracted {
    title: Option<String>,
    authors: Vec<String>,
    year: Option<i32>,
    venue: Option<String>,
    doi: Option<String>,
    arxiv: Option<String>,
    provider_id: Option<String>,
    citation_count: Option<u64>,
    references: Vec<String>,
    cited_by: Vec<String>,
    topics: Vec<String>,
}

/// Normalize one raw record from the given source
pub fn normalize(raw: &Value, source: SourceTag) -> Result<Paper> {
    if !raw.is_object() {
        return Err(malformed(source, "record is not a JSON object"));
    }

    let mut extracted = match source {
        SourceTag::SemanticScholar => extract_semantic_scholar(raw),
        SourceTag::Arxiv => extract_arxiv(raw),
        SourceTag::Crossref => extract_crossref(raw),
        SourceTag::ScholarlySearch => extract_scholarly(raw),
    };
    extracted.topics.extend(keywords(raw.get("keywords")));

    finish(extracted, source)
}

fn finish(extracted: Extracted, source: SourceTag) -> Result<Paper> {
    let doi = extracted.doi.as_deref().and_then(PaperId::doi);
    let arxiv = extracted.arxiv.as_deref().and_then(PaperId::arxiv);
    let provider = extracted.provider_id.as_deref().map(PaperId::external);
    let synthetic = extracted
        .title
        .as_deref()
        .map(|title| PaperId::synthetic(title, extracted.year));

    let id = doi
        .clone()
        .or_else(|| arxiv.clone())
        .or_else(|| synthetic.clone())
        .or_else(|| provider.clone())
        .ok_or_else(|| malformed(source, "record has neither a title nor an identifier"))?;

    let external_ids: BTreeSet<PaperId> = [doi, arxiv, provider, synthetic]
        .into_iter()
        .flatten()
        .collect();

    let mut paper = Paper::new(
        id,
        extracted.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        source,
    )
    .with_authors(extracted.authors)
    .with_topics(extracted.topics)
    .with_citation_count(extracted.citation_count.unwrap_or(0));

    paper.year = extracted.year;
    paper.venue = extracted.venue;
    paper.references = dedup(extracted.references);
    paper.cited_by = dedup(extracted.cited_by);
    paper.external_ids.extend(external_ids);

    Ok(paper)
}

fn extract_semantic_scholar(raw: &Value) -> Extracted {
    let external = raw.get("externalIds");

    let mut topics: Vec<String> = string_list(raw.get("fieldsOfStudy"));
    if let Some(Value::Array(fields)) = raw.get("s2FieldsOfStudy") {
        topics.extend(fields.iter().filter_map(|f| text(f.get("category"))));
    }

    Extracted {
        title: text(raw.get("title")),
        authors: names(raw.get("authors")),
        year: year_value(raw.get("year")),
        venue: text(raw.get("venue")),
        doi: external.and_then(|e| text(e.get("DOI"))),
        arxiv: external.and_then(|e| text(e.get("ArXiv"))),
        provider_id: text(raw.get("paperId")),
        citation_count: count(raw.get("citationCount")),
        references: related_ids(raw.get("references")),
        cited_by: related_ids(raw.get("citations")),
        topics,
    }
}

fn extract_arxiv(raw: &Value) -> Extracted {
    let mut topics = string_list(raw.get("categories"));
    topics.extend(text(raw.get("primary_category")));

    Extracted {
        title: text(raw.get("title")),
        authors: names(raw.get("authors")),
        year: year_value(raw.get("year")).or_else(|| year_value(raw.get("published"))),
        venue: text(raw.get("journal_ref")),
        doi: text(raw.get("doi")),
        arxiv: text(raw.get("id")).or_else(|| text(raw.get("arxiv_id"))),
        provider_id: None,
        citation_count: count(raw.get("citation_count")),
        references: string_list(raw.get("references")),
        cited_by: Vec::new(),
        topics,
    }
}

fn extract_crossref(raw: &Value) -> Extracted {
    let year = ["issued", "published-print", "published-online", "created"]
        .iter()
        .find_map(|key| date_parts_year(raw.get(*key)));

    let authors = match raw.get("author") {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(|a| {
                let given = text(a.get("given"));
                let family = text(a.get("family"));
                match (given, family) {
                    (Some(g), Some(f)) => Some(format!("{g} {f}")),
                    (None, Some(f)) => Some(f),
                    (Some(g), None) => Some(g),
                    (None, None) => text(a.get("name")),
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    let references = match raw.get("reference") {
        Some(Value::Array(list)) => list.iter().filter_map(|r| text(r.get("DOI"))).collect(),
        _ => Vec::new(),
    };

    Extracted {
        title: first_text(raw.get("title")),
        authors,
        year,
        venue: first_text(raw.get("container-title")),
        doi: text(raw.get("DOI")),
        arxiv: None,
        provider_id: None,
        citation_count: count(raw.get("is-referenced-by-count")),
        references,
        cited_by: Vec::new(),
        topics: string_list(raw.get("subject")),
    }
}

fn extract_scholarly(raw: &Value) -> Extracted {
    let bib = raw.get("bib");
    let field = |key: &str| bib.and_then(|b| b.get(key));

    let authors = match field("author") {
        Some(Value::String(joined)) => joined
            .split(" and ")
            .filter_map(|a| text(Some(&Value::String(a.to_string()))))
            .collect(),
        other => names(other),
    };

    // Scholar links often point straight at arXiv
    let arxiv = text(raw.get("pub_url")).filter(|url| url.to_ascii_lowercase().contains("arxiv.org/"));

    Extracted {
        title: text(field("title")),
        authors,
        year: year_value(field("pub_year")),
        venue: text(field("venue")),
        doi: text(field("doi")),
        arxiv,
        provider_id: None,
        citation_count: count(raw.get("num_citations")),
        references: Vec::new(),
        cited_by: Vec::new(),
        topics: keywords(field("keywords")),
    }
}

/// Trimmed, whitespace-collapsed, non-empty string
fn text(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?;
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Crossref wraps many scalar fields in single-element arrays
fn first_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(list) => list.iter().find_map(|v| text(Some(v))),
        other => text(Some(other)),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list.iter().filter_map(|v| text(Some(v))).collect(),
        _ => Vec::new(),
    }
}

/// Keywords as a list or a comma/semicolon separated string
fn keywords(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(joined)) => joined
            .split([',', ';'])
            .filter_map(normalize_topic)
            .collect(),
        other => string_list(other),
    }
}

/// Author lists as plain strings or `{ "name": ... }` objects
fn names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(|a| text(Some(a)).or_else(|| text(a.get("name"))))
            .collect(),
        _ => Vec::new(),
    }
}

/// Related papers as bare ids or objects with a paperId / DOI
fn related_ids(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(|r| {
                text(Some(r))
                    .or_else(|| text(r.get("paperId")))
                    .or_else(|| r.get("externalIds").and_then(|e| text(e.get("DOI"))))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Year from a number, a "2020" string, or an ISO date prefix
fn year_value(value: Option<&Value>) -> Option<i32> {
    let year = match value? {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().get(..4).and_then(|y| y.parse().ok()),
        _ => None,
    }?;
    (1000..=9999).contains(&year).then_some(year)
}

/// Crossref `{ "date-parts": [[2020, 9, 16]] }`
fn date_parts_year(value: Option<&Value>) -> Option<i32> {
    let parts = value?.get("date-parts")?.as_array()?;
    let first = parts.first()?.as_array()?;
    year_value(first.first())
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn malformed(source: SourceTag, reason: &str) -> AppError {
    AppError::MalformedRecord {
        source_tag: source.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citenet_common::errors::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_semantic_scholar_record() {
        let raw = json!({
            "paperId": "649def34f8be52c8b66281af98ae884c09aef38b",
            "title": "Array programming with NumPy",
            "authors": [{"name": "Charles R. Harris"}, {"name": "K. Jarrod Millman"}],
            "year": 2020,
            "venue": "Nature",
            "externalIds": {"DOI": "10.1038/s41586-020-2649-2", "ArXiv": "2006.10256"},
            "citationCount": 9000,
            "references": [{"paperId": "ref1"}, {"paperId": "ref2"}, {"paperId": "ref1"}],
            "citations": [{"paperId": "cit1"}],
            "fieldsOfStudy": ["Computer Science"],
            "s2FieldsOfStudy": [{"category": "Mathematics", "source": "s2-fos-model"}]
        });

        let paper = normalize(&raw, SourceTag::SemanticScholar).unwrap();

        assert_eq!(paper.id.as_str(), "doi:10.1038/s41586-020-2649-2");
        assert_eq!(paper.authors, vec!["Charles R. Harris", "K. Jarrod Millman"]);
        assert_eq!(paper.year, Some(2020));
        assert_eq!(paper.venue.as_deref(), Some("Nature"));
        assert_eq!(paper.citation_count, 9000);
        assert_eq!(paper.references, vec!["ref1", "ref2"]);
        assert_eq!(paper.cited_by, vec!["cit1"]);
        assert!(paper.topics.contains("computer science"));
        assert!(paper.topics.contains("mathematics"));
        assert!(paper.external_ids.contains(&PaperId::parse("arXiv:2006.10256")));
        assert!(paper.external_ids.contains(&PaperId::external("649def34f8be52c8b66281af98ae884c09aef38b")));
    }

    #[test]
    fn test_arxiv_record_prefers_arxiv_without_doi() {
        let raw = json!({
            "id": "http://arxiv.org/abs/2106.15928v1",
            "title": "A Study\n  of Things",
            "authors": ["Ada Lovelace", "Alan Turing"],
            "published": "2021-06-30T10:00:00Z",
            "categories": ["cs.LG", "stat.ML"]
        });

        let paper = normalize(&raw, SourceTag::Arxiv).unwrap();

        assert_eq!(paper.id.as_str(), "arxiv:2106.15928");
        assert_eq!(paper.title, "A Study of Things");
        assert_eq!(paper.year, Some(2021));
        assert!(paper.topics.contains("cs.lg"));
    }

    #[test]
    fn test_crossref_record() {
        let raw = json!({
            "DOI": "10.1145/3292500.3330701",
            "title": ["Graph Neural Networks"],
            "author": [{"given": "Grace", "family": "Hopper"}, {"family": "Knuth"}],
            "issued": {"date-parts": [[2019, 7, 25]]},
            "container-title": ["KDD"],
            "is-referenced-by-count": 42,
            "reference": [{"key": "r1", "DOI": "10.1000/a"}, {"key": "r2"}],
            "subject": ["Information Systems"]
        });

        let paper = normalize(&raw, SourceTag::Crossref).unwrap();

        assert_eq!(paper.id.as_str(), "doi:10.1145/3292500.3330701");
        assert_eq!(paper.authors, vec!["Grace Hopper", "Knuth"]);
        assert_eq!(paper.year, Some(2019));
        assert_eq!(paper.venue.as_deref(), Some("KDD"));
        assert_eq!(paper.citation_count, 42);
        assert_eq!(paper.references, vec!["10.1000/a"]);
    }

    #[test]
    fn test_scholarly_record_without_identifier_uses_title_hash() {
        let raw = json!({
            "bib": {
                "title": "Quantum Error Mitigation in Practice",
                "author": "A. Author and B. Author",
                "pub_year": "2022",
                "venue": "PRX Quantum"
            },
            "num_citations": 17,
            "keywords": "Quantum Error Mitigation; NISQ"
        });

        let paper = normalize(&raw, SourceTag::ScholarlySearch).unwrap();

        assert_eq!(
            paper.id,
            PaperId::synthetic("quantum error mitigation in practice", Some(2022))
        );
        assert_eq!(paper.authors, vec!["A. Author", "B. Author"]);
        assert!(paper.topics.contains("quantum error mitigation"));
        assert!(paper.topics.contains("nisq"));
    }

    #[test]
    fn test_same_paper_from_two_sources_without_doi_merges() {
        let scholar = json!({"bib": {"title": "Deep Residual Learning", "pub_year": 2016}});
        let s2 = json!({"paperId": "abc", "title": "Deep residual learning", "year": 2016});

        let a = normalize(&scholar, SourceTag::ScholarlySearch).unwrap();
        let b = normalize(&s2, SourceTag::SemanticScholar).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_missing_year_is_unknown() {
        let raw = json!({"paperId": "xyz", "title": "Undated"});
        let paper = normalize(&raw, SourceTag::SemanticScholar).unwrap();
        assert_eq!(paper.year, None);
    }

    #[test]
    fn test_identifier_without_title() {
        let raw = json!({"DOI": "10.1000/untitled"});
        let paper = normalize(&raw, SourceTag::Crossref).unwrap();
        assert_eq!(paper.title, "Unknown Title");
        assert_eq!(paper.id.as_str(), "doi:10.1000/untitled");
    }

    #[test]
    fn test_record_without_title_or_identifier_is_malformed() {
        let raw = json!({"year": 2020, "authors": [{"name": "Nobody"}]});
        let err = normalize(&raw, SourceTag::SemanticScholar).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedRecord);

        let err = normalize(&json!(["not", "an", "object"]), SourceTag::Arxiv).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedRecord);
    }
}
