//! Wire types shared by the index backends
//!
//! A chunk becomes one indexed document. The metadata field names are part
//! of the wire format: retrieval filters and downstream consumers address
//! them by these exact keys.

use serde::{Deserialize, Serialize};

/// Metadata carried by every indexed chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Hex MD5 digest of the chunk text
    #[serde(rename = "MD5")]
    pub md5: String,
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Aliases")]
    pub aliases: Vec<String>,
    /// ISO-8601 timestamp of emission
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "QID")]
    pub qid: String,
    /// 1-based chunk index within the entity
    #[serde(rename = "ChunkID")]
    pub chunk_id: u32,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "IsItem")]
    pub is_item: bool,
    #[serde(rename = "IsProperty")]
    pub is_property: bool,
    /// Date string of the dump the chunk came from
    #[serde(rename = "DumpDate")]
    pub dump_date: String,
}

/// One index-ready document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDocument {
    /// Document id `"<QID>_<Language>_<ChunkID>"`
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl ChunkDocument {
    /// The id shape retrieval results report: `"<QID>_<Language>"`
    pub fn result_id(&self) -> String {
        format!("{}_{}", self.metadata.qid, self.metadata.language)
    }
}

/// Filter applied to similarity and keyword queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Restrict results to one entity
    pub qid: Option<String>,
    /// Restrict results to any of these languages (disjunction)
    pub languages: Vec<String>,
}

impl SearchFilter {
    /// Filter on a comma-separated language list; empty input filters
    /// nothing
    pub fn for_languages(languages: Option<&str>) -> Self {
        let languages = languages
            .filter(|l| !l.is_empty())
            .map(|l| {
                l.split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            qid: None,
            languages,
        }
    }

    /// Same language filter plus a fixed QID (comparative retrieval)
    pub fn with_qid(mut self, qid: impl Into<String>) -> Self {
        self.qid = Some(qid.into());
        self
    }

    /// Whether the filter constrains anything
    pub fn is_empty(&self) -> bool {
        self.qid.is_none() && self.languages.is_empty()
    }
}

/// One retrieval result: `"<QID>_<Language>"` and its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ChunkMetadata {
        ChunkMetadata {
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            label: "Universe".to_string(),
            description: "totality of space and time".to_string(),
            aliases: vec!["cosmos".to_string()],
            date: "2024-01-01T00:00:00Z".to_string(),
            qid: "Q1".to_string(),
            chunk_id: 1,
            language: "en".to_string(),
            is_item: true,
            is_property: false,
            dump_date: "20240101".to_string(),
        }
    }

    #[test]
    fn metadata_serializes_with_wire_field_names() {
        let value = serde_json::to_value(metadata()).expect("serialize");
        for key in [
            "MD5",
            "Label",
            "Description",
            "Aliases",
            "Date",
            "QID",
            "ChunkID",
            "Language",
            "IsItem",
            "IsProperty",
            "DumpDate",
        ] {
            assert!(value.get(key).is_some(), "missing wire field {key}");
        }
    }

    #[test]
    fn result_id_is_qid_and_language() {
        let document = ChunkDocument {
            id: "Q1_en_1".to_string(),
            text: "Universe, totality of space and time.".to_string(),
            metadata: metadata(),
        };
        assert_eq!(document.result_id(), "Q1_en");
    }

    #[test]
    fn language_filter_splits_on_commas() {
        let filter = SearchFilter::for_languages(Some("en,de, ar"));
        assert_eq!(filter.languages, vec!["en", "de", "ar"]);
        assert!(SearchFilter::for_languages(Some("")).is_empty());
        assert!(SearchFilter::for_languages(None).is_empty());
    }
}
