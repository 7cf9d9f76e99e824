//! Chunk document assembly
//!
//! Wraps textifier chunks into the wire documents the indexes store:
//! MD5 digest, entity header metadata, emission timestamp, 1-based chunk
//! ids, and the `"<QID>_<Language>_<ChunkID>"` document id.

use chrono::Utc;

use wikivec_data::LangEntity;
use wikivec_vector_data::{ChunkDocument, ChunkMetadata};

/// Build one wire document per chunk of an entity
pub fn build_documents(
    entity: &LangEntity,
    chunks: Vec<String>,
    language: &str,
    dump_date: &str,
) -> Vec<ChunkDocument> {
    let date = Utc::now().to_rfc3339();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let chunk_id = index as u32 + 1;
            let md5 = format!("{:x}", md5::compute(text.as_bytes()));
            ChunkDocument {
                id: format!("{}_{language}_{chunk_id}", entity.id),
                metadata: ChunkMetadata {
                    md5,
                    label: entity.label.clone(),
                    description: entity.description.clone(),
                    aliases: entity.aliases.clone(),
                    date: date.clone(),
                    qid: entity.id.clone(),
                    chunk_id,
                    language: language.to_string(),
                    is_item: entity.is_item(),
                    is_property: entity.is_property(),
                    dump_date: dump_date.to_string(),
                },
                text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikivec_data::ClaimMap;

    fn entity(id: &str) -> LangEntity {
        LangEntity {
            id: id.to_string(),
            label: "Universe".to_string(),
            description: "totality of space and time".to_string(),
            aliases: vec!["cosmos".to_string()],
            claims: ClaimMap::new(),
        }
    }

    #[test]
    fn documents_carry_ids_digests_and_metadata() {
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        let documents = build_documents(&entity("Q1"), chunks, "en", "20240101");

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].id, "Q1_en_1");
        assert_eq!(documents[1].id, "Q1_en_2");
        assert_eq!(documents[0].metadata.chunk_id, 1);
        assert_eq!(documents[1].metadata.chunk_id, 2);
        assert_eq!(
            documents[0].metadata.md5,
            format!("{:x}", md5::compute(b"first chunk"))
        );
        assert_eq!(documents[0].metadata.qid, "Q1");
        assert!(documents[0].metadata.is_item);
        assert!(!documents[0].metadata.is_property);
        assert_eq!(documents[0].metadata.dump_date, "20240101");
        assert!(!documents[0].metadata.date.is_empty());
    }

    #[test]
    fn property_entities_flag_as_properties() {
        let documents = build_documents(&entity("P31"), vec!["text".to_string()], "en", "");
        assert!(documents[0].metadata.is_property);
        assert!(!documents[0].metadata.is_item);
        assert_eq!(documents[0].id, "P31_en_1");
    }
}
