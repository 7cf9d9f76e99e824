//! End-to-end pipeline tests over an in-memory store and mock index
//!
//! Drives the three stages against a small literal dump file and checks the
//! persisted and indexed results, including replay behavior.

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use wikivec_config::ApplicationConfig;
use wikivec_data::{EmbedCache, IdStore, LangStore, connect_memory};
use wikivec_dump::DumpReader;
use wikivec_embeddings::{Embedder, MockEmbedder};
use wikivec_indexing::{discover_ids, project_entities, ship_chunks};
use wikivec_textify::{Tokenizer, WhitespaceTokenizer};
use wikivec_vector_data::{MockIndex, VectorIndex};

/// Q1 is a Wikipedia member with one claim; Q2 has no sitelink; Q5 is the
/// item Q1's claim references and is itself a member.
const DUMP_LINES: &[&str] = &[
    "[",
    r#"{"id":"Q1","labels":{"en":{"language":"en","value":"Universe"}},"descriptions":{"en":{"language":"en","value":"totality of space and time"}},"aliases":{},"sitelinks":{"enwiki":{"site":"enwiki","title":"Universe"}},"claims":{"P31":[{"type":"statement","rank":"normal","mainsnak":{"snaktype":"value","datatype":"wikibase-item","datavalue":{"value":{"id":"Q5"},"type":"wikibase-entityid"}}}]}},"#,
    r#"{"id":"Q2","labels":{},"descriptions":{},"aliases":{},"sitelinks":{},"claims":{}},"#,
    r#"{"id":"Q5","labels":{"en":{"language":"en","value":"totality"}},"descriptions":{"en":{"language":"en","value":"sum of all parts"}},"aliases":{},"sitelinks":{"enwiki":{"site":"enwiki","title":"Totality"}},"claims":{}}"#,
    "]",
];

fn write_dump() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("tempfile");
    for line in DUMP_LINES {
        writeln!(file, "{line}").expect("write");
    }
    file.flush().expect("flush");
    file
}

fn config() -> ApplicationConfig {
    let mut config = ApplicationConfig::default();
    config.dump.workers = 2;
    config.dump.queue_capacity = 8;
    config.dump.dump_date = "20240101".to_string();
    config.storage.id_batch_size = 2; // exercise the threshold flush
    config.storage.lang_batch_size = 2;
    config.embedding.batch_size = 2;
    config
}

async fn stores() -> (IdStore, LangStore) {
    let pool = connect_memory().await.expect("pool");
    let ids = IdStore::open(pool.clone()).await.expect("ids");
    let entities = LangStore::open(pool).await.expect("entities");
    (ids, entities)
}

#[tokio::test]
async fn stage_a_records_members_and_their_references() {
    let dump = write_dump();
    let (ids, _) = stores().await;
    let config = config();
    let reader = DumpReader::new(dump.path(), 2, 8, 0);

    let consumed = discover_ids(&reader, &ids, &config, false)
        .await
        .expect("stage A");
    assert_eq!(consumed, 5);

    // S1: the member's own record carries the predicate.
    let q1 = ids.get("Q1").await.expect("get").expect("present");
    assert!(q1.in_wikipedia);
    assert!(!q1.is_property);

    // S2: a non-member contributes nothing.
    assert!(ids.get("Q2").await.expect("get").is_none());

    // Referenced ids carry false membership and their property flag.
    let p31 = ids.get("P31").await.expect("get").expect("present");
    assert!(!p31.in_wikipedia);
    assert!(p31.is_property);
    let q5 = ids.get("Q5").await.expect("get").expect("present");
    // Q5 is referenced by Q1 and also a member itself: monotone OR.
    assert!(q5.in_wikipedia);
    assert!(!q5.is_property);
}

#[tokio::test]
async fn stage_a_replay_is_idempotent() {
    let dump = write_dump();
    let (ids, _) = stores().await;
    let config = config();
    let reader = DumpReader::new(dump.path(), 2, 8, 0);

    discover_ids(&reader, &ids, &config, false)
        .await
        .expect("first run");
    let after_first = ids.count().await.expect("count");
    discover_ids(&reader, &ids, &config, false)
        .await
        .expect("second run");
    assert_eq!(ids.count().await.expect("count"), after_first);
}

#[tokio::test]
async fn stage_b_projects_only_discovered_ids() {
    let dump = write_dump();
    let (ids, entities) = stores().await;
    let config = config();
    let reader = DumpReader::new(dump.path(), 2, 8, 0);

    discover_ids(&reader, &ids, &config, false)
        .await
        .expect("stage A");
    project_entities(&reader, &ids, &entities, &config, false)
        .await
        .expect("stage B");

    // S1 projection.
    let q1 = entities.get("Q1").await.expect("get").expect("present");
    assert_eq!(q1.label, "Universe");
    assert_eq!(q1.description, "totality of space and time");
    assert!(q1.aliases.is_empty());
    assert_eq!(q1.claims.len(), 1);

    // S2: never enters the LangStore.
    assert!(entities.get("Q2").await.expect("get").is_none());

    // Language completeness: every projected id was discovered.
    let projected = ["Q1", "Q5"];
    for id in projected {
        assert!(
            ids.get(id).await.expect("get").is_some(),
            "{id} in LangStore but not IdStore"
        );
    }
}

#[tokio::test]
async fn stage_c_ships_one_chunk_per_small_entity() {
    let dump = write_dump();
    let (ids, entities) = stores().await;
    let config = config();
    let reader = DumpReader::new(dump.path(), 2, 8, 0);

    discover_ids(&reader, &ids, &config, false)
        .await
        .expect("stage A");
    project_entities(&reader, &ids, &entities, &config, false)
        .await
        .expect("stage B");

    let cache_pool = connect_memory().await.expect("pool");
    let cache = EmbedCache::open(cache_pool, "pipeline_test")
        .await
        .expect("cache");
    let index = Arc::new(MockIndex::new());

    let shipped = ship_chunks(
        &entities,
        &cache,
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        Arc::new(MockEmbedder::new(8)) as Arc<dyn Embedder>,
        Arc::new(WhitespaceTokenizer) as Arc<dyn Tokenizer>,
        &config,
        CancellationToken::new(),
    )
    .await
    .expect("stage C");

    // Q1 and Q5 are members; each fits in a single chunk.
    assert_eq!(shipped, 2);
    let document = index.get("Q1_en_1").expect("document");
    // Q1's only property (P31) has no resolvable label, so the rendered
    // text is just the header.
    assert_eq!(document.text, "Universe, totality of space and time.");
    assert_eq!(document.metadata.qid, "Q1");
    assert_eq!(document.metadata.chunk_id, 1);
    assert_eq!(document.metadata.language, "en");
    assert_eq!(document.metadata.dump_date, "20240101");
    assert!(document.metadata.is_item);
    assert_eq!(
        document.metadata.md5,
        format!("{:x}", md5::compute(document.text.as_bytes()))
    );

    // Both chunk ids and the shipped ledger line up.
    assert!(index.get("Q5_en_1").is_some());
    assert!(cache.get("Q1_en_1").await.expect("get").is_some());
}

#[tokio::test]
async fn stage_c_rerun_reships_nothing() {
    let dump = write_dump();
    let (ids, entities) = stores().await;
    let config = config();
    let reader = DumpReader::new(dump.path(), 2, 8, 0);

    discover_ids(&reader, &ids, &config, false)
        .await
        .expect("stage A");
    project_entities(&reader, &ids, &entities, &config, false)
        .await
        .expect("stage B");

    let cache_pool = connect_memory().await.expect("pool");
    let cache = EmbedCache::open(cache_pool, "pipeline_test")
        .await
        .expect("cache");
    let index = Arc::new(MockIndex::new());
    let embedder = Arc::new(MockEmbedder::new(8));

    for _ in 0..2 {
        ship_chunks(
            &entities,
            &cache,
            Arc::clone(&index) as Arc<dyn VectorIndex>,
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            Arc::new(WhitespaceTokenizer) as Arc<dyn Tokenizer>,
            &config,
            CancellationToken::new(),
        )
        .await
        .expect("stage C");
    }

    // The second run finds every document id in the cache and embeds
    // nothing new.
    assert_eq!(index.len(), 2);
    let embedded = embedder.embedded_texts();
    let unique: std::collections::HashSet<&String> = embedded.iter().collect();
    assert_eq!(embedded.len(), unique.len(), "no text embedded twice");
}
