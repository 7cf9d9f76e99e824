//! Stage entry points
//!
//! Each stage reads its predecessor's persisted output and writes its own,
//! so stages are independently restartable and a rerun reconverges to the
//! same state. Handlers accumulate records behind a mutex and flush through
//! the store's bulk operation once the threshold is crossed; whatever is
//! left at end-of-stream is flushed in a retry loop until it lands.

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wikivec_config::ApplicationConfig;
use wikivec_data::{
    EmbedCache, IdRecord, IdStore, LangEntity, LangStore, entity_in_wikipedia, extract_entity_ids,
};
use wikivec_dump::DumpReader;
use wikivec_embeddings::Embedder;
use wikivec_textify::{Textifier, Tokenizer, chunk_text};
use wikivec_vector_data::VectorIndex;

use crate::batch_writer::BatchWriter;
use crate::documents::build_documents;
use crate::error::{IndexingError, IndexingResult};
use crate::resolver::StoreResolver;

const RESIDUAL_RETRY_SLEEP: Duration = Duration::from_secs(1);
const SCAN_PAGE_SIZE: usize = 500;

/// Stage A: scan the dump and persist every discovered identifier
///
/// Entities that satisfy the Wikipedia-membership predicate contribute
/// their own record (flag true) plus records for every id referenced from
/// claims and qualifiers (flags false, property bit as appropriate); other
/// entities contribute nothing. Upserts are monotone-OR, so replays and
/// reference-first discoveries converge.
///
/// Returns the number of dump lines consumed.
///
/// # Errors
///
/// Fails when the dump cannot be read or the store breaks fatally.
pub async fn discover_ids(
    reader: &DumpReader,
    store: &IdStore,
    config: &ApplicationConfig,
    verbose: bool,
) -> IndexingResult<u64> {
    let batch: Arc<Mutex<Vec<IdRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let language = config.language.clone();
    let threshold = config.storage.id_batch_size;

    info!(language = %language, "stage A: id discovery starting");

    let handler_store = store.clone();
    let handler_batch = Arc::clone(&batch);
    let consumed = reader
        .run(
            move |entity| {
                let store = handler_store.clone();
                let batch = Arc::clone(&handler_batch);
                let language = language.clone();
                async move {
                    // Only Wikipedia members contribute records; their own
                    // id plus everything referenced from claims and
                    // qualifiers.
                    if !entity_in_wikipedia(&entity, &language) {
                        return;
                    }
                    let records = extract_entity_ids(&entity, &language);
                    if records.is_empty() {
                        return;
                    }
                    let mut guard = batch.lock().await;
                    guard.extend(records);
                    if guard.len() > threshold {
                        let pending: Vec<IdRecord> = guard.drain(..).collect();
                        if let Err(e) = store.bulk_upsert(&pending).await {
                            warn!(error = %e, "id batch flush failed, retrying later");
                            guard.extend(pending);
                        }
                    }
                }
            },
            None,
            verbose,
        )
        .await?;

    // Residual flush: keep trying until the batch lands.
    loop {
        let pending: Vec<IdRecord> = { batch.lock().await.drain(..).collect() };
        if pending.is_empty() {
            break;
        }
        match store.bulk_upsert(&pending).await {
            Ok(()) => break,
            Err(e) => {
                warn!(error = %e, "residual id flush failed, retrying");
                batch.lock().await.extend(pending);
                sleep(RESIDUAL_RETRY_SLEEP).await;
            }
        }
    }

    info!(consumed, ids = store.count().await?, "stage A complete");
    Ok(consumed)
}

/// Stage B: project discovered entities onto the target language
///
/// Only entities already present in the IdStore are projected; the insert
/// is conflict-ignore, so the first projection of an id wins and replays
/// are no-ops.
///
/// Returns the number of dump lines consumed.
///
/// # Errors
///
/// Fails when the dump cannot be read or a store breaks fatally.
pub async fn project_entities(
    reader: &DumpReader,
    ids: &IdStore,
    entities: &LangStore,
    config: &ApplicationConfig,
    verbose: bool,
) -> IndexingResult<u64> {
    let batch: Arc<Mutex<Vec<LangEntity>>> = Arc::new(Mutex::new(Vec::new()));
    let language = config.language.clone();
    let threshold = config.storage.lang_batch_size;

    info!(language = %language, "stage B: language projection starting");

    let handler_ids = ids.clone();
    let handler_entities = entities.clone();
    let handler_batch = Arc::clone(&batch);
    let consumed = reader
        .run(
            move |entity| {
                let ids = handler_ids.clone();
                let store = handler_entities.clone();
                let batch = Arc::clone(&handler_batch);
                let language = language.clone();
                async move {
                    let Some(id) = entity.get("id").and_then(serde_json::Value::as_str) else {
                        return;
                    };
                    match ids.contains(id).await {
                        Ok(true) => {}
                        Ok(false) => return,
                        Err(e) => {
                            warn!(id, error = %e, "id lookup failed, skipping entity");
                            return;
                        }
                    }
                    let Some(projected) = LangEntity::project(&entity, &language) else {
                        return;
                    };
                    let mut guard = batch.lock().await;
                    guard.push(projected);
                    if guard.len() > threshold {
                        let pending: Vec<LangEntity> = guard.drain(..).collect();
                        if let Err(e) = store.bulk_insert(&pending).await {
                            warn!(error = %e, "entity batch flush failed, retrying later");
                            guard.extend(pending);
                        }
                    }
                }
            },
            None,
            verbose,
        )
        .await?;

    loop {
        let pending: Vec<LangEntity> = { batch.lock().await.drain(..).collect() };
        if pending.is_empty() {
            break;
        }
        match entities.bulk_insert(&pending).await {
            Ok(()) => break,
            Err(e) => {
                warn!(error = %e, "residual entity flush failed, retrying");
                batch.lock().await.extend(pending);
                sleep(RESIDUAL_RETRY_SLEEP).await;
            }
        }
    }

    info!(consumed, entities = entities.count().await?, "stage B complete");
    Ok(consumed)
}

/// Stage C: textify, chunk and ship every Wikipedia-member entity
///
/// Entities stream out of the LangStore into a bounded queue feeding N
/// workers. Each worker owns a private [`BatchWriter`]; the embedding cache
/// and the index are the only shared sinks. Entities without a label are
/// skipped. On cancellation the producer stops and workers drain the queue,
/// flushing their partial batches before exiting.
///
/// Returns the number of entities shipped.
///
/// # Errors
///
/// Fails on fatal store, embedding or index errors, or when cancelled
/// mid-flush.
#[allow(clippy::too_many_arguments)]
pub async fn ship_chunks(
    entities: &LangStore,
    cache: &EmbedCache,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    tokenizer: Arc<dyn Tokenizer>,
    config: &ApplicationConfig,
    cancel: CancellationToken,
) -> IndexingResult<u64> {
    let resolver = Arc::new(StoreResolver::new(
        entities.clone(),
        config.textifier.label_cache_capacity,
    ));
    let language = config.language.clone();
    let dump_date = config.dump.dump_date.clone();
    let max_tokens = config.textifier.max_chunk_tokens;
    let workers = config.dump.workers;

    info!(language = %language, workers, "stage C: textify and ship starting");

    let (tx, rx) = mpsc::channel::<LangEntity>(config.dump.queue_capacity);
    let rx = Arc::new(Mutex::new(rx));

    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let rx = Arc::clone(&rx);
        let resolver = Arc::clone(&resolver);
        let tokenizer = Arc::clone(&tokenizer);
        let textifier = Textifier::new(&config.locale)?;
        let language = language.clone();
        let dump_date = dump_date.clone();
        let mut writer = BatchWriter::new(
            Arc::clone(&index),
            Arc::clone(&embedder),
            cache.clone(),
            config.embedding.batch_size,
        )
        .with_cancellation(cancel.clone());

        handles.push(tokio::spawn(async move {
            let mut shipped: u64 = 0;
            loop {
                let entity = { rx.lock().await.recv().await };
                let Some(entity) = entity else {
                    break;
                };
                if entity.label.is_empty() {
                    debug!(id = %entity.id, "entity without label, skipping");
                    continue;
                }
                let chunks = match chunk_text(
                    &textifier,
                    &entity,
                    tokenizer.as_ref(),
                    resolver.as_ref(),
                    max_tokens,
                )
                .await
                {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        warn!(id = %entity.id, error = %e, "textification failed, skipping");
                        continue;
                    }
                };
                for document in build_documents(&entity, chunks, &language, &dump_date) {
                    writer.add_document(document).await?;
                }
                shipped += 1;
            }
            // Leftover maintenance: empty the batch before exiting.
            while writer.flush().await? {}
            debug!(worker_id, shipped, "ship worker finished");
            Ok::<u64, IndexingError>(shipped)
        }));
    }

    let stream = entities.stream_wikipedia(SCAN_PAGE_SIZE);
    futures::pin_mut!(stream);
    while let Some(entity) = stream.try_next().await? {
        if cancel.is_cancelled() {
            info!("stage C cancelled, draining queue");
            break;
        }
        if tx.send(entity).await.is_err() {
            break;
        }
    }
    drop(tx);

    let mut total: u64 = 0;
    for handle in handles {
        total += handle
            .await
            .map_err(|e| IndexingError::Other(format!("ship worker panicked: {e}")))??;
    }

    info!(total, "stage C complete");
    Ok(total)
}
