//! Token-bounded chunking of entity texts
//!
//! The index imposes a maximum token length per document; an entity whose
//! rendered text exceeds it is split into chunks that each repeat the header
//! (label, description, aliases) and carry a subset of the properties.
//! Properties are accumulated greedily in claim order; a property is only
//! ever truncated when it exceeds the budget all by itself.

use tracing::warn;

use wikivec_data::LangEntity;

use crate::error::TextifyResult;
use crate::locale::PropertyTextMap;
use crate::resolver::LabelResolver;
use crate::textifier::Textifier;
use crate::tokenizer::{TokenSpans, Tokenizer};

/// Split an entity's rendered text into chunks of at most `max_length`
/// tokens
///
/// # Errors
///
/// Returns an error when tokenization or label resolution fails.
pub async fn chunk_text(
    textifier: &Textifier,
    entity: &LangEntity,
    tokenizer: &dyn Tokenizer,
    resolver: &dyn LabelResolver,
    max_length: usize,
) -> TextifyResult<Vec<String>> {
    let properties = textifier.properties_to_map(&entity.claims, resolver).await?;

    // Common case: everything fits in one chunk.
    let full_text = textifier.merge(entity, &properties);
    let full_spans = tokenizer.encode(&full_text)?;
    if full_spans.token_count() <= max_length {
        return Ok(vec![full_text]);
    }

    // If the header alone blows the budget there is no room for any
    // property; emit the budget-sized prefix of the full text, located via
    // the header's token offsets.
    let header_text = textifier.merge(entity, &PropertyTextMap::new());
    let header_spans = tokenizer.encode(&header_text)?;
    if header_spans.token_count() >= max_length {
        warn!(
            entity = %entity.id,
            "entity header exceeds the chunk budget, properties are dropped"
        );
        return Ok(vec![truncate_to_tokens(&full_text, &header_spans, max_length)]);
    }

    let mut chunks = Vec::new();
    let mut accumulated = PropertyTextMap::new();

    for (label, value) in &properties {
        let mut candidate = accumulated.clone();
        candidate.insert(label.clone(), value.clone());
        let candidate_text = textifier.merge(entity, &candidate);
        let candidate_spans = tokenizer.encode(&candidate_text)?;

        if candidate_spans.token_count() < max_length {
            accumulated = candidate;
            continue;
        }

        if accumulated.is_empty() {
            // The property exceeds the budget on its own: its truncated
            // form appears exactly once.
            chunks.push(truncate_to_tokens(&candidate_text, &candidate_spans, max_length));
        } else {
            // Flush the previous accumulation (known to fit) and start a
            // fresh chunk with the current property.
            chunks.push(textifier.merge(entity, &accumulated));
            accumulated.clear();
            accumulated.insert(label.clone(), value.clone());

            let singleton_text = textifier.merge(entity, &accumulated);
            let singleton_spans = tokenizer.encode(&singleton_text)?;
            if singleton_spans.token_count() >= max_length {
                chunks.push(truncate_to_tokens(&singleton_text, &singleton_spans, max_length));
                accumulated.clear();
            }
        }
    }

    if !accumulated.is_empty() {
        let tail_text = textifier.merge(entity, &accumulated);
        let tail_spans = tokenizer.encode(&tail_text)?;
        if tail_spans.token_count() >= max_length {
            chunks.push(truncate_to_tokens(&tail_text, &tail_spans, max_length));
        } else {
            chunks.push(tail_text);
        }
    }

    Ok(chunks)
}

/// Slice `text` down to its first `max_length` tokens
///
/// The spans may come from a sibling render (the header) whose prefix is
/// shared with `text`; the range is clamped onto character boundaries of
/// `text` to stay safe either way.
fn truncate_to_tokens(text: &str, spans: &TokenSpans, max_length: usize) -> String {
    let Some((start, end)) = spans.prefix_range(max_length) else {
        return text.to_string();
    };
    let mut end = end.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut start = start.min(end);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    text.get(start..end).unwrap_or(text).to_string()
}
