//! Domain models for stored entities and their normalization
//!
//! The raw dump entity is a loosely-shaped JSON object; these types are the
//! cleaned, language-projected form the pipeline persists. Claim maps keep
//! insertion order because textification renders properties in dump order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Keys stripped from claims before storage; they are dump bookkeeping with
/// no bearing on textification.
const BOOKKEEPING_KEYS: [&str; 4] = ["hash", "property", "numeric-id", "qualifiers-order"];

/// One row of the id discovery table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdRecord {
    pub id: String,
    pub in_wikipedia: bool,
    pub is_property: bool,
}

impl IdRecord {
    pub fn new(id: impl Into<String>, in_wikipedia: bool, is_property: bool) -> Self {
        Self {
            id: id.into(),
            in_wikipedia,
            is_property,
        }
    }
}

/// Statement rank; `deprecated` claims are dropped at projection time and
/// never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

/// Snak kind
///
/// Unknown kinds map to `SomeValue`, which renders as the locale's
/// "no value" phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SnakType {
    #[default]
    Value,
    NoValue,
    SomeValue,
}

impl From<String> for SnakType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "value" => Self::Value,
            "novalue" => Self::NoValue,
            _ => Self::SomeValue,
        }
    }
}

/// Snak datatype, restricted to the kinds the textifier renders
///
/// Every datatype outside the rendered set (urls, coordinates, media, …)
/// collapses to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum DataType {
    #[serde(rename = "wikibase-item")]
    WikibaseItem,
    #[serde(rename = "wikibase-property")]
    WikibaseProperty,
    #[serde(rename = "monolingualtext")]
    Monolingualtext,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "quantity")]
    Quantity,
    #[serde(rename = "external-id")]
    ExternalId,
    #[default]
    #[serde(rename = "other")]
    Other,
}

impl From<String> for DataType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "wikibase-item" => Self::WikibaseItem,
            "wikibase-property" => Self::WikibaseProperty,
            "monolingualtext" => Self::Monolingualtext,
            "string" => Self::String,
            "time" => Self::Time,
            "quantity" => Self::Quantity,
            "external-id" => Self::ExternalId,
            _ => Self::Other,
        }
    }
}

/// A single snak: kind, datatype and the raw data value
///
/// The data value keeps its dump JSON shape (minus bookkeeping keys); it is
/// interpreted at textification time where the datatype dispatch lives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snak {
    #[serde(default)]
    pub snaktype: SnakType,
    #[serde(default)]
    pub datatype: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datavalue: Option<Value>,
}

/// Ordered qualifier map: property id to its snaks
pub type QualifierMap = IndexMap<String, Vec<Snak>>;

/// A cleaned claim
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Claim {
    #[serde(default)]
    pub mainsnak: Snak,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub qualifiers: QualifierMap,
    #[serde(default)]
    pub rank: Rank,
}

/// Ordered claim map: property id to its claims
pub type ClaimMap = IndexMap<String, Vec<Claim>>;

/// One language-projected entity, as stored in the LangStore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LangEntity {
    pub id: String,
    pub label: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub claims: ClaimMap,
}

impl LangEntity {
    /// Whether this entity is an item (`Q…`) rather than a property (`P…`)
    pub fn is_item(&self) -> bool {
        self.id.starts_with('Q')
    }

    /// Whether this entity is a property (`P…`)
    pub fn is_property(&self) -> bool {
        self.id.starts_with('P')
    }

    /// Project a raw dump entity onto `language`
    ///
    /// Label and description come from `language` with fallback to the
    /// multilingual pseudo-language `mul` (empty string when both are
    /// absent); aliases are the union of both; claims are cleaned (see
    /// [`clean_claims`]). Returns `None` when the entity carries no string
    /// id.
    pub fn project(entity: &Value, language: &str) -> Option<Self> {
        let id = entity.get("id")?.as_str()?.to_string();
        let label = term_with_fallback(entity.get("labels"), language);
        let description = term_with_fallback(entity.get("descriptions"), language);
        let aliases = collect_aliases(entity.get("aliases"), language);
        let claims = clean_claims(entity.get("claims"));
        Some(Self {
            id,
            label,
            description,
            aliases,
            claims,
        })
    }
}

/// Pick `labels[language].value`, falling back to `labels["mul"].value`,
/// falling back to the empty string
fn term_with_fallback(terms: Option<&Value>, language: &str) -> String {
    let Some(terms) = terms.and_then(Value::as_object) else {
        return String::new();
    };
    [language, "mul"]
        .iter()
        .find_map(|lang| terms.get(*lang))
        .and_then(|term| term.get("value"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Union of the target-language and multilingual aliases, first-seen order,
/// duplicates removed
fn collect_aliases(aliases: Option<&Value>, language: &str) -> Vec<String> {
    let Some(aliases) = aliases.and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut seen = std::collections::HashSet::new();
    let mut collected = Vec::new();
    for lang in [language, "mul"] {
        let Some(entries) = aliases.get(lang).and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            if let Some(value) = entry.get("value").and_then(Value::as_str)
                && seen.insert(value.to_string())
            {
                collected.push(value.to_string());
            }
        }
    }
    collected
}

/// Clean raw dump claims for storage
///
/// Keeps statements that are not `deprecated`, strips bookkeeping keys, and
/// drops properties left with no claims. Claims that fail to decode are
/// logged and skipped.
pub fn clean_claims(claims: Option<&Value>) -> ClaimMap {
    let mut cleaned = ClaimMap::new();
    let Some(claims) = claims.and_then(Value::as_object) else {
        return cleaned;
    };
    for (pid, statements) in claims {
        let Some(statements) = statements.as_array() else {
            continue;
        };
        let mut kept = Vec::new();
        for statement in statements {
            let is_statement = statement
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t == "statement");
            let rank = statement.get("rank").and_then(Value::as_str);
            if !is_statement || rank == Some("deprecated") {
                continue;
            }
            match decode_claim(statement) {
                Ok(claim) => kept.push(claim),
                Err(e) => {
                    warn!(pid = %pid, error = %e, "skipping undecodable claim");
                }
            }
        }
        if !kept.is_empty() {
            cleaned.insert(pid.clone(), kept);
        }
    }
    cleaned
}

fn decode_claim(statement: &Value) -> Result<Claim, serde_json::Error> {
    let mainsnak = statement
        .get("mainsnak")
        .map(|snak| strip_bookkeeping(snak.clone()))
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();
    let qualifiers = statement
        .get("qualifiers")
        .map(|qualifiers| strip_bookkeeping(qualifiers.clone()))
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();
    let rank = statement
        .get("rank")
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();
    Ok(Claim {
        mainsnak,
        qualifiers,
        rank,
    })
}

/// Recursively remove dump bookkeeping keys from a JSON tree
pub fn strip_bookkeeping(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !BOOKKEEPING_KEYS.contains(&key.as_str()))
                .map(|(key, inner)| (key, strip_bookkeeping(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_bookkeeping).collect()),
        other => other,
    }
}

/// The Wikipedia membership predicate of the id discovery stage
///
/// True iff the entity carries a `<language>wiki` sitelink AND a label AND a
/// description resolvable in `language` or `mul`.
pub fn entity_in_wikipedia(entity: &Value, language: &str) -> bool {
    let has_sitelink = entity
        .get("sitelinks")
        .and_then(Value::as_object)
        .is_some_and(|links| links.contains_key(&format!("{language}wiki")));
    has_sitelink
        && has_term(entity.get("labels"), language)
        && has_term(entity.get("descriptions"), language)
}

fn has_term(terms: Option<&Value>, language: &str) -> bool {
    terms
        .and_then(Value::as_object)
        .is_some_and(|terms| terms.contains_key(language) || terms.contains_key("mul"))
}

/// Collect the id records contributed by one dump entity
///
/// The entity's own record carries the `in_wikipedia` predicate; every id
/// referenced from claims and qualifiers (property ids, item/property
/// values, non-unity quantity units) is recorded with `in_wikipedia = false`
/// and `is_property` as appropriate. Upserts are monotone-OR, so a
/// referenced entity later scanned directly gets its flag raised.
pub fn extract_entity_ids(entity: &Value, language: &str) -> Vec<IdRecord> {
    let Some(own_id) = entity.get("id").and_then(Value::as_str) else {
        return Vec::new();
    };
    let mut records = vec![IdRecord::new(
        own_id,
        entity_in_wikipedia(entity, language),
        false,
    )];

    let Some(claims) = entity.get("claims").and_then(Value::as_object) else {
        return records;
    };
    for (pid, statements) in claims {
        records.push(IdRecord::new(pid.clone(), false, true));
        let Some(statements) = statements.as_array() else {
            continue;
        };
        for statement in statements {
            if let Some(mainsnak) = statement.get("mainsnak") {
                push_snak_references(mainsnak, &mut records);
            }
            let Some(qualifiers) = statement.get("qualifiers").and_then(Value::as_object) else {
                continue;
            };
            for (qualifier_pid, snaks) in qualifiers {
                records.push(IdRecord::new(qualifier_pid.clone(), false, true));
                let Some(snaks) = snaks.as_array() else {
                    continue;
                };
                for snak in snaks {
                    push_snak_references(snak, &mut records);
                }
            }
        }
    }
    records
}

/// Record ids referenced by a single snak's data value
fn push_snak_references(snak: &Value, records: &mut Vec<IdRecord>) {
    let Some(value) = snak.get("datavalue").and_then(|dv| dv.get("value")) else {
        return;
    };
    match snak.get("datatype").and_then(Value::as_str) {
        Some("wikibase-item") => {
            if let Some(id) = value.get("id").and_then(Value::as_str) {
                records.push(IdRecord::new(id, false, false));
            }
        }
        Some("wikibase-property") => {
            if let Some(id) = value.get("id").and_then(Value::as_str) {
                records.push(IdRecord::new(id, false, true));
            }
        }
        Some("quantity") => {
            let unit = value.get("unit").and_then(Value::as_str).unwrap_or("1");
            if unit != "1"
                && let Some(id) = unit.rsplit('/').next()
                && !id.is_empty()
            {
                records.push(IdRecord::new(id, false, false));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wikipedia_entity() -> Value {
        json!({
            "id": "Q1",
            "labels": {"en": {"language": "en", "value": "Universe"}},
            "descriptions": {"en": {"language": "en", "value": "totality of space and time"}},
            "aliases": {},
            "sitelinks": {"enwiki": {"site": "enwiki", "title": "Universe"}},
            "claims": {}
        })
    }

    #[test]
    fn in_wikipedia_requires_sitelink_label_and_description() {
        assert!(entity_in_wikipedia(&wikipedia_entity(), "en"));

        let no_sitelink = json!({
            "id": "Q2",
            "labels": {"en": {"value": "x"}},
            "descriptions": {"en": {"value": "y"}},
            "sitelinks": {}
        });
        assert!(!entity_in_wikipedia(&no_sitelink, "en"));

        let no_description = json!({
            "id": "Q2",
            "labels": {"en": {"value": "x"}},
            "descriptions": {},
            "sitelinks": {"enwiki": {}}
        });
        assert!(!entity_in_wikipedia(&no_description, "en"));
    }

    #[test]
    fn mul_terms_satisfy_the_predicate() {
        let entity = json!({
            "id": "Q3",
            "labels": {"mul": {"value": "x"}},
            "descriptions": {"mul": {"value": "y"}},
            "sitelinks": {"enwiki": {}}
        });
        assert!(entity_in_wikipedia(&entity, "en"));
        // The sitelink is still language-scoped.
        assert!(!entity_in_wikipedia(&entity, "de"));
    }

    #[test]
    fn extract_ids_walks_claims_and_qualifiers() {
        let entity = json!({
            "id": "Q5",
            "labels": {"en": {"value": "human"}},
            "descriptions": {"en": {"value": "a person"}},
            "sitelinks": {"enwiki": {}},
            "claims": {
                "P31": [{
                    "type": "statement",
                    "rank": "normal",
                    "mainsnak": {
                        "snaktype": "value",
                        "datatype": "wikibase-item",
                        "datavalue": {"value": {"id": "Q7"}, "type": "wikibase-entityid"}
                    },
                    "qualifiers": {
                        "P585": [{
                            "snaktype": "value",
                            "datatype": "quantity",
                            "datavalue": {
                                "value": {"amount": "+3", "unit": "http://www.wikidata.org/entity/Q11573"},
                                "type": "quantity"
                            }
                        }]
                    }
                }],
                "P1687": [{
                    "type": "statement",
                    "rank": "normal",
                    "mainsnak": {
                        "snaktype": "value",
                        "datatype": "wikibase-property",
                        "datavalue": {"value": {"id": "P569"}, "type": "wikibase-entityid"}
                    }
                }]
            }
        });

        let records = extract_entity_ids(&entity, "en");
        let find = |id: &str| records.iter().find(|r| r.id == id).cloned();

        let own = find("Q5").expect("own record");
        assert!(own.in_wikipedia);
        assert!(!own.is_property);

        assert!(find("P31").expect("claim property").is_property);
        assert!(!find("Q7").expect("item value").is_property);
        assert!(find("P585").expect("qualifier property").is_property);
        assert!(!find("Q11573").expect("quantity unit").is_property);
        assert!(find("P569").expect("property value").is_property);
        // Referenced ids never inherit wikipedia membership.
        assert!(records.iter().filter(|r| r.id != "Q5").all(|r| !r.in_wikipedia));
    }

    #[test]
    fn unit_quantity_contributes_no_unit_record() {
        let entity = json!({
            "id": "Q6",
            "claims": {
                "P1082": [{
                    "type": "statement",
                    "rank": "normal",
                    "mainsnak": {
                        "snaktype": "value",
                        "datatype": "quantity",
                        "datavalue": {"value": {"amount": "+42", "unit": "1"}, "type": "quantity"}
                    }
                }]
            }
        });
        let records = extract_entity_ids(&entity, "en");
        assert_eq!(records.len(), 2); // Q6 + P1082 only
    }

    #[test]
    fn projection_prefers_language_and_falls_back_to_mul() {
        let entity = json!({
            "id": "Q9",
            "labels": {"mul": {"value": "Mul Label"}},
            "descriptions": {"en": {"value": "english description"}, "mul": {"value": "mul description"}},
            "aliases": {
                "en": [{"value": "alpha"}, {"value": "beta"}],
                "mul": [{"value": "beta"}, {"value": "gamma"}]
            },
            "claims": {}
        });
        let projected = LangEntity::project(&entity, "en").expect("entity");
        assert_eq!(projected.label, "Mul Label");
        assert_eq!(projected.description, "english description");
        assert_eq!(projected.aliases, vec!["alpha", "beta", "gamma"]);
        assert!(projected.claims.is_empty());
    }

    #[test]
    fn projection_yields_empty_strings_when_terms_are_missing() {
        let entity = json!({"id": "Q2", "labels": {}, "descriptions": {}, "sitelinks": {}});
        let projected = LangEntity::project(&entity, "en").expect("entity");
        assert_eq!(projected.label, "");
        assert_eq!(projected.description, "");
        assert!(projected.aliases.is_empty());
    }

    #[test]
    fn deprecated_claims_are_dropped() {
        let claims = json!({
            "P17": [
                {
                    "type": "statement",
                    "rank": "deprecated",
                    "mainsnak": {"snaktype": "value", "datatype": "string",
                                 "datavalue": {"value": "old", "type": "string"}}
                },
                {
                    "type": "statement",
                    "rank": "normal",
                    "mainsnak": {"snaktype": "value", "datatype": "string",
                                 "datavalue": {"value": "current", "type": "string"}}
                }
            ]
        });
        let cleaned = clean_claims(Some(&claims));
        let kept = cleaned.get("P17").expect("property kept");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].rank, Rank::Normal);
    }

    #[test]
    fn all_deprecated_drops_the_property() {
        let claims = json!({
            "P17": [{
                "type": "statement",
                "rank": "deprecated",
                "mainsnak": {"snaktype": "value", "datatype": "string",
                             "datavalue": {"value": "old", "type": "string"}}
            }]
        });
        assert!(clean_claims(Some(&claims)).is_empty());
    }

    #[test]
    fn bookkeeping_keys_are_stripped_recursively() {
        let snak = json!({
            "snaktype": "value",
            "datatype": "wikibase-item",
            "hash": "abc123",
            "datavalue": {"value": {"id": "Q42", "numeric-id": 42}, "type": "wikibase-entityid"}
        });
        let stripped = strip_bookkeeping(snak);
        assert!(stripped.get("hash").is_none());
        assert!(stripped["datavalue"]["value"].get("numeric-id").is_none());
        assert_eq!(stripped["datavalue"]["value"]["id"], "Q42");
    }

    #[test]
    fn claim_map_round_trips_through_json_in_order() {
        let claims = json!({
            "P31": [{"type": "statement", "rank": "preferred",
                     "mainsnak": {"snaktype": "value", "datatype": "string",
                                  "datavalue": {"value": "a", "type": "string"}}}],
            "P17": [{"type": "statement", "rank": "normal",
                     "mainsnak": {"snaktype": "novalue", "datatype": "wikibase-item"}}]
        });
        let cleaned = clean_claims(Some(&claims));
        let encoded = serde_json::to_string(&cleaned).expect("encode");
        let decoded: ClaimMap = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(cleaned, decoded);
        let keys: Vec<&String> = decoded.keys().collect();
        assert_eq!(keys, vec!["P31", "P17"]);
        assert_eq!(decoded["P31"][0].rank, Rank::Preferred);
        assert_eq!(decoded["P17"][0].mainsnak.snaktype, SnakType::NoValue);
    }

    #[test]
    fn unknown_datatype_decodes_as_other() {
        let snak: Snak = serde_json::from_value(json!({
            "snaktype": "value",
            "datatype": "globe-coordinate",
            "datavalue": {"value": {"latitude": 1.0}, "type": "globecoordinate"}
        }))
        .expect("snak");
        assert_eq!(snak.datatype, DataType::Other);
    }
}
