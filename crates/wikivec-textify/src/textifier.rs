//! Entity textification
//!
//! Turns a language-projected entity into the locale-formatted string the
//! index stores. Rendering has two phases: an async resolution phase that
//! walks claims and qualifiers turning snaks into text (label lookups hit
//! the store), and a pure merge phase over the resolved property map. The
//! chunker re-runs only the merge phase as it searches for chunk boundaries.

use serde_json::Value;
use tracing::warn;

use wikivec_data::{ClaimMap, DataType, LangEntity, QualifierMap, Rank, Snak, SnakType};

use crate::error::TextifyResult;
use crate::locale::{ClaimText, LocalePack, PropertyTextMap, QualifierTextMap};
use crate::resolver::LabelResolver;
use crate::time::time_to_text;

/// Default calendar model assumed when a time value carries none
const DEFAULT_CALENDAR: &str = "http://www.wikidata.org/entity/Q1985786";

/// Outcome of rendering a single snak
///
/// `Text` is a usable value (the "no value" phrase included); `Skip` omits
/// this value while keeping its siblings; `Drop` discards the whole property
/// from the rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnakText {
    Text(String),
    Skip,
    Drop,
}

/// Locale-bound entity renderer
pub struct Textifier {
    pack: &'static LocalePack,
}

impl Textifier {
    /// Create a textifier for a locale code
    ///
    /// # Errors
    ///
    /// Returns an error when no locale pack exists for the code.
    pub fn new(locale: &str) -> TextifyResult<Self> {
        Ok(Self {
            pack: LocalePack::for_code(locale)?,
        })
    }

    /// The locale pack in use
    pub const fn pack(&self) -> &'static LocalePack {
        self.pack
    }

    /// The language this textifier renders
    pub const fn language(&self) -> &'static str {
        self.pack.language
    }

    /// Render one snak
    ///
    /// Dispatches on snak type and datatype. Malformed time and quantity
    /// payloads degrade to their raw fields with a warning rather than
    /// failing the entity.
    ///
    /// # Errors
    ///
    /// Returns a resolver error when a label lookup fails.
    pub async fn snak_to_text(
        &self,
        snak: &Snak,
        resolver: &dyn LabelResolver,
    ) -> TextifyResult<SnakText> {
        // The stored datavalue keeps the dump's `{value, type}` wrapper.
        let value = snak
            .datavalue
            .as_ref()
            .map(|datavalue| datavalue.get("value").unwrap_or(datavalue));

        let Some(value) = value else {
            return Ok(SnakText::Text(self.pack.no_value.to_string()));
        };
        if snak.snaktype != SnakType::Value {
            return Ok(SnakText::Text(self.pack.no_value.to_string()));
        }

        // Language-bound values only render in their own language.
        if let Some(language) = value.get("language").and_then(Value::as_str)
            && language != self.pack.language
        {
            return Ok(SnakText::Skip);
        }

        match snak.datatype {
            DataType::WikibaseItem | DataType::WikibaseProperty => {
                let id = value
                    .as_str()
                    .or_else(|| value.get("id").and_then(Value::as_str));
                let Some(id) = id else {
                    warn!("entity reference without id, skipping value");
                    return Ok(SnakText::Skip);
                };
                // A lookup miss suppresses exactly this claim's value;
                // sibling claims keep rendering.
                Ok(resolver
                    .label(id)
                    .await?
                    .map_or(SnakText::Skip, SnakText::Text))
            }
            DataType::Monolingualtext => Ok(value
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| value.as_str())
                .map_or(SnakText::Skip, |text| SnakText::Text(text.to_string()))),
            DataType::String => Ok(value
                .as_str()
                .map_or(SnakText::Skip, |text| SnakText::Text(text.to_string()))),
            DataType::Time => Ok(self.render_time(value)),
            DataType::Quantity => self.render_quantity(value, resolver).await,
            DataType::ExternalId => Ok(SnakText::Drop),
            DataType::Other => Ok(SnakText::Skip),
        }
    }

    /// Render a time datavalue, falling back to the raw time string when
    /// the payload is malformed
    fn render_time(&self, value: &Value) -> SnakText {
        let Some(time) = value.get("time").and_then(Value::as_str) else {
            warn!("time value without time field, skipping");
            return SnakText::Skip;
        };
        let precision = value
            .get("precision")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(11);
        let calendarmodel = value
            .get("calendarmodel")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CALENDAR);
        match time_to_text(time, precision, calendarmodel, self.pack) {
            Ok(text) => SnakText::Text(text),
            Err(e) => {
                warn!(error = %e, "time formatting failed, using raw value");
                SnakText::Text(time.to_string())
            }
        }
    }

    /// Render a quantity datavalue: amount plus unit label when the unit is
    /// not unity
    async fn render_quantity(
        &self,
        value: &Value,
        resolver: &dyn LabelResolver,
    ) -> TextifyResult<SnakText> {
        let amount = match value.get("amount") {
            Some(Value::String(amount)) => amount.clone(),
            Some(Value::Number(amount)) => amount.to_string(),
            _ => {
                warn!("quantity without amount, skipping value");
                return Ok(SnakText::Skip);
            }
        };
        let unit = value.get("unit").and_then(Value::as_str).unwrap_or("1");
        if unit == "1" {
            return Ok(SnakText::Text(amount));
        }
        let unit_id = unit.rsplit('/').next().unwrap_or(unit);
        Ok(match resolver.label(unit_id).await? {
            Some(unit_label) => SnakText::Text(format!("{amount} {unit_label}")),
            None => SnakText::Text(amount),
        })
    }

    /// Resolve one claim's qualifiers into rendered text lists
    ///
    /// # Errors
    ///
    /// Returns a resolver error when a label lookup fails.
    pub async fn qualifiers_to_map(
        &self,
        qualifiers: &QualifierMap,
        resolver: &dyn LabelResolver,
    ) -> TextifyResult<QualifierTextMap> {
        let mut map = QualifierTextMap::new();
        for (pid, snaks) in qualifiers {
            let mut values: Option<Vec<String>> = Some(Vec::new());
            for snak in snaks {
                match self.snak_to_text(snak, resolver).await? {
                    SnakText::Drop => {
                        values = None;
                        break;
                    }
                    SnakText::Skip => {}
                    SnakText::Text(text) => {
                        if let Some(list) = values.as_mut() {
                            list.push(text);
                        }
                    }
                }
            }
            if let Some(label) = resolver.label(pid).await? {
                map.insert(label, values);
            }
        }
        Ok(map)
    }

    /// Resolve an entity's claims into the property map the merge phase
    /// renders
    ///
    /// Rank selection per property: if any claim is `preferred`, only
    /// preferred claims are kept, otherwise `normal` ones; `deprecated`
    /// never renders. Properties whose own label cannot be resolved are
    /// omitted from the map entirely.
    ///
    /// # Errors
    ///
    /// Returns a resolver error when a label lookup fails.
    pub async fn properties_to_map(
        &self,
        claims: &ClaimMap,
        resolver: &dyn LabelResolver,
    ) -> TextifyResult<PropertyTextMap> {
        let mut map = PropertyTextMap::new();
        for (pid, claims) in claims {
            let mut values: Option<Vec<ClaimText>> = Some(Vec::new());
            let mut preferred_found = false;

            for claim in claims {
                if claim.rank == Rank::Deprecated {
                    continue;
                }
                match self.snak_to_text(&claim.mainsnak, resolver).await? {
                    SnakText::Drop => {
                        values = None;
                        break;
                    }
                    SnakText::Skip => {}
                    SnakText::Text(text) => {
                        let include = (!preferred_found && claim.rank == Rank::Normal)
                            || claim.rank == Rank::Preferred;
                        if !include {
                            continue;
                        }
                        if !preferred_found && claim.rank == Rank::Preferred {
                            preferred_found = true;
                            if let Some(list) = values.as_mut() {
                                list.clear();
                            }
                        }
                        let qualifiers =
                            self.qualifiers_to_map(&claim.qualifiers, resolver).await?;
                        if let Some(list) = values.as_mut() {
                            list.push(ClaimText {
                                value: text,
                                qualifiers,
                            });
                        }
                    }
                }
            }

            if let Some(label) = resolver.label(pid).await? {
                map.insert(label, values);
            }
        }
        Ok(map)
    }

    /// Merge an entity's header with an already-resolved property map
    pub fn merge(&self, entity: &LangEntity, properties: &PropertyTextMap) -> String {
        self.pack.merge_entity_text(
            &entity.label,
            &entity.description,
            &entity.aliases,
            properties,
        )
    }

    /// Render the full entity text
    ///
    /// # Errors
    ///
    /// Returns a resolver error when a label lookup fails.
    pub async fn entity_to_text(
        &self,
        entity: &LangEntity,
        resolver: &dyn LabelResolver,
    ) -> TextifyResult<String> {
        let properties = self.properties_to_map(&entity.claims, resolver).await?;
        Ok(self.merge(entity, &properties))
    }
}
