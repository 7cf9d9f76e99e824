//! Locale packs
//!
//! A pack is pure data: phrases, separators, quotes and calendar labels for
//! one language. The composition of entity text out of label, description,
//! aliases and properties is generic over the pack, so adding a language
//! means adding a data file, not code branches.

mod ar;
mod de;
mod en;

use indexmap::IndexMap;

use crate::error::{TextifyError, TextifyResult};

/// Rendered values of one claim: the main value plus its qualifier texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimText {
    pub value: String,
    /// Qualifier label → rendered values; `None` marks a qualifier whose
    /// values were suppressed entirely
    pub qualifiers: QualifierTextMap,
}

/// Qualifier label → rendered values
pub type QualifierTextMap = IndexMap<String, Option<Vec<String>>>;

/// Property label → rendered claims; `None` marks a property kept in the
/// map but excluded from the text (all of its values were suppressed)
pub type PropertyTextMap = IndexMap<String, Option<Vec<ClaimText>>>;

/// Formatting rules for one language
#[derive(Debug, Clone, Copy)]
pub struct LocalePack {
    /// Language code the pack belongs to
    pub language: &'static str,

    /// Phrase rendered for `novalue` snaks
    pub no_value: &'static str,

    /// Separator between label, description and the alias clause
    pub term_separator: &'static str,
    /// Separator inside value lists
    pub list_separator: &'static str,
    /// Phrase introducing the alias list (with trailing space)
    pub also_known_as: &'static str,
    /// Phrase introducing the property block (with trailing space)
    pub attributes_include: &'static str,
    /// Phrase for properties/qualifiers present without values; empty
    /// disables the "has X" rendering
    pub has_phrase: &'static str,

    /// Quotes around the whole value list of a property
    pub claims_open_quote: &'static str,
    pub claims_close_quote: &'static str,
    /// Quotes around each individual value
    pub value_open_quote: &'static str,
    pub value_close_quote: &'static str,
    /// Separator between values of one property
    pub claim_join: &'static str,

    /// Opening/closing of one qualifier group and the separator between
    /// groups
    pub qualifier_group_open: &'static str,
    pub qualifier_group_close: &'static str,
    pub qualifier_group_separator: &'static str,
    /// Wrapping around the full qualifier block
    pub qualifiers_prefix: &'static str,
    pub qualifiers_suffix: &'static str,

    /// Month names, January first
    pub months: [&'static str; 12],
    /// Era suffixes
    pub era_ad: &'static str,
    pub era_bc: &'static str,
    /// Period suffixes and labels for coarse time precisions
    pub decade_suffix: &'static str,
    pub century_suffix: &'static str,
    pub millennium_suffix: &'static str,
    pub ten_thousand_years: &'static str,
    pub hundred_thousand_years: &'static str,
    pub million_years: &'static str,
    pub tens_of_millions_years: &'static str,
    pub hundred_million_years: &'static str,
    pub billion_years: &'static str,
}

impl LocalePack {
    /// Look up the pack for a language code
    ///
    /// # Errors
    ///
    /// Returns [`TextifyError::UnknownLocale`] for codes without a pack.
    pub fn for_code(code: &str) -> TextifyResult<&'static Self> {
        match code {
            "en" => Ok(&en::PACK),
            "de" => Ok(&de::PACK),
            "ar" => Ok(&ar::PACK),
            other => Err(TextifyError::UnknownLocale(other.to_string())),
        }
    }

    /// Language codes with a pack
    pub const fn supported() -> &'static [&'static str] {
        &["en", "de", "ar"]
    }

    /// Merge label, description, aliases and properties into the entity text
    ///
    /// With no properties the header ends with a period; otherwise the
    /// property block follows the attributes phrase. Properties whose value
    /// list is `None` contribute nothing but still count as present.
    pub fn merge_entity_text(
        &self,
        label: &str,
        description: &str,
        aliases: &[String],
        properties: &PropertyTextMap,
    ) -> String {
        let mut text = format!("{label}{}{description}", self.term_separator);

        if !aliases.is_empty() {
            text.push_str(self.term_separator);
            text.push_str(self.also_known_as);
            text.push_str(&aliases.join(self.list_separator));
        }

        if properties.is_empty() {
            text.push('.');
        } else {
            let properties_text = self.properties_to_text(properties);
            text = format!("{text}. {}{properties_text}", self.attributes_include);
        }
        text
    }

    /// Render the property block, one `- label: values` line per property
    pub fn properties_to_text(&self, properties: &PropertyTextMap) -> String {
        let mut properties_text = String::new();
        for (label, claim_values) in properties {
            match claim_values {
                Some(values) if !values.is_empty() => {
                    let mut claims_text = String::new();
                    for claim_value in values {
                        if !claims_text.is_empty() {
                            claims_text.push_str(self.claim_join);
                        }
                        claims_text.push_str(self.value_open_quote);
                        claims_text.push_str(&claim_value.value);
                        if !claim_value.qualifiers.is_empty() {
                            claims_text.push_str(&self.qualifiers_to_text(&claim_value.qualifiers));
                        }
                        claims_text.push_str(self.value_close_quote);
                    }
                    properties_text.push_str(&format!(
                        "\n- {label}: {}{claims_text}{}",
                        self.claims_open_quote, self.claims_close_quote
                    ));
                }
                Some(_) if !self.has_phrase.is_empty() => {
                    properties_text.push_str(&format!("\n- {} {label}", self.has_phrase));
                }
                _ => {}
            }
        }
        properties_text
    }

    /// Render one claim's qualifier block
    pub fn qualifiers_to_text(&self, qualifiers: &QualifierTextMap) -> String {
        let mut text = String::new();
        for (label, values) in qualifiers {
            match values {
                Some(values) if !values.is_empty() => {
                    if !text.is_empty() {
                        text.push_str(self.qualifier_group_separator);
                    }
                    text.push_str(&format!(
                        "{}{label}: {}{}",
                        self.qualifier_group_open,
                        values.join(self.list_separator),
                        self.qualifier_group_close
                    ));
                }
                Some(_) if !self.has_phrase.is_empty() => {
                    text.push_str(&format!(
                        "{}{} {label}{}",
                        self.qualifier_group_open, self.has_phrase, self.qualifier_group_close
                    ));
                }
                _ => {}
            }
        }
        if text.is_empty() {
            String::new()
        } else {
            format!("{}{text}{}", self.qualifiers_prefix, self.qualifiers_suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str) -> ClaimText {
        ClaimText {
            value: text.to_string(),
            qualifiers: QualifierTextMap::new(),
        }
    }

    #[test]
    fn header_without_properties_ends_with_period() {
        let pack = LocalePack::for_code("en").expect("pack");
        let text = pack.merge_entity_text(
            "Universe",
            "totality of space and time",
            &[],
            &PropertyTextMap::new(),
        );
        assert_eq!(text, "Universe, totality of space and time.");
    }

    #[test]
    fn aliases_join_into_the_header() {
        let pack = LocalePack::for_code("en").expect("pack");
        let aliases = vec!["cosmos".to_string(), "everything".to_string()];
        let text = pack.merge_entity_text("Universe", "all there is", &aliases, &PropertyTextMap::new());
        assert_eq!(
            text,
            "Universe, all there is, also known as cosmos, everything."
        );
    }

    #[test]
    fn properties_render_as_quoted_lines() {
        let pack = LocalePack::for_code("en").expect("pack");
        let mut properties = PropertyTextMap::new();
        properties.insert(
            "instance of".to_string(),
            Some(vec![value("human"), value("writer")]),
        );
        let text = pack.merge_entity_text("Ada", "mathematician", &[], &properties);
        assert_eq!(
            text,
            "Ada, mathematician. Attributes include: \n- instance of: \"human, writer\""
        );
    }

    #[test]
    fn empty_value_list_renders_has_line() {
        let pack = LocalePack::for_code("en").expect("pack");
        let mut properties = PropertyTextMap::new();
        properties.insert("spouse".to_string(), Some(vec![]));
        assert_eq!(pack.properties_to_text(&properties), "\n- has spouse");
    }

    #[test]
    fn suppressed_property_renders_nothing_but_counts_as_present() {
        let pack = LocalePack::for_code("en").expect("pack");
        let mut properties = PropertyTextMap::new();
        properties.insert("external ref".to_string(), None);
        assert_eq!(pack.properties_to_text(&properties), "");
        let text = pack.merge_entity_text("X", "y", &[], &properties);
        assert_eq!(text, "X, y. Attributes include: ");
    }

    #[test]
    fn qualifiers_render_in_parens() {
        let pack = LocalePack::for_code("en").expect("pack");
        let mut qualifiers = QualifierTextMap::new();
        qualifiers.insert(
            "point in time".to_string(),
            Some(vec!["1879".to_string()]),
        );
        qualifiers.insert("sourcing".to_string(), Some(vec![]));
        assert_eq!(
            pack.qualifiers_to_text(&qualifiers),
            " (point in time: 1879)(has sourcing)"
        );
    }

    #[test]
    fn german_pack_uses_its_own_quotes() {
        let pack = LocalePack::for_code("de").expect("pack");
        let mut properties = PropertyTextMap::new();
        properties.insert("Land".to_string(), Some(vec![value("Deutschland")]));
        assert_eq!(
            pack.properties_to_text(&properties),
            "\n- Land: „Deutschland“"
        );
    }

    #[test]
    fn arabic_pack_quotes_each_value() {
        let pack = LocalePack::for_code("ar").expect("pack");
        let mut properties = PropertyTextMap::new();
        properties.insert("بلد".to_string(), Some(vec![value("مصر"), value("سوريا")]));
        assert_eq!(
            pack.properties_to_text(&properties),
            "\n- بلد: «مصر»،\n «سوريا»"
        );
        // No "has" rendering in the Arabic pack.
        let mut empty = PropertyTextMap::new();
        empty.insert("زوج".to_string(), Some(vec![]));
        assert_eq!(pack.properties_to_text(&empty), "");
    }

    #[test]
    fn unknown_locale_is_an_error() {
        assert!(matches!(
            LocalePack::for_code("tlh"),
            Err(TextifyError::UnknownLocale(_))
        ));
    }
}
