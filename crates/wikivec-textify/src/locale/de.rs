//! Deutsch

use super::LocalePack;

pub(super) static PACK: LocalePack = LocalePack {
    language: "de",

    no_value: "kein Wert",

    term_separator: ", ",
    list_separator: ", ",
    also_known_as: "auch bekannt als ",
    attributes_include: "Attribute umfassen: ",
    has_phrase: "hat",

    claims_open_quote: "\u{201e}",
    claims_close_quote: "\u{201c}",
    value_open_quote: "",
    value_close_quote: "",
    claim_join: ", ",

    qualifier_group_open: "(",
    qualifier_group_close: ")",
    qualifier_group_separator: " ",
    qualifiers_prefix: " ",
    qualifiers_suffix: "",

    months: [
        "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
    ],
    era_ad: "n. Chr.",
    era_bc: "v. Chr.",
    decade_suffix: "er Jahre",
    century_suffix: ". Jahrhundert",
    millennium_suffix: ". Jahrtausend",
    ten_thousand_years: "Zehntausend Jahre",
    hundred_thousand_years: "Hunderttausend Jahre",
    million_years: "Millionen Jahre",
    tens_of_millions_years: "Zehn Millionen Jahre",
    hundred_million_years: "Hundert Millionen Jahre",
    billion_years: "Milliarden Jahre",
};
