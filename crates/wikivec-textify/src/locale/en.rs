//! English

use super::LocalePack;

pub(super) static PACK: LocalePack = LocalePack {
    language: "en",

    no_value: "no value",

    term_separator: ", ",
    list_separator: ", ",
    also_known_as: "also known as ",
    attributes_include: "Attributes include: ",
    has_phrase: "has",

    claims_open_quote: "\"",
    claims_close_quote: "\"",
    value_open_quote: "",
    value_close_quote: "",
    claim_join: ", ",

    qualifier_group_open: "(",
    qualifier_group_close: ")",
    qualifier_group_separator: " ",
    qualifiers_prefix: " ",
    qualifiers_suffix: "",

    months: [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ],
    era_ad: "AD",
    era_bc: "BC",
    decade_suffix: "s",
    century_suffix: "th century",
    millennium_suffix: "th millennium",
    ten_thousand_years: "ten thousand years",
    hundred_thousand_years: "hundred thousand years",
    million_years: "million years",
    tens_of_millions_years: "tens of millions of years",
    hundred_million_years: "hundred million years",
    billion_years: "billion years",
};
