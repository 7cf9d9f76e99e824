//! العربية

use super::LocalePack;

pub(super) static PACK: LocalePack = LocalePack {
    language: "ar",

    no_value: "لا قيمة",

    term_separator: "، ",
    list_separator: "، ",
    also_known_as: "المعروف أيضًا باسم ",
    attributes_include: "السمات تتضمن: ",
    // The Arabic rendering drops properties without values instead of
    // announcing them.
    has_phrase: "",

    claims_open_quote: "",
    claims_close_quote: "",
    value_open_quote: "«",
    value_close_quote: "»",
    claim_join: "،\n ",

    qualifier_group_open: "",
    qualifier_group_close: "",
    qualifier_group_separator: " ; ",
    qualifiers_prefix: " (",
    qualifiers_suffix: ")",

    months: [
        "كانون الثاني",
        "شباط",
        "آذار",
        "نيسان",
        "أيار",
        "حزيران",
        "تموز",
        "آب",
        "أيلول",
        "تشرين الأول",
        "تشرين الثاني",
        "كانون الأول",
    ],
    era_ad: "م",
    era_bc: "ق.م",
    decade_suffix: "عقد",
    century_suffix: "قرن",
    millennium_suffix: "ألفية",
    ten_thousand_years: "عشرة آلاف سنة",
    hundred_thousand_years: "مئات آلاف السنين",
    million_years: "ملايين السنين",
    tens_of_millions_years: "عشرات الملايين من السنين",
    hundred_million_years: "مئات الملايين من السنين",
    billion_years: "مليار سنة",
};
