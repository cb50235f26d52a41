// Content Neutralizer
// Masks facts (numbers, units, years, brands, places) so structure-sensitive
// signals see only the shape of the text.

use regex::Regex;
use std::sync::OnceLock;

pub const MEASURE_TOKEN: &str = "[SPEC]";
pub const YEAR_TOKEN: &str = "[YEAR]";
pub const NUM_TOKEN: &str = "[NUM]";
pub const BRAND_TOKEN: &str = "[BRAND]";
pub const PLACE_TOKEN: &str = "[PLACE]";

const BRANDS: &[&str] = &[
    "lada", "лада", "калина", "приора", "веста", "toyota", "тойота", "bmw", "бмв",
    "mercedes", "мерседес", "audi", "volkswagen", "honda", "ford", "kia", "киа",
    "hyundai", "хендай", "nissan", "mazda", "iphone", "айфон", "samsung", "самсунг",
    "xiaomi", "huawei", "google", "гугл", "apple", "эпл", "microsoft",
];

const PLACES: &[&str] = &[
    "москва", "москве", "питер", "спб", "россия", "россии", "украина", "сша", "usa",
    "америка", "европа", "китай", "германия", "франция",
];

fn measure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Longer units first; letter units must end a word so "5 минут" is not "5 м".
        Regex::new(
            r"(?i)\d+(?:[.,]\d+)?\s*(?:(?:л\.?\s*с|hp|кг|kg|км|km|мл|gb|mb|тыс|руб|м|г)\b|[₽$€%])",
        )
        .expect("measure regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b\d{4}\b(?:\s*(?:года|году|год|year|г\.?))?").expect("year regex")
    })
}

fn num_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("num regex"))
}

fn word_list_re(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("word list regex")
}

fn brand_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_list_re(BRANDS))
}

fn place_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| word_list_re(PLACES))
}

/// Replace facts with placeholder tokens. Unit rules run before the bare digit rule.
pub fn neutralize(text: &str) -> String {
    let s = measure_re().replace_all(text, MEASURE_TOKEN);
    let s = year_re().replace_all(&s, YEAR_TOKEN);
    let s = num_re().replace_all(&s, NUM_TOKEN);
    let s = brand_re().replace_all(&s, BRAND_TOKEN);
    place_re().replace_all(&s, PLACE_TOKEN).into_owned()
}
