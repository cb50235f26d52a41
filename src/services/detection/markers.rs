// Human Marker Dictionary
// Curated phrases that generative models rarely produce, tiered strong/weak

use crate::models::MarkerHits;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    Idiom,
    Technical,
    Conversational,
    Slang,
}

const IDIOMS: &[&str] = &[
    "пляска святого витта", "святого витта", "корень зла", "божеский вид",
    "привести в божеский", "ни богу свечка", "ни черту кочерга",
    "как бог на душу", "бог весть", "черт знает", "леший знает",
    "горе-мастер", "горе-специалист", "горе-механик", "горе-водитель",
    "чудо-юдо", "диво дивное", "чудо в перьях", "птица редкая",
    "ни рыба ни мясо", "ни два ни полтора", "ни туда ни сюда",
    "гаражная магия", "колхозный тюнинг", "совковый подход",
    "руки чешутся", "глаза разбегаются", "уши вянут", "волосы дыбом",
    "мурашки по коже", "сердце ёкнуло", "душа не на месте",
    "кровь из глаз", "мозг выносит", "крышу сносит",
    "как мертвому припарка", "на козе не подъедешь", "с боку припека",
    "от корки до корки", "через пень-колоду", "как кур в ощип", "собаку съел",
    "в ус не дует", "как с гуся вода", "палец о палец", "с горем пополам",
    "на вольные хлеба", "куда макар телят не гонял", "семь верст до небес",
    "как снег на голову", "из пальца высосано", "черным по белому",
    "с иголочки", "на честном слове", "как на дрожжах", "не разлей вода",
];

const TECHNICAL: &[&str] = &[
    "прикипело", "сорвал резьбу", "закис болт", "пробило прокладку", "шлифануть",
    "на соплях", "синяя изолента", "вэдэшка", "вэдэхой брызнуть", "в гаражах",
    "смерть мотору", "жижа", "залипуха", "хрустит граната",
    "стучат пальцы", "пальцы звенят", "жрет бензин", "подсос воздуха",
    "8-клапанная", "8-клапанник", "16-клапанка", "16-клапанник", "шеснарь", "восьмиклоп",
    "грм", "цепь грм", "ремень грм", "метки грм", "выставить метки",
    "гнуть клапана", "загнуло клапана", "ремень генератора", "ролик натяжителя",
    "помпа", "термостат заклинил", "тосол", "антифриз", "фриз", "ож", "охлаждайка",
    "заглушка", "сальник", "прокладка клапанной", "маслосъемные",
    "тяга", "рулевые наконечники", "шаровая", "сайлентблок",
    "на низах", "на верхах", "тянет", "не тянет", "троит", "двоит",
    "масложор", "жрет масло", "дымит", "сизый дым", "белый дым",
    "стартер крутит", "не заводится", "схватывает", "глохнет",
    "форсунки", "инжектор", "карбюратор", "карб", "солекс", "озон",
    "свечи", "катушка", "бронепровода", "трамблер", "датчик коленвала",
];

const CONVERSATIONAL: &[&str] = &[
    "врать не буду", "чего греха таить", "положа руку на сердце",
    "как сейчас помню", "давным-давно", "на авось", "как-то раз",
    "блин", "ёлки", "ёлки-палки", "ёпрст", "чёрт", "черт возьми",
    "короче", "ну вот", "слушай", "смотри", "знаешь",
];

const SLANG: &[&str] = &[
    "кринж", "кринжатина", "рофл", "треш", "дичь", "годнота", "зачетно", "на изи",
    "по фану", "не зашло", "от слова совсем", "токсик", "душнила", "пруфы",
    "инфа сотка", "хайп", "чекайте", "баян", "жиза", "рил", "кэп",
];

const STRONG: &[&str] = &[
    "масложор", "на соплях", "гаражная магия", "колхозный тюнинг",
    "грм", "8-клапанная", "16-клапанка", "шеснарь", "загнуло клапана",
    "троит", "двоит", "восьмиклоп", "вэдэшка", "синяя изолента",
    "кринж", "жиза", "рил", "инфа сотка", "годнота", "дичь", "треш",
    "говнокод", "костыль", "хотфикс", "баян", "душнила",
    "крышу сносит", "мозг выносит", "кровь из глаз",
    "собаку съел", "как с гуся вода", "ни рыба ни мясо",
    "блин", "чёрт", "ёлки-палки", "капец", "жесть",
];

const WEAK: &[&str] = &[
    "наверное", "наверно", "возможно", "вероятно", "пожалуй",
    "видимо", "похоже", "кажется", "мне кажется", "я думаю",
    "вроде", "вроде бы", "вроде как", "как бы",
    "на самом деле", "честно говоря", "в общем", "в общем-то",
    "собственно", "кстати", "между прочим", "если честно", "по правде говоря",
];

/// Phrases this short must match a whole word, otherwise "ож" fires inside "ожидать".
const WHOLE_WORD_MAX_CHARS: usize = 3;

/// Immutable, process-wide marker dictionary.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    dictionary: Vec<(MarkerCategory, Vec<String>)>,
    strong: Vec<String>,
    weak: Vec<String>,
}

impl MarkerSet {
    pub fn new(
        dictionary: Vec<(MarkerCategory, Vec<String>)>,
        strong: Vec<String>,
        weak: Vec<String>,
    ) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|p| p.to_lowercase()).collect::<Vec<_>>();
        Self {
            dictionary: dictionary
                .into_iter()
                .map(|(cat, phrases)| (cat, lower(phrases)))
                .collect(),
            strong: lower(strong),
            weak: lower(weak),
        }
    }

    /// The built-in Russian dictionary, built once and shared.
    pub fn standard() -> Arc<MarkerSet> {
        static SET: OnceLock<Arc<MarkerSet>> = OnceLock::new();
        SET.get_or_init(|| {
            let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
            Arc::new(MarkerSet::new(
                vec![
                    (MarkerCategory::Idiom, owned(IDIOMS)),
                    (MarkerCategory::Technical, owned(TECHNICAL)),
                    (MarkerCategory::Conversational, owned(CONVERSATIONAL)),
                    (MarkerCategory::Slang, owned(SLANG)),
                ],
                owned(STRONG),
                owned(WEAK),
            ))
        })
        .clone()
    }

    pub fn category(&self, category: MarkerCategory) -> &[String] {
        self.dictionary
            .iter()
            .find(|(cat, _)| *cat == category)
            .map(|(_, phrases)| phrases.as_slice())
            .unwrap_or(&[])
    }

    /// Strong tier first, then weak, then the rest of the dictionary counted as strong.
    pub fn match_markers(&self, text: &str) -> MarkerHits {
        let lowered = text.to_lowercase();
        let mut hits = MarkerHits::default();

        for phrase in &self.strong {
            if !hits.strong_found.contains(phrase) && contains_phrase(&lowered, phrase) {
                hits.strong_found.push(phrase.clone());
            }
        }

        for phrase in &self.weak {
            if !hits.weak_found.contains(phrase) && contains_phrase(&lowered, phrase) {
                hits.weak_found.push(phrase.clone());
            }
        }

        for (_, phrases) in &self.dictionary {
            for phrase in phrases {
                if !hits.strong_found.contains(phrase) && contains_phrase(&lowered, phrase) {
                    hits.strong_found.push(phrase.clone());
                }
            }
        }

        hits.strong_count = hits.strong_found.len();
        hits.weak_count = hits.weak_found.len();
        hits
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Substring search anchored at a word start; short phrases are anchored at both ends.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let whole_word = phrase.chars().count() <= WHOLE_WORD_MAX_CHARS;

    haystack.match_indices(phrase).any(|(idx, _)| {
        let starts_word = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        if !starts_word {
            return false;
        }
        if !whole_word {
            return true;
        }
        haystack[idx + phrase.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c))
    })
}
