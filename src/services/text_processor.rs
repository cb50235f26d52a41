// Text Processing Service
// Tokenization, sentence segmentation and chunking for mixed Cyrillic/Latin text

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[a-zа-яё]+").expect("word regex"))
}

fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence split regex"))
}

fn sentence_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[.!?…]+["'»”)\]]*\s+"#).expect("sentence end regex"))
}

fn odd_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{3000}\u{00A0}\u{202F}]").expect("odd space regex"))
}

/// Normalize quotes, exotic spaces and line endings.
/// Runs of spaces are left alone: doubled spaces are a signal.
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text
        .replace(['\u{201c}', '\u{201d}', '\u{201e}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    s = odd_space_re().replace_all(&s, " ").to_string();
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    s.lines()
        .map(|ln| ln.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Lowercased alphabetic words with at least `min_len` characters.
pub fn words(text: &str, min_len: usize) -> impl Iterator<Item = String> + '_ {
    word_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(move |w| w.chars().count() >= min_len)
}

pub fn word_count(text: &str) -> usize {
    word_re().find_iter(text).count()
}

/// Split on terminal punctuation and keep trimmed fragments of at least `min_chars` characters.
pub fn sentences(text: &str, min_chars: usize) -> Vec<&str> {
    sentence_split_re()
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().count() >= min_chars)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize,
}

/// Byte spans of sentences, terminal punctuation included, surrounding whitespace excluded.
pub fn sentence_spans(text: &str) -> Vec<SentenceSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0usize;

    for m in sentence_end_re().find_iter(text) {
        let end = m.start() + m.as_str().trim_end().len();
        push_trimmed_span(text, cursor, end, &mut spans);
        cursor = m.end();
    }
    push_trimmed_span(text, cursor, text.len(), &mut spans);

    spans
}

fn push_trimmed_span(text: &str, start: usize, end: usize, out: &mut Vec<SentenceSpan>) {
    let raw = &text[start..end];
    let lead = raw.len() - raw.trim_start().len();
    let trail = raw.len() - raw.trim_end().len();
    let (s, e) = (start + lead, end - trail);
    if s < e {
        out.push(SentenceSpan { start: s, end: e });
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Pack whole sentences greedily into chunks of at most `max_chars` characters.
///
/// Chunk text is always a slice of the input, so offsets stay valid. A single
/// sentence longer than the limit becomes its own oversized chunk.
pub fn build_chunks(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![];
    }

    let lead = text.len() - text.trim_start().len();
    if trimmed.chars().count() <= max_chars {
        return vec![TextChunk {
            index: 0,
            start: lead,
            end: lead + trimmed.len(),
            text: trimmed.to_string(),
        }];
    }

    let mut chunks: Vec<TextChunk> = Vec::new();
    // (start, end, chars) of the chunk under construction
    let mut current: Option<(usize, usize, usize)> = None;

    for span in sentence_spans(text) {
        // Use char count (not UTF-8 byte length); Cyrillic is two bytes per letter.
        let span_chars = text[span.start..span.end].chars().count();
        current = match current {
            Some((start, end, chars)) => {
                let gap = text[end..span.start].chars().count();
                if chars + gap + span_chars > max_chars {
                    push_chunk(text, start, end, &mut chunks);
                    Some((span.start, span.end, span_chars))
                } else {
                    Some((start, span.end, chars + gap + span_chars))
                }
            }
            None => Some((span.start, span.end, span_chars)),
        };
    }

    if let Some((start, end, _)) = current {
        push_chunk(text, start, end, &mut chunks);
    }

    chunks
}

fn push_chunk(text: &str, start: usize, end: usize, chunks: &mut Vec<TextChunk>) {
    chunks.push(TextChunk {
        index: chunks.len(),
        start,
        end,
        text: text[start..end].to_string(),
    });
}
