use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Closed-class function words and conversational fillers never indexed
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being",
    "in", "on", "at", "to", "for", "of", "with", "by", "from", "up", "about",
    "and", "but", "or", "nor", "so", "yet",
    "it", "this", "that", "these", "those",
    "i", "you", "he", "she", "we", "they", "me", "him", "her", "us", "them",
    "my", "your", "his", "its", "our", "their",
    "can", "could", "will", "would", "shall", "should", "may", "might", "must",
    "do", "does", "did", "done",
    "have", "has", "had",
    "go", "come", "take", "make", "get",
    "one", "two", "three",
    "yes", "no", "not", "yeah", "ok", "okay", "um", "umm", "uh",
];

/// Single-letter words allowed past the length check
const SINGLE_LETTER_WORDS: &[&str] = &["a", "i"];

const STRIP_CHARS: &[char] = &['.', ',', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\''];

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[a-zA-Z]+(?:-[a-zA-Z]+)*").expect("word pattern is a valid regex")
    })
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

/// Lowercase and strip surrounding punctuation
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase().trim_matches(STRIP_CHARS).to_string()
}

/// Letters with optional internal hyphens, ASCII only
pub fn is_well_formed(lemma: &str) -> bool {
    !lemma.is_empty()
        && lemma.is_ascii()
        && !lemma.starts_with('-')
        && !lemma.ends_with('-')
        && lemma.chars().all(|c| c.is_ascii_lowercase() || c == '-')
        && lemma.chars().any(|c| c.is_ascii_lowercase())
}

/// Accept or reject a normalized candidate
pub fn accept(lemma: &str) -> bool {
    if !is_well_formed(lemma) {
        return false;
    }
    if lemma.len() < 2 && !SINGLE_LETTER_WORDS.contains(&lemma) {
        return false;
    }
    !is_stop_word(lemma)
}

/// Extract every indexable lemma from one transcript token.
///
/// A token such as `"well-known,"` yields `["well-known"]`; `"don't"` yields
/// nothing because both fragments are rejected.
pub fn extract_lemmas(token: &str) -> Vec<String> {
    word_pattern()
        .find_iter(token)
        .map(|m| normalize(m.as_str()))
        .filter(|lemma| accept(lemma))
        .collect()
}
