//! Flesch reading-ease score and Flesch-Kincaid grade label.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ReadabilityScore;

/// Estimate the syllable count of a single word.
///
/// Returns 0 only for an empty input; any other word counts at least 1.
pub fn count_syllables(word: &str) -> usize {
    static NON_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z]").unwrap());
    static SILENT_SUFFIX: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?:[^laeiouy]es|ed|[^laeiouy]e)$").unwrap());
    static LEADING_Y: Lazy<Regex> = Lazy::new(|| Regex::new(r"^y").unwrap());
    static VOWEL_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[aeiouy]+").unwrap());

    if word.is_empty() {
        return 0;
    }

    let lower = word.trim().to_lowercase();
    let letters = NON_LETTER.replace_all(&lower, "");
    if letters.len() <= 3 {
        return 1;
    }

    let stripped = SILENT_SUFFIX.replace(&letters, "");
    let stripped = LEADING_Y.replace(&stripped, "");
    VOWEL_RUN.find_iter(&stripped).count().max(1)
}

/// Number of sentence-terminated chunks, at least 1.
pub fn count_sentences(text: &str) -> usize {
    static SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?\n]+[.!?\n]+").unwrap());
    SENTENCE.find_iter(text).count().max(1)
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Score `text` with the Flesch formulas.
///
/// Blank input yields `{score: 0, grade: "N/A"}`. The score is clamped to
/// 0-100; the grade level is not clamped before labelling.
pub fn calculate_readability(text: &str) -> ReadabilityScore {
    if text.trim().is_empty() {
        return ReadabilityScore::not_available();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return ReadabilityScore::not_available();
    }

    let sentence_count = count_sentences(text) as f64;
    let word_count = words.len() as f64;
    let syllable_count = words.iter().map(|w| count_syllables(w)).sum::<usize>() as f64;

    let words_per_sentence = word_count / sentence_count;
    let syllables_per_word = syllable_count / word_count;

    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    let grade_level = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;

    ReadabilityScore {
        score: score.clamp(0.0, 100.0).round() as u8,
        grade: grade_label(grade_level),
    }
}

fn grade_label(grade_level: f64) -> String {
    if grade_level < 1.0 {
        "~K".to_string()
    } else if grade_level > 16.0 {
        "Grad+".to_string()
    } else {
        format!("G{}", grade_level.round() as i64)
    }
}
