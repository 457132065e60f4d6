//! Tokenization, keyword extraction, and the in-memory inverted index.
//!
//! The index is a derived, rebuildable projection of the record table: it is
//! built lazily from a full scan on first search and maintained
//! incrementally afterwards. Invalidated and deleted records are removed
//! immediately so index-backed queries never surface them.

use crate::model::MemoryRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

/// Minimum length for non-CJK tokens; shorter segments are noise.
const MIN_TOKEN_CHARS: usize = 2;
/// Number of keywords derived from content at write time.
const MAX_KEYWORDS: usize = 8;
/// Base score assigned to the best-ranked index match.
const BASE_SCORE: f32 = 10.0;
/// Bonus for an exact case-insensitive substring match of the full query.
const EXACT_MATCH_BONUS: f32 = 5.0;
/// Weight applied to record importance.
const IMPORTANCE_WEIGHT: f32 = 0.5;
/// Bonus for records accessed within the recency window.
const RECENCY_BONUS: f32 = 1.0;
/// Recency window in days.
const RECENCY_WINDOW_DAYS: i64 = 7;

/// Whether a character belongs to a CJK script (Han, kana, hangul).
fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{4E00}'..='\u{9FFF}'     // CJK unified ideographs
        | '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{F900}'..='\u{FAFF}'   // CJK compatibility ideographs
        | '\u{3040}'..='\u{30FF}'   // hiragana + katakana
        | '\u{AC00}'..='\u{D7AF}'   // hangul syllables
    )
}

/// Tokenize text with awareness of two scripts.
///
/// CJK segments are kept even at a single character, since one ideograph is
/// a meaningful unit. Other segments are lowercased and must reach
/// `MIN_TOKEN_CHARS` to filter noise. Deterministic: same input, same output.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.unicode_words() {
        if word.chars().any(is_cjk) {
            tokens.push(word.to_string());
        } else if word.chars().count() >= MIN_TOKEN_CHARS {
            tokens.push(word.to_lowercase());
        }
    }
    tokens
}

/// Derive a keyword set from content: the first distinct tokens, in order.
pub fn extract_keywords(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in tokenize(content) {
        if seen.insert(token.clone()) {
            keywords.push(token);
            if keywords.len() >= MAX_KEYWORDS {
                break;
            }
        }
    }
    keywords
}

/// Inverted index over valid memory records: token -> posting set.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, HashSet<Uuid>>,
}

impl InvertedIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a record's content and keywords under its id.
    pub fn add(&mut self, record: &MemoryRecord) {
        for token in tokenize(&record.content).into_iter().chain(record.keywords.iter().cloned()) {
            self.postings.entry(token).or_default().insert(record.id);
        }
    }

    /// Remove every posting for the given id.
    pub fn remove(&mut self, id: Uuid) {
        self.postings.retain(|_, ids| {
            ids.remove(&id);
            !ids.is_empty()
        });
    }

    /// Replace a record's entry without duplicating it.
    pub fn replace(&mut self, record: &MemoryRecord) {
        self.remove(record.id);
        self.add(record);
    }

    /// Drop every posting.
    pub fn clear(&mut self) {
        self.postings.clear();
    }

    /// Rank candidate ids by the number of matching query tokens.
    ///
    /// Ordering is deterministic: hit count descending, id as tie-break.
    pub fn candidates(&self, query_tokens: &[String]) -> Vec<Uuid> {
        let mut hits: HashMap<Uuid, usize> = HashMap::new();
        for token in query_tokens {
            if let Some(ids) = self.postings.get(token) {
                for id in ids {
                    *hits.entry(*id).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(Uuid, usize)> = hits.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}

/// Composite relevance score for a record at a given match rank.
pub fn relevance_score(
    record: &MemoryRecord,
    rank: usize,
    query: &str,
    now: DateTime<Utc>,
) -> f32 {
    let mut score = (BASE_SCORE - rank as f32).max(1.0);
    if record
        .content
        .to_lowercase()
        .contains(&query.to_lowercase())
    {
        score += EXACT_MATCH_BONUS;
    }
    score += f32::from(record.importance) * IMPORTANCE_WEIGHT;
    if now - record.last_accessed_at <= Duration::days(RECENCY_WINDOW_DAYS) {
        score += RECENCY_BONUS;
    }
    score
}

/// Index-free fallback: substring and keyword-overlap matching.
///
/// Used when the query survives trimming but tokenizes to nothing (for
/// example a single latin letter), so the inverted index cannot help.
pub fn fallback_candidates(records: &[MemoryRecord], query: &str) -> Vec<Uuid> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| {
            record.content.to_lowercase().contains(&needle)
                || record
                    .keywords
                    .iter()
                    .any(|keyword| keyword.to_lowercase().contains(&needle))
        })
        .map(|record| record.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{InvertedIndex, extract_keywords, fallback_candidates, relevance_score, tokenize};
    use crate::model::{MemoryCategory, MemoryRecord};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(content: &str, importance: u8) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            category: MemoryCategory::Fact,
            importance,
            keywords: extract_keywords(content),
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            access_count: 0,
            valid: true,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn tokenize_keeps_single_cjk_units() {
        assert_eq!(tokenize("喜欢猫"), vec!["喜", "欢", "猫"]);
    }

    #[test]
    fn tokenize_filters_short_latin_noise() {
        assert_eq!(tokenize("I like big cats"), vec!["like", "big", "cats"]);
        assert_eq!(tokenize("a b c"), Vec::<String>::new());
    }

    #[test]
    fn tokenize_lowercases_latin_and_mixes_scripts() {
        assert_eq!(tokenize("Rust 很好"), vec!["rust", "很", "好"]);
    }

    #[test]
    fn extract_keywords_dedupes_and_caps() {
        let keywords = extract_keywords("猫 猫 cats cats dogs one two three four five six");
        assert_eq!(keywords[0], "猫");
        assert_eq!(keywords[1], "cats");
        assert_eq!(keywords.len(), 8);
    }

    #[test]
    fn index_ranks_by_token_overlap() {
        let mut index = InvertedIndex::new();
        let both = record("喜欢猫和狗", 5);
        let one = record("喜欢狗", 5);
        index.add(&both);
        index.add(&one);

        let ranked = index.candidates(&tokenize("猫和狗"));
        assert_eq!(ranked[0], both.id);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn index_remove_drops_all_postings() {
        let mut index = InvertedIndex::new();
        let entry = record("weekend hiking plans", 5);
        index.add(&entry);
        index.remove(entry.id);
        assert_eq!(index.candidates(&tokenize("hiking")), Vec::<Uuid>::new());
    }

    #[test]
    fn replace_does_not_duplicate_postings() {
        let mut index = InvertedIndex::new();
        let mut entry = record("likes tea", 5);
        index.add(&entry);
        entry.content = "likes coffee".to_string();
        entry.keywords = extract_keywords(&entry.content);
        index.replace(&entry);

        assert_eq!(index.candidates(&tokenize("coffee")), vec![entry.id]);
        assert_eq!(index.candidates(&tokenize("tea")), Vec::<Uuid>::new());
    }

    #[test]
    fn score_rewards_exact_match_importance_and_recency() {
        let now = Utc::now();
        let mut fresh = record("喜欢猫", 8);
        fresh.last_accessed_at = now;
        let mut stale = record("喜欢猫", 8);
        stale.last_accessed_at = now - Duration::days(30);

        let fresh_score = relevance_score(&fresh, 0, "喜欢猫", now);
        let stale_score = relevance_score(&stale, 0, "喜欢猫", now);
        // base 10 + exact 5 + importance 4, plus 1 recency for the fresh one
        assert_eq!(stale_score, 19.0);
        assert_eq!(fresh_score, 20.0);
    }

    #[test]
    fn fallback_matches_substring_in_content_or_keywords() {
        let cat = record("喜欢猫", 5);
        let dog = record("喜欢狗", 5);
        let records = vec![cat.clone(), dog];
        assert_eq!(fallback_candidates(&records, "猫"), vec![cat.id]);
        assert_eq!(fallback_candidates(&records, "仓鼠"), Vec::<Uuid>::new());
    }
}
