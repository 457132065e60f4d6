//! Relevance-candidate selection for per-turn memory injection.

use kokoro_llm::{ChatClient, ChatOptions};
use kokoro_memory::{MemoryError, MemoryRecord, MemoryStore};
use kokoro_protocol::ChatMessage;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Max model-suggested keywords used for search expansion.
const MAX_EXPANSION_TERMS: usize = 3;
/// Results fetched per expansion term.
const EXPANSION_LIMIT: usize = 2;
/// Top-important records merged unconditionally.
const TOP_IMPORTANT: usize = 3;

const KEYWORD_PROMPT: &str =
    "你是一个关键词提取助手。请从用户输入中提取最多3个适合用来检索相关记忆的关键词，只输出关键词本身，用逗号分隔，不要输出其他内容。";

/// Merge relevance candidates for one user input, deduplicated by id.
///
/// Sources, in order: a direct search on the raw input; when that underfills
/// the limit and a chat client is available, best-effort model-suggested
/// related keywords (a failing expansion contributes nothing and never
/// propagates); and the top most-important records unconditionally.
///
/// When the merged set overflows the limit, it is shuffled and then stably
/// grouped into importance tiers before truncation, trading strict
/// importance ordering for variety. Pass a seed for deterministic selection.
pub async fn relevant_memories(
    store: &dyn MemoryStore,
    chat_client: Option<&dyn ChatClient>,
    input: &str,
    limit: usize,
    seed: Option<u64>,
) -> Result<Vec<MemoryRecord>, MemoryError> {
    let mut merged: Vec<MemoryRecord> = Vec::new();
    let mut seen: HashSet<uuid::Uuid> = HashSet::new();
    let mut push = |record: MemoryRecord, merged: &mut Vec<MemoryRecord>| {
        if seen.insert(record.id) {
            merged.push(record);
        }
    };

    for (record, _) in store.search(input, limit).await? {
        push(record, &mut merged);
    }

    if merged.len() < limit
        && let Some(chat_client) = chat_client
    {
        for term in suggest_keywords(chat_client, input).await {
            for (record, _) in store.search(&term, EXPANSION_LIMIT).await? {
                push(record, &mut merged);
            }
        }
    }

    for record in store.get_most_important(TOP_IMPORTANT).await? {
        push(record, &mut merged);
    }

    if merged.len() > limit {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        merged.shuffle(&mut rng);
        // stable sort keeps the shuffled order inside each tier
        merged.sort_by_key(|record| importance_tier(record.importance));
        merged.truncate(limit);
    }
    debug!(
        "selected relevant memories (input_len={}, selected={})",
        input.len(),
        merged.len()
    );
    Ok(merged)
}

/// Importance tier: high (>= 7), mid (>= 4), low.
fn importance_tier(importance: u8) -> u8 {
    match importance {
        7..=10 => 0,
        4..=6 => 1,
        _ => 2,
    }
}

/// Ask the model for related search keywords; best-effort.
async fn suggest_keywords(chat_client: &dyn ChatClient, input: &str) -> Vec<String> {
    let messages = [
        ChatMessage::system(KEYWORD_PROMPT),
        ChatMessage::user(input.to_string()),
    ];
    let response = match chat_client
        .send_chat(&messages, ChatOptions::default())
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!("keyword expansion failed, continuing without it: {err}");
            return Vec::new();
        }
    };
    let Some(content) = response.content else {
        return Vec::new();
    };
    content
        .split(['，', ',', '、', '\n'])
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .take(MAX_EXPANSION_TERMS)
        .map(str::to_string)
        .collect()
}
