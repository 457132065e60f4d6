//! System prompt assembly for conversation turns.

use kokoro_memory::MemoryRecord;
use kokoro_tools::format_memories;

/// Fixed tool-usage policy appended after the persona.
const TOOL_POLICY: &str = "## 工具使用规则\n\
- 当用户提到值得长期记住的信息（事实、偏好、重要事件）时，调用 store_memory 记录。\n\
- 回答前如果需要更多关于用户的背景，调用 recall_memory 查找。\n\
- 发现记忆过时或错误时，用 update_memory 修正，或用 forget_memory 忘记。\n\
- 工具调用对用户不可见；回复里不要提及工具或记忆系统本身。";

/// Assemble the per-turn system prompt: persona, tool policy, and the
/// formatted injected memories.
pub(crate) fn build_system_prompt(persona: &str, injected: &[MemoryRecord]) -> String {
    let mut sections = vec![persona.trim().to_string(), TOOL_POLICY.to_string()];
    let memories = format_memories(injected);
    if !memories.is_empty() {
        sections.push(format!("## 关于用户的记忆\n\n{memories}"));
    }
    sections.join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::build_system_prompt;
    use chrono::Utc;
    use kokoro_memory::{MemoryCategory, MemoryRecord, extract_keywords};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            category: MemoryCategory::Preference,
            importance: 5,
            keywords: extract_keywords(content),
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            access_count: 0,
            valid: true,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn prompt_contains_persona_policy_and_memories() {
        let prompt = build_system_prompt("你是小葵。", &[record("喜欢猫")]);
        assert!(prompt.starts_with("你是小葵。"));
        assert!(prompt.contains("## 工具使用规则"));
        assert!(prompt.contains("## 关于用户的记忆"));
        assert!(prompt.contains("- 喜欢猫"));
    }

    #[test]
    fn memory_section_is_omitted_when_empty() {
        let prompt = build_system_prompt("你是小葵。", &[]);
        assert_eq!(prompt.contains("关于用户的记忆"), false);
        assert!(prompt.contains("## 工具使用规则"));
    }
}
