//! Prompt formatting for injected memory records.

use kokoro_memory::{MemoryCategory, MemoryRecord};

/// Render records as a bullet list grouped by category label, for embedding
/// into a system prompt. An empty slice renders as an empty string.
pub fn format_memories(records: &[MemoryRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut sections = Vec::new();
    for category in MemoryCategory::ALL {
        let lines = records
            .iter()
            .filter(|record| record.category == category)
            .map(|record| format!("- {}", record.content))
            .collect::<Vec<_>>();
        if lines.is_empty() {
            continue;
        }
        sections.push(format!("【{}】\n{}", category.label(), lines.join("\n")));
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::format_memories;
    use chrono::Utc;
    use kokoro_memory::{MemoryCategory, MemoryRecord, extract_keywords};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(content: &str, category: MemoryCategory) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            category,
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
    fn empty_list_renders_empty_string() {
        assert_eq!(format_memories(&[]), "");
    }

    #[test]
    fn records_group_under_category_labels() {
        let records = vec![
            record("喜欢猫", MemoryCategory::Preference),
            record("住在上海", MemoryCategory::Fact),
            record("喜欢抹茶", MemoryCategory::Preference),
        ];
        let rendered = format_memories(&records);
        assert_eq!(
            rendered,
            "【事实】\n- 住在上海\n【偏好】\n- 喜欢猫\n- 喜欢抹茶"
        );
    }
}
