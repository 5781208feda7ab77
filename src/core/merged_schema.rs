use crate::error::{AppError, AppResult};
use crate::io;
use crate::model::output::MergedEntry;
use schemars::schema_for;
use serde_json::json;
use std::path::{Path, PathBuf};

pub const SCHEMA_FILE: &str = "master_courses.schema.json";
pub const EXAMPLE_FILE: &str = "master_courses.example.json";

#[derive(Debug, Clone)]
pub struct SchemaFiles {
    pub schema_path: PathBuf,
    pub example_path: PathBuf,
}

fn placeholder_entry() -> AppResult<MergedEntry> {
    serde_json::from_value(json!({
        "course_id": "000000",
        "course_code": "DEPT 100",
        "course_title": "Example Course",
        "current_term": "2025 Fall",
        "current_sections": [{"section": "001", "location": "Example Hall 101"}],
    }))
    .map_err(|e| AppError::SerdeParse(e.to_string()))
}

/// The most informative entry of a snapshot: one with history and several
/// sections if there is one, else the first.
fn pick_example(snapshot: &[MergedEntry]) -> Option<&MergedEntry> {
    snapshot
        .iter()
        .find(|e| e.has_analytics() && e.current_sections.len() > 1)
        .or_else(|| snapshot.iter().find(|e| e.has_analytics()))
        .or_else(|| snapshot.first())
}

/// Writes the JSON Schema of a merged snapshot and one example entry into
/// `output_dir/merged/`.
pub async fn create_merged_schema_files(
    snapshot: Option<&[MergedEntry]>,
    output_dir: &Path,
) -> AppResult<SchemaFiles> {
    let merged_dir = output_dir.join("merged");

    let schema = schema_for!(Vec<MergedEntry>);
    let schema_path = merged_dir.join(SCHEMA_FILE);
    io::save_json(schema_path.clone(), schema, "Merged Snapshot Schema".to_string()).await?;

    let example = match snapshot.and_then(pick_example) {
        Some(entry) => entry.clone(),
        None => placeholder_entry()?,
    };
    let example_path = merged_dir.join(EXAMPLE_FILE);
    io::save_json(
        example_path.clone(),
        vec![example],
        "Merged Snapshot Example".to_string(),
    )
    .await?;

    Ok(SchemaFiles {
        schema_path,
        example_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn entry(id: &str, sections: usize, with_history: bool) -> MergedEntry {
        let sections: Vec<Value> = (0..sections)
            .map(|i| json!({"section": format!("{:03}", i + 1)}))
            .collect();
        let history = if with_history {
            json!({"2024 Fall": {}})
        } else {
            json!({})
        };
        serde_json::from_value(json!({
            "course_id": id,
            "current_sections": sections,
            "historical_semesters": history,
        }))
        .unwrap()
    }

    #[test]
    fn example_prefers_rich_entries() {
        let snapshot = vec![entry("1", 1, false), entry("2", 1, true), entry("3", 2, true)];
        assert_eq!(pick_example(&snapshot).unwrap().course_id, "3");
        assert_eq!(pick_example(&snapshot[..2]).unwrap().course_id, "2");
        assert_eq!(pick_example(&snapshot[..1]).unwrap().course_id, "1");
        assert!(pick_example(&[]).is_none());
    }

    #[tokio::test]
    async fn writes_schema_and_example() {
        let dir = tempfile::tempdir().unwrap();
        let files = create_merged_schema_files(None, dir.path()).await.unwrap();

        let schema: Value = io::load_json(&files.schema_path).await.unwrap();
        assert_eq!(schema["type"], "array");
        let schema_text = schema.to_string();
        assert!(schema_text.contains("current_sections"));
        assert!(schema_text.contains("lecture_monday"));

        let example: Vec<MergedEntry> = io::load_json(&files.example_path).await.unwrap();
        assert_eq!(example[0].course_id, "000000");
        assert_eq!(example[0].current_sections[0].location, "Example Hall 101");
    }
}
