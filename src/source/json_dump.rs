use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::extract::{
    BUG_KEY, COMMENT_SEPARATOR, COMMENT_TEXT_KEY, LONG_DESC_KEY, RAW_FILE_SUFFIX,
};
use crate::constants::columns;
use crate::data::BugRecord;
use crate::errors::PipelineError;
use crate::source::{BugSource, SourceTable};
use crate::transport::fs::require_path;
use crate::types::SourceId;

const EXCERPT_CHARS: usize = 80;

/// An input unit that could not be turned into a bug entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based line number for line-delimited input, or 1-based element
    /// position for a whole-file array.
    pub line: usize,
    /// Parser or shape error.
    pub reason: String,
    /// Leading characters of the offending unit.
    pub excerpt: String,
}

impl MalformedLine {
    fn new(line: usize, reason: impl Into<String>, raw: &str) -> Self {
        Self {
            line,
            reason: reason.into(),
            excerpt: raw.trim().chars().take(EXCERPT_CHARS).collect(),
        }
    }

    /// Error form used when reporting the skip.
    pub fn to_error(&self, path: &Path) -> PipelineError {
        PipelineError::MalformedRecord {
            path: path.to_path_buf(),
            line: self.line,
            reason: self.reason.clone(),
        }
    }
}

/// Entries parsed from one dump, before attribute extraction.
#[derive(Clone, Debug, Default)]
pub struct ParsedDump {
    /// Parsed JSON objects, in input order.
    pub entries: Vec<Value>,
    /// Units that failed to parse.
    pub skipped: Vec<MalformedLine>,
}

/// Parse a dump that is either one JSON value or one JSON value per line.
///
/// The whole-file parse is attempted first. Only when it fails is the content
/// read line by line; unparseable lines are skipped and reported, blank lines
/// are ignored.
pub fn parse_dump(content: &str) -> ParsedDump {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => whole_value_entries(value),
        Err(err) => {
            debug!(
                error = %err,
                "[bugsplit:extract] whole-file parse failed; falling back to line-delimited"
            );
            line_delimited_entries(content)
        }
    }
}

fn whole_value_entries(value: Value) -> ParsedDump {
    let mut parsed = ParsedDump::default();
    match value {
        Value::Object(_) => parsed.entries.push(value),
        Value::Array(items) => {
            for (idx, item) in items.into_iter().enumerate() {
                if item.is_object() {
                    parsed.entries.push(item);
                } else {
                    parsed.skipped.push(MalformedLine::new(
                        idx + 1,
                        "array element is not a JSON object",
                        &item.to_string(),
                    ));
                }
            }
        }
        _ => {}
    }
    parsed
}

fn line_delimited_entries(content: &str) -> ParsedDump {
    let mut parsed = ParsedDump::default();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => parsed.entries.push(value),
            Ok(Value::Array(items)) => {
                for item in items {
                    if item.is_object() {
                        parsed.entries.push(item);
                    } else {
                        parsed.skipped.push(MalformedLine::new(
                            idx + 1,
                            "array element is not a JSON object",
                            &item.to_string(),
                        ));
                    }
                }
            }
            Ok(_) => parsed.skipped.push(MalformedLine::new(
                idx + 1,
                "line is not a JSON object",
                trimmed,
            )),
            Err(err) => parsed
                .skipped
                .push(MalformedLine::new(idx + 1, err.to_string(), trimmed)),
        }
    }
    parsed
}

/// Flatten one entry into a [`BugRecord`].
///
/// Fields come from the nested `bug` object and default to empty strings; an
/// entry without a `bug` object yields an all-empty row.
pub fn extract_attributes(entry: &Value) -> BugRecord {
    let bug = entry.get(BUG_KEY).and_then(Value::as_object);
    let field = |name: &str| {
        bug.and_then(|fields| fields.get(name))
            .map(scalar_text)
            .unwrap_or_default()
    };
    BugRecord {
        short_desc: field(columns::SHORT_DESC),
        product: field(columns::PRODUCT),
        priority: field(columns::PRIORITY),
        bug_severity: field(columns::BUG_SEVERITY),
        days_resolution: field(columns::DAYS_RESOLUTION),
        comments: bug
            .and_then(|fields| fields.get(LONG_DESC_KEY))
            .map(join_comments)
            .unwrap_or_default(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Join every comment body in order, separated by a blank line.
///
/// A single comment object is treated as a one-element list.
fn join_comments(long_desc: &Value) -> String {
    let comment_text = |comment: &Value| {
        comment
            .get(COMMENT_TEXT_KEY)
            .map(scalar_text)
            .unwrap_or_default()
    };
    match long_desc {
        Value::Array(comments) => comments
            .iter()
            .map(comment_text)
            .collect::<Vec<_>>()
            .join(COMMENT_SEPARATOR),
        Value::Object(_) => comment_text(long_desc),
        _ => String::new(),
    }
}

/// Raw tracker dump stored as `<raw_dir>/<Source>_original.json`.
#[derive(Clone, Debug)]
pub struct JsonDumpSource {
    id: SourceId,
    path: PathBuf,
}

impl JsonDumpSource {
    /// Source reading the conventional dump file for `id` inside `raw_dir`.
    pub fn in_dir(raw_dir: impl AsRef<Path>, id: impl Into<SourceId>) -> Self {
        let id = id.into();
        let path = raw_dir.as_ref().join(format!("{id}{RAW_FILE_SUFFIX}"));
        Self { id, path }
    }

    /// Dump file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BugSource for JsonDumpSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(&self) -> Result<SourceTable, PipelineError> {
        require_path(&self.path)?;
        let content = fs::read_to_string(&self.path)?;
        let parsed = parse_dump(&content);
        for skipped in &parsed.skipped {
            warn!(
                source = %self.id,
                excerpt = %skipped.excerpt,
                "[bugsplit:extract] skipping unit: {}",
                skipped.to_error(&self.path)
            );
        }
        if parsed.entries.is_empty() {
            return Err(PipelineError::no_valid_data(
                "extract",
                format!("no valid JSON objects found in '{}'", self.path.display()),
            ));
        }
        let records = parsed.entries.iter().map(extract_attributes).collect();
        Ok(SourceTable {
            source: self.id.clone(),
            records,
            skipped: parsed.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn whole_file_object_yields_one_entry() {
        let parsed = parse_dump(r#"{"bug": {"short_desc": "Crash"}}"#);
        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn whole_file_array_skips_non_objects() {
        let parsed = parse_dump(r#"[{"bug": {}}, 3, {"bug": {}}]"#);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
    }

    #[test]
    fn line_delimited_input_skips_malformed_lines_and_blank_lines() {
        let content = concat!(
            "{\"bug\": {\"short_desc\": \"a\"}}\n",
            "{\"bug\": {\"short_desc\": \n",
            "\n",
            "{\"bug\": {\"short_desc\": \"b\"}}\n",
        );
        let parsed = parse_dump(content);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
        assert!(parsed.skipped[0].excerpt.starts_with("{\"bug\""));
    }

    #[test]
    fn scalar_document_yields_nothing() {
        let parsed = parse_dump("42");
        assert!(parsed.entries.is_empty());
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn extract_attributes_reads_nested_fields_and_joins_comments() {
        let entry = json!({
            "bug": {
                "short_desc": "Editor freezes",
                "product": "Platform",
                "priority": "P3",
                "bug_severity": "major",
                "days_resolution": 14,
                "long_desc": [
                    {"thetext": "Steps to reproduce"},
                    {"who": "dev"},
                    {"thetext": "Fixed in trunk"}
                ]
            }
        });
        let record = extract_attributes(&entry);
        assert_eq!(record.short_desc, "Editor freezes");
        assert_eq!(record.product, "Platform");
        assert_eq!(record.priority, "P3");
        assert_eq!(record.bug_severity, "major");
        assert_eq!(record.days_resolution, "14");
        assert_eq!(record.comments, "Steps to reproduce\n\n\n\nFixed in trunk");
    }

    #[test]
    fn missing_bug_object_yields_empty_row() {
        let record = extract_attributes(&json!({"id": 7}));
        assert_eq!(record, BugRecord::default());

        let record = extract_attributes(&json!({"bug": "not an object"}));
        assert_eq!(record, BugRecord::default());
    }

    #[test]
    fn single_comment_object_and_null_fields_are_tolerated() {
        let entry = json!({
            "bug": {
                "priority": null,
                "long_desc": {"thetext": "only comment"}
            }
        });
        let record = extract_attributes(&entry);
        assert_eq!(record.priority, "");
        assert_eq!(record.comments, "only comment");
    }

    #[test]
    fn dump_source_reports_missing_file_and_empty_dump() {
        let temp = tempdir().unwrap();
        let missing = JsonDumpSource::in_dir(temp.path(), "KDE");
        assert!(missing.path().ends_with("KDE_original.json"));
        assert!(matches!(
            missing.load().unwrap_err(),
            PipelineError::InputNotFound { .. }
        ));

        fs::write(temp.path().join("W3C_original.json"), "not json\n").unwrap();
        let empty = JsonDumpSource::in_dir(temp.path(), "W3C");
        assert!(matches!(
            empty.load().unwrap_err(),
            PipelineError::NoValidData { .. }
        ));
    }
}
