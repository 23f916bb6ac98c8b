//! Request model and shared value types for the ReportForge build domain.
//!
//! [`BuildRequest`] is exactly what a client posts and exactly what lands in
//! the workspace data file: field order, block order and non-ASCII text all
//! survive the trip unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ClassificationKey;

// ---------------------------------------------------------------------------
// Build request
// ---------------------------------------------------------------------------

/// One document-build request: routing key, report metadata, and body content.
///
/// The wire shape is flat. `course` is the classification key; every other
/// top-level scalar is report metadata; `content_blocks` is the document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Selects the template. Serialized under its wire name `course`.
    #[serde(rename = "course")]
    pub classification: ClassificationKey,

    /// Title page and abstract fields.
    #[serde(flatten)]
    pub metadata: ReportMetadata,

    /// Document body in reading order.
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,
}

impl BuildRequest {
    /// Creates a request with empty metadata and no content.
    pub fn new(classification: impl Into<String>) -> Self {
        Self {
            classification: ClassificationKey::new(classification),
            metadata: ReportMetadata::default(),
            content_blocks: Vec::new(),
        }
    }

    /// File name offered to the client for the compiled document.
    ///
    /// `report_<student_id>.pdf`, or `report_<classification>.pdf` when no
    /// student id was supplied. Characters that are unsafe in a file name or a
    /// header value are replaced with `_`.
    pub fn download_file_name(&self) -> String {
        let stem = if self.metadata.student_id.trim().is_empty() {
            self.classification.as_str()
        } else {
            self.metadata.student_id.trim()
        };
        let stem: String = stem
            .chars()
            .map(|c| match c {
                '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        if stem.is_empty() {
            "report.pdf".to_string()
        } else {
            format!("report_{stem}.pdf")
        }
    }
}

// ---------------------------------------------------------------------------

/// Scalar metadata rendered on the title page and abstract pages.
///
/// Every field defaults to the empty string so templates can reference them
/// unconditionally. Fields a client sends beyond the known set are kept in
/// [`ReportMetadata::extra`] and written to the data file verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_en: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_name_en: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub supervisor: String,
    #[serde(default)]
    pub supervisor_en: String,
    #[serde(default)]
    pub finish_year: String,
    #[serde(default)]
    pub finish_month: String,
    #[serde(default)]
    pub abstract_zh: String,
    #[serde(default)]
    pub keywords_zh: String,
    #[serde(default)]
    pub abstract_en: String,
    #[serde(default)]
    pub keywords_en: String,

    /// Client-supplied fields outside the known set.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Content blocks
// ---------------------------------------------------------------------------

/// One discrete unit of document content.
///
/// Discriminated on the `type` field. Optional fields that are absent are
/// written as `null` so templates see a stable shape per block kind. No
/// cross-field checks happen here (a table row may be wider than its header);
/// that is left to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A section heading.
    Section { title: String },

    /// A paragraph of free text with an optional heading.
    Text {
        title: Option<String>,
        content: String,
    },

    /// A display equation in the template language's math syntax.
    Equation { content: String },

    /// An image referencing a file staged in the workspace.
    Image {
        title: Option<String>,
        path: String,
        caption: Option<String>,
    },

    /// A table with column headers and rows of scalar cells.
    Table {
        title: Option<String>,
        caption: Option<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    },
}

impl ContentBlock {
    /// The wire tag of this block (`"text"`, `"table"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Section { .. } => "section",
            Self::Text { .. } => "text",
            Self::Equation { .. } => "equation",
            Self::Image { .. } => "image",
            Self::Table { .. } => "table",
        }
    }
}

/// A single table cell. Rows may mix kinds freely.
///
/// Numbers keep their JSON representation, so integers beyond `i64` (up to
/// `u64::MAX`) reach the data file unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Formats as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`) for HTTP headers.
    pub fn to_http_date(self) -> String {
        self.0.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn request_decodes_flat_wire_shape() {
        let raw = json!({
            "course": "教育见习",
            "title": "见习报告",
            "student_id": "20230001",
            "content_blocks": [
                { "id": "e1", "type": "section", "title": "一、见习学校概况" },
                { "id": "e2", "type": "text", "content": "基本情况介绍" }
            ]
        });
        let request: BuildRequest = serde_json::from_value(raw).unwrap();

        assert_eq!(request.classification.as_str(), "教育见习");
        assert_eq!(request.metadata.title, "见习报告");
        assert_eq!(request.metadata.college, "");
        assert_eq!(request.content_blocks.len(), 2);
        assert_eq!(request.content_blocks[0].kind(), "section");
        assert_eq!(
            request.content_blocks[1],
            ContentBlock::Text {
                title: None,
                content: "基本情况介绍".to_string()
            }
        );
    }

    #[test]
    fn unknown_top_level_fields_are_kept() {
        let raw = json!({ "course": "x", "department": "物理系" });
        let request: BuildRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.metadata.extra["department"], json!("物理系"));

        let back = serde_json::to_value(&request).unwrap();
        assert_eq!(back["department"], json!("物理系"));
        assert_eq!(back["course"], json!("x"));
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let raw = json!({ "course": "x", "content_blocks": [{ "type": "video" }] });
        assert!(serde_json::from_value::<BuildRequest>(raw).is_err());
    }

    #[test]
    fn table_cells_keep_their_kind() {
        let raw = json!({
            "type": "table",
            "headers": ["name", "score", "passed", "note"],
            "rows": [["Alice", 95, true, null], ["Bob", 87.5, false, "retake"]]
        });
        let block: ContentBlock = serde_json::from_value(raw).unwrap();
        let ContentBlock::Table { rows, caption, .. } = &block else {
            panic!("expected a table, got {block:?}");
        };
        assert_eq!(caption, &None);
        assert_eq!(
            rows[0],
            vec![
                Cell::Text("Alice".into()),
                Cell::Number(95.into()),
                Cell::Bool(true),
                Cell::Null
            ]
        );
        assert_eq!(
            rows[1][1],
            Cell::Number(serde_json::Number::from_f64(87.5).unwrap())
        );

        let back = serde_json::to_value(&block).unwrap();
        assert_eq!(back["caption"], serde_json::Value::Null);
        assert_eq!(back["rows"][0][3], serde_json::Value::Null);
    }

    #[test]
    fn wide_integer_cells_are_written_unchanged() {
        let raw = r#"{"type":"table","headers":["id","score","serial"],"rows":[[18446744073709551615,1e2,12345678901234567890]]}"#;
        let block: ContentBlock = serde_json::from_str(raw).unwrap();
        let ContentBlock::Table { rows, .. } = &block else {
            panic!("expected a table, got {block:?}");
        };
        assert_eq!(rows[0][0], Cell::Number(u64::MAX.into()));

        let text = serde_json::to_string(&block).unwrap();
        assert!(text.contains("[18446744073709551615,100.0,12345678901234567890]"), "{text}");
    }

    #[test]
    fn download_name_prefers_student_id() {
        let mut request = BuildRequest::new("教育见习");
        assert_eq!(request.download_file_name(), "report_教育见习.pdf");

        request.metadata.student_id = "2023/0001".into();
        assert_eq!(request.download_file_name(), "report_2023_0001.pdf");

        let empty = BuildRequest::new("");
        assert_eq!(empty.download_file_name(), "report.pdf");
    }

    #[test]
    fn http_date_format() {
        let ts = Timestamp::from_utc(Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap());
        assert_eq!(ts.to_http_date(), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
