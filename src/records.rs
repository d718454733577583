//! Raw actor output items and the normalized post table built from them.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Substituted for any field the actor omitted.
pub const MISSING: &str = "none";

pub const COLUMNS: [&str; 4] = ["pageName", "text", "time", "url"];

/// One dataset item as returned by the actor.
///
/// `None` means the key was absent; `Some(Value::Null)` means it was
/// present with an explicit null.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    #[serde(default, deserialize_with = "present")]
    pub page_name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub text: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub time: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub url: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub page_name: Option<String>,
    pub text: Option<String>,
    pub time: Option<NaiveDateTime>,
    pub url: Option<String>,
}

impl PostRecord {
    pub fn from_raw(item: RawItem) -> Self {
        let time = field_or_missing(item.time)
            .as_deref()
            .and_then(parse_timestamp);

        PostRecord {
            page_name: field_or_missing(item.page_name),
            text: field_or_missing(item.text),
            time,
            url: field_or_missing(item.url),
        }
    }
}

fn field_or_missing(field: Option<Value>) -> Option<String> {
    match field {
        None => Some(MISSING.to_string()),
        Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    }
}

/// Lenient timestamp parsing. Offsets are folded into UTC and dropped;
/// anything unrecognised yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = raw.parse().ok()?;
        // 12 or more digits are epoch milliseconds
        let dt = if n >= 100_000_000_000 {
            DateTime::from_timestamp_millis(n)
        } else {
            DateTime::from_timestamp(n, 0)
        };
        return dt.map(|dt| dt.naive_utc());
    }

    None
}

/// Posts ordered newest first, undated posts last.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PostTable {
    rows: Vec<PostRecord>,
}

impl PostTable {
    pub fn rows(&self) -> &[PostRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PostRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Non-null post bodies joined by single spaces.
    pub fn joined_text(&self) -> String {
        self.rows
            .iter()
            .filter_map(|r| r.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Fixed-width rendering with right-aligned columns and no index.
    pub fn render(&self) -> String {
        let cells: Vec<[String; 4]> = self
            .rows
            .iter()
            .map(|r| {
                [
                    display_text(&r.page_name),
                    display_text(&r.text),
                    r.time
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.f").to_string())
                        .unwrap_or_else(|| "NaT".to_string()),
                    display_text(&r.url),
                ]
            })
            .collect();

        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, COLUMNS.iter().copied(), &widths);
        for row in &cells {
            out.push('\n');
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }
        out
    }
}

fn display_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "None".to_string())
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize; 4]) {
    let line = cells
        .zip(widths)
        .map(|(cell, w)| format!("{:>width$}", cell, width = *w))
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(&line);
}

fn newest_first(a: &PostRecord, b: &PostRecord) -> Ordering {
    match (a.time, b.time) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Builds the sorted post table. Never fails: every field is defaulted.
pub fn normalize(items: impl IntoIterator<Item = RawItem>) -> PostTable {
    let mut rows: Vec<PostRecord> = items.into_iter().map(PostRecord::from_raw).collect();
    rows.sort_by(newest_first);
    PostTable { rows }
}
