//! Typed builders for Notion page property values.
//!
//! Every value serializes to exactly the JSON shape Notion expects for its
//! kind (`{"title": [...]}`, `{"date": null}`, ...), so payloads are never
//! assembled by hand.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// Notion rejects text objects longer than this.
pub const MAX_TEXT_LEN: usize = 2000;

/// Property name -> value, serialized as the `properties` object of a page request.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    RichText,
    Date,
    Select,
    Url,
    Number,
    /// Any kind the mapper never writes (status, relation, formula, ...).
    Other,
}

impl PropertyKind {
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::RichText,
            "date" => PropertyKind::Date,
            "select" => PropertyKind::Select,
            "url" => PropertyKind::Url,
            "number" => PropertyKind::Number,
            _ => PropertyKind::Other,
        }
    }
}

/// The property declarations of the target database, read once per run.
#[derive(Debug, Clone, Default)]
pub struct TargetSchema {
    fields: HashMap<String, PropertyKind>,
}

impl TargetSchema {
    pub fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        self.fields.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, PropertyKind)> for TargetSchema {
    fn from_iter<I: IntoIterator<Item = (S, PropertyKind)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    pub text: TextContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateObject {
    pub start: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectObject {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Title(Vec<TextObject>),
    RichText(Vec<TextObject>),
    Date(Option<DateObject>),
    Select(Option<SelectObject>),
    Url(Option<String>),
    Number(Option<f64>),
}

impl PropertyValue {
    /// An empty string clears the property instead of writing an empty run.
    pub fn title(content: &str) -> Self {
        PropertyValue::Title(text_runs(content))
    }

    pub fn rich_text(content: &str) -> Self {
        PropertyValue::RichText(text_runs(content))
    }

    pub fn date(start: Option<String>) -> Self {
        PropertyValue::Date(start.map(|start| DateObject { start }))
    }

    pub fn select(name: &str) -> Self {
        PropertyValue::Select(Some(SelectObject {
            name: name.to_string(),
        }))
    }

    pub fn url(url: &str) -> Self {
        PropertyValue::Url(Some(url.to_string()).filter(|u| !u.is_empty()))
    }

    pub fn number(value: Option<f64>) -> Self {
        PropertyValue::Number(value)
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Title(_) => PropertyKind::Title,
            PropertyValue::RichText(_) => PropertyKind::RichText,
            PropertyValue::Date(_) => PropertyKind::Date,
            PropertyValue::Select(_) => PropertyKind::Select,
            PropertyValue::Url(_) => PropertyKind::Url,
            PropertyValue::Number(_) => PropertyKind::Number,
        }
    }

    /// Concatenated text of a title or rich text value.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            PropertyValue::Title(runs) | PropertyValue::RichText(runs) => Some(
                runs.iter()
                    .map(|r| r.text.content.as_str())
                    .collect::<String>(),
            ),
            _ => None,
        }
    }
}

fn text_runs(content: &str) -> Vec<TextObject> {
    if content.is_empty() {
        Vec::new()
    } else {
        vec![text_object(content)]
    }
}

fn text_object(content: &str) -> TextObject {
    TextObject {
        text: TextContent {
            content: truncate_chars(content, MAX_TEXT_LEN),
        },
    }
}

/// Cuts on a char boundary; Notion counts characters, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
