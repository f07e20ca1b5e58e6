use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::models::{Assignment, Course};
use crate::notion::properties::{PropertyBag, PropertyValue, TargetSchema};
use crate::sync::status::AssignmentStatus;

/// Property names in the assignments database.
pub mod fields {
    pub const NAME: &str = "Assignment Name";
    pub const COURSE: &str = "Course";
    pub const DUE_DATE: &str = "Due Date";
    pub const STATUS: &str = "Status";
    pub const POINTS: &str = "Points";
    pub const URL: &str = "Canvas URL";
    pub const CANVAS_ID: &str = "Canvas ID";
    pub const DESCRIPTION: &str = "Description";
}

/// Builds the properties for one assignment. Only fields the schema declares
/// with the matching kind are emitted; everything else is left out.
pub fn map_assignment(
    assignment: &Assignment,
    course: &Course,
    status: AssignmentStatus,
    schema: &TargetSchema,
) -> PropertyBag {
    let candidates = [
        (fields::NAME, PropertyValue::title(&assignment.name)),
        (fields::COURSE, PropertyValue::rich_text(&course.name)),
        (
            fields::DUE_DATE,
            PropertyValue::date(assignment.due_at.as_deref().and_then(normalize_timestamp)),
        ),
        (fields::STATUS, PropertyValue::select(status.label())),
        (fields::POINTS, PropertyValue::number(assignment.points_possible)),
        (fields::URL, PropertyValue::url(&assignment.html_url)),
        (fields::CANVAS_ID, PropertyValue::rich_text(&assignment.id)),
        (
            fields::DESCRIPTION,
            PropertyValue::rich_text(assignment.description.as_deref().unwrap_or_default()),
        ),
    ];

    let mut bag = PropertyBag::new();
    for (name, value) in candidates {
        match schema.kind_of(name) {
            None => continue,
            Some(kind) if kind == value.kind() => {
                bag.insert(name.to_string(), value);
            }
            Some(kind) => {
                warn!(
                    "Skipping property {:?}: database declares {:?}, expected {:?}",
                    name,
                    kind,
                    value.kind()
                );
            }
        }
    }
    bag
}

/// Canvas timestamps (`2024-03-01T23:59:00Z`, or with an explicit offset) as
/// UTC ISO-8601. Unparseable values are dropped with a warning.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.and_utc()));

    match parsed {
        Ok(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
        Err(e) => {
            warn!("Ignoring unparseable date {:?}: {}", raw, e);
            None
        }
    }
}
