#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use canvas_notion_sync::canvas::CanvasClient;
use canvas_notion_sync::error::AppError;
use canvas_notion_sync::models::{Assignment, Course, Submission, WorkflowState};
use canvas_notion_sync::notion::dto::{DateValue, Property, RichText, SelectOption};
use canvas_notion_sync::notion::properties::{PropertyBag, PropertyKind, PropertyValue, TargetSchema};
use canvas_notion_sync::notion::{NotionClient, QueryPage, TargetRecord};
use canvas_notion_sync::sync::fields;

pub fn full_schema() -> TargetSchema {
    [
        (fields::NAME, PropertyKind::Title),
        (fields::COURSE, PropertyKind::RichText),
        (fields::DUE_DATE, PropertyKind::Date),
        (fields::STATUS, PropertyKind::Select),
        (fields::POINTS, PropertyKind::Number),
        (fields::URL, PropertyKind::Url),
        (fields::CANVAS_ID, PropertyKind::RichText),
        (fields::DESCRIPTION, PropertyKind::RichText),
    ]
    .into_iter()
    .collect()
}

pub fn assignment(id: &str, course_id: &str, name: &str) -> Assignment {
    Assignment {
        id: id.to_string(),
        course_id: course_id.to_string(),
        name: name.to_string(),
        due_at: Some("2024-03-01T23:59:00Z".to_string()),
        points_possible: Some(10.0),
        description: None,
        html_url: format!("https://school.instructure.com/courses/{}/assignments/{}", course_id, id),
    }
}

pub fn submission(state: WorkflowState, submitted_at: Option<&str>, late: bool) -> Submission {
    Submission {
        workflow_state: state,
        submitted_at: submitted_at.map(str::to_string),
        late,
    }
}

#[derive(Default)]
pub struct FakeCanvas {
    pub courses: Vec<Course>,
    /// Courses missing from this map fail to list, like a 403 from Canvas.
    pub assignments: HashMap<String, Vec<Assignment>>,
    pub submissions: HashMap<String, Submission>,
    /// Assignment ids whose submission lookup fails with a 503.
    pub failing_submissions: HashSet<String>,
    pub fail_course_listing: bool,
}

impl FakeCanvas {
    pub fn with_course(mut self, course: Course, assignments: Vec<Assignment>) -> Self {
        self.assignments.insert(course.id.clone(), assignments);
        self.courses.push(course);
        self
    }
}

#[async_trait]
impl CanvasClient for FakeCanvas {
    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        if self.fail_course_listing {
            return Err(AppError::Api {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.courses.clone())
    }

    async fn fetch_course(&self, course_id: &str) -> Result<Course, AppError> {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, AppError> {
        self.assignments
            .get(course_id)
            .cloned()
            .ok_or_else(|| AppError::Api {
                status: 403,
                body: "user not authorized to perform that action".to_string(),
            })
    }

    async fn fetch_submission(
        &self,
        _course_id: &str,
        assignment_id: &str,
    ) -> Result<Option<Submission>, AppError> {
        if self.failing_submissions.contains(assignment_id) {
            return Err(AppError::Api {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(self.submissions.get(assignment_id).cloned())
    }
}

/// In-memory Notion database with cursor pagination and failure injection.
pub struct FakeNotion {
    pub schema: TargetSchema,
    pub pages: Mutex<Vec<TargetRecord>>,
    pub page_size: usize,
    /// Canvas ids whose create call fails with a 400.
    pub fail_create_for: HashSet<String>,
    /// Every write fails with 401.
    pub reject_writes: bool,
    pub query_calls: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeNotion {
    pub fn new(schema: TargetSchema) -> Self {
        Self {
            schema,
            pages: Mutex::new(Vec::new()),
            page_size: 100,
            fail_create_for: HashSet::new(),
            reject_writes: false,
            query_calls: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Seeds rows that already carry a Canvas ID.
    pub fn seed(&self, canvas_ids: impl IntoIterator<Item = String>) {
        let mut pages = self.pages.lock().unwrap();
        for canvas_id in canvas_ids {
            let mut bag = PropertyBag::new();
            bag.insert(fields::CANVAS_ID.to_string(), PropertyValue::rich_text(&canvas_id));
            pages.push(TargetRecord {
                id: self.allocate_id(),
                properties: to_properties(&bag),
            });
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    pub fn pages_for(&self, canvas_id: &str) -> Vec<TargetRecord> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.text(fields::CANVAS_ID).as_deref() == Some(canvas_id))
            .cloned()
            .collect()
    }

    fn allocate_id(&self) -> String {
        format!("page-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn select_value(record: &TargetRecord, key: &str) -> Option<String> {
    match record.properties.get(key) {
        Some(Property::Select { select }) => select.as_ref().map(|s| s.name.clone()),
        _ => None,
    }
}

pub fn to_properties(bag: &PropertyBag) -> HashMap<String, Property> {
    bag.iter()
        .map(|(name, value)| {
            let property = match value {
                PropertyValue::Title(_) => Property::Title {
                    title: vec![RichText {
                        plain_text: value.plain_text().unwrap_or_default(),
                    }],
                },
                PropertyValue::RichText(_) => Property::RichText {
                    rich_text: vec![RichText {
                        plain_text: value.plain_text().unwrap_or_default(),
                    }],
                },
                PropertyValue::Date(date) => Property::Date {
                    date: date.as_ref().map(|d| DateValue {
                        start: d.start.clone(),
                    }),
                },
                PropertyValue::Select(select) => Property::Select {
                    select: select.as_ref().map(|s| SelectOption { name: s.name.clone() }),
                },
                PropertyValue::Url(url) => Property::Url { url: url.clone() },
                PropertyValue::Number(number) => Property::Number { number: *number },
            };
            (name.clone(), property)
        })
        .collect()
}

#[async_trait]
impl NotionClient for FakeNotion {
    async fn fetch_schema(&self) -> Result<TargetSchema, AppError> {
        Ok(self.schema.clone())
    }

    async fn query_page(
        &self,
        cursor: Option<String>,
        filter: Option<serde_json::Value>,
    ) -> Result<QueryPage, AppError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let excluded_status = filter
            .as_ref()
            .and_then(|f| f["select"]["does_not_equal"].as_str().map(str::to_string));

        let pages = self.pages.lock().unwrap();
        let matching: Vec<&TargetRecord> = pages
            .iter()
            .filter(|p| match &excluded_status {
                Some(excluded) => select_value(p, fields::STATUS).as_deref() != Some(excluded.as_str()),
                None => true,
            })
            .collect();

        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(matching.len());
        let has_more = end < matching.len();

        Ok(QueryPage {
            records: matching[start..end].iter().map(|p| (*p).clone()).collect(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn create_page(&self, properties: &PropertyBag) -> Result<TargetRecord, AppError> {
        if self.reject_writes {
            return Err(AppError::Unauthorized("API token is invalid".to_string()));
        }

        let canvas_id = properties
            .get(fields::CANVAS_ID)
            .and_then(|v| v.plain_text())
            .unwrap_or_default();
        if self.fail_create_for.contains(&canvas_id) {
            return Err(AppError::Api {
                status: 400,
                body: "body failed validation".to_string(),
            });
        }

        let record = TargetRecord {
            id: self.allocate_id(),
            properties: to_properties(properties),
        };
        self.pages.lock().unwrap().push(record.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: &PropertyBag,
    ) -> Result<TargetRecord, AppError> {
        if self.reject_writes {
            return Err(AppError::Unauthorized("API token is invalid".to_string()));
        }

        let mut pages = self.pages.lock().unwrap();
        let page = pages
            .iter_mut()
            .find(|p| p.id == page_id)
            .ok_or(AppError::NotFound)?;
        page.properties.extend(to_properties(properties));
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(page.clone())
    }
}
