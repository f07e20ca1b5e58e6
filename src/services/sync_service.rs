use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::canvas::CanvasClient;
use crate::error::AppError;
use crate::models::{Assignment, Course};
use crate::notion::NotionClient;
use crate::notion::properties::{PropertyKind, TargetSchema};
use crate::sync::{AssignmentStatus, IdentityIndex, fields, map_assignment, resolve_status};

pub struct SyncService {
    canvas: Arc<dyn CanvasClient>,
    notion: Arc<dyn NotionClient>,
    course_ids: Vec<String>,
    pace: Duration,
    // Held for a whole run; two overlapping runs could both create a page
    // for the same assignment.
    run_lock: Mutex<()>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub scopes_failed: usize,
}

enum Outcome {
    Created,
    Updated,
}

impl SyncService {
    /// An empty `course_ids` syncs every active course.
    pub fn new(
        canvas: Arc<dyn CanvasClient>,
        notion: Arc<dyn NotionClient>,
        course_ids: Vec<String>,
        pace: Duration,
    ) -> Self {
        Self {
            canvas,
            notion,
            course_ids,
            pace,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn sync_all(&self) -> Result<SyncSummary, AppError> {
        let _run = self.run_lock.lock().await;
        info!("Starting Canvas to Notion sync...");

        info!("Step 1: Reading database schema");
        let schema = self.notion.fetch_schema().await?;
        if schema.kind_of(fields::CANVAS_ID) != Some(PropertyKind::RichText) {
            return Err(AppError::Config(format!(
                "Notion database needs a rich text {:?} property to match assignments",
                fields::CANVAS_ID
            )));
        }

        info!("Step 2: Indexing existing pages");
        let records = self.notion.query_all(None).await?;
        let mut index = IdentityIndex::build(&records, fields::CANVAS_ID);
        info!(
            "Found {} existing assignments in Notion ({} pages)",
            index.len(),
            records.len()
        );

        info!("Step 3: Syncing assignments");
        let courses = self.resolve_courses().await?;
        info!("Found {} courses", courses.len());

        let mut summary = SyncSummary::default();

        for course in &courses {
            info!("Processing course: {}", course.name);

            let assignments = match self.canvas.list_assignments(&course.id).await {
                Ok(assignments) => assignments,
                Err(e) => {
                    warn!("Skipping course {} ({}): {}", course.name, course.id, e);
                    summary.scopes_failed += 1;
                    continue;
                }
            };

            for assignment in &assignments {
                summary.total += 1;

                match self
                    .sync_assignment(course, assignment, &schema, &mut index)
                    .await
                {
                    Ok(Outcome::Created) => summary.created += 1,
                    Ok(Outcome::Updated) => summary.updated += 1,
                    Err(e) if e.is_fatal() => {
                        error!("Aborting sync at {:?}: {}", assignment.name, e);
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("Failed to sync {:?}: {}", assignment.name, e);
                        summary.failed += 1;
                    }
                }

                if !self.pace.is_zero() {
                    tokio::time::sleep(self.pace).await;
                }
            }
        }

        info!(
            "Sync completed: total={} created={} updated={} failed={} courses_skipped={}",
            summary.total, summary.created, summary.updated, summary.failed, summary.scopes_failed
        );
        Ok(summary)
    }

    /// Rows whose `Status` is anything but Completed.
    pub async fn pending_count(&self) -> Result<usize, AppError> {
        let schema = self.notion.fetch_schema().await?;
        if schema.kind_of(fields::STATUS) != Some(PropertyKind::Select) {
            return Ok(0);
        }

        let filter = serde_json::json!({
            "property": fields::STATUS,
            "select": { "does_not_equal": AssignmentStatus::Completed.label() }
        });
        let pending = self.notion.query_all(Some(filter)).await?;
        Ok(pending.len())
    }

    async fn resolve_courses(&self) -> Result<Vec<Course>, AppError> {
        if self.course_ids.is_empty() {
            return self.canvas.list_courses().await;
        }

        let mut courses = Vec::with_capacity(self.course_ids.len());
        for id in &self.course_ids {
            match self.canvas.fetch_course(id).await {
                Ok(course) => courses.push(course),
                Err(e) => {
                    warn!("Could not fetch course {}: {}", id, e);
                    courses.push(Course::unnamed(id.as_str()));
                }
            }
        }
        Ok(courses)
    }

    async fn sync_assignment(
        &self,
        course: &Course,
        assignment: &Assignment,
        schema: &TargetSchema,
        index: &mut IdentityIndex,
    ) -> Result<Outcome, AppError> {
        let (submission, status_known) = match self
            .canvas
            .fetch_submission(&course.id, &assignment.id)
            .await
        {
            Ok(submission) => (submission, true),
            Err(e) => {
                warn!("No submission state for {:?}: {}", assignment.name, e);
                (None, false)
            }
        };

        let status = resolve_status(submission.as_ref());
        let mut properties = map_assignment(assignment, course, status, schema);

        match index.get(&assignment.id).map(str::to_string) {
            Some(page_id) => {
                // An existing page keeps its status until Canvas answers again.
                if !status_known {
                    properties.remove(fields::STATUS);
                }
                self.notion.update_page(&page_id, &properties).await?;
                info!("Updated: {} [{}]", assignment.name, status);
                Ok(Outcome::Updated)
            }
            None => {
                let page = self.notion.create_page(&properties).await?;
                index.insert(assignment.id.clone(), page.id);
                info!("Created: {} [{}]", assignment.name, status);
                Ok(Outcome::Created)
            }
        }
    }
}
