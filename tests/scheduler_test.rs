mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use canvas_notion_sync::models::Course;
use canvas_notion_sync::services::{SyncScheduler, SyncService};

use common::{FakeCanvas, FakeNotion, assignment, full_schema};

#[tokio::test]
async fn scheduler_runs_immediately_and_repeats() {
    let canvas = FakeCanvas::default().with_course(
        Course::new("7297", "Chemistry"),
        vec![assignment("101", "7297", "Lab 1")],
    );
    let notion = Arc::new(FakeNotion::new(full_schema()));
    let service = Arc::new(SyncService::new(
        Arc::new(canvas),
        notion.clone(),
        Vec::new(),
        Duration::ZERO,
    ));

    let scheduler = SyncScheduler::new(service, Duration::from_millis(200));
    let task = tokio::spawn(scheduler.start());

    tokio::time::sleep(Duration::from_millis(700)).await;
    task.abort();

    assert_eq!(notion.creates.load(Ordering::SeqCst), 1);
    assert!(notion.updates.load(Ordering::SeqCst) >= 2);
    assert_eq!(notion.page_count(), 1);
}

#[tokio::test]
async fn scheduler_survives_failed_runs() {
    let mut fake = FakeNotion::new(full_schema());
    fake.reject_writes = true;
    let notion = Arc::new(fake);
    let canvas = FakeCanvas::default().with_course(
        Course::new("7297", "Chemistry"),
        vec![assignment("101", "7297", "Lab 1")],
    );
    let service = Arc::new(SyncService::new(
        Arc::new(canvas),
        notion.clone(),
        Vec::new(),
        Duration::ZERO,
    ));

    let task = tokio::spawn(SyncScheduler::new(service, Duration::from_millis(100)).start());

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!task.is_finished());
    task.abort();

    // Each attempt reads the whole database before failing on the write.
    assert!(notion.query_calls.load(Ordering::SeqCst) >= 2);
}
