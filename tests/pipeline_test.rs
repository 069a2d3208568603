//! Integration tests for completion handling.

use std::fs;

use blockdoc::model::Block;
use blockdoc::pipeline::{Pipeline, WorkerPool};
use blockdoc::provider::{CollectOutcome, JobStatus, ReplayProvider, ResultPage};
use blockdoc::render::TextOptions;
use blockdoc::sink::{JsonDirSink, MemorySink, SharedSink, TextRecord};
use blockdoc::CompletionNotification;

fn notification(job_id: &str, status: &str, key: &str) -> CompletionNotification {
    let message = serde_json::json!({
        "JobId": job_id,
        "Status": status,
        "API": "StartDocumentAnalysis",
        "JobTag": "tdt-roster",
        "Timestamp": 1_700_000_000_000_i64,
        "DocumentLocation": {"S3ObjectName": key, "S3Bucket": "docs"}
    });
    CompletionNotification::from_json(&message.to_string()).unwrap()
}

/// Two fragments: a roster table on page 1, a greeting on page 2.
fn fragments() -> Vec<ResultPage> {
    vec![
        ResultPage::new(vec![
            Block::page("p1", 1).with_children(["t1"]),
            Block::table("t1").with_children(["c1", "c2", "c3", "c4"]),
            Block::cell("c1", 1, 1).with_children(["w1"]),
            Block::cell("c2", 1, 2).with_children(["w2"]),
            Block::cell("c3", 2, 1).with_children(["w3"]),
            Block::cell("c4", 2, 2).with_children(["w4"]),
            Block::word("w1", "ID"),
            Block::word("w2", "Name"),
            Block::word("w3", "7"),
            Block::word("w4", "Ana"),
        ])
        .with_declared_pages(2),
        ResultPage::new(vec![
            Block::page("p2", 2).with_children(["l1"]),
            Block::line("l1", "Hello world"),
        ]),
    ]
}

#[test]
fn test_notification_to_json_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonDirSink::new(dir.path()).unwrap();
    let provider = ReplayProvider::new(fragments()).with_job_id("job-7");
    let mut pipeline = Pipeline::new(provider);

    let job = pipeline
        .process(&notification("job-7", "SUCCEEDED", "in/roster.pdf"), &mut sink)
        .unwrap()
        .unwrap();

    assert_eq!(job.document.page_count(), 2);
    assert_eq!(job.document.metadata.declared_pages, 2);
    assert_eq!(job.outcome, CollectOutcome::Complete);
    assert_eq!(job.text, "Hello world");
    assert_eq!(job.rows, 1);

    let stored: TextRecord =
        serde_json::from_str(&fs::read_to_string(dir.path().join("roster.json")).unwrap())
            .unwrap();
    assert_eq!(stored.document, "roster");
    assert_eq!(stored.extracted_text, "Hello world");
    assert_eq!(stored.job_id, "job-7");

    let rows = fs::read_to_string(dir.path().join("roster.rows.jsonl")).unwrap();
    let row: serde_json::Value = serde_json::from_str(rows.lines().next().unwrap()).unwrap();
    assert_eq!(row["values"], serde_json::json!({"ID": "7", "Name": "Ana"}));
    assert_eq!(row["job_id"], "job-7");
}

#[test]
fn test_only_succeeded_jobs_are_processed() {
    let mut sink = MemorySink::new();
    let mut pipeline = Pipeline::new(ReplayProvider::new(fragments()).with_job_id("job-7"));

    for status in ["FAILED", "IN_PROGRESS", "PARTIAL_SUCCESS", "ERROR"] {
        let outcome = pipeline
            .process(&notification("job-7", status, "in/roster.pdf"), &mut sink)
            .unwrap();
        assert!(outcome.is_none(), "status {status}");
    }
    assert!(sink.texts.is_empty());
    assert!(sink.rows.is_empty());
}

#[test]
fn test_newline_text_option() {
    let mut sink = MemorySink::new();
    let provider = ReplayProvider::new(vec![ResultPage::new(vec![
        Block::page("p1", 1).with_children(["l1", "l2"]),
        Block::line("l1", "first"),
        Block::line("l2", "second"),
    ])]);
    let mut pipeline =
        Pipeline::new(provider).with_text_options(TextOptions::new().with_newlines(true));

    pipeline
        .process(&notification("replay-job", "SUCCEEDED", "a.png"), &mut sink)
        .unwrap();

    assert_eq!(sink.texts[0].extracted_text, "first\nsecond");
}

#[test]
fn test_unreadable_document_still_reports() {
    let mut sink = MemorySink::new();
    let mut pipeline = Pipeline::new(ReplayProvider::new(vec![ResultPage::default()]));

    let job = pipeline
        .process(&notification("replay-job", "SUCCEEDED", "blank.pdf"), &mut sink)
        .unwrap()
        .unwrap();

    assert_eq!(job.outcome, CollectOutcome::Empty);
    assert!(job.document.is_empty());
    assert_eq!(sink.texts.len(), 1);
    assert_eq!(sink.texts[0].extracted_text, "");
}

#[test]
fn test_sns_event_notification() {
    let inner = serde_json::json!({
        "JobId": "job-7",
        "Status": JobStatus::Succeeded.to_string(),
        "DocumentLocation": {"S3ObjectName": "in/roster.pdf", "S3Bucket": "docs"}
    })
    .to_string();
    let event = serde_json::json!({"Records": [{"Sns": {"Message": inner}}]}).to_string();

    let notifications = CompletionNotification::parse_any(&event).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].document_name(), "roster");
}

#[test]
fn test_worker_pool_shares_only_the_sink() {
    let notifications: Vec<_> = (0..6)
        .map(|i| notification("replay-job", "SUCCEEDED", &format!("in/doc-{i}.pdf")))
        .collect();
    let sink = SharedSink::new(MemorySink::new());

    let reports = WorkerPool::new(3).run(
        notifications,
        || Pipeline::new(ReplayProvider::new(fragments())),
        sink.clone(),
    );

    assert_eq!(reports.len(), 6);
    assert!(reports.iter().all(|r| r.is_ok()));

    let sink = sink.into_inner().unwrap();
    assert_eq!(sink.texts.len(), 6);
    assert_eq!(sink.rows.len(), 6);
    let mut documents: Vec<_> = sink.texts.iter().map(|t| t.document.clone()).collect();
    documents.sort();
    assert_eq!(documents[0], "doc-0");
    assert_eq!(documents[5], "doc-5");
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_process_notification_async() {
    let sink = SharedSink::new(MemorySink::new());
    let pipeline = Pipeline::new(ReplayProvider::new(fragments()));

    let job = blockdoc::pipeline::process_notification_async(
        pipeline,
        notification("replay-job", "SUCCEEDED", "in/roster.pdf"),
        sink.clone(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(job.rows, 1);
    assert_eq!(sink.with(|s| s.texts.len()).unwrap(), 1);
}
