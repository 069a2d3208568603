//! Completion handling: notification in, records out.
//!
//! A [`Pipeline`] runs one job at a time (collect, rebuild, extract, store).
//! A [`WorkerPool`] runs several pipelines side by side; each worker owns
//! its pipeline, so only the sink is shared.

use std::thread;

use crossbeam_channel::unbounded;

use crate::error::Result;
use crate::model::Document;
use crate::notify::CompletionNotification;
use crate::parser::{BuildOptions, DocumentBuilder};
use crate::provider::{
    CollectOutcome, CollectorOptions, DocumentAnalysisProvider, ResultCollector, RetryPolicy,
    Sleeper, ThreadSleeper,
};
use crate::render::{to_rows, to_text, TextOptions};
use crate::sink::{PersistenceSink, SharedSink, TextRecord};

/// Outcome of one processed notification.
#[derive(Debug, Clone)]
pub struct ProcessedJob {
    pub job_id: String,
    pub document_name: String,
    pub document: Document,
    pub text: String,
    /// Number of row records stored
    pub rows: usize,
    pub outcome: CollectOutcome,
}

/// Collects, rebuilds and stores the results of completed jobs.
pub struct Pipeline<P, S = ThreadSleeper> {
    collector: ResultCollector<P, S>,
    builder: DocumentBuilder,
    text_options: TextOptions,
}

impl<P: DocumentAnalysisProvider> Pipeline<P> {
    /// Create a pipeline with default options.
    pub fn new(provider: P) -> Self {
        Self::from_collector(ResultCollector::new(provider))
    }
}

impl<P, S> Pipeline<P, S>
where
    P: DocumentAnalysisProvider,
    S: Sleeper,
{
    /// Create a pipeline around a configured collector.
    pub fn from_collector(collector: ResultCollector<P, S>) -> Self {
        Self {
            collector,
            builder: DocumentBuilder::new(),
            text_options: TextOptions::default(),
        }
    }

    /// Set collection options.
    pub fn with_collector_options(mut self, options: CollectorOptions) -> Self {
        self.collector = self.collector.with_options(options);
        self
    }

    /// Set the retry policy used while collecting.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.collector = self.collector.with_policy(policy);
        self
    }

    /// Set document build options.
    pub fn with_build_options(mut self, options: BuildOptions) -> Self {
        self.builder = DocumentBuilder::with_options(options);
        self
    }

    /// Set text extraction options.
    pub fn with_text_options(mut self, options: TextOptions) -> Self {
        self.text_options = options;
        self
    }

    pub fn collector(&self) -> &ResultCollector<P, S> {
        &self.collector
    }

    /// Handle one notification.
    ///
    /// Returns `Ok(None)` for jobs that did not succeed; those are logged
    /// and left alone.
    pub fn process<K>(
        &mut self,
        notification: &CompletionNotification,
        sink: &mut K,
    ) -> Result<Option<ProcessedJob>>
    where
        K: PersistenceSink + ?Sized,
    {
        let job_id = notification.job_id.as_str();
        if !notification.is_succeeded() {
            log::info!(
                "Skipping job {} with status {}",
                job_id,
                notification.status
            );
            return Ok(None);
        }

        let document_name = notification.document_name();
        log::info!("Processing job {} ({})", job_id, document_name);

        let collected = self.collector.collect(job_id)?;
        let outcome = collected.outcome;
        if outcome == CollectOutcome::Empty {
            log::warn!("Job {}: no readable blocks in {}", job_id, document_name);
        }

        let document = self.builder.build_collected(collected)?;
        let text = to_text(&document, &self.text_options);

        sink.store_text(&TextRecord {
            document: document_name.clone(),
            extracted_text: text.clone(),
            job_id: job_id.to_string(),
        })?;

        let rows = to_rows(&document, &self.text_options.pages);
        for row in &rows {
            let row = row.clone().with_source(Some(job_id), Some(&document_name));
            sink.store_row(&row)?;
        }

        log::info!(
            "Job {}: stored text of {} pages and {} rows",
            job_id,
            document.page_count(),
            rows.len()
        );

        Ok(Some(ProcessedJob {
            job_id: job_id.to_string(),
            document_name,
            document,
            text,
            rows: rows.len(),
            outcome,
        }))
    }
}

/// Result of one notification handled by a [`WorkerPool`].
#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub result: Result<Option<ProcessedJob>>,
}

impl JobReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Processes notifications on a fixed number of threads.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every notification and return reports in input order.
    ///
    /// `make_pipeline` is called once per worker. A failing job does not
    /// stop the others.
    pub fn run<F, P, S, K>(
        &self,
        notifications: Vec<CompletionNotification>,
        make_pipeline: F,
        sink: SharedSink<K>,
    ) -> Vec<JobReport>
    where
        F: Fn() -> Pipeline<P, S> + Sync,
        P: DocumentAnalysisProvider,
        S: Sleeper,
        K: PersistenceSink + Send,
    {
        let total = notifications.len();
        let (job_tx, job_rx) = unbounded::<(usize, CompletionNotification)>();
        let (report_tx, report_rx) = unbounded::<(usize, JobReport)>();

        for job in notifications.into_iter().enumerate() {
            // Receivers outlive this loop, so sending cannot fail
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let workers = self.workers.min(total.max(1));
        log::info!("Processing {} notifications on {} workers", total, workers);

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let report_tx = report_tx.clone();
                let mut sink = sink.clone();
                let make_pipeline = &make_pipeline;

                scope.spawn(move || {
                    let mut pipeline = make_pipeline();
                    for (position, notification) in job_rx.iter() {
                        log::debug!("Worker {} took job {}", worker, notification.job_id);
                        let result = pipeline.process(&notification, &mut sink);
                        if let Err(err) = &result {
                            log::error!("Job {} failed: {}", notification.job_id, err);
                        }
                        let report = JobReport {
                            job_id: notification.job_id,
                            result,
                        };
                        if report_tx.send((position, report)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(report_tx);

        let mut reports: Vec<(usize, JobReport)> = report_rx.iter().collect();
        reports.sort_by_key(|(position, _)| *position);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

/// Process one notification on tokio's blocking pool.
#[cfg(feature = "async")]
pub async fn process_notification_async<P, S, K>(
    mut pipeline: Pipeline<P, S>,
    notification: CompletionNotification,
    mut sink: SharedSink<K>,
) -> Result<Option<ProcessedJob>>
where
    P: DocumentAnalysisProvider + Send + 'static,
    S: Sleeper + Send + 'static,
    K: PersistenceSink + Send + 'static,
{
    tokio::task::spawn_blocking(move || pipeline.process(&notification, &mut sink))
        .await
        .map_err(|e| crate::error::Error::Task(format!("Task join error: {}", e)))?
}
