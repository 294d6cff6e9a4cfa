//! Extraction orchestrator and worker pool.
//!
//! [`ExtractionService`] owns the job store, the notification sink and a
//! bounded queue drained by a fixed number of worker tasks. `prepare`
//! creates the job record synchronously; `submit` enqueues the payload and
//! returns, applying backpressure when the queue is full. Workers run the
//! whole unpack/convert/aggregate pipeline for one job on the blocking pool,
//! so one job occupies one worker for its full duration.

use crate::archive::flatten;
use crate::config::ServiceConfig;
use crate::error::{BlattwerkError, Result};
use crate::formats::{FileType, OUTPUT_MIME_TYPE, ZIP_MIME_TYPE};
use crate::notify::{NotificationEvent, SharedSink};
use crate::store::JobStore;
use crate::strategies::{self, PipelineContext, ERROR_UNSUPPORTED_FILE_TYPE};
use crate::types::{parse_meta_info, Job, JobStatus, RequestContent};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::ZipWriter;

const ERROR_IN_ZIP_AGGREGATION: &str = "ERROR_IN_ZIP_AGGREGATION";

/// Name given to a leaf document submitted outside any container.
const SINGLE_DOCUMENT_NAME: &str = "document";

type QueueItem = (Uuid, RequestContent);

pub struct ExtractionService {
    store: Arc<JobStore>,
    sink: SharedSink,
    queue: mpsc::Sender<QueueItem>,
    workers: Vec<JoinHandle<()>>,
}

impl ExtractionService {
    /// Spawn the worker pool. Must be called within a tokio runtime.
    pub fn new(config: &ServiceConfig, sink: SharedSink) -> Self {
        Self::with_store(config, sink, Arc::new(JobStore::new()))
    }

    pub fn with_store(config: &ServiceConfig, sink: SharedSink, store: Arc<JobStore>) -> Self {
        let (tx, rx) = mpsc::channel::<QueueItem>(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let store = Arc::clone(&store);
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    loop {
                        let item = { rx.lock().await.recv().await };
                        let Some((job_id, content)) = item else {
                            break;
                        };
                        tracing::debug!(worker, job_id = %job_id, "picked up job");
                        let store = Arc::clone(&store);
                        let sink = Arc::clone(&sink);
                        let joined =
                            tokio::task::spawn_blocking(move || run_pipeline(&store, &sink, job_id, content)).await;
                        if let Err(error) = joined {
                            tracing::error!(worker, job_id = %job_id, %error, "pipeline task panicked");
                        }
                    }
                })
            })
            .collect();

        Self {
            store,
            sink,
            queue: tx,
            workers,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Create and register a new `InProgress` job.
    ///
    /// `meta_info_raw` is shape-inferred once here (JSON object/array,
    /// number, or plain string) and carried on the job for the lifetime of
    /// the extraction.
    pub fn prepare(&self, meta_info_raw: Option<&str>, notify_destination: Option<String>) -> Result<Job> {
        let id = Uuid::new_v4();
        let mut job = Job::new(id);
        job.meta_info = meta_info_raw.map(parse_meta_info).unwrap_or(serde_json::Value::Null);
        job.notify_destination = notify_destination;

        if !self.store.insert(job.clone()) {
            return Err(BlattwerkError::DuplicateJob(id));
        }
        tracing::info!(job_id = %id, "job created");
        Ok(job)
    }

    /// Enqueue a prepared job's payload. Returns once the queue accepted the
    /// item; waits when the queue is at capacity.
    pub async fn submit(&self, job_id: Uuid, content: RequestContent) -> Result<()> {
        self.queue
            .send((job_id, content))
            .await
            .map_err(|_| BlattwerkError::QueueClosed)
    }

    /// Run the whole pipeline for one job inline, bypassing the queue.
    pub fn process(&self, job_id: Uuid, content: RequestContent) {
        run_pipeline(&self.store, &self.sink, job_id, content);
    }

    pub fn retrieve(&self, job_id: Uuid) -> Option<Job> {
        self.store.find_by_id(job_id)
    }

    /// Remove a job record. Idempotent: removing an absent id reports false.
    pub fn discard(&self, job_id: Uuid) -> bool {
        self.store.remove_by_id(job_id)
    }

    /// Close the queue and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        drop(self.queue);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Unpack, convert and finalize one job. All per-entry failures are recorded
/// on the job; only zip aggregation failure marks the whole job `Failed`.
fn run_pipeline(store: &Arc<JobStore>, sink: &SharedSink, job_id: Uuid, content: RequestContent) {
    let Some(job) = store.find_by_id(job_id) else {
        tracing::error!(job_id = %job_id, "job record missing at processing time");
        return;
    };
    let meta = job.meta_info.clone();
    let destination = job.notify_destination.clone();

    let ctx = PipelineContext {
        store: Arc::clone(store),
        sink: Arc::clone(sink),
    };
    let file_type = content.file_type();

    if file_type.is_container() || file_type.is_compressed() {
        let documents = flatten(content.content(), file_type, job_id, "", 1);
        if documents.is_empty() {
            // Final meta-only event so the client learns the container held
            // nothing convertible.
            let event = NotificationEvent::for_document(job_id, "", "", 0, 0, meta);
            sink.notify(destination.as_deref(), &event);
        } else {
            let document_count = documents.len();
            for (index, (path, bytes)) in documents.into_iter().enumerate() {
                let document_name = document_name_for(&path);
                let event = NotificationEvent::for_document(
                    job_id,
                    document_name,
                    path.as_str(),
                    index,
                    document_count,
                    meta.clone(),
                );
                dispatch(&ctx, &event, &path, &bytes, destination.as_deref());
            }
        }
    } else {
        let event = NotificationEvent::for_document(
            job_id,
            SINGLE_DOCUMENT_NAME,
            SINGLE_DOCUMENT_NAME,
            0,
            1,
            meta,
        );
        match strategies::strategy_for(file_type) {
            Some(strategy) => strategy.extract(content.content(), &event, &ctx),
            None => report_unsupported(&ctx, &event, SINGLE_DOCUMENT_NAME, destination.as_deref()),
        }
    }

    finalize(store, job_id);
}

/// Route one flattened entry to the strategy matching its own extension.
fn dispatch(ctx: &PipelineContext, event: &NotificationEvent, path: &str, bytes: &[u8], destination: Option<&str>) {
    let strategy = FileType::for_path(path)
        .filter(|ft| ft.is_document())
        .and_then(strategies::strategy_for);
    match strategy {
        Some(strategy) => strategy.extract(bytes, event, ctx),
        None => report_unsupported(ctx, event, path, destination),
    }
}

fn report_unsupported(ctx: &PipelineContext, event: &NotificationEvent, path: &str, destination: Option<&str>) {
    tracing::warn!(job_id = %event.job_id, document = path, "no conversion strategy for entry");
    if let Some(mut job) = ctx.store.find_by_id(event.job_id) {
        job.add_failure_reason(
            ERROR_UNSUPPORTED_FILE_TYPE,
            format!("no conversion strategy for {}", path),
        );
        ctx.store.update(job);
    }
    ctx.sink.notify(destination, &event.with_empty_page(0, 0));
}

/// Flattened path to document name: `dir/scan 1.jpg` -> `dir_scan 1_jpg`.
fn document_name_for(path: &str) -> String {
    path.replace('.', "_").replace('/', "_")
}

/// Aggregate the job's entries and move it to a terminal state.
fn finalize(store: &Arc<JobStore>, job_id: Uuid) {
    let Some(mut job) = store.find_by_id(job_id) else {
        tracing::error!(job_id = %job_id, "job record missing at finalization time");
        return;
    };

    match job.extracted_entries().len() {
        0 => {
            job.aggregated_result = None;
            job.response_type = None;
            job.status = JobStatus::Done;
        }
        1 => {
            let bytes = job.extracted_entries().values().next().map(|b| b.to_vec());
            job.aggregated_result = bytes;
            job.response_type = Some(OUTPUT_MIME_TYPE.to_string());
            job.status = JobStatus::Done;
        }
        _ => {
            let bundled = bundle_zip(job.extracted_entries());
            match bundled {
                Ok(bundle) => {
                    job.aggregated_result = Some(bundle);
                    job.response_type = Some(ZIP_MIME_TYPE.to_string());
                    job.status = JobStatus::Done;
                }
                Err(error) => {
                    tracing::error!(job_id = %job_id, %error, "zip aggregation failed");
                    job.add_failure_reason(ERROR_IN_ZIP_AGGREGATION, error.to_string());
                    job.aggregated_result = None;
                    job.response_type = None;
                    job.status = JobStatus::Failed;
                }
            }
        }
    }

    let status = job.status;
    let entry_count = job.extracted_entries().len();
    if store.update(job) {
        tracing::info!(job_id = %job_id, status = status.as_str(), entries = entry_count, "job finalized");
    } else {
        tracing::error!(job_id = %job_id, "failed to persist finalized job, record missing");
    }
}

fn bundle_zip(entries: &std::collections::BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = FileOptions::default();
        for (name, bytes) in entries {
            zip.start_file(name, options)
                .map_err(|e| BlattwerkError::serialization(format!("zip entry {}: {}", name, e)))?;
            zip.write_all(bytes)?;
        }
        zip.finish()
            .map_err(|e| BlattwerkError::serialization(format!("zip finish: {}", e)))?;
    }
    Ok(cursor.into_inner())
}
