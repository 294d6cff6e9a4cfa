//! Blattwerk - Asynchronous Document and Archive Extraction Pipeline
//!
//! Blattwerk takes an uploaded document or archive, recursively unpacks
//! containers (zip, tar, 7z, gzip, bzip2), converts every embedded page or
//! image to PNG, and aggregates the results per job: a single entry is
//! returned as-is, multiple entries are bundled into one zip. Jobs run
//! asynchronously on a bounded worker pool; clients poll by job id or
//! receive push notifications per converted page.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use blattwerk::{ExtractionService, FileType, RequestContent, ServiceConfig, TracingSink};
//! use std::sync::Arc;
//!
//! # async fn run() -> blattwerk::Result<()> {
//! let service = ExtractionService::new(&ServiceConfig::default(), Arc::new(TracingSink));
//!
//! let job = service.prepare(Some("{\"batch\": 1}"), None)?;
//! service.submit(job.id(), RequestContent::new(FileType::Zip, std::fs::read("scans.zip")?)).await?;
//!
//! // Poll until the job leaves InProgress, then read `aggregated_result`.
//! let job = service.retrieve(job.id());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Container Unpacker** (`archive`): bounded-recursion flattening of
//!   nested archives into a path→bytes map
//! - **Conversion Strategies** (`strategies`): per-file-type PDF/TIFF/JPG/PNG
//!   conversion to canonical PNG entries
//! - **Extraction Orchestrator** (`service`): job lifecycle, worker pool,
//!   result aggregation
//! - **Job Store** (`store`): concurrent in-memory job records
//!
//! One bad page never sinks a job: conversion failures are recorded as
//! per-job failure reasons and processing continues.

#![deny(unsafe_code)]

pub mod archive;
pub mod config;
pub mod error;
pub mod formats;
pub mod notify;
pub mod service;
pub mod store;
pub mod strategies;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use archive::flatten;
pub use config::ServiceConfig;
pub use error::{BlattwerkError, Result};
pub use formats::FileType;
pub use notify::{MemorySink, NotificationEvent, NotificationSink, SharedSink, TracingSink};
pub use service::ExtractionService;
pub use store::JobStore;
pub use types::{Job, JobStatus, JobView, RequestContent};
