#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

//! # SFTP Ingestion
//!
//! Queue-driven ingestion of partner lab-report files.
//!
//! ## Overview
//!
//! Two queues drive the service. Messages on the polling queue name a
//! partner; the polling handler connects to that partner's SFTP server,
//! stages every file in blob storage, unpacks zip archives and removes the
//! remote copies. Messages on the import queue are storage-change events;
//! the import handler reads the staged file and forwards it to ReportStream.
//!
//! ```text
//! QueueConsumer ──> MessageContentHandler
//!                     ├── PollingMessageHandler ──> TransferPipeline ──> ArchiveExtractor
//!                     └── ImportMessageHandler  ──> ReadAndSend ──> ReportSender
//! ```
//!
//! Delivery is at least once. A message is deleted only after its handler
//! succeeds; once its delivery count passes the configured maximum it is
//! moved to the paired dead-letter queue.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Queue consumer, dead-lettering and message handlers
//! - [`sftp`] - Remote file server access and the concurrent transfer pipeline
//! - [`archive`] - Password-protected zip extraction with a per-member error ledger
//! - [`usecases`] - Read a staged file and forward it
//! - [`report_stream`] - Outbound report submission
//! - [`messaging`] - Queue providers (pgmq, in-memory)
//! - [`storage`] - Blob store providers and staging paths
//! - [`secrets`] - Secret store providers and per-partner secret names
//! - [`config`] - Layered service configuration and partner settings
//! - [`logging`] - Structured logging setup

pub mod archive;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod orchestration;
pub mod report_stream;
pub mod secrets;
pub mod sftp;
pub mod storage;
pub mod usecases;

pub use config::{ConfigLoader, IngestionConfig, PartnerConfig, PartnerConfigs};
pub use error::{IngestionError, Result};
pub use orchestration::{QueueConsumer, QueueConsumerConfig};
