//! Backend storage services for the upload pipeline
//!
//! This crate provides the AWS-backed collaborators shared by the upload API and
//! the upload processor: the idempotency ledger (`DynamoDB`), the result
//! notification topic (SNS) and the storage event queue (SQS).

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

pub mod notification;
pub mod queue;
pub mod upload_ledger;
