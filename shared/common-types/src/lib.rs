//! Domain types shared by the upload API and the upload processor

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Content type allow-list handling and magic-byte sniffing
pub mod content_type;
/// Storage-completion events and their wire formats
pub mod event;
/// Upload settings shared by issuer and processor
pub mod policy;
/// Processing outcomes
pub mod result;
/// Target key derivation and parsing
pub mod upload_key;

pub use content_type::{normalize_content_type, sniff_content_type};
pub use event::{EventParseError, StorageEvent};
pub use policy::UploadPolicy;
pub use result::{ProcessingResult, ProcessingStatus};
pub use upload_key::{UploadKey, UploadKeyError};
