//! Whole-file Upload Module
//!
//! Persists uploads so that a reader never sees a partially written file:
//! - Request targets are sanitized before any filesystem access
//! - Bodies stream into a uniquely named sibling temp file
//! - A single rename publishes the finished file
//! - Existing destinations are left alone (idempotent re-upload)
//!
//! Protocol Flow:
//! 1. Reject anything but PUT and any target that escapes the storage root
//! 2. Skip the upload if the destination already exists
//! 3. Stage the body to `<destination>.<sequence>`
//! 4. Rename the temp file onto the destination

pub mod coordinator;
pub mod oracle;
pub mod publish;
pub mod root;
pub mod sequence;
pub mod staging;
pub mod target;
pub mod types;

pub use coordinator::{UploadCoordinator, UploadOptions};
pub use root::StorageRoot;
pub use sequence::SequenceAllocator;
pub use staging::{StagedFile, TempFile};
pub use target::TargetPath;
pub use types::*;
