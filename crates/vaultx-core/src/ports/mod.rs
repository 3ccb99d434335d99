//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engines depend on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IMetadataStore`] - Durable file records, permissions and audit log
//! - [`ITransport`] - Remote metadata service and blob transfer

pub mod metadata_store;
pub mod transport;

pub use metadata_store::IMetadataStore;
pub use transport::{DownloadLocator, ITransport, RejectedRecord, RemoteListing, UploadTarget};
