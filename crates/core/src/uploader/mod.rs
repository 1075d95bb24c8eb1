//! Upload driver and remote storage adapters.
//!
//! The driver is storage-agnostic: it talks to a [`CredentialProvider`] and a
//! [`StorageService`] with a resumable chunked protocol. [`DriveStorage`] and
//! [`TokenFileCredentialProvider`] are the Google Drive implementations.

mod config;
mod credential;
mod drive;
mod driver;
mod error;
mod traits;
mod types;

pub use config::{UploaderConfig, CHUNK_ALIGNMENT};
pub use credential::{StoredToken, TokenFileCredentialProvider};
pub use drive::DriveStorage;
pub use driver::UploadDriver;
pub use error::UploaderError;
pub use traits::{CredentialProvider, StorageService};
pub use types::{
    ChunkStatus, Credential, RemoteArtifact, UploadFailure, UploadJob, UploadMetadata,
    UploadOutcome, UploadSession,
};
