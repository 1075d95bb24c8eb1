//! Trait definitions for the uploader module.

use std::path::Path;

use async_trait::async_trait;

use super::error::UploaderError;
use super::types::{ChunkStatus, Credential, UploadMetadata, UploadSession};

/// Source of storage-service credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a valid credential, or `None` when none is available.
    async fn get_credential(&self) -> Result<Option<Credential>, UploaderError>;
}

/// A remote storage service with a resumable, chunked upload protocol.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Returns the name of this storage implementation.
    fn name(&self) -> &str;

    /// Opens a resumable upload for `file`.
    async fn create_upload_session(
        &self,
        credential: &Credential,
        metadata: &UploadMetadata,
        file: &Path,
    ) -> Result<UploadSession, UploaderError>;

    /// Sends the next chunk and updates `session.bytes_done`.
    async fn next_chunk(&self, session: &mut UploadSession) -> Result<ChunkStatus, UploaderError>;
}
