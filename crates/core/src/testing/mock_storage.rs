//! Mock storage service and credential provider for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::uploader::{
    ChunkStatus, Credential, CredentialProvider, RemoteArtifact, StorageService, UploadMetadata,
    UploadSession, UploaderError,
};

/// Mock implementation of the StorageService trait.
///
/// Pretends every file is `bytes_total` long and accepts `chunk_size` bytes
/// per call. Completed uploads get ids `mock-file-<n>`.
#[derive(Debug)]
pub struct MockStorageService {
    bytes_total: u64,
    chunk_size: u64,
    sessions: Arc<RwLock<Vec<UploadMetadata>>>,
    chunk_calls: Arc<RwLock<usize>>,
    chunk_delay: Arc<RwLock<Duration>>,
    /// Fails the n-th chunk call (1-based) with the stored error.
    chunk_failure: Arc<RwLock<Option<(usize, UploaderError)>>>,
    session_failure: Arc<RwLock<Option<UploaderError>>>,
}

impl MockStorageService {
    pub fn new(bytes_total: u64, chunk_size: u64) -> Self {
        Self {
            bytes_total,
            chunk_size: chunk_size.max(1),
            sessions: Arc::new(RwLock::new(Vec::new())),
            chunk_calls: Arc::new(RwLock::new(0)),
            chunk_delay: Arc::new(RwLock::new(Duration::ZERO)),
            chunk_failure: Arc::new(RwLock::new(None)),
            session_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Metadata of every session opened so far.
    pub async fn sessions(&self) -> Vec<UploadMetadata> {
        self.sessions.read().await.clone()
    }

    pub async fn chunk_calls(&self) -> usize {
        *self.chunk_calls.read().await
    }

    pub async fn set_chunk_delay(&self, delay: Duration) {
        *self.chunk_delay.write().await = delay;
    }

    pub async fn fail_at_chunk(&self, n: usize, error: UploaderError) {
        *self.chunk_failure.write().await = Some((n, error));
    }

    pub async fn fail_session(&self, error: UploaderError) {
        *self.session_failure.write().await = Some(error);
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_upload_session(
        &self,
        credential: &Credential,
        metadata: &UploadMetadata,
        file: &Path,
    ) -> Result<UploadSession, UploaderError> {
        if let Some(err) = self.session_failure.write().await.take() {
            return Err(err);
        }

        let mut sessions = self.sessions.write().await;
        sessions.push(metadata.clone());
        Ok(UploadSession {
            session_uri: format!("mock://session/{}", sessions.len()),
            file_path: file.to_path_buf(),
            bytes_total: self.bytes_total,
            bytes_done: 0,
            credential: credential.clone(),
        })
    }

    async fn next_chunk(&self, session: &mut UploadSession) -> Result<ChunkStatus, UploaderError> {
        let call = {
            let mut calls = self.chunk_calls.write().await;
            *calls += 1;
            *calls
        };

        let delay = *self.chunk_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failure = self.chunk_failure.write().await;
            if failure.as_ref().is_some_and(|(n, _)| *n == call) {
                if let Some((_, err)) = failure.take() {
                    return Err(err);
                }
            }
        }

        session.bytes_done = (session.bytes_done + self.chunk_size).min(session.bytes_total);
        if session.bytes_done >= session.bytes_total {
            let id = format!("mock-file-{}", self.sessions.read().await.len());
            Ok(ChunkStatus::Complete(RemoteArtifact {
                view_link: Some(format!("https://drive.example/file/d/{id}/view")),
                remote_id: id,
            }))
        } else {
            Ok(ChunkStatus::Progress {
                bytes_done: session.bytes_done,
            })
        }
    }
}

#[derive(Debug, Clone)]
enum CredentialBehavior {
    Valid(String),
    Missing,
    Failing(String),
}

/// Mock implementation of the CredentialProvider trait.
#[derive(Debug)]
pub struct MockCredentialProvider {
    behavior: CredentialBehavior,
    calls: Arc<RwLock<usize>>,
}

impl MockCredentialProvider {
    fn with(behavior: CredentialBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Always returns a credential.
    pub fn valid() -> Self {
        Self::with(CredentialBehavior::Valid("mock-token".to_string()))
    }

    /// Never has a credential.
    pub fn none() -> Self {
        Self::with(CredentialBehavior::Missing)
    }

    /// Fails with a credential error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with(CredentialBehavior::Failing(reason.into()))
    }

    pub async fn calls(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl CredentialProvider for MockCredentialProvider {
    async fn get_credential(&self) -> Result<Option<Credential>, UploaderError> {
        *self.calls.write().await += 1;
        match &self.behavior {
            CredentialBehavior::Valid(token) => Ok(Some(Credential::new(token.clone()))),
            CredentialBehavior::Missing => Ok(None),
            CredentialBehavior::Failing(reason) => Err(UploaderError::Credential(reason.clone())),
        }
    }
}
