//! Staging of uploaded order files.
//!
//! The stager is the only way bytes reach the object store: it enforces the
//! type allow-list and the size ceiling, derives a collision-resistant key
//! from the original file name and returns the store's locator.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use printbuddy_core::Locator;
use tracing::{debug, error};

use crate::ObjectStore;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_KEY_PREFIX: &str = "uploads";

const MAX_NAME_LEN: usize = 100;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "jpg", "jpeg", "png"];

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
];

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Only PDF, DOCX, JPG, and PNG files are allowed")]
    UnsupportedType,

    #[error("File exceeds the upload limit of {limit} bytes")]
    TooLarge { limit: usize, actual: usize },

    #[error("File is empty")]
    Empty,

    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl StageError {
    /// Whether the customer can fix this by sending a different file.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StageError::BackendUnavailable(_))
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub key_prefix: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            key_prefix: DEFAULT_KEY_PREFIX.into(),
        }
    }
}

pub struct FileStager {
    store: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
}

impl FileStager {
    pub fn new(store: Arc<dyn ObjectStore>, policy: UploadPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Check and store one uploaded file. Nothing is written unless every
    /// check passes.
    pub async fn stage(
        &self,
        data: Bytes,
        original_name: &str,
        mime_type: &str,
    ) -> Result<Locator, StageError> {
        let content_type = check_type(original_name, mime_type)?;
        if data.is_empty() {
            return Err(StageError::Empty);
        }
        if data.len() > self.policy.max_bytes {
            return Err(StageError::TooLarge {
                limit: self.policy.max_bytes,
                actual: data.len(),
            });
        }

        let key = upload_key(
            &self.policy.key_prefix,
            next_stamp(),
            &key_nonce(),
            original_name,
        );
        let size = data.len();
        self.store
            .put(&key, data, &content_type)
            .await
            .map_err(|e| {
                error!("staging {key} failed: {e}");
                StageError::BackendUnavailable(e.to_string())
            })?;
        debug!("staged {size} bytes at {key}");

        Locator::new(self.store.locator(&key))
            .ok_or_else(|| StageError::BackendUnavailable("store returned an empty locator".into()))
    }
}

/// Validate extension and declared MIME type independently against the
/// allow-lists. Returns the normalised content type.
pub fn check_type(original_name: &str, mime_type: &str) -> Result<String, StageError> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let extension_ok = extension
        .as_deref()
        .map(|e| ALLOWED_EXTENSIONS.contains(&e))
        .unwrap_or(false);

    let content_type = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let mime_ok = ALLOWED_MIME_TYPES.contains(&content_type.as_str());

    if extension_ok && mime_ok {
        Ok(content_type)
    } else {
        Err(StageError::UnsupportedType)
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9.-]`, dropping any
/// directory part and leading dots.
pub fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned = if cleaned.len() > MAX_NAME_LEN {
        // Keep the tail so the extension survives.
        &cleaned[cleaned.len() - MAX_NAME_LEN..]
    } else {
        cleaned
    };
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `{prefix}/{stamp}-{nonce}-{name}`. The stamp orders keys within one
/// process; the nonce keeps instances sharing a bucket apart.
pub fn upload_key(prefix: &str, stamp: i64, nonce: &str, original_name: &str) -> String {
    let name = sanitize_file_name(original_name);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{stamp}-{nonce}-{name}")
    } else {
        format!("{prefix}/{stamp}-{nonce}-{name}")
    }
}

/// Eight random hex digits.
pub fn key_nonce() -> String {
    let mut nonce = uuid::Uuid::new_v4().simple().to_string();
    nonce.truncate(8);
    nonce
}

/// Millisecond wall-clock stamp that never repeats within the process.
pub fn next_stamp() -> i64 {
    static LAST: AtomicI64 = AtomicI64::new(0);
    let now = chrono::Utc::now().timestamp_millis();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}
