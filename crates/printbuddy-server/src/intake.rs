//! The submission pipeline.
//!
//! Feedback: validate, persist. Orders: validate, stage the file, persist,
//! notify. Every stage short-circuits on failure; notification never does.

use std::sync::Arc;

use bytes::Bytes;
use printbuddy_core::{Catalog, CreateFeedback, Feedback, Order, OrderDraft, Submission, ValidationError};
use printbuddy_db::{Database, DbError};
use printbuddy_store::{FileStager, StageError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::notify::Notifier;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("persist failed: {0}")]
    Persist(#[from] DbError),
}

/// An uploaded file as received, before any checks.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

pub struct Intake {
    db: Arc<dyn Database>,
    stager: FileStager,
    notifier: Arc<dyn Notifier>,
    catalog: Catalog,
}

impl Intake {
    pub fn new(
        db: Arc<dyn Database>,
        stager: FileStager,
        notifier: Arc<dyn Notifier>,
        catalog: Catalog,
    ) -> Self {
        Self {
            db,
            stager,
            notifier,
            catalog,
        }
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    pub fn upload_limit(&self) -> usize {
        self.stager.policy().max_bytes
    }

    pub async fn submit_feedback(&self, submission: &Submission) -> Result<Feedback, IntakeError> {
        let input = CreateFeedback::from_submission(submission).inspect_err(|e| {
            debug!("feedback rejected: {e}");
        })?;
        debug!(rating = input.rating, "feedback validated");

        let feedback = self.db.insert_feedback(&input).await.inspect_err(|e| {
            error!("failed to persist feedback: {e}");
        })?;
        info!(feedback_id = %feedback.id, rating = feedback.rating, "feedback received");
        Ok(feedback)
    }

    pub async fn submit_order(
        &self,
        submission: &Submission,
        file: Option<UploadedFile>,
    ) -> Result<Order, IntakeError> {
        let draft = OrderDraft::from_submission(submission, self.catalog, file.is_some())
            .inspect_err(|e| debug!("order rejected: {e}"))?;
        let Some(file) = file else {
            return Err(ValidationError::new(printbuddy_core::validate::FILE_REQUIRED).into());
        };
        debug!(service = %draft.service, file = %file.file_name, "order validated");

        let locator = self
            .stager
            .stage(file.data, &file.file_name, &file.content_type)
            .await
            .inspect_err(|e| {
                if e.is_client_error() {
                    debug!("upload rejected: {e}");
                } else {
                    error!("upload failed: {e}");
                }
            })?;
        debug!(%locator, "file staged");

        let input = draft.into_create(locator.clone());
        let order = self.db.insert_order(&input).await.inspect_err(|e| {
            // The staged file stays behind; nothing references it.
            error!(%locator, "failed to persist order, staged file orphaned: {e}");
        })?;
        info!(order_id = %order.id, service = %order.service, amount = order.amount, "order received");

        if let Err(e) = self.notifier.notify(&order.summary()).await {
            warn!(order_id = %order.id, "operator notification failed: {e}");
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use printbuddy_core::OrderOption;

    use super::*;
    use crate::test_helpers::{
        test_intake, test_intake_with, FailingNotifier, FailingStore, RecordingNotifier,
        RejectingDatabase, TestBackends,
    };

    fn pdf(len: usize) -> UploadedFile {
        UploadedFile {
            file_name: "flyer.pdf".into(),
            content_type: "application/pdf".into(),
            data: Bytes::from(vec![b'%'; len]),
        }
    }

    fn poster_order() -> Submission {
        Submission::new()
            .with("name", "A")
            .with("email", "a@b.com")
            .with("service", "poster")
            .with("details", "2 copies")
    }

    #[tokio::test]
    async fn feedback_is_persisted() {
        let t = test_intake(Arc::new(RecordingNotifier::default()));
        let sub = Submission::new()
            .with("feedback", "Great service")
            .with("rating", "5");
        let fb = t.intake.submit_feedback(&sub).await.unwrap();
        assert_eq!(fb.rating, 5);
        assert_eq!(t.db.count_feedback().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_feedback_persists_nothing() {
        let t = test_intake(Arc::new(RecordingNotifier::default()));
        let sub = Submission::new().with("feedback", "").with("rating", "5");
        let err = t.intake.submit_feedback(&sub).await.unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
        assert_eq!(t.db.count_feedback().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn order_runs_every_stage_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let t = test_intake(notifier.clone());

        let order = t
            .intake
            .submit_order(&poster_order(), Some(pdf(2 * 1024 * 1024)))
            .await
            .unwrap();

        assert_eq!(order.service, OrderOption::Poster);
        assert_eq!(order.amount, 14);
        assert!(order.file_locator.starts_with("uploads/"));
        assert!(t.upload_dir.path().join(&order.file_locator).exists());
        assert_eq!(t.db.count_orders().await.unwrap(), 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, order.id);
    }

    #[tokio::test]
    async fn missing_file_stages_and_persists_nothing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let t = test_intake(notifier.clone());

        let err = t.intake.submit_order(&poster_order(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "File is required");
        assert_eq!(t.db.count_orders().await.unwrap(), 0);
        assert!(!t.upload_dir.path().join("uploads").exists());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_persist() {
        let notifier = Arc::new(RecordingNotifier::default());
        let t = test_intake(notifier.clone());

        let err = t
            .intake
            .submit_order(&poster_order(), Some(pdf(6 * 1024 * 1024)))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Stage(StageError::TooLarge { .. })));
        assert_eq!(t.db.count_orders().await.unwrap(), 0);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected() {
        let t = test_intake(Arc::new(RecordingNotifier::default()));
        let file = UploadedFile {
            file_name: "script.exe".into(),
            content_type: "application/octet-stream".into(),
            data: Bytes::from_static(b"MZ"),
        };
        let err = t.intake.submit_order(&poster_order(), Some(file)).await.unwrap_err();
        assert!(matches!(err, IntakeError::Stage(StageError::UnsupportedType)));
        assert_eq!(t.db.count_orders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_the_order() {
        let t = test_intake(Arc::new(FailingNotifier));
        let order = t
            .intake
            .submit_order(&poster_order(), Some(pdf(1024)))
            .await
            .unwrap();
        assert_eq!(t.db.get_order(&order.id).await.unwrap().id, order.id);
    }

    #[tokio::test]
    async fn store_outage_persists_and_notifies_nothing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let t = test_intake_with(
            notifier.clone(),
            TestBackends {
                store: Some(Arc::new(FailingStore)),
                ..Default::default()
            },
        );

        let err = t
            .intake
            .submit_order(&poster_order(), Some(pdf(1024)))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Stage(StageError::BackendUnavailable(_))));
        assert_eq!(t.db.count_orders().await.unwrap(), 0);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn persist_failure_skips_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let t = test_intake_with(
            notifier.clone(),
            TestBackends {
                db: Some(Arc::new(RejectingDatabase::default())),
                ..Default::default()
            },
        );

        let err = t
            .intake
            .submit_order(&poster_order(), Some(pdf(1024)))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Persist(_)));
        assert_eq!(t.db.count_orders().await.unwrap(), 0);
        assert!(notifier.sent().is_empty());
        // The staged file is left behind.
        assert!(t.upload_dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn same_order_twice_creates_two_records() {
        let t = test_intake(Arc::new(RecordingNotifier::default()));
        let a = t.intake.submit_order(&poster_order(), Some(pdf(10))).await.unwrap();
        let b = t.intake.submit_order(&poster_order(), Some(pdf(10))).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.file_locator, b.file_locator);
        assert_eq!(t.db.count_orders().await.unwrap(), 2);
    }
}
