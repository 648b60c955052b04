use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use printbuddy_core::{Catalog, CreateFeedback, CreateOrder, Feedback, Order, OrderSummary};
use printbuddy_db::{Database, DbError, SqliteDatabase};
use printbuddy_store::{FileStager, LocalStore, ObjectStore, StoreConfig, StoreError, UploadPolicy};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::intake::Intake;
use crate::notify::{Notifier, NotifyError};
use crate::routes::{app_state, build_router};

/// Notifier that remembers every summary it was handed.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OrderSummary>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OrderSummary> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(summary.clone());
        }
        Ok(())
    }
}

/// Notifier whose backend is always down.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _summary: &OrderSummary) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }
}

/// Object store whose backend is always down.
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> Result<(), StoreError> {
        Err(StoreError::Internal("connection refused".into()))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        Err(StoreError::NotFound(key.to_string()))
    }

    fn locator(&self, key: &str) -> String {
        key.to_string()
    }
}

/// In-memory SQLite that refuses every insert. Reads go through, so tests
/// can check nothing was written.
pub struct RejectingDatabase {
    inner: SqliteDatabase,
}

impl Default for RejectingDatabase {
    fn default() -> Self {
        Self {
            inner: SqliteDatabase::open_in_memory().unwrap(),
        }
    }
}

#[async_trait]
impl Database for RejectingDatabase {
    async fn insert_feedback(&self, _input: &CreateFeedback) -> Result<Feedback, DbError> {
        Err(DbError::Internal("disk I/O error".into()))
    }
    async fn get_feedback(&self, id: &str) -> Result<Feedback, DbError> {
        self.inner.get_feedback(id).await
    }
    async fn list_feedback(&self, limit: i64) -> Result<Vec<Feedback>, DbError> {
        self.inner.list_feedback(limit).await
    }
    async fn count_feedback(&self) -> Result<i64, DbError> {
        self.inner.count_feedback().await
    }

    async fn insert_order(&self, _input: &CreateOrder) -> Result<Order, DbError> {
        Err(DbError::Internal("disk I/O error".into()))
    }
    async fn get_order(&self, id: &str) -> Result<Order, DbError> {
        self.inner.get_order(id).await
    }
    async fn list_orders(&self, limit: i64) -> Result<Vec<Order>, DbError> {
        self.inner.list_orders(limit).await
    }
    async fn count_orders(&self) -> Result<i64, DbError> {
        self.inner.count_orders().await
    }
}

/// Storage backends for a test pipeline. `None` picks in-memory SQLite and a
/// local store under the returned temp dir.
#[derive(Default)]
pub struct TestBackends {
    pub db: Option<Arc<dyn Database>>,
    pub store: Option<Arc<dyn ObjectStore>>,
}

/// An intake pipeline over in-memory SQLite and a temp upload root.
pub struct TestIntake {
    pub intake: Intake,
    pub db: Arc<dyn Database>,
    pub upload_dir: TempDir,
}

fn build_intake(
    notifier: Arc<dyn Notifier>,
    policy: UploadPolicy,
    catalog: Catalog,
    backends: TestBackends,
) -> (Intake, Arc<dyn Database>, TempDir) {
    let db: Arc<dyn Database> = match backends.db {
        Some(db) => db,
        None => Arc::new(SqliteDatabase::open_in_memory().unwrap()),
    };
    let upload_dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = match backends.store {
        Some(store) => store,
        None => Arc::new(LocalStore::new(&StoreConfig::local(
            upload_dir.path().to_string_lossy(),
        ))),
    };
    let stager = FileStager::new(store, policy);
    let intake = Intake::new(db.clone(), stager, notifier, catalog);
    (intake, db, upload_dir)
}

pub fn test_intake(notifier: Arc<dyn Notifier>) -> TestIntake {
    test_intake_with(notifier, TestBackends::default())
}

pub fn test_intake_with(notifier: Arc<dyn Notifier>, backends: TestBackends) -> TestIntake {
    let (intake, db, upload_dir) =
        build_intake(notifier, UploadPolicy::default(), Catalog::Service, backends);
    TestIntake {
        intake,
        db,
        upload_dir,
    }
}

/// A full router wired like production, minus the network.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<dyn Database>,
    pub upload_dir: TempDir,
}

pub fn test_app(notifier: Arc<dyn Notifier>, config: ServerConfig) -> TestApp {
    test_app_with(notifier, config, TestBackends::default())
}

pub fn test_app_with(
    notifier: Arc<dyn Notifier>,
    config: ServerConfig,
    backends: TestBackends,
) -> TestApp {
    let (intake, db, upload_dir) =
        build_intake(notifier, config.upload_policy(), config.catalog, backends);
    let state = app_state(intake, config.rate_limit());
    TestApp {
        router: build_router(state, &config),
        db,
        upload_dir,
    }
}

pub async fn response_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Builder for `multipart/form-data` request bodies.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "printbuddy-test-boundary-7MA4YWxkTrZu0gW".into(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(&data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `content-type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    pub db: Arc<dyn Database>,
    _upload_dir: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn the app on a random local port, with client addresses available
/// to the rate limiter.
pub async fn spawn_test_server(notifier: Arc<dyn Notifier>, config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let app = test_app(notifier, config);
    let router = app.router;
    let handle = tokio::spawn(async move {
        crate::serve_with_shutdown(listener, router, std::future::pending())
            .await
            .unwrap();
    });
    TestServer {
        base_url,
        db: app.db,
        _upload_dir: app.upload_dir,
        _handle: handle,
    }
}
