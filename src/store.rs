//! Connection provider seam and its MongoDB implementation.
//!
//! Everything above this module talks to `Connector` and `CollectionHandle`;
//! only this file knows about the driver.

use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{Acknowledgment, ClientOptions, Credential, WriteConcern};
use mongodb::{Client, Collection};

use crate::config::{MongoSettings, Secrets};
use crate::error::{ConnectError, ReadError, WriteError};

const DUPLICATE_KEY_CODE: i32 = 11000;
const DOCUMENT_VALIDATION_FAILURE_CODE: i32 = 121;
const APP_NAME: &str = "player-wellness-registry";

/// Result of a single insert as reported by the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertReceipt {
    pub inserted_id: Bson,
    pub acknowledged: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a fresh connection and returns a handle to `collection`.
    async fn connect(&self, collection: &str) -> Result<Box<dyn CollectionHandle>, ConnectError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    async fn insert_one(&self, record: Document) -> Result<InsertReceipt, WriteError>;

    async fn find_all(&self) -> Result<Vec<Document>, ReadError>;
}

/// Connector backed by a MongoDB deployment. No client is cached; each call
/// to `connect` builds and probes a new one.
pub struct MongoConnector {
    secrets: Secrets,
}

impl MongoConnector {
    pub fn new(secrets: Secrets) -> Self {
        Self { secrets }
    }

    async fn open(&self, collection: &str) -> Result<MongoCollection, ConnectError> {
        let settings = self.secrets.resolve()?;
        let client = probe_client(&settings).await?;

        Ok(MongoCollection {
            collection: client
                .database(&settings.database_name)
                .collection::<Document>(collection),
            write_timeout: settings.write_timeout,
        })
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self, collection: &str) -> Result<Box<dyn CollectionHandle>, ConnectError> {
        match self.open(collection).await {
            Ok(handle) => {
                tracing::info!(collection, "connected to database collection");
                Ok(Box::new(handle))
            }
            Err(e) => {
                tracing::error!(collection, error = %e, "database connection failed");
                Err(e)
            }
        }
    }
}

async fn probe_client(settings: &MongoSettings) -> Result<Client, ConnectError> {
    let target = settings.connection_target();
    let mut options = ClientOptions::parse(target.as_str())
        .await
        .map_err(|e| classify_connect(e, settings.connect_timeout))?;

    let mut credential = Credential::default();
    credential.username = Some(settings.username.clone());
    credential.password = Some(settings.password.clone());
    options.credential = Some(credential);
    options.server_selection_timeout = Some(settings.connect_timeout);
    options.connect_timeout = Some(settings.connect_timeout);
    options.app_name = Some(APP_NAME.to_string());

    let client =
        Client::with_options(options).map_err(|e| classify_connect(e, settings.connect_timeout))?;

    let admin = client.database("admin");
    let probe = admin.run_command(doc! { "ping": 1 }).into_future();
    match tokio::time::timeout(settings.connect_timeout, probe).await {
        Ok(Ok(_)) => Ok(client),
        Ok(Err(e)) => Err(classify_connect(e, settings.connect_timeout)),
        Err(_) => Err(ConnectError::ConnectionTimeout(settings.connect_timeout)),
    }
}

struct MongoCollection {
    collection: Collection<Document>,
    write_timeout: Duration,
}

impl MongoCollection {
    fn acknowledged(&self) -> bool {
        self.collection.write_concern().map_or(true, is_acknowledged)
    }
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    async fn insert_one(&self, record: Document) -> Result<InsertReceipt, WriteError> {
        let insert = self
            .collection
            .insert_one(record)
            .bypass_document_validation(false)
            .into_future();

        match tokio::time::timeout(self.write_timeout, insert).await {
            Ok(Ok(result)) => Ok(InsertReceipt {
                inserted_id: result.inserted_id,
                acknowledged: self.acknowledged(),
            }),
            Ok(Err(e)) => Err(classify_write(e)),
            Err(_) => Err(WriteError::Timeout(self.write_timeout)),
        }
    }

    async fn find_all(&self) -> Result<Vec<Document>, ReadError> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| ReadError::Query(e.to_string()))?;

        let mut records = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| ReadError::Query(e.to_string()))?
        {
            let record = cursor
                .deserialize_current()
                .map_err(|e| ReadError::Query(e.to_string()))?;
            records.push(record);
        }

        Ok(records)
    }
}

/// `w: 0` is only unacknowledged when journaling was not requested.
fn is_acknowledged(write_concern: &WriteConcern) -> bool {
    !matches!(write_concern.w, Some(Acknowledgment::Nodes(0))) || write_concern.journal == Some(true)
}

fn classify_connect(err: MongoError, timeout: Duration) -> ConnectError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => ConnectError::ConnectionTimeout(timeout),
        _ => ConnectError::UnexpectedConnectionError(err.to_string()),
    }
}

fn classify_write(err: MongoError) -> WriteError {
    match err.kind.as_ref() {
        ErrorKind::Write(failure) => classify_write_failure(failure),
        ErrorKind::Command(e) => WriteError::OperationFailure {
            code: e.code,
            message: e.message.clone(),
        },
        ErrorKind::BsonSerialization(_) | ErrorKind::InvalidArgument { .. } => {
            WriteError::InvalidDocument(err.to_string())
        }
        _ => WriteError::UnexpectedWriteError(err.to_string()),
    }
}

fn classify_write_failure(failure: &WriteFailure) -> WriteError {
    match failure {
        WriteFailure::WriteError(e) if e.code == DUPLICATE_KEY_CODE => {
            WriteError::DuplicateKey(e.message.clone())
        }
        WriteFailure::WriteError(e) if e.code == DOCUMENT_VALIDATION_FAILURE_CODE => {
            WriteError::InvalidDocument(e.message.clone())
        }
        WriteFailure::WriteError(e) => WriteError::OperationFailure {
            code: e.code,
            message: e.message.clone(),
        },
        WriteFailure::WriteConcernError(e) => WriteError::OperationFailure {
            code: e.code,
            message: e.message.clone(),
        },
        _ => WriteError::UnexpectedWriteError(format!("{failure:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CLUSTER_URL_KEY, DATABASE_NAME_KEY, PASSWORD_KEY, USERNAME_KEY};
    use std::collections::HashMap;

    #[tokio::test]
    async fn missing_configuration_fails_before_any_network_attempt() {
        let source: HashMap<String, String> = [
            (USERNAME_KEY, "coach"),
            (PASSWORD_KEY, "pass"),
            (DATABASE_NAME_KEY, "wellness"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert!(!source.contains_key(CLUSTER_URL_KEY));

        let connector = MongoConnector::new(Secrets::from_source(&source));
        let err = connector.connect("roster").await.err().unwrap();

        assert!(matches!(
            err,
            ConnectError::MissingConfiguration { key: CLUSTER_URL_KEY }
        ));
    }

    #[tokio::test]
    async fn acknowledged_unless_write_concern_is_zero() {
        let options = ClientOptions::parse("mongodb://localhost:27017").await.unwrap();
        let client = Client::with_options(options).unwrap();
        let collection = client.database("wellness").collection::<Document>("player_rpe");

        let handle = MongoCollection {
            collection: collection.clone(),
            write_timeout: Duration::from_secs(1),
        };
        assert!(handle.acknowledged());

        let mut unacknowledged = WriteConcern::default();
        unacknowledged.w = Some(Acknowledgment::Nodes(0));
        let options = mongodb::options::CollectionOptions::builder()
            .write_concern(unacknowledged)
            .build();
        let handle = MongoCollection {
            collection: client
                .database("wellness")
                .collection_with_options::<Document>("player_rpe", options),
            write_timeout: Duration::from_secs(1),
        };
        assert!(!handle.acknowledged());
    }

    #[test]
    fn journaled_zero_write_concern_is_acknowledged() {
        let mut write_concern = WriteConcern::default();
        write_concern.w = Some(Acknowledgment::Nodes(0));
        assert!(!is_acknowledged(&write_concern));

        write_concern.journal = Some(true);
        assert!(is_acknowledged(&write_concern));

        write_concern.journal = Some(false);
        assert!(!is_acknowledged(&write_concern));

        write_concern.w = Some(Acknowledgment::Majority);
        assert!(is_acknowledged(&write_concern));
    }

    fn write_failure(code: i32, message: &str) -> WriteFailure {
        let error: mongodb::error::WriteError =
            mongodb::bson::from_document(doc! { "code": code, "errmsg": message }).unwrap();
        WriteFailure::WriteError(error)
    }

    #[test]
    fn write_failures_map_by_server_code() {
        assert!(matches!(
            classify_write_failure(&write_failure(11000, "E11000 duplicate key")),
            WriteError::DuplicateKey(message) if message == "E11000 duplicate key"
        ));
        assert!(matches!(
            classify_write_failure(&write_failure(121, "Document failed validation")),
            WriteError::InvalidDocument(message) if message == "Document failed validation"
        ));
        assert!(matches!(
            classify_write_failure(&write_failure(13, "not authorized")),
            WriteError::OperationFailure { code: 13, .. }
        ));
    }

    #[tokio::test]
    async fn malformed_target_is_an_unexpected_connection_error() {
        let err = ClientOptions::parse("not-a-connection-string").await.unwrap_err();

        assert!(matches!(
            classify_connect(err, Duration::from_secs(5)),
            ConnectError::UnexpectedConnectionError(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_timeout() {
        let mut options = ClientOptions::parse("mongodb://127.0.0.1:1").await.unwrap();
        options.server_selection_timeout = Some(Duration::from_millis(50));
        let client = Client::with_options(options).unwrap();
        let admin = client.database("admin");

        let err = admin.run_command(doc! { "ping": 1 }).await.unwrap_err();
        let timeout = Duration::from_millis(50);

        assert!(matches!(
            classify_connect(err.clone(), timeout),
            ConnectError::ConnectionTimeout(elapsed) if elapsed == timeout
        ));
        assert!(matches!(
            classify_write(err),
            WriteError::UnexpectedWriteError(_)
        ));
    }
}
