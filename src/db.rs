use mongodb::bson::Document;

use crate::error::WriteError;
use crate::models::RosterRecord;
use crate::store::Connector;

pub const ROSTER_COLLECTION: &str = "roster";
pub const WELLNESS_COLLECTION: &str = "player_wellness";
pub const RPE_COLLECTION: &str = "player_rpe";

/// Inserts one record into `collection`.
///
/// `Ok(true)` means the remote acknowledged the write. `Ok(false)` means the
/// insert was sent but not confirmed durable. No retry is attempted and no
/// idempotency is provided beyond whatever `_id` the record carries.
pub async fn insert(
    connector: &dyn Connector,
    collection: &str,
    record: Document,
) -> Result<bool, WriteError> {
    if collection.trim().is_empty() {
        return Err(WriteError::InvalidArgument(
            "collection name cannot be empty".to_string(),
        ));
    }
    if record.is_empty() {
        return Err(WriteError::InvalidArgument(
            "data must be a non-empty document".to_string(),
        ));
    }

    let handle = connector
        .connect(collection)
        .await
        .map_err(|source| WriteError::ConnectionUnavailable {
            collection: collection.to_string(),
            source,
        })?;

    match handle.insert_one(record).await {
        Ok(receipt) if !receipt.acknowledged => {
            tracing::warn!(collection, "write was not acknowledged");
            Ok(false)
        }
        Ok(receipt) => {
            tracing::info!(collection, inserted_id = %receipt.inserted_id, "inserted document");
            Ok(true)
        }
        Err(e) => {
            match &e {
                WriteError::DuplicateKey(details) => {
                    tracing::error!(collection, details = %details, "duplicate key error")
                }
                WriteError::OperationFailure { code, message } => {
                    tracing::error!(collection, code, message = %message, "database operation failed")
                }
                WriteError::InvalidDocument(details) => {
                    tracing::error!(collection, details = %details, "invalid document structure")
                }
                other => {
                    tracing::error!(collection, error = %other, "unexpected error during insertion")
                }
            }
            Err(e)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterStatus {
    Loaded,
    Unavailable,
}

/// Player ids from the roster plus whether they could actually be read.
/// An unavailable roster is not the same as an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterLookup {
    pub player_ids: Vec<String>,
    pub status: RosterStatus,
}

impl RosterLookup {
    pub fn is_available(&self) -> bool {
        self.status == RosterStatus::Loaded
    }

    /// Message for the user when there is nothing to choose from.
    pub fn notice(&self) -> Option<&'static str> {
        match self.status {
            RosterStatus::Unavailable => Some("Failed to load player data. Please try again later."),
            RosterStatus::Loaded if self.player_ids.is_empty() => Some("The roster has no players yet."),
            RosterStatus::Loaded => None,
        }
    }
}

pub async fn lookup_roster(connector: &dyn Connector) -> RosterLookup {
    match fetch_player_ids(connector).await {
        Ok(player_ids) => RosterLookup {
            player_ids,
            status: RosterStatus::Loaded,
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch player ids");
            RosterLookup {
                player_ids: Vec::new(),
                status: RosterStatus::Unavailable,
            }
        }
    }
}

/// Never fails; an empty result may mean the roster could not be read.
/// Callers that need to tell the two apart use `lookup_roster`.
#[allow(dead_code)]
pub async fn list_player_ids(connector: &dyn Connector) -> Vec<String> {
    lookup_roster(connector).await.player_ids
}

async fn fetch_player_ids(connector: &dyn Connector) -> anyhow::Result<Vec<String>> {
    let handle = connector.connect(ROSTER_COLLECTION).await?;
    let records = handle.find_all().await?;

    let mut player_ids: Vec<String> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let roster_record = RosterRecord::from_document(index, record)?;
        if !player_ids.contains(&roster_record.player_id) {
            player_ids.push(roster_record.player_id);
        }
    }

    Ok(player_ids)
}
