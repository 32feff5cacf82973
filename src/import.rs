use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::Document;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::db::{self, RPE_COLLECTION, WELLNESS_COLLECTION};
use crate::error::{ValidationError, WriteError};
use crate::models::{RpeForm, WellnessForm};
use crate::store::Connector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportKind {
    Wellness,
    Rpe,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub unconfirmed: usize,
}

trait CsvEntry: DeserializeOwned {
    const COLLECTION: &'static str;

    fn submission_id(&mut self) -> &mut Option<String>;

    fn into_document(
        self,
        roster: &[String],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Document, ValidationError>;
}

impl CsvEntry for WellnessForm {
    const COLLECTION: &'static str = WELLNESS_COLLECTION;

    fn submission_id(&mut self) -> &mut Option<String> {
        &mut self.submission_id
    }

    fn into_document(
        self,
        roster: &[String],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Document, ValidationError> {
        let entry = self.validate(today, now)?;
        entry.player_id.ensure_listed(roster)?;
        Ok(entry.to_document())
    }
}

impl CsvEntry for RpeForm {
    const COLLECTION: &'static str = RPE_COLLECTION;

    fn submission_id(&mut self) -> &mut Option<String> {
        &mut self.submission_id
    }

    fn into_document(
        self,
        roster: &[String],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Document, ValidationError> {
        let entry = self.validate(today, now)?;
        entry.player_id.ensure_listed(roster)?;
        Ok(entry.to_document())
    }
}

pub async fn import_csv(
    connector: &dyn Connector,
    kind: ImportKind,
    csv_path: &Path,
    roster: &[String],
    today: NaiveDate,
) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    match kind {
        ImportKind::Wellness => import_rows::<WellnessForm, _>(connector, file, roster, today).await,
        ImportKind::Rpe => import_rows::<RpeForm, _>(connector, file, roster, today).await,
    }
}

/// Every row is parsed and validated before the first insert, so a bad row
/// never leaves a partial import behind. Rows without a `submission_id` get
/// a fresh one; rows whose id already exists are skipped.
async fn import_rows<T: CsvEntry, R: Read>(
    connector: &dyn Connector,
    input: R,
    roster: &[String],
    today: NaiveDate,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_reader(input);
    let mut documents = Vec::new();

    for (index, result) in reader.deserialize::<T>().enumerate() {
        let row = index + 1;
        let mut entry = result.with_context(|| format!("row {row}: could not parse"))?;

        let submission_id = entry.submission_id();
        if submission_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            *submission_id = Some(format!("import-{}", Uuid::new_v4()));
        }

        let document = entry
            .into_document(roster, today, Utc::now())
            .with_context(|| format!("row {row}: rejected"))?;
        documents.push((row, document));
    }

    let mut summary = ImportSummary::default();
    for (row, document) in documents {
        match db::insert(connector, T::COLLECTION, document).await {
            Ok(true) => summary.inserted += 1,
            Ok(false) => summary.unconfirmed += 1,
            Err(WriteError::DuplicateKey(_)) => {
                tracing::info!(row, "submission already recorded, skipping");
                summary.skipped_duplicates += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("row {row}: import stopped after {} inserts", summary.inserted)
                });
            }
        }
    }

    Ok(summary)
}
