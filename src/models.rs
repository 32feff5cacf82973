use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{doc, Bson, Document};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ReadError, ValidationError};
use crate::session::derive_session_id;

/// Player identifier as it appears on the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankPlayerId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric ids are stored as integers to match the roster collection,
    /// but only when the integer renders back to the same text.
    pub fn to_bson(&self) -> Bson {
        match self.0.parse::<i64>() {
            Ok(value) if value.to_string() == self.0 => Bson::Int64(value),
            _ => Bson::String(self.0.clone()),
        }
    }

    pub fn ensure_listed(&self, roster: &[String]) -> Result<(), ValidationError> {
        if roster.iter().any(|id| id == &self.0) {
            Ok(())
        } else {
            Err(ValidationError::UnknownPlayer(self.0.clone()))
        }
    }
}

/// Pre-training wellness input, from the command line or a CSV row.
#[derive(Debug, Clone, Deserialize)]
pub struct WellnessForm {
    pub player_id: String,
    pub date: NaiveDate,
    pub feeling: i64,
    pub sleep_hours: f64,
    #[serde(default)]
    pub submission_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WellnessEntry {
    pub submission_id: String,
    pub player_id: PlayerId,
    pub session_id: String,
    pub date: NaiveDate,
    pub feeling: i32,
    pub sleep_hours: f64,
    pub timestamp: DateTime<Utc>,
}

impl WellnessForm {
    pub fn validate(
        self,
        today: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Result<WellnessEntry, ValidationError> {
        let player_id = PlayerId::parse(&self.player_id)?;
        check_date(self.date, today)?;

        if !(1..=5).contains(&self.feeling) {
            return Err(ValidationError::Feeling(self.feeling));
        }
        if !valid_sleep_hours(self.sleep_hours) {
            return Err(ValidationError::SleepHours(self.sleep_hours));
        }

        Ok(WellnessEntry {
            submission_id: submission_id_or_new(self.submission_id),
            session_id: derive_session_id(self.date, player_id.as_str()),
            player_id,
            date: self.date,
            feeling: self.feeling as i32,
            sleep_hours: self.sleep_hours,
            timestamp,
        })
    }
}

impl WellnessEntry {
    pub fn to_document(&self) -> Document {
        doc! {
            "_id": self.submission_id.clone(),
            "player_id": self.player_id.to_bson(),
            "session_id": self.session_id.clone(),
            "date": encode_date(self.date),
            "feeling": self.feeling,
            "sleep_hours": self.sleep_hours,
            "timestamp": encode_timestamp(self.timestamp),
        }
    }
}

/// Post-training RPE input.
#[derive(Debug, Clone, Deserialize)]
pub struct RpeForm {
    pub player_id: String,
    pub date: NaiveDate,
    pub rpe_score: i64,
    pub training_minutes: i64,
    #[serde(default)]
    pub individual_session: bool,
    #[serde(default)]
    pub submission_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpeEntry {
    pub submission_id: String,
    pub player_id: PlayerId,
    pub session_id: String,
    pub date: NaiveDate,
    pub rpe_score: i32,
    pub training_minutes: i32,
    pub individual_session: bool,
    pub timestamp: DateTime<Utc>,
}

impl RpeForm {
    pub fn validate(
        self,
        today: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Result<RpeEntry, ValidationError> {
        let player_id = PlayerId::parse(&self.player_id)?;
        check_date(self.date, today)?;

        if !(1..=10).contains(&self.rpe_score) {
            return Err(ValidationError::RpeScore(self.rpe_score));
        }
        if !(0..=120).contains(&self.training_minutes) {
            return Err(ValidationError::TrainingMinutes(self.training_minutes));
        }

        Ok(RpeEntry {
            submission_id: submission_id_or_new(self.submission_id),
            session_id: derive_session_id(self.date, player_id.as_str()),
            player_id,
            date: self.date,
            rpe_score: self.rpe_score as i32,
            training_minutes: self.training_minutes as i32,
            individual_session: self.individual_session,
            timestamp,
        })
    }
}

impl RpeEntry {
    pub fn to_document(&self) -> Document {
        doc! {
            "_id": self.submission_id.clone(),
            "player_id": self.player_id.to_bson(),
            "session_id": self.session_id.clone(),
            "date": encode_date(self.date),
            "rpe_score": self.rpe_score,
            "training_minutes": self.training_minutes,
            "individual_session": self.individual_session,
            "timestamp": encode_timestamp(self.timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterRecord {
    pub player_id: String,
}

impl RosterRecord {
    /// Reads `player_id` from a roster document and renders it as a string.
    pub fn from_document(index: usize, record: &Document) -> Result<Self, ReadError> {
        let player_id = match record.get("player_id") {
            Some(Bson::Int32(value)) => value.to_string(),
            Some(Bson::Int64(value)) => value.to_string(),
            Some(Bson::Double(value)) if value.is_finite() && value.fract() == 0.0 => {
                format!("{value:.0}")
            }
            Some(Bson::String(value)) => value.clone(),
            _ => return Err(ReadError::MalformedRecord { index }),
        };

        Ok(Self { player_id })
    }
}

fn check_date(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date > today {
        return Err(ValidationError::FutureDate { date, today });
    }
    Ok(())
}

fn valid_sleep_hours(hours: f64) -> bool {
    (0.0..=12.0).contains(&hours) && (hours * 2.0).fract() == 0.0
}

fn submission_id_or_new(submission_id: Option<String>) -> String {
    submission_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00").to_string()
}

fn encode_timestamp(timestamp: DateTime<Utc>) -> Bson {
    Bson::DateTime(mongodb::bson::DateTime::from_millis(
        timestamp.timestamp_millis(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn submitted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 15, 0).unwrap()
    }

    fn wellness_form() -> WellnessForm {
        WellnessForm {
            player_id: "42".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            feeling: 4,
            sleep_hours: 7.5,
            submission_id: Some("sub-1".to_string()),
        }
    }

    fn rpe_form() -> RpeForm {
        RpeForm {
            player_id: "7".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            rpe_score: 6,
            training_minutes: 90,
            individual_session: true,
            submission_id: None,
        }
    }

    #[test]
    fn wellness_entry_renders_expected_document() {
        let entry = wellness_form().validate(today(), submitted_at()).unwrap();
        let document = entry.to_document();

        assert_eq!(document.get_str("_id").unwrap(), "sub-1");
        assert_eq!(document.get_i64("player_id").unwrap(), 42);
        assert_eq!(document.get_str("session_id").unwrap(), "20240601U42");
        assert_eq!(document.get_str("date").unwrap(), "2024-06-01T00:00:00");
        assert_eq!(document.get_i32("feeling").unwrap(), 4);
        assert_eq!(document.get_f64("sleep_hours").unwrap(), 7.5);
        assert_eq!(
            document.get_datetime("timestamp").unwrap().timestamp_millis(),
            submitted_at().timestamp_millis()
        );
    }

    #[test]
    fn feeling_outside_scale_is_rejected() {
        for feeling in [0, 6, -1] {
            let form = WellnessForm {
                feeling,
                ..wellness_form()
            };
            assert_eq!(
                form.validate(today(), submitted_at()).unwrap_err(),
                ValidationError::Feeling(feeling)
            );
        }
    }

    #[test]
    fn sleep_hours_must_be_in_range_and_half_hour_steps() {
        for hours in [-0.5, 12.5, 7.25, f64::NAN] {
            let form = WellnessForm {
                sleep_hours: hours,
                ..wellness_form()
            };
            assert!(matches!(
                form.validate(today(), submitted_at()),
                Err(ValidationError::SleepHours(_))
            ));
        }

        for hours in [0.0, 12.0, 8.5] {
            let form = WellnessForm {
                sleep_hours: hours,
                ..wellness_form()
            };
            assert!(form.validate(today(), submitted_at()).is_ok());
        }
    }

    #[test]
    fn future_dates_are_rejected() {
        let form = WellnessForm {
            date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            ..wellness_form()
        };
        assert!(matches!(
            form.validate(today(), submitted_at()),
            Err(ValidationError::FutureDate { .. })
        ));
    }

    #[test]
    fn blank_player_id_is_rejected() {
        let form = WellnessForm {
            player_id: "  ".to_string(),
            ..wellness_form()
        };
        assert_eq!(
            form.validate(today(), submitted_at()).unwrap_err(),
            ValidationError::BlankPlayerId
        );
    }

    #[test]
    fn rpe_entry_renders_expected_document() {
        let entry = rpe_form().validate(today(), submitted_at()).unwrap();
        let document = entry.to_document();

        assert!(Uuid::parse_str(document.get_str("_id").unwrap()).is_ok());
        assert_eq!(document.get_i64("player_id").unwrap(), 7);
        assert_eq!(document.get_str("session_id").unwrap(), "20240603U7");
        assert_eq!(document.get_i32("rpe_score").unwrap(), 6);
        assert_eq!(document.get_i32("training_minutes").unwrap(), 90);
        assert!(document.get_bool("individual_session").unwrap());
    }

    #[test]
    fn rpe_ranges_are_enforced() {
        let form = RpeForm {
            rpe_score: 11,
            ..rpe_form()
        };
        assert_eq!(
            form.validate(today(), submitted_at()).unwrap_err(),
            ValidationError::RpeScore(11)
        );

        let form = RpeForm {
            training_minutes: 121,
            ..rpe_form()
        };
        assert_eq!(
            form.validate(today(), submitted_at()).unwrap_err(),
            ValidationError::TrainingMinutes(121)
        );
    }

    #[test]
    fn non_numeric_player_id_is_stored_as_string() {
        let player = PlayerId::parse("GK1").unwrap();
        assert_eq!(player.to_bson(), Bson::String("GK1".to_string()));
    }

    #[test]
    fn stored_player_id_reads_back_as_the_roster_id() {
        for raw in ["007", "+7", "42", "-3"] {
            let form = WellnessForm {
                player_id: raw.to_string(),
                ..wellness_form()
            };
            let entry = form.validate(today(), submitted_at()).unwrap();
            entry.player_id.ensure_listed(&[raw.to_string()]).unwrap();

            let stored = RosterRecord::from_document(0, &entry.to_document()).unwrap();
            assert_eq!(stored.player_id, raw);
        }

        assert_eq!(PlayerId::parse("007").unwrap().to_bson(), Bson::String("007".to_string()));
        assert_eq!(PlayerId::parse("42").unwrap().to_bson(), Bson::Int64(42));
    }

    #[test]
    fn roster_membership_check() {
        let roster = vec!["7".to_string(), "12".to_string()];
        assert!(PlayerId::parse("12").unwrap().ensure_listed(&roster).is_ok());
        assert_eq!(
            PlayerId::parse("13").unwrap().ensure_listed(&roster),
            Err(ValidationError::UnknownPlayer("13".to_string()))
        );
    }

    #[test]
    fn roster_record_normalises_player_id() {
        let cases = [
            (doc! { "player_id": 7 }, "7"),
            (doc! { "player_id": 12_i64 }, "12"),
            (doc! { "player_id": 3.0 }, "3"),
            (doc! { "player_id": "GK1" }, "GK1"),
        ];
        for (record, expected) in cases {
            assert_eq!(
                RosterRecord::from_document(0, &record).unwrap().player_id,
                expected
            );
        }
    }

    #[test]
    fn roster_record_without_player_id_is_malformed() {
        let err = RosterRecord::from_document(2, &doc! { "name": "Kim" }).unwrap_err();
        assert!(matches!(err, ReadError::MalformedRecord { index: 2 }));
    }
}
