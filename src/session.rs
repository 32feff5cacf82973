use chrono::NaiveDate;

/// Session key correlating same-day entries for a player: `YYYYMMDD`, a `U`,
/// then the first two characters of the player id.
///
/// Players sharing a two-character prefix collide on the same date, so the
/// value is never used for lookup or dedup.
pub fn derive_session_id(date: NaiveDate, player_id: &str) -> String {
    let prefix: String = player_id.chars().take(2).collect();
    format!("{}U{}", date.format("%Y%m%d"), prefix)
}
