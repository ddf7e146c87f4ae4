//! Unit — identity and file naming of one storage unit.
//!
//! A unit holds every record saved for one container on one UTC calendar
//! day, stored as `{container_id}-{YYYY-MM-DD}.json`.

use chrono::{DateTime, NaiveDate, Utc};

use super::error::StoreError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_LEN: usize = 10;
const EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    pub container_id: String,
    pub day: NaiveDate,
}

impl StorageKey {
    pub fn new(container_id: &str, day: NaiveDate) -> Result<Self, StoreError> {
        validate_container_id(container_id)?;
        Ok(Self {
            container_id: container_id.to_string(),
            day,
        })
    }

    /// Unit that records saved at `at` belong to.
    pub fn for_instant(container_id: &str, at: DateTime<Utc>) -> Result<Self, StoreError> {
        Self::new(container_id, at.date_naive())
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}{}", self.container_id, self.day.format(DATE_FORMAT), EXTENSION)
    }

    /// Inverse of [`file_name`](Self::file_name); `None` for foreign files.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(EXTENSION)?;
        if stem.len() < DATE_LEN + 2 || !stem.is_char_boundary(stem.len() - DATE_LEN - 1) {
            return None;
        }
        let (container_id, date) = stem.split_at(stem.len() - DATE_LEN - 1);
        let date = date.strip_prefix('-')?;
        let day = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Self::new(container_id, day).ok()
    }
}

fn validate_container_id(container_id: &str) -> Result<(), StoreError> {
    let bad = container_id.is_empty()
        || container_id == "."
        || container_id == ".."
        || container_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidContainerId(container_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_file_name() {
        let key = StorageKey::new("abc123", day("2024-03-01")).unwrap();
        assert_eq!(key.file_name(), "abc123-2024-03-01.json");
    }

    #[test]
    fn test_parse_round_trip_with_dashes_in_id() {
        let key = StorageKey::new("my-app-1", day("2024-12-31")).unwrap();
        assert_eq!(StorageKey::parse_file_name(&key.file_name()), Some(key));
    }

    #[test]
    fn test_for_instant_uses_utc_day() {
        let at: DateTime<Utc> = "2024-03-01T23:59:59Z".parse().unwrap();
        assert_eq!(StorageKey::for_instant("c1", at).unwrap().day, day("2024-03-01"));
    }

    #[test]
    fn test_parse_rejects_foreign_files() {
        assert!(StorageKey::parse_file_name("notes.txt").is_none());
        assert!(StorageKey::parse_file_name("c1-2024-03-01.json.tmp").is_none());
        assert!(StorageKey::parse_file_name("c1-yesterday.json").is_none());
        assert!(StorageKey::parse_file_name("2024-03-01.json").is_none());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        assert!(StorageKey::new("../etc", day("2024-03-01")).is_err());
        assert!(StorageKey::new("", day("2024-03-01")).is_err());
        assert!(StorageKey::new("..", day("2024-03-01")).is_err());
    }
}
