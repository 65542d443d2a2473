//! Batch parsing and validation for pantomime.tick.v1 records

use crate::error::TrackingError;
use crate::schema::tick::{TickRecord, ValidationError};

/// Adapter for reading tick records from JSON input
pub struct TickAdapter;

impl TickAdapter {
    /// Parse a single JSON tick record
    pub fn parse_record(json: &str) -> Result<TickRecord, TrackingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSON string containing an array of tick records
    pub fn parse_array(json: &str) -> Result<Vec<TickRecord>, TrackingError> {
        let records: Vec<TickRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) tick records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TickRecord>, TrackingError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TickRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(TrackingError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either a JSON array or NDJSON, judged by the first non-blank byte
    pub fn parse_auto(input: &str) -> Result<Vec<TickRecord>, TrackingError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[TickRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    tick_id: record.tick_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// One failed record from a validated batch
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub tick_id: Option<String>,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SCHEMA_VERSION;
    use crate::types::Size;
    use chrono::{DateTime, Utc};

    const NDJSON: &str = r#"{"schema_version":"pantomime.tick.v1","timestamp":"2024-03-02T10:15:00Z","tick_id":"a","display":{"width":640.0,"height":480.0}}

{"schema_version":"pantomime.tick.v1","timestamp":"2024-03-02T10:15:00.033Z","tick_id":"b","display":{"width":640.0,"height":480.0}}"#;

    #[test]
    fn test_parse_ndjson() {
        let records = TickAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let input = format!("{}\nnot json\n", NDJSON.lines().next().unwrap());
        let err = TickAdapter::parse_ndjson(&input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_auto() {
        let array = format!("[{}]", NDJSON.lines().next().unwrap());
        assert_eq!(TickAdapter::parse_auto(&array).unwrap().len(), 1);
        assert_eq!(TickAdapter::parse_auto(NDJSON).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_records() {
        let ts = "2024-03-02T10:15:00Z".parse::<DateTime<Utc>>().unwrap();
        let good = TickRecord::new(ts, Size::new(640.0, 480.0));
        let mut bad = TickRecord::new(ts, Size::new(640.0, 480.0)).with_tick_id("x");
        bad.schema_version = "other".to_string();

        let results = TickAdapter::validate_records(&[good.clone(), bad, good]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].tick_id.as_deref(), Some("x"));
        assert!(results[0].error.to_string().contains(SCHEMA_VERSION));
    }
}
