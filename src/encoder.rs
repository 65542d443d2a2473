//! Report encoding
//!
//! Wraps each [`TickReport`] with producer and timing metadata so the UI
//! collaborator (or a log consumer) can tell which processor instance emitted
//! it and for which sensor tick.

use crate::error::TrackingError;
use crate::types::TickReport;
use crate::{PANTOMIME_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current output schema version
pub const REPORT_VERSION: &str = "pantomime.report.v1";

/// Processor instance that produced a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One encoded tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub report_version: String,
    pub producer: ReportProducer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_id: Option<String>,
    /// Sensor timestamp of the tick
    pub observed_at_utc: String,
    pub computed_at_utc: String,
    #[serde(flatten)]
    pub report: TickReport,
}

/// Encoder for producing frame reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a tick report with producer and timing metadata
    pub fn encode(
        &self,
        report: TickReport,
        tick_id: Option<&str>,
        observed_at: DateTime<Utc>,
    ) -> FrameReport {
        FrameReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: PANTOMIME_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            tick_id: tick_id.map(str::to_string),
            observed_at_utc: observed_at.to_rfc3339(),
            computed_at_utc: Utc::now().to_rfc3339(),
            report,
        }
    }

    /// Encode to a single-line JSON string
    pub fn encode_to_json(
        &self,
        report: TickReport,
        tick_id: Option<&str>,
        observed_at: DateTime<Utc>,
    ) -> Result<String, TrackingError> {
        let frame = self.encode(report, tick_id, observed_at);
        serde_json::to_string(&frame).map_err(TrackingError::JsonError)
    }
}
