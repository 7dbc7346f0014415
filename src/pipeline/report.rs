use crate::error::Result;
use crate::pipeline::StageName;
use crate::processors::ConsolidatedOutput;
use crate::writers::write_json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// What a stage did with one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ZoneOutcome {
    Converted,
    AlreadyConverted,
    /// The conversion tool returned without creating the zone directory
    NotConverted,
    BuffersWritten { stations: usize, features: usize },
    BuffersPresent,
    WorkflowRun,
    ResultsComplete,
    /// Exactly one result file: left alone until cleaned by hand
    Inconsistent { files: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneReport {
    pub zone: String,
    #[serde(flatten)]
    pub outcome: ZoneOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// Durable state already satisfied the stage
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: StageName,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tool_calls: usize,
    pub zones: Vec<ZoneReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ConsolidatedOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    pub fn started(stage: StageName) -> Self {
        let now = Utc::now();
        Self {
            stage,
            status: StageStatus::Completed,
            started_at: now,
            finished_at: now,
            tool_calls: 0,
            zones: Vec::new(),
            outputs: Vec::new(),
            error: None,
        }
    }

    pub fn skipped(stage: StageName) -> Self {
        Self {
            status: StageStatus::Skipped,
            ..Self::started(stage)
        }
    }

    pub fn failed(stage: StageName, started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            status: StageStatus::Failed,
            started_at,
            finished_at: Utc::now(),
            error: Some(error),
            ..Self::started(stage)
        }
    }

    pub fn record(&mut self, zone: impl Into<String>, outcome: ZoneOutcome) {
        self.zones.push(ZoneReport {
            zone: zone.into(),
            outcome,
        });
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn count(&self, predicate: impl Fn(&ZoneOutcome) -> bool) -> usize {
        self.zones.iter().filter(|z| predicate(&z.outcome)).count()
    }

    pub fn summary(&self) -> String {
        match self.status {
            StageStatus::Skipped => format!("{}: already complete, skipped", self.stage),
            StageStatus::Failed => format!(
                "{}: failed: {}",
                self.stage,
                self.error.as_deref().unwrap_or("unknown error")
            ),
            StageStatus::Completed => format!(
                "{}: {} zones, {} tool calls, {} outputs",
                self.stage,
                self.zones.len(),
                self.tool_calls,
                self.outputs.len()
            ),
        }
    }
}

/// Persisted next to the results after every run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub zones: usize,
    pub stages: Vec<StageReport>,
}

impl RunSummary {
    pub fn new(profile: impl Into<String>, zones: usize) -> Self {
        let now = Utc::now();
        Self {
            profile: profile.into(),
            started_at: now,
            finished_at: now,
            zones,
            stages: Vec::new(),
        }
    }

    pub fn stage(&self, name: StageName) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn total_tool_calls(&self) -> usize {
        self.stages.iter().map(|s| s.tool_calls).sum()
    }

    pub fn write(&mut self, path: &Path) -> Result<()> {
        self.finished_at = Utc::now();
        write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zone_outcome_serialization() {
        let mut report = StageReport::started(StageName::Indicators);
        report.record("osm_1.0_2.0_3.0_4.0", ZoneOutcome::Inconsistent { files: 1 });
        report.record("osm_5.0_6.0_7.0_8.0", ZoneOutcome::WorkflowRun);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stage"], json!("indicators"));
        assert_eq!(value["status"], json!("completed"));
        assert_eq!(
            value["zones"][0],
            json!({"zone": "osm_1.0_2.0_3.0_4.0", "outcome": "inconsistent", "files": 1})
        );
        assert_eq!(value["zones"][1]["outcome"], json!("workflow_run"));
        assert!(value.get("outputs").is_none());
        assert_eq!(report.count(|o| matches!(o, ZoneOutcome::WorkflowRun)), 1);
    }

    #[test]
    fn test_skipped_and_failed_summaries() {
        assert_eq!(
            StageReport::skipped(StageName::Convert).summary(),
            "convert: already complete, skipped"
        );
        let failed = StageReport::failed(StageName::Buffers, Utc::now(), "boom".to_string());
        assert_eq!(failed.summary(), "buffers: failed: boom");
    }
}
