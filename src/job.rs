use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{
    pipeline::{IngestFailure, IngestOutcome},
    stats::IngestReport,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub processing_time: f64,
    pub timeout_degraded: bool,
    pub stats: IngestReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobResult {
    Completed {
        preview: Vec<Map<String, JsonValue>>,
        summary: JobSummary,
    },
    Failed {
        preview: Vec<Map<String, JsonValue>>,
        error: IngestFailure,
    },
}

impl JobResult {
    pub fn from_outcome(outcome: &IngestOutcome, preview_rows: usize) -> Self {
        match outcome {
            IngestOutcome::Success(success) => JobResult::Completed {
                preview: success.table.to_records(preview_rows),
                summary: JobSummary {
                    total_rows: success.table.row_count(),
                    total_columns: success.table.column_count(),
                    processing_time: success.report.processing_time_seconds(),
                    timeout_degraded: success.timeout_degraded,
                    stats: success.report.clone(),
                },
            },
            IngestOutcome::Failure(failure) => JobResult::Failed {
                preview: Vec::new(),
                error: failure.clone(),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PipelineConfig,
        data::Cell,
        loader::InMemoryWorkbook,
        pipeline::{IngestRequest, Pipeline},
    };

    #[test]
    fn completed_job_carries_preview_and_summary() {
        let mut rows = vec![vec![Cell::Text("id".into()), Cell::Text("name".into())]];
        rows.extend((0..15).map(|i| vec![Cell::Number(i as f64), Cell::Text(format!("n{i}"))]));
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1", rows);
        let request = IngestRequest::new("/uploads/people.xlsx", "xlsx", None, 512);
        let outcome =
            Pipeline::new(PipelineConfig::default()).process_workbook(&request, &mut workbook);

        let job = JobResult::from_outcome(&outcome, 10);
        let json = serde_json::to_value(&job).expect("serialize");
        assert_eq!(json["preview"].as_array().unwrap().len(), 10);
        assert_eq!(json["preview"][0]["id"], 0.0);
        assert_eq!(json["summary"]["total_rows"], 15);
        assert_eq!(json["summary"]["total_columns"], 2);
        assert_eq!(json["summary"]["stats"]["initial_rows"], 16);
    }

    #[test]
    fn failed_job_has_empty_preview() {
        let request = IngestRequest::new("/uploads/notes.txt", "txt", None, 10);
        let outcome = Pipeline::new(PipelineConfig::default()).process(&request);
        let job = JobResult::from_outcome(&outcome, 10);
        let json = serde_json::to_value(&job).expect("serialize");
        assert_eq!(json["preview"].as_array().unwrap().len(), 0);
        assert_eq!(json["error"]["kind"], "unsupported_file_type");
    }
}
