//! Reasoning service response model
//!
//! The service answers with `{status, message, record?}`. Parsing is strict about the
//! top-level shape and lenient about patient demographics, which fall back to the
//! documented placeholders when absent.

use crate::error::{AppError, Result};
use serde_json::Value;

/// Status value that marks an encounter as complete
pub const STATUS_FINISHED: &str = "finished";

/// Patient name used when the service did not identify the patient
pub const UNKNOWN_PATIENT_NAME: &str = "unknown";

/// National id used when the service did not provide one
pub const FALLBACK_CPF: &str = "000.000.000-00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    Finished,
    /// Any other status; the raw value is kept for reporting
    InProgress(String),
}

/// Patient demographics after fallbacks are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientInfo {
    pub name: String,
    pub cpf: String,
    pub date_of_birth: Option<String>,
}

impl Default for PatientInfo {
    fn default() -> Self {
        Self {
            name: UNKNOWN_PATIENT_NAME.to_string(),
            cpf: FALLBACK_CPF.to_string(),
            date_of_birth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageRecord {
    pub summary: String,
    pub patient: PatientInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningResponse {
    pub status: ResponseStatus,
    pub message: Option<String>,
    /// Always present when `status` is `Finished`
    pub record: Option<TriageRecord>,
}

impl ReasoningResponse {
    /// Interpret a raw JSON response
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| malformed("top-level value is not an object"))?;

        let status = match obj.get("status") {
            Some(Value::String(s)) if s == STATUS_FINISHED => ResponseStatus::Finished,
            Some(Value::String(s)) => ResponseStatus::InProgress(s.clone()),
            Some(_) => return Err(malformed("`status` is not a string")),
            None => return Err(malformed("missing `status`")),
        };

        let message = match obj.get("message") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(malformed("`message` is not a string")),
        };

        let record = match obj.get("record") {
            Some(record @ Value::Object(_)) => Some(parse_record(record)?),
            Some(Value::Null) | None => None,
            Some(_) => return Err(malformed("`record` is not an object")),
        };

        if status == ResponseStatus::Finished && record.is_none() {
            return Err(malformed("finished response without `record`"));
        }

        Ok(Self {
            status,
            message,
            record,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.status == ResponseStatus::Finished
    }
}

fn parse_record(value: &Value) -> Result<TriageRecord> {
    let summary = match value.get("summary") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(malformed("`record.summary` is not a string")),
        None => return Err(malformed("missing `record.summary`")),
    };

    let patient = match value.get("patient") {
        Some(Value::Object(p)) => PatientInfo {
            name: non_empty_str(p.get("name")).unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string()),
            cpf: non_empty_str(p.get("cpf")).unwrap_or_else(|| FALLBACK_CPF.to_string()),
            date_of_birth: non_empty_str(p.get("date_of_birth")),
        },
        Some(Value::Null) | None => PatientInfo::default(),
        Some(_) => return Err(malformed("`record.patient` is not an object")),
    };

    Ok(TriageRecord { summary, patient })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn malformed(reason: &str) -> AppError {
    AppError::MalformedResponse(reason.to_string())
}

/// Store the summary document path inside a raw response at `record.triage.path_document`
pub fn attach_document_path(value: &mut Value, document_path: &str) {
    if !value.is_object() {
        return;
    }
    let record = value
        .as_object_mut()
        .map(|obj| obj.entry("record").or_insert_with(|| Value::Object(Default::default())));
    if let Some(Value::Object(record)) = record {
        let triage = record
            .entry("triage")
            .or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(triage) = triage {
            triage.insert(
                "path_document".to_string(),
                Value::String(document_path.to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finished_response_with_full_patient() {
        let raw = json!({
            "status": "finished",
            "message": "Triage complete",
            "record": {
                "summary": "Headache for three days.",
                "patient": {"name": "Maria Silva", "cpf": "123.456.789-00", "date_of_birth": "1980-04-02"}
            }
        });

        let response = ReasoningResponse::from_value(&raw).unwrap();
        assert!(response.is_finished());
        assert_eq!(response.message.as_deref(), Some("Triage complete"));

        let record = response.record.unwrap();
        assert_eq!(record.summary, "Headache for three days.");
        assert_eq!(record.patient.name, "Maria Silva");
        assert_eq!(record.patient.cpf, "123.456.789-00");
        assert_eq!(record.patient.date_of_birth.as_deref(), Some("1980-04-02"));
    }

    #[test]
    fn test_missing_demographics_fall_back() {
        let raw = json!({
            "status": "finished",
            "message": "ok",
            "record": {"summary": "Fever.", "patient": {"name": ""}}
        });
        let record = ReasoningResponse::from_value(&raw).unwrap().record.unwrap();
        assert_eq!(record.patient, PatientInfo::default());

        let raw = json!({"status": "finished", "record": {"summary": "Fever."}});
        let record = ReasoningResponse::from_value(&raw).unwrap().record.unwrap();
        assert_eq!(record.patient.name, UNKNOWN_PATIENT_NAME);
        assert_eq!(record.patient.cpf, FALLBACK_CPF);
    }

    #[test]
    fn test_in_progress_status() {
        let raw = json!({"status": "in_progress", "message": "How long have you had the pain?"});
        let response = ReasoningResponse::from_value(&raw).unwrap();
        assert_eq!(response.status, ResponseStatus::InProgress("in_progress".to_string()));
        assert!(response.record.is_none());
    }

    #[test]
    fn test_malformed_shapes() {
        let cases = [
            json!([1, 2, 3]),
            json!({"message": "no status"}),
            json!({"status": 7}),
            json!({"status": "finished", "message": "no record"}),
            json!({"status": "finished", "record": {"patient": {}}}),
            json!({"status": "in_progress", "record": "text"}),
        ];
        for raw in cases {
            let err = ReasoningResponse::from_value(&raw).unwrap_err();
            assert!(matches!(err, AppError::MalformedResponse(_)), "accepted {}", raw);
        }
    }

    #[test]
    fn test_attach_document_path() {
        let mut raw = json!({"status": "finished", "record": {"summary": "x"}});
        attach_document_path(&mut raw, "/data/abc/triage.txt");
        assert_eq!(raw["record"]["triage"]["path_document"], "/data/abc/triage.txt");
        assert_eq!(raw["record"]["summary"], "x");
    }
}
