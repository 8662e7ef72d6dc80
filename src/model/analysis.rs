//! Analysis records exchanged with the face-analysis backend

use chrono::{DateTime, NaiveDateTime, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Deserializer, Serialize};

/// Server-side lifecycle of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    /// `completed` and `failed` end the polling protocol
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "⏳",
            AnalysisStatus::Processing => "⚙",
            AnalysisStatus::Completed => "✓",
            AnalysisStatus::Failed => "✗",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            AnalysisStatus::Pending => Color::DarkGray,
            AnalysisStatus::Processing => Color::Yellow,
            AnalysisStatus::Completed => Color::Green,
            AnalysisStatus::Failed => Color::Red,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderStats {
    #[serde(default)]
    pub male: u32,
    #[serde(default)]
    pub female: u32,
}

/// Fixed four-bucket age histogram
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroupStats {
    #[serde(rename = "10s", default)]
    pub tens: u32,
    #[serde(rename = "20s", default)]
    pub twenties: u32,
    #[serde(rename = "30s", default)]
    pub thirties: u32,
    #[serde(rename = "40_plus", default)]
    pub forty_plus: u32,
}

/// Aggregated statistics of a completed analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub total_faces: u32,
    #[serde(default)]
    pub gender: GenderStats,
    #[serde(default)]
    pub age_group: AgeGroupStats,
}

/// One row of `GET /api/analyses`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisSummary {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_faces: u32,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub result: Option<AnalysisResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysesResponse {
    pub analyses: Vec<AnalysisSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    pub analysis_id: String,
    pub image_count: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultResponse {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub result: Option<AnalysisResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryResponse {
    pub analysis_id: String,
    pub summary: String,
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Accepts RFC 3339 timestamps as well as the naive ISO form
/// (`2024-05-01T12:30:00.123456`) the backend emits, read as UTC.
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_result_deserializes_age_bucket_aliases() {
        let json = r#"{
            "total_faces": 5,
            "gender": {"male": 2, "female": 3},
            "age_group": {"10s": 1, "20s": 2, "30s": 0, "40_plus": 2}
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.total_faces, 5);
        assert_eq!(result.gender, GenderStats { male: 2, female: 3 });
        assert_eq!(result.age_group.twenties, 2);
        assert_eq!(result.age_group.forty_plus, 2);
    }

    #[test]
    fn test_result_missing_sections_default_to_zero() {
        let result: AnalysisResult = serde_json::from_str(r#"{"total_faces": 0}"#).unwrap();
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn test_summary_row_parses_naive_timestamp() {
        let json = r#"{
            "analysis_id": "abc",
            "status": "processing",
            "image_count": 2,
            "total_faces": 0,
            "created_at": "2024-05-01T12:30:15.250000"
        }"#;
        let row: AnalysisSummary = serde_json::from_str(json).unwrap();
        assert_eq!(row.status, AnalysisStatus::Processing);
        let created = row.created_at.unwrap();
        assert_eq!((created.month(), created.day()), (5, 1));
        assert_eq!((created.hour(), created.minute()), (12, 30));
        assert!(row.result.is_none());
    }

    #[test]
    fn test_unparseable_timestamp_is_none() {
        let json = r#"{"analysis_id": "abc", "status": "failed", "created_at": "yesterday"}"#;
        let row: AnalysisSummary = serde_json::from_str(json).unwrap();
        assert!(row.created_at.is_none());
    }

    #[test]
    fn test_rfc3339_timestamp_is_normalized_to_utc() {
        let parsed = parse_timestamp("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(parsed.hour(), 12);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AnalysisStatus::Pending.is_terminal());
        assert!(!AnalysisStatus::Processing.is_terminal());
        assert!(AnalysisStatus::Completed.is_terminal());
        assert!(AnalysisStatus::Failed.is_terminal());
    }
}
