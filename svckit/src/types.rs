use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DashError;

/// Server-assigned severity bucket. Unrecognized values are kept verbatim
/// in `Other` so they survive a round trip and render with a neutral color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriageCategory {
    Immediate,
    Delayed,
    Minimal,
    Expectant,
    Other(String),
}

impl TriageCategory {
    pub fn as_str(&self) -> &str {
        match self {
            TriageCategory::Immediate => "immediate",
            TriageCategory::Delayed => "delayed",
            TriageCategory::Minimal => "minimal",
            TriageCategory::Expectant => "expectant",
            TriageCategory::Other(raw) => raw,
        }
    }
}

impl From<String> for TriageCategory {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "immediate" => TriageCategory::Immediate,
            "delayed" => TriageCategory::Delayed,
            "minimal" => TriageCategory::Minimal,
            "expectant" => TriageCategory::Expectant,
            _ => TriageCategory::Other(raw),
        }
    }
}

impl From<TriageCategory> for String {
    fn from(category: TriageCategory) -> Self {
        match category {
            TriageCategory::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TriageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient workflow outcome. The backend may report values beyond the three
/// the dashboard can set (e.g. "deteriorating").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Stable,
    Evacuated,
    Deceased,
    Other(String),
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Stable => "stable",
            Outcome::Evacuated => "evacuated",
            Outcome::Deceased => "deceased",
            Outcome::Other(raw) => raw,
        }
    }
}

impl From<String> for Outcome {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "stable" => Outcome::Stable,
            "evacuated" => Outcome::Evacuated,
            "deceased" => Outcome::Deceased,
            _ => Outcome::Other(raw),
        }
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub patient_id: String,
    #[serde(default)]
    pub timestamp: String,

    // Vitals
    pub respiratory_rate: Option<u32>,
    pub pulse: Option<u32>,
    pub systolic_bp: Option<u32>,
    #[serde(default)]
    pub consciousness: String,
    #[serde(default)]
    pub can_walk: bool,

    // Injury assessment
    #[serde(default)]
    pub injury_type: Vec<String>,
    #[serde(default)]
    pub injury_severity: String,
    #[serde(default)]
    pub body_regions: Vec<String>,

    // Demographics
    pub estimated_age: Option<u32>,
    pub gender: Option<String>,

    // Triage results (server-assigned)
    pub triage_category: TriageCategory,
    #[serde(default)]
    pub triage_score: i64,
    #[serde(default)]
    pub priority: i64,

    // Treatment tracking
    #[serde(default, deserialize_with = "flag_or_timestamp")]
    pub treatment_started: bool,
    pub treatment_notes: Option<String>,
    pub outcome: Option<Outcome>,

    pub notes: Option<String>,
    pub location: Option<String>,
    pub medic: Option<String>,
}

/// `treatment_started` is a bool in some backends and a start timestamp
/// (or null) in others. Anything present and not `false` counts as started.
fn flag_or_timestamp<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(flag)) => flag,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub resource_type: String,
    pub current_stock: u32,
    pub critical_level: u32,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Resource {
    pub fn is_critical(&self) -> bool {
        self.current_stock <= self.critical_level
    }
}

/// Aggregate counts. Every field is optional on the wire; absence renders
/// as zero and is preserved when re-serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delayed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimal: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectant: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evacuated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deceased: Option<u64>,
}

/// AVPU consciousness scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consciousness {
    Alert,
    Voice,
    Pain,
    Unresponsive,
}

impl Consciousness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consciousness::Alert => "alert",
            Consciousness::Voice => "voice",
            Consciousness::Pain => "pain",
            Consciousness::Unresponsive => "unresponsive",
        }
    }
}

impl FromStr for Consciousness {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alert" | "a" => Ok(Consciousness::Alert),
            "voice" | "v" => Ok(Consciousness::Voice),
            "pain" | "p" => Ok(Consciousness::Pain),
            "unresponsive" | "u" => Ok(Consciousness::Unresponsive),
            other => Err(DashError::Validation(format!(
                "consciousness must be alert, voice, pain or unresponsive (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjurySeverity {
    Minor,
    Moderate,
    Severe,
    Critical,
}

impl InjurySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjurySeverity::Minor => "minor",
            InjurySeverity::Moderate => "moderate",
            InjurySeverity::Severe => "severe",
            InjurySeverity::Critical => "critical",
        }
    }
}

impl FromStr for InjurySeverity {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(InjurySeverity::Minor),
            "moderate" => Ok(InjurySeverity::Moderate),
            "severe" => Ok(InjurySeverity::Severe),
            "critical" => Ok(InjurySeverity::Critical),
            other => Err(DashError::Validation(format!(
                "injury severity must be minor, moderate, severe or critical (got '{}')",
                other
            ))),
        }
    }
}

/// Body of `POST /api/patients`. Absent optional fields are omitted from
/// the JSON rather than sent as zero or empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<u32>,
    pub consciousness: Consciousness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_walk: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub injury_type: Vec<String>,
    pub injury_severity: InjurySeverity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body_regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl PatientInput {
    pub fn new(consciousness: Consciousness, injury_severity: InjurySeverity) -> Self {
        Self {
            patient_id: None,
            respiratory_rate: None,
            pulse: None,
            systolic_bp: None,
            consciousness,
            can_walk: None,
            injury_type: Vec::new(),
            injury_severity,
            body_regions: Vec::new(),
            estimated_age: None,
            gender: None,
            notes: None,
            medic: None,
            location: None,
        }
    }
}

/// Response of `POST /api/patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPatient {
    pub patient_id: String,
    pub category: TriageCategory,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Body of `PATCH /api/patients/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_started: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl PatientPatch {
    pub fn start_treatment() -> Self {
        Self {
            treatment_started: Some(true),
            ..Self::default()
        }
    }

    pub fn outcome(outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..Self::default()
        }
    }
}

/// Body of `POST /api/resources`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceUpsert {
    pub resource_type: String,
    pub current_stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ResourceUpsert {
    pub fn stock(resource_type: impl Into<String>, current_stock: u32) -> Self {
        Self {
            resource_type: resource_type.into(),
            current_stock,
            critical_level: None,
            location: None,
        }
    }
}

/// Snapshot export document, field order matches the downloaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub timestamp: String,
    pub stats: Stats,
    pub patients: Vec<Patient>,
    pub resources: Vec<Resource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient_json() -> serde_json::Value {
        json!({
            "id": 7,
            "patient_id": "P1700000000",
            "timestamp": "2024-03-01T10:15:30.123456",
            "respiratory_rate": 32,
            "pulse": null,
            "systolic_bp": 85,
            "consciousness": "pain",
            "can_walk": false,
            "injury_type": ["blast", "burn"],
            "injury_severity": "severe",
            "body_regions": ["chest"],
            "estimated_age": null,
            "gender": "female",
            "triage_category": "immediate",
            "triage_score": 95,
            "priority": 76,
            "treatment_started": "2024-03-01T10:20:00",
            "treatment_notes": null,
            "outcome": null,
            "notes": "tourniquet applied",
            "location": null,
            "medic": "M-12"
        })
    }

    #[test]
    fn test_patient_from_backend_payload() {
        let patient: Patient = serde_json::from_value(patient_json()).unwrap();
        assert_eq!(patient.triage_category, TriageCategory::Immediate);
        assert!(patient.treatment_started);
        assert_eq!(patient.injury_type, vec!["blast", "burn"]);
        assert_eq!(patient.pulse, None);
        assert_eq!(patient.outcome, None);
    }

    #[test]
    fn test_treatment_started_variants() {
        let mut raw = patient_json();
        raw["treatment_started"] = json!(null);
        assert!(!serde_json::from_value::<Patient>(raw.clone()).unwrap().treatment_started);

        raw["treatment_started"] = json!(true);
        assert!(serde_json::from_value::<Patient>(raw.clone()).unwrap().treatment_started);

        raw.as_object_mut().unwrap().remove("treatment_started");
        assert!(!serde_json::from_value::<Patient>(raw).unwrap().treatment_started);
    }

    #[test]
    fn test_unknown_category_is_preserved() {
        let mut raw = patient_json();
        raw["triage_category"] = json!("urgent");
        let patient: Patient = serde_json::from_value(raw).unwrap();
        assert_eq!(patient.triage_category, TriageCategory::Other("urgent".to_string()));

        let back = serde_json::to_value(&patient).unwrap();
        assert_eq!(back["triage_category"], "urgent");
    }

    #[test]
    fn test_stats_absent_fields_stay_absent() {
        let stats: Stats = serde_json::from_str(r#"{"immediate": 2, "total": 3}"#).unwrap();
        assert_eq!(stats.immediate, Some(2));
        assert_eq!(stats.delayed, None);

        let back = serde_json::to_value(&stats).unwrap();
        assert_eq!(back, json!({"immediate": 2, "total": 3}));
    }

    #[test]
    fn test_minimal_patient_input_omits_optionals() {
        let input = PatientInput::new(Consciousness::Voice, InjurySeverity::Moderate);
        let body = serde_json::to_value(&input).unwrap();
        assert_eq!(
            body,
            json!({"consciousness": "voice", "injury_severity": "moderate"})
        );
    }

    #[test]
    fn test_patch_bodies() {
        assert_eq!(
            serde_json::to_value(PatientPatch::start_treatment()).unwrap(),
            json!({"treatment_started": true})
        );
        assert_eq!(
            serde_json::to_value(PatientPatch::outcome(Outcome::Evacuated)).unwrap(),
            json!({"outcome": "evacuated"})
        );
    }

    #[test]
    fn test_parse_form_enums() {
        assert_eq!("U".parse::<Consciousness>().unwrap(), Consciousness::Unresponsive);
        assert_eq!(" Critical ".parse::<InjurySeverity>().unwrap(), InjurySeverity::Critical);
        assert!(matches!(
            "sleepy".parse::<Consciousness>(),
            Err(DashError::Validation(_))
        ));
    }

    #[test]
    fn test_resource_critical_boundary() {
        let mut resource = Resource {
            id: 1,
            resource_type: "oxygen".to_string(),
            current_stock: 10,
            critical_level: 10,
            last_updated: None,
            location: None,
        };
        assert!(resource.is_critical());
        resource.current_stock = 11;
        assert!(!resource.is_critical());
    }
}
