// services/triage-dash/src/form.rs
//
// New-patient intake form: free-text fields edited in the Input tab and
// validated into a PatientInput on submit

use svckit::errors::DashError;
use svckit::types::{Consciousness, InjurySeverity, PatientInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PatientId,
    RespiratoryRate,
    Pulse,
    SystolicBp,
    Consciousness,
    CanWalk,
    InjuryType,
    InjurySeverity,
    BodyRegions,
    EstimatedAge,
    Gender,
    Notes,
    Medic,
}

impl Field {
    pub const ORDER: [Field; 13] = [
        Field::PatientId,
        Field::RespiratoryRate,
        Field::Pulse,
        Field::SystolicBp,
        Field::Consciousness,
        Field::CanWalk,
        Field::InjuryType,
        Field::InjurySeverity,
        Field::BodyRegions,
        Field::EstimatedAge,
        Field::Gender,
        Field::Notes,
        Field::Medic,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::PatientId => "Patient ID",
            Field::RespiratoryRate => "Respiratory rate",
            Field::Pulse => "Pulse",
            Field::SystolicBp => "Systolic BP",
            Field::Consciousness => "Consciousness *",
            Field::CanWalk => "Can walk",
            Field::InjuryType => "Injury type",
            Field::InjurySeverity => "Injury severity *",
            Field::BodyRegions => "Body regions",
            Field::EstimatedAge => "Estimated age",
            Field::Gender => "Gender",
            Field::Notes => "Notes",
            Field::Medic => "Medic",
        }
    }

    /// Placeholder shown while the field is empty.
    pub fn hint(self) -> &'static str {
        match self {
            Field::PatientId => "auto-assigned if blank",
            Field::RespiratoryRate => "breaths/min",
            Field::Pulse => "bpm",
            Field::SystolicBp => "mmHg",
            Field::Consciousness => "alert | voice | pain | unresponsive",
            Field::CanWalk => "yes | no",
            Field::InjuryType => "comma separated, e.g. blast, burn",
            Field::InjurySeverity => "minor | moderate | severe | critical",
            Field::BodyRegions => "comma separated, e.g. head, chest",
            Field::EstimatedAge => "years",
            Field::Gender => "male | female | other",
            Field::Notes => "",
            Field::Medic => "medic id",
        }
    }

    fn numeric(self) -> bool {
        matches!(
            self,
            Field::RespiratoryRate | Field::Pulse | Field::SystolicBp | Field::EstimatedAge
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientForm {
    values: Vec<String>,
    focus: usize,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientForm {
    pub fn new() -> Self {
        Self {
            values: vec![String::new(); Field::ORDER.len()],
            focus: 0,
        }
    }

    pub fn focused(&self) -> Field {
        Field::ORDER[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Field::ORDER.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Field::ORDER.len() - 1) % Field::ORDER.len();
    }

    pub fn value(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    /// Type into the focused field. Numeric fields only take digits.
    pub fn insert(&mut self, c: char) {
        let field = self.focused();
        if field.numeric() && !c.is_ascii_digit() {
            return;
        }
        if c.is_control() {
            return;
        }
        self.values[self.focus].push(c);
    }

    pub fn backspace(&mut self) {
        self.values[self.focus].pop();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Validate into a request body. The form is left as-is on failure so
    /// the operator can correct it.
    pub fn build(&self) -> Result<PatientInput, DashError> {
        let consciousness = required(self.value(Field::Consciousness), Field::Consciousness)?
            .parse::<Consciousness>()?;
        let severity = required(self.value(Field::InjurySeverity), Field::InjurySeverity)?
            .parse::<InjurySeverity>()?;

        let mut input = PatientInput::new(consciousness, severity);
        input.patient_id = text(self.value(Field::PatientId));
        input.respiratory_rate =
            number(self.value(Field::RespiratoryRate), Field::RespiratoryRate)?;
        input.pulse = number(self.value(Field::Pulse), Field::Pulse)?;
        input.systolic_bp = number(self.value(Field::SystolicBp), Field::SystolicBp)?;
        input.can_walk = flag(self.value(Field::CanWalk))?;
        input.injury_type = list(self.value(Field::InjuryType));
        input.body_regions = list(self.value(Field::BodyRegions));
        input.estimated_age = number(self.value(Field::EstimatedAge), Field::EstimatedAge)?;
        input.gender = text(self.value(Field::Gender)).map(|g| g.to_lowercase());
        input.notes = text(self.value(Field::Notes));
        input.medic = text(self.value(Field::Medic));
        Ok(input)
    }
}

fn required(raw: &str, field: Field) -> Result<&str, DashError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DashError::Validation(format!(
            "{} is required",
            field.label().trim_end_matches(" *")
        )));
    }
    Ok(trimmed)
}

fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn number(raw: &str, field: Field) -> Result<Option<u32>, DashError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<u32>().map(Some).map_err(|_| {
        DashError::Validation(format!(
            "{} must be a whole number (got '{}')",
            field.label(),
            trimmed
        ))
    })
}

fn flag(raw: &str) -> Result<Option<bool>, DashError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "yes" | "y" | "true" => Ok(Some(true)),
        "no" | "n" | "false" => Ok(Some(false)),
        other => Err(DashError::Validation(format!(
            "Can walk must be yes or no (got '{}')",
            other
        ))),
    }
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}
