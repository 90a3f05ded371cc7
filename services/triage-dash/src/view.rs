// services/triage-dash/src/view.rs
//
// Pure view-model build: Snapshot + filter -> everything the renderer draws.
// Rebuilt from scratch after every refresh, command and filter change.

use svckit::types::{Outcome, Patient, Resource, Stats};

use crate::derive::{
    category_color, clock_time, critical_resources, display_count, matches_filter,
    resource_label, stock_bar_percent, CategoryColor, PatientFilter,
};
use crate::dispatch::Action;
use crate::store::Snapshot;

/// What a card affordance does when its key is pressed.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Dispatch(Action),
    /// Open the stock editor prefilled with the current value.
    EditStock { resource_id: i64, current: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Affordance {
    pub key: char,
    pub label: &'static str,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatTile {
    pub label: &'static str,
    pub value: u64,
    pub color: Option<CategoryColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientCard {
    pub id: i64,
    pub patient_id: String,
    pub color: CategoryColor,
    pub category: String,
    pub priority: i64,
    pub score: i64,
    pub time: String,
    pub vitals: Vec<(&'static str, String)>,
    pub injuries: String,
    pub regions: String,
    pub demographics: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub affordances: Vec<Affordance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCard {
    pub id: i64,
    pub resource_type: String,
    pub label: String,
    pub current_stock: u32,
    pub critical_level: u32,
    pub critical: bool,
    pub bar_percent: f64,
    pub affordances: Vec<Affordance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsPanel {
    pub patients: Vec<StatTile>,
    pub treatment: Vec<StatTile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertBanner {
    pub resource_types: Vec<String>,
}

impl AlertBanner {
    pub fn message(&self) -> String {
        format!("CRITICAL RESOURCES: {}", self.resource_types.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub filter: PatientFilter,
    pub stats_bar: Vec<StatTile>,
    pub queue: Vec<PatientCard>,
    /// Patients excluded by the active filter.
    pub hidden: usize,
    pub resources: Vec<ResourceCard>,
    pub stats_panel: StatsPanel,
    pub alert: Option<AlertBanner>,
}

pub fn build_view(snapshot: &Snapshot, filter: PatientFilter) -> DashboardView {
    let queue: Vec<PatientCard> = snapshot
        .patients
        .iter()
        .filter(|p| matches_filter(p, filter))
        .map(patient_card)
        .collect();
    let hidden = snapshot.patients.len() - queue.len();

    let critical = critical_resources(&snapshot.resources);
    let alert = (!critical.is_empty()).then(|| AlertBanner {
        resource_types: critical.iter().map(|r| r.resource_type.clone()).collect(),
    });

    DashboardView {
        filter,
        stats_bar: stats_bar(&snapshot.stats),
        queue,
        hidden,
        resources: snapshot.resources.iter().map(resource_card).collect(),
        stats_panel: stats_panel(&snapshot.stats),
        alert,
    }
}

fn tile(label: &'static str, value: Option<u64>, color: Option<CategoryColor>) -> StatTile {
    StatTile {
        label,
        value: display_count(value),
        color,
    }
}

fn stats_bar(stats: &Stats) -> Vec<StatTile> {
    vec![
        tile("Immediate", stats.immediate, Some(CategoryColor::Red)),
        tile("Delayed", stats.delayed, Some(CategoryColor::Yellow)),
        tile("Minimal", stats.minimal, Some(CategoryColor::Green)),
        tile("Expectant", stats.expectant, Some(CategoryColor::Gray)),
        tile("Total", stats.total, None),
        tile("Treated", stats.treated, None),
    ]
}

fn stats_panel(stats: &Stats) -> StatsPanel {
    StatsPanel {
        patients: vec![
            tile("Total patients", stats.total, None),
            tile("Immediate", stats.immediate, Some(CategoryColor::Red)),
            tile("Delayed", stats.delayed, Some(CategoryColor::Yellow)),
            tile("Minimal", stats.minimal, Some(CategoryColor::Green)),
            tile("Expectant", stats.expectant, Some(CategoryColor::Gray)),
        ],
        treatment: vec![
            tile("Treated", stats.treated, None),
            tile("Evacuated", stats.evacuated, None),
            tile("Deceased", stats.deceased, None),
        ],
    }
}

fn vital(value: Option<u32>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

fn patient_card(patient: &Patient) -> PatientCard {
    let demographics = match (patient.estimated_age, patient.gender.as_deref()) {
        (None, None) => None,
        (Some(age), None) => Some(format!("Age: {}", age)),
        (None, Some(gender)) => Some(format!("Gender: {}", gender)),
        (Some(age), Some(gender)) => Some(format!("Age: {} | Gender: {}", age, gender)),
    };

    let mut status = Vec::new();
    if let Some(outcome) = &patient.outcome {
        status.push(format!("Outcome: {}", outcome));
    }
    if let Some(medic) = &patient.medic {
        status.push(format!("Medic: {}", medic));
    }
    if let Some(location) = &patient.location {
        status.push(format!("Location: {}", location));
    }
    if let Some(notes) = &patient.treatment_notes {
        status.push(format!("Treatment: {}", notes));
    }

    PatientCard {
        id: patient.id,
        patient_id: patient.patient_id.clone(),
        color: category_color(&patient.triage_category),
        category: patient.triage_category.as_str().to_uppercase(),
        priority: patient.priority,
        score: patient.triage_score,
        time: clock_time(&patient.timestamp),
        vitals: vec![
            ("RR", vital(patient.respiratory_rate)),
            ("HR", vital(patient.pulse)),
            ("BP", vital(patient.systolic_bp)),
            ("Conscious", patient.consciousness.clone()),
        ],
        injuries: format!(
            "{} ({})",
            patient.injury_type.join(", "),
            patient.injury_severity
        ),
        regions: patient.body_regions.join(", "),
        demographics,
        notes: patient.notes.clone(),
        status: (!status.is_empty()).then(|| status.join(" | ")),
        affordances: patient_affordances(patient),
    }
}

fn patient_affordances(patient: &Patient) -> Vec<Affordance> {
    let patient_id = patient.id;
    vec![
        Affordance {
            key: 't',
            label: if patient.treatment_started { "Treating" } else { "Start treatment" },
            intent: Intent::Dispatch(Action::StartTreatment { patient_id }),
        },
        Affordance {
            key: 's',
            label: "Stable",
            intent: Intent::Dispatch(Action::SetOutcome {
                patient_id,
                outcome: Outcome::Stable,
            }),
        },
        Affordance {
            key: 'v',
            label: "Evacuate",
            intent: Intent::Dispatch(Action::SetOutcome {
                patient_id,
                outcome: Outcome::Evacuated,
            }),
        },
    ]
}

fn resource_card(resource: &Resource) -> ResourceCard {
    ResourceCard {
        id: resource.id,
        resource_type: resource.resource_type.clone(),
        label: resource_label(&resource.resource_type),
        current_stock: resource.current_stock,
        critical_level: resource.critical_level,
        critical: resource.is_critical(),
        bar_percent: stock_bar_percent(resource),
        affordances: vec![Affordance {
            key: 'e',
            label: "Update stock",
            intent: Intent::EditStock {
                resource_id: resource.id,
                current: resource.current_stock,
            },
        }],
    }
}

impl PatientCard {
    pub fn affordance(&self, key: char) -> Option<&Affordance> {
        self.affordances.iter().find(|a| a.key == key)
    }
}

impl ResourceCard {
    pub fn affordance(&self, key: char) -> Option<&Affordance> {
        self.affordances.iter().find(|a| a.key == key)
    }
}
