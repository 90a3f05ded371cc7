// services/triage-dash/src/mock.rs
//
// In-memory triage backend for demo mode and tests

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use rand::Rng;
use tokio::sync::Mutex;

use svckit::errors::DashError;
use svckit::types::{
    Consciousness, CreatedPatient, InjurySeverity, Outcome, Patient, PatientInput, PatientPatch,
    Resource, ResourceUpsert, Stats, TriageCategory,
};

use crate::gateway::TriageGateway;

/// Gateway operations, used to inject faults and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchPatients,
    FetchResources,
    FetchStats,
    CreatePatient,
    PatchPatient,
    UpsertResource,
}

const DEFAULT_CRITICAL_LEVEL: u32 = 10;

struct DemoBackend {
    patients: Vec<Patient>,
    resources: Vec<Resource>,
    next_patient_id: i64,
    next_resource_id: i64,
}

#[derive(Default)]
struct Faults {
    failing: HashSet<Operation>,
    fail_next: HashSet<Operation>,
    calls: HashMap<Operation, usize>,
}

pub struct DemoGateway {
    backend: Mutex<DemoBackend>,
    faults: Mutex<Faults>,
    latency: Option<Duration>,
    live: bool,
}

impl DemoGateway {
    /// Empty backend.
    pub fn empty() -> Self {
        Self::from_backend(DemoBackend::new())
    }

    /// Backend seeded with the standard field-hospital stock list and a few
    /// casualties.
    pub fn seeded() -> Self {
        let mut backend = DemoBackend::new();
        for (resource_type, stock, critical) in [
            ("oxygen", 50, 10),
            ("morphine", 30, 5),
            ("blood_o_neg", 20, 3),
            ("saline", 100, 20),
            ("gauze", 200, 50),
            ("antibiotics", 40, 8),
        ] {
            backend.upsert(&ResourceUpsert {
                resource_type: resource_type.to_string(),
                current_stock: stock,
                critical_level: Some(critical),
                location: None,
            });
        }

        let mut blast = PatientInput::new(Consciousness::Pain, InjurySeverity::Critical);
        blast.patient_id = Some("P-0001".to_string());
        blast.respiratory_rate = Some(34);
        blast.pulse = Some(130);
        blast.systolic_bp = Some(82);
        blast.can_walk = Some(false);
        blast.injury_type = vec!["blast".to_string(), "burn".to_string()];
        blast.body_regions = vec!["chest".to_string(), "arms".to_string()];
        blast.notes = Some("Tourniquet applied left arm".to_string());
        backend.create(&blast);

        let mut fracture = PatientInput::new(Consciousness::Alert, InjurySeverity::Severe);
        fracture.patient_id = Some("P-0002".to_string());
        fracture.respiratory_rate = Some(22);
        fracture.pulse = Some(104);
        fracture.can_walk = Some(false);
        fracture.injury_type = vec!["fracture".to_string()];
        fracture.body_regions = vec!["legs".to_string()];
        fracture.estimated_age = Some(42);
        fracture.gender = Some("male".to_string());
        backend.create(&fracture);

        let mut walking = PatientInput::new(Consciousness::Alert, InjurySeverity::Minor);
        walking.patient_id = Some("P-0003".to_string());
        walking.respiratory_rate = Some(16);
        walking.can_walk = Some(true);
        walking.injury_type = vec!["laceration".to_string()];
        walking.body_regions = vec!["head".to_string()];
        backend.create(&walking);

        Self::from_backend(backend)
    }

    fn from_backend(backend: DemoBackend) -> Self {
        Self {
            backend: Mutex::new(backend),
            faults: Mutex::new(Faults::default()),
            latency: None,
            live: false,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Drain stock a little on every resource fetch so demo mode shows movement.
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    pub async fn set_failing(&self, operation: Operation, failing: bool) {
        let mut faults = self.faults.lock().await;
        if failing {
            faults.failing.insert(operation);
        } else {
            faults.failing.remove(&operation);
        }
    }

    pub async fn fail_next(&self, operation: Operation) {
        self.faults.lock().await.fail_next.insert(operation);
    }

    pub async fn calls(&self, operation: Operation) -> usize {
        self.faults
            .lock()
            .await
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    async fn enter(&self, operation: Operation) -> Result<(), DashError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut faults = self.faults.lock().await;
        *faults.calls.entry(operation).or_insert(0) += 1;
        if faults.fail_next.remove(&operation) || faults.failing.contains(&operation) {
            return Err(DashError::Network(format!(
                "{:?} failed: HTTP 503 Service Unavailable",
                operation
            )));
        }
        Ok(())
    }
}

impl Default for DemoGateway {
    fn default() -> Self {
        Self::seeded()
    }
}

impl DemoBackend {
    fn new() -> Self {
        Self {
            patients: Vec::new(),
            resources: Vec::new(),
            next_patient_id: 1,
            next_resource_id: 1,
        }
    }

    fn create(&mut self, input: &PatientInput) -> CreatedPatient {
        let (category, score) = demo_category(input);
        let id = self.next_patient_id;
        self.next_patient_id += 1;

        let patient_id = input
            .patient_id
            .clone()
            .unwrap_or_else(|| format!("P{}", Local::now().timestamp() + id));
        let now = Local::now().naive_local();

        self.patients.push(Patient {
            id,
            patient_id: patient_id.clone(),
            timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            respiratory_rate: input.respiratory_rate,
            pulse: input.pulse,
            systolic_bp: input.systolic_bp,
            consciousness: input.consciousness.as_str().to_string(),
            can_walk: input.can_walk.unwrap_or(true),
            injury_type: input.injury_type.clone(),
            injury_severity: input.injury_severity.as_str().to_string(),
            body_regions: input.body_regions.clone(),
            estimated_age: input.estimated_age,
            gender: input.gender.clone(),
            triage_category: category.clone(),
            triage_score: score,
            priority: score,
            treatment_started: false,
            treatment_notes: None,
            outcome: None,
            notes: input.notes.clone(),
            location: input.location.clone(),
            medic: input.medic.clone(),
        });

        CreatedPatient {
            patient_id,
            category,
            score: Some(score),
            priority: Some(score),
        }
    }

    fn patch(&mut self, id: i64, patch: &PatientPatch) -> Result<(), DashError> {
        let patient = self
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| {
                DashError::Network(format!("PATCH /api/patients/{} failed: HTTP 404 Not Found", id))
            })?;
        if let Some(started) = patch.treatment_started {
            patient.treatment_started = started;
        }
        if let Some(notes) = &patch.treatment_notes {
            patient.treatment_notes = Some(notes.clone());
        }
        if let Some(outcome) = &patch.outcome {
            patient.outcome = Some(outcome.clone());
        }
        Ok(())
    }

    fn upsert(&mut self, upsert: &ResourceUpsert) {
        let now = Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string();
        if let Some(resource) = self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == upsert.resource_type)
        {
            resource.current_stock = upsert.current_stock;
            resource.last_updated = Some(now);
            if let Some(level) = upsert.critical_level {
                resource.critical_level = level;
            }
            if upsert.location.is_some() {
                resource.location = upsert.location.clone();
            }
            return;
        }

        let id = self.next_resource_id;
        self.next_resource_id += 1;
        self.resources.push(Resource {
            id,
            resource_type: upsert.resource_type.clone(),
            current_stock: upsert.current_stock,
            critical_level: upsert.critical_level.unwrap_or(DEFAULT_CRITICAL_LEVEL),
            last_updated: Some(now),
            location: upsert.location.clone(),
        });
    }

    fn is_active(patient: &Patient) -> bool {
        !matches!(patient.outcome, Some(Outcome::Deceased) | Some(Outcome::Evacuated))
    }

    /// Active patients, highest priority first, then by arrival.
    fn queue(&self) -> Vec<Patient> {
        let mut active: Vec<Patient> = self
            .patients
            .iter()
            .filter(|p| Self::is_active(p))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.priority.cmp(&a.priority));
        active
    }

    fn stats(&self) -> Stats {
        let active: Vec<&Patient> = self.patients.iter().filter(|p| Self::is_active(p)).collect();
        let count = |category: TriageCategory| {
            active.iter().filter(|p| p.triage_category == category).count() as u64
        };
        let with_outcome = |outcome: Outcome| {
            self.patients
                .iter()
                .filter(|p| p.outcome.as_ref() == Some(&outcome))
                .count() as u64
        };

        Stats {
            immediate: Some(count(TriageCategory::Immediate)),
            delayed: Some(count(TriageCategory::Delayed)),
            minimal: Some(count(TriageCategory::Minimal)),
            expectant: Some(count(TriageCategory::Expectant)),
            total: Some(active.len() as u64),
            treated: Some(self.patients.iter().filter(|p| p.treatment_started).count() as u64),
            evacuated: Some(with_outcome(Outcome::Evacuated)),
            deceased: Some(with_outcome(Outcome::Deceased)),
        }
    }

    fn drain_stock(&mut self) {
        let mut rng = rand::thread_rng();
        for resource in &mut self.resources {
            if resource.current_stock > 0 && rng.gen_ratio(1, 4) {
                resource.current_stock -= 1;
            }
        }
    }
}

/// Stand-in for the backend's scoring service so demo data has categories.
fn demo_category(input: &PatientInput) -> (TriageCategory, i64) {
    if input.respiratory_rate == Some(0) {
        return (TriageCategory::Expectant, 0);
    }
    let score = match input.injury_severity {
        InjurySeverity::Critical => 90,
        InjurySeverity::Severe => 60,
        InjurySeverity::Moderate => 30,
        InjurySeverity::Minor => 10,
    } + match input.consciousness {
        Consciousness::Unresponsive => 30,
        Consciousness::Pain => 20,
        Consciousness::Voice => 10,
        Consciousness::Alert => 0,
    };
    let category = match score {
        s if s >= 80 => TriageCategory::Immediate,
        s if s >= 50 => TriageCategory::Delayed,
        _ => TriageCategory::Minimal,
    };
    (category, score)
}

#[async_trait]
impl TriageGateway for DemoGateway {
    async fn fetch_patients(&self) -> Result<Vec<Patient>, DashError> {
        self.enter(Operation::FetchPatients).await?;
        Ok(self.backend.lock().await.queue())
    }

    async fn fetch_resources(&self) -> Result<Vec<Resource>, DashError> {
        self.enter(Operation::FetchResources).await?;
        let mut backend = self.backend.lock().await;
        if self.live {
            backend.drain_stock();
        }
        Ok(backend.resources.clone())
    }

    async fn fetch_stats(&self) -> Result<Stats, DashError> {
        self.enter(Operation::FetchStats).await?;
        Ok(self.backend.lock().await.stats())
    }

    async fn create_patient(&self, input: &PatientInput) -> Result<CreatedPatient, DashError> {
        self.enter(Operation::CreatePatient).await?;
        Ok(self.backend.lock().await.create(input))
    }

    async fn patch_patient(&self, id: i64, patch: &PatientPatch) -> Result<(), DashError> {
        self.enter(Operation::PatchPatient).await?;
        self.backend.lock().await.patch(id, patch)
    }

    async fn upsert_resource(&self, upsert: &ResourceUpsert) -> Result<(), DashError> {
        self.enter(Operation::UpsertResource).await?;
        self.backend.lock().await.upsert(upsert);
        Ok(())
    }

    fn name(&self) -> &str {
        "demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_backend() {
        let gateway = DemoGateway::seeded();
        let resources = gateway.fetch_resources().await.unwrap();
        assert_eq!(resources.len(), 6);
        assert_eq!(resources[2].resource_type, "blood_o_neg");
        assert_eq!(resources[2].critical_level, 3);

        let patients = gateway.fetch_patients().await.unwrap();
        assert_eq!(patients.len(), 3);
        assert!(patients.windows(2).all(|w| w[0].priority >= w[1].priority));

        let stats = gateway.fetch_stats().await.unwrap();
        assert_eq!(stats.total, Some(3));
    }

    #[tokio::test]
    async fn test_outcome_removes_patient_from_queue() {
        let gateway = DemoGateway::seeded();
        let first = gateway.fetch_patients().await.unwrap()[0].id;

        gateway
            .patch_patient(first, &PatientPatch::outcome(Outcome::Evacuated))
            .await
            .unwrap();

        let patients = gateway.fetch_patients().await.unwrap();
        assert!(patients.iter().all(|p| p.id != first));
        let stats = gateway.fetch_stats().await.unwrap();
        assert_eq!(stats.evacuated, Some(1));
        assert_eq!(stats.total, Some(2));
    }

    #[tokio::test]
    async fn test_upsert_creates_unknown_type() {
        let gateway = DemoGateway::empty();
        gateway
            .upsert_resource(&ResourceUpsert::stock("tourniquets", 12))
            .await
            .unwrap();
        gateway
            .upsert_resource(&ResourceUpsert::stock("tourniquets", 4))
            .await
            .unwrap();

        let resources = gateway.fetch_resources().await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].current_stock, 4);
        assert_eq!(resources[0].critical_level, DEFAULT_CRITICAL_LEVEL);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let gateway = DemoGateway::seeded();
        gateway.fail_next(Operation::FetchStats).await;

        assert!(gateway.fetch_stats().await.is_err());
        assert!(gateway.fetch_stats().await.is_ok());
        assert_eq!(gateway.calls(Operation::FetchStats).await, 2);

        gateway.set_failing(Operation::FetchPatients, true).await;
        assert!(gateway.fetch_patients().await.is_err());
        assert!(gateway.fetch_patients().await.is_err());
        gateway.set_failing(Operation::FetchPatients, false).await;
        assert!(gateway.fetch_patients().await.is_ok());
    }

    #[tokio::test]
    async fn test_patch_unknown_patient() {
        let gateway = DemoGateway::empty();
        let err = gateway
            .patch_patient(99, &PatientPatch::start_treatment())
            .await
            .unwrap_err();
        assert!(err.user_message().contains("404"));
    }
}
