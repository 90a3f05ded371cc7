// services/triage-dash/src/dispatch.rs
//
// Command dispatcher: user-triggered mutations go to the gateway, and a
// successful mutation is followed by exactly one refresh cycle

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use svckit::errors::DashError;
use svckit::metrics;
use svckit::types::{Outcome, PatientInput, PatientPatch, ResourceUpsert};

use crate::export;
use crate::notify::{refresh_notice, Notification};
use crate::store::{RefreshOutcome, StateStore};

/// Every user command, keyed by the entity it targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Refresh,
    StartTreatment { patient_id: i64 },
    SetOutcome { patient_id: i64, outcome: Outcome },
    UpdateStock { resource_id: i64, stock: u32 },
    SubmitPatient(PatientInput),
    Export,
    GenerateReport,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Refresh => "refresh",
            Action::StartTreatment { .. } => "start_treatment",
            Action::SetOutcome { .. } => "set_outcome",
            Action::UpdateStock { .. } => "update_stock",
            Action::SubmitPatient(_) => "submit_patient",
            Action::Export => "export",
            Action::GenerateReport => "generate_report",
        }
    }
}

/// A notification to deliver later, e.g. completion of an external job.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred {
    pub after: Duration,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub action: &'static str,
    pub success: bool,
    pub notices: Vec<Notification>,
    pub refresh: Option<RefreshOutcome>,
    pub deferred: Option<Deferred>,
}

impl CommandReport {
    fn new(action: &'static str, success: bool, notice: Notification) -> Self {
        Self {
            action,
            success,
            notices: vec![notice],
            refresh: None,
            deferred: None,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<StateStore>,
    export_dir: PathBuf,
    report_delay: Duration,
}

impl Dispatcher {
    pub fn new(store: Arc<StateStore>, export_dir: PathBuf, report_delay: Duration) -> Self {
        Self {
            store,
            export_dir,
            report_delay,
        }
    }

    pub async fn dispatch(&self, action: Action) -> CommandReport {
        let name = action.name();
        let report = match action {
            Action::Refresh => {
                let outcome = self.store.refresh().await;
                CommandReport {
                    action: name,
                    success: outcome.reached_backend(),
                    notices: refresh_notice(&outcome).into_iter().collect(),
                    refresh: Some(outcome),
                    deferred: None,
                }
            }
            Action::Export => self.export().await,
            Action::GenerateReport => CommandReport {
                action: name,
                success: true,
                notices: vec![Notification::info("Generating situation report...")],
                refresh: None,
                deferred: Some(Deferred {
                    after: self.report_delay,
                    notification: Notification::success("Report generated successfully"),
                }),
            },
            mutation => {
                let result = self.mutate(&mutation).await;
                self.after_mutation(name, result, failure_message(&mutation)).await
            }
        };

        metrics::record_command(name, report.success);
        report
    }

    async fn mutate(&self, action: &Action) -> Result<String, DashError> {
        let gateway = self.store.gateway();
        match action {
            Action::StartTreatment { patient_id } => {
                gateway
                    .patch_patient(*patient_id, &PatientPatch::start_treatment())
                    .await?;
                Ok("Treatment started".to_string())
            }
            Action::SetOutcome { patient_id, outcome } => {
                if matches!(outcome, Outcome::Other(_)) {
                    return Err(DashError::Validation(format!(
                        "'{}' is not an outcome the dashboard can record",
                        outcome
                    )));
                }
                gateway
                    .patch_patient(*patient_id, &PatientPatch::outcome(outcome.clone()))
                    .await?;
                Ok(format!("Patient marked as {}", outcome))
            }
            Action::UpdateStock { resource_id, stock } => {
                let snapshot = self.store.snapshot().await;
                let resource = snapshot
                    .resources
                    .iter()
                    .find(|r| r.id == *resource_id)
                    .ok_or_else(|| {
                        DashError::Validation(format!("unknown resource id {}", resource_id))
                    })?;
                gateway
                    .upsert_resource(&ResourceUpsert::stock(resource.resource_type.clone(), *stock))
                    .await?;
                Ok("Resource updated".to_string())
            }
            Action::SubmitPatient(input) => {
                let created = gateway.create_patient(input).await?;
                Ok(format!(
                    "Patient {} triaged as {}",
                    created.patient_id,
                    created.category.as_str().to_uppercase()
                ))
            }
            Action::Refresh | Action::Export | Action::GenerateReport => Err(DashError::Validation(
                format!("{} is not a backend mutation", action.name()),
            )),
        }
    }

    async fn after_mutation(
        &self,
        name: &'static str,
        result: Result<String, DashError>,
        failure: &str,
    ) -> CommandReport {
        match result {
            Ok(message) => {
                info!("{}: {}", name, message);
                let outcome = self.store.refresh().await;
                let mut report = CommandReport::new(name, true, Notification::success(message));
                report.notices.extend(refresh_notice(&outcome));
                report.refresh = Some(outcome);
                report
            }
            Err(e) => {
                warn!("{} failed: {}", name, e);
                CommandReport::new(
                    name,
                    false,
                    Notification::error(format!("{}: {}", failure, e.user_message())),
                )
            }
        }
    }

    async fn export(&self) -> CommandReport {
        let snapshot = self.store.snapshot().await;
        match export::write_snapshot(&snapshot, &self.export_dir, Utc::now()).await {
            Ok(path) => CommandReport::new(
                "export",
                true,
                Notification::success(format!("Data exported successfully to {}", path.display())),
            ),
            Err(e) => {
                warn!("Export failed: {}", e);
                CommandReport::new(
                    "export",
                    false,
                    Notification::error(format!("Export failed: {}", e.user_message())),
                )
            }
        }
    }
}

fn failure_message(action: &Action) -> &'static str {
    match action {
        Action::StartTreatment { .. } => "Failed to start treatment",
        Action::SetOutcome { .. } => "Failed to update patient",
        Action::UpdateStock { .. } => "Failed to update resource",
        Action::SubmitPatient(_) => "Failed to add patient",
        Action::Refresh | Action::Export | Action::GenerateReport => "Command failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DemoGateway, Operation};
    use crate::notify::Level;
    use svckit::types::{Consciousness, InjurySeverity};

    async fn setup() -> (Arc<DemoGateway>, Arc<StateStore>, Dispatcher) {
        let gateway = Arc::new(DemoGateway::seeded());
        let store = Arc::new(StateStore::new(gateway.clone()));
        store.refresh().await;
        let dispatcher = Dispatcher::new(
            store.clone(),
            std::env::temp_dir(),
            Duration::from_millis(10),
        );
        (gateway, store, dispatcher)
    }

    #[tokio::test]
    async fn test_minimal_submission_triggers_one_refresh() {
        let (gateway, store, dispatcher) = setup().await;
        let cycles_before = store.cycles();
        let fetches_before = gateway.calls(Operation::FetchPatients).await;

        let input = PatientInput::new(Consciousness::Alert, InjurySeverity::Moderate);
        let report = dispatcher.dispatch(Action::SubmitPatient(input)).await;

        assert!(report.success);
        assert_eq!(report.refresh, Some(RefreshOutcome::Complete));
        assert_eq!(store.cycles(), cycles_before + 1);
        assert_eq!(gateway.calls(Operation::FetchPatients).await, fetches_before + 1);
        assert!(report.notices[0].message.contains("triaged as MINIMAL"));
        assert_eq!(store.snapshot().await.patients.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_untouched() {
        let (gateway, store, dispatcher) = setup().await;
        let before = store.snapshot().await;
        gateway.fail_next(Operation::PatchPatient).await;

        let report = dispatcher
            .dispatch(Action::StartTreatment { patient_id: before.patients[0].id })
            .await;

        assert!(!report.success);
        assert_eq!(report.refresh, None);
        assert_eq!(report.notices.len(), 1);
        assert_eq!(report.notices[0].level, Level::Error);
        assert!(report.notices[0].message.starts_with("Failed to start treatment"));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_outcome_patch_refreshes_queue() {
        let (_gateway, store, dispatcher) = setup().await;
        let target = store.snapshot().await.patients[0].id;

        let report = dispatcher
            .dispatch(Action::SetOutcome { patient_id: target, outcome: Outcome::Evacuated })
            .await;

        assert!(report.success);
        assert_eq!(report.notices[0].message, "Patient marked as evacuated");
        let snapshot = store.snapshot().await;
        assert!(snapshot.patients.iter().all(|p| p.id != target));
        assert_eq!(snapshot.stats.evacuated, Some(1));
    }

    #[tokio::test]
    async fn test_stock_update_resolves_type_from_id() {
        let (_gateway, store, dispatcher) = setup().await;
        let blood = store
            .snapshot()
            .await
            .resources
            .into_iter()
            .find(|r| r.resource_type == "blood_o_neg")
            .unwrap();

        let report = dispatcher
            .dispatch(Action::UpdateStock { resource_id: blood.id, stock: 2 })
            .await;
        assert!(report.success);

        let updated = store
            .snapshot()
            .await
            .resources
            .into_iter()
            .find(|r| r.id == blood.id)
            .unwrap();
        assert_eq!(updated.current_stock, 2);
        assert!(updated.is_critical());
    }

    #[tokio::test]
    async fn test_stock_update_unknown_resource_is_validation_failure() {
        let (gateway, _store, dispatcher) = setup().await;
        let report = dispatcher
            .dispatch(Action::UpdateStock { resource_id: 999, stock: 5 })
            .await;
        assert!(!report.success);
        assert!(report.notices[0].message.contains("unknown resource id 999"));
        assert_eq!(gateway.calls(Operation::UpsertResource).await, 0);
    }

    #[tokio::test]
    async fn test_mutation_with_partial_refresh_reports_both() {
        let (gateway, _store, dispatcher) = setup().await;
        gateway.fail_next(Operation::FetchStats).await;

        let report = dispatcher
            .dispatch(Action::SubmitPatient(PatientInput::new(
                Consciousness::Pain,
                InjurySeverity::Critical,
            )))
            .await;

        assert!(report.success);
        assert_eq!(report.notices.len(), 2);
        assert_eq!(report.notices[1].level, Level::Warn);
        assert!(report.notices[1].message.contains("stats"));
    }

    #[tokio::test]
    async fn test_generate_report_is_deferred() {
        let (_gateway, _store, dispatcher) = setup().await;
        let report = dispatcher.dispatch(Action::GenerateReport).await;
        assert_eq!(report.notices[0].message, "Generating situation report...");
        let deferred = report.deferred.unwrap();
        assert_eq!(deferred.after, Duration::from_millis(10));
        assert_eq!(deferred.notification.message, "Report generated successfully");
    }

    #[tokio::test]
    async fn test_manual_refresh_failure_single_notice() {
        let (gateway, _store, dispatcher) = setup().await;
        for op in [Operation::FetchPatients, Operation::FetchResources, Operation::FetchStats] {
            gateway.fail_next(op).await;
        }
        let report = dispatcher.dispatch(Action::Refresh).await;
        assert!(!report.success);
        assert_eq!(report.notices, vec![Notification::error("Failed to update data")]);
    }
}
