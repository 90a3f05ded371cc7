// services/triage-dash/tests/refresh_cycle.rs
//
// Store + dispatcher + view driven end to end against the demo backend

use std::sync::Arc;
use std::time::Duration;

use svckit::types::{Consciousness, InjurySeverity, Outcome, PatientInput};
use triage_dash::derive::PatientFilter;
use triage_dash::mock::Operation;
use triage_dash::notify::{refresh_notice, Level};
use triage_dash::view::{build_view, Intent};
use triage_dash::{Action, DemoGateway, Dispatcher, RefreshOutcome, StateStore};

struct Harness {
    gateway: Arc<DemoGateway>,
    store: Arc<StateStore>,
    dispatcher: Dispatcher,
    export_dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let gateway = Arc::new(DemoGateway::seeded());
    let store = Arc::new(StateStore::new(gateway.clone()));
    let export_dir = tempfile::tempdir().unwrap();
    let dispatcher = Dispatcher::new(
        store.clone(),
        export_dir.path().to_path_buf(),
        Duration::from_millis(1),
    );
    assert_eq!(store.refresh().await, RefreshOutcome::Complete);
    Harness {
        gateway,
        store,
        dispatcher,
        export_dir,
    }
}

#[tokio::test]
async fn resource_outage_keeps_last_known_stock_panel() {
    let h = harness().await;
    let before = build_view(&h.store.snapshot().await, PatientFilter::All);

    h.dispatcher
        .dispatch(Action::SubmitPatient(PatientInput::new(
            Consciousness::Unresponsive,
            InjurySeverity::Critical,
        )))
        .await;
    h.gateway.set_failing(Operation::FetchResources, true).await;

    let outcome = h.store.refresh().await;
    let notice = refresh_notice(&outcome).unwrap();
    assert_eq!(notice.level, Level::Warn);
    assert!(notice.message.contains("resources"));

    let after = build_view(&h.store.snapshot().await, PatientFilter::All);
    assert_eq!(after.resources, before.resources);
    assert_eq!(after.queue.len(), before.queue.len() + 1);
    assert_ne!(after.stats_bar, before.stats_bar);
}

#[tokio::test]
async fn queue_affordance_round_trip() {
    let h = harness().await;
    let view = build_view(&h.store.snapshot().await, PatientFilter::Immediate);
    let card = &view.queue[0];

    let action = match &card.affordance('v').unwrap().intent {
        Intent::Dispatch(action) => action.clone(),
        other => panic!("unexpected intent {:?}", other),
    };
    assert_eq!(
        action,
        Action::SetOutcome {
            patient_id: card.id,
            outcome: Outcome::Evacuated
        }
    );

    let report = h.dispatcher.dispatch(action).await;
    assert!(report.success);

    let view = build_view(&h.store.snapshot().await, PatientFilter::All);
    assert!(view.queue.iter().all(|c| c.id != card.id));
    let treatment: Vec<(&str, u64)> = view
        .stats_panel
        .treatment
        .iter()
        .map(|t| (t.label, t.value))
        .collect();
    assert_eq!(treatment, vec![("Treated", 0), ("Evacuated", 1), ("Deceased", 0)]);
}

#[tokio::test]
async fn draining_stock_raises_alert_banner() {
    let h = harness().await;
    assert!(build_view(&h.store.snapshot().await, PatientFilter::All).alert.is_none());

    let oxygen = h
        .store
        .snapshot()
        .await
        .resources
        .into_iter()
        .find(|r| r.resource_type == "oxygen")
        .unwrap();
    let report = h
        .dispatcher
        .dispatch(Action::UpdateStock { resource_id: oxygen.id, stock: 10 })
        .await;
    assert!(report.success);
    assert_eq!(report.notices[0].message, "Resource updated");

    let view = build_view(&h.store.snapshot().await, PatientFilter::All);
    assert_eq!(view.alert.unwrap().resource_types, vec!["oxygen"]);
}

#[tokio::test]
async fn export_reflects_latest_refresh() {
    let h = harness().await;
    let report = h.dispatcher.dispatch(Action::Export).await;
    assert!(report.success);
    assert!(report.notices[0].message.starts_with("Data exported successfully"));

    let path = std::fs::read_dir(h.export_dir.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let exported: svckit::types::ExportDocument =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let snapshot = h.store.snapshot().await;
    assert_eq!(exported.patients, snapshot.patients);
    assert_eq!(exported.resources, snapshot.resources);
    assert_eq!(exported.stats, snapshot.stats);
}

#[tokio::test]
async fn backend_outage_then_recovery() {
    let h = harness().await;
    let before = h.store.snapshot().await;
    for op in [Operation::FetchPatients, Operation::FetchResources, Operation::FetchStats] {
        h.gateway.set_failing(op, true).await;
    }

    let report = h.dispatcher.dispatch(Action::Refresh).await;
    assert!(!report.success);
    assert_eq!(report.notices.len(), 1);
    assert_eq!(h.store.snapshot().await, before);

    for op in [Operation::FetchPatients, Operation::FetchResources, Operation::FetchStats] {
        h.gateway.set_failing(op, false).await;
    }
    let report = h.dispatcher.dispatch(Action::Refresh).await;
    assert!(report.success);
    assert!(report.notices.is_empty());
    assert_eq!(report.refresh, Some(RefreshOutcome::Complete));
}
