// services/triage-dash/src/export.rs
//
// Snapshot export to a dated JSON document

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use svckit::errors::DashError;
use svckit::types::ExportDocument;

use crate::store::Snapshot;

pub fn document(snapshot: &Snapshot, at: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        stats: snapshot.stats.clone(),
        patients: snapshot.patients.clone(),
        resources: snapshot.resources.clone(),
    }
}

pub fn file_name(at: DateTime<Utc>) -> String {
    format!("triage-data-{}.json", at.format("%Y-%m-%d"))
}

/// Write the snapshot to `<dir>/triage-data-YYYY-MM-DD.json`, replacing any
/// export from earlier the same day.
pub async fn write_snapshot(
    snapshot: &Snapshot,
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf, DashError> {
    let body = serde_json::to_string_pretty(&document(snapshot, at))?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(at));
    tokio::fs::write(&path, body).await?;

    info!(
        "Exported {} patients and {} resources to {}",
        snapshot.patients.len(),
        snapshot.resources.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    use crate::mock::DemoGateway;
    use crate::store::StateStore;

    #[tokio::test]
    async fn test_export_round_trips_store_contents() {
        let store = StateStore::new(Arc::new(DemoGateway::seeded()));
        store.refresh().await;
        let snapshot = store.snapshot().await;

        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let path = write_snapshot(&snapshot, dir.path(), at).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "triage-data-2024-03-01.json");

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ExportDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.patients, snapshot.patients);
        assert_eq!(parsed.resources, snapshot.resources);
        assert_eq!(parsed.stats, snapshot.stats);
        assert_eq!(parsed.timestamp, "2024-03-01T09:30:00.000Z");
    }

    #[tokio::test]
    async fn test_export_preserves_sparse_stats_and_unknown_categories() {
        let mut snapshot = Snapshot::default();
        snapshot.stats.immediate = Some(2);
        snapshot.patients.push(
            serde_json::from_value(serde_json::json!({
                "id": 1,
                "patient_id": "P-9",
                "triage_category": "black",
                "outcome": "deteriorating"
            }))
            .unwrap(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&snapshot, &dir.path().join("exports"), Utc::now())
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["stats"], serde_json::json!({"immediate": 2}));
        assert_eq!(raw["patients"][0]["triage_category"], "black");

        let parsed: ExportDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.patients, snapshot.patients);
        assert_eq!(parsed.stats, snapshot.stats);
    }
}
