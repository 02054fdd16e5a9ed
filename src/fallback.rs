use crate::models::Snapshot;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

const EMBEDDED: &str = include_str!("../data/fallback.json");

pub fn embedded() -> Snapshot {
    match serde_json::from_str::<Snapshot>(EMBEDDED) {
        Ok(snapshot) => normalize(snapshot),
        Err(err) => {
            error!("embedded fallback data is invalid: {err}");
            Snapshot::default()
        }
    }
}

/// Static dataset used when the backend cannot be reached. A file at `path`
/// replaces the embedded copy; read or parse failures fall back to it.
pub async fn load_fallback(path: Option<&Path>) -> Snapshot {
    let Some(path) = path else {
        return embedded();
    };

    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                info!("loaded fallback data from {}", path.display());
                normalize(snapshot)
            }
            Err(err) => {
                error!("failed to parse fallback file: {err}");
                embedded()
            }
        },
        Err(err) => {
            error!("failed to read fallback file: {err}");
            embedded()
        }
    }
}

fn normalize(mut snapshot: Snapshot) -> Snapshot {
    snapshot.catalog = snapshot.catalog.normalized();
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_data_has_three_ordered_plans() {
        let snapshot = embedded();
        assert_eq!(snapshot.catalog.order, vec!["Core", "PC", "Ultimate"]);
        assert_eq!(snapshot.summary["Core"].count, 400);
        assert_eq!(snapshot.monthly.months.len(), 12);
        assert!(snapshot.monthly.months.iter().all(|month| month
            .plans
            .values()
            .all(|plan| plan.profit.is_none())));
    }

    #[tokio::test]
    async fn unreadable_file_uses_embedded_copy() {
        let path = std::env::temp_dir().join("plan_dashboard_missing_fallback.json");
        let snapshot = load_fallback(Some(&path)).await;
        assert_eq!(snapshot, embedded());
    }

    #[tokio::test]
    async fn file_replaces_embedded_copy() {
        let mut path = std::env::temp_dir();
        path.push(format!("plan_dashboard_fallback_{}.json", std::process::id()));
        let payload = serde_json::json!({
            "catalog": { "plans": { "Solo": { "name": "Solo", "price": 3.5 } } },
            "summary": { "Solo": { "count": 2 } }
        });
        fs::write(&path, payload.to_string()).await.unwrap();

        let snapshot = load_fallback(Some(&path)).await;
        let _ = fs::remove_file(&path).await;
        assert_eq!(snapshot.catalog.order, vec!["Solo"]);
        assert_eq!(snapshot.summary["Solo"].count, 2);
        assert!(snapshot.monthly.months.is_empty());
    }
}
