use crate::config::Config;
use crate::dashboard::{self, Dashboard};
use crate::errors::DashboardError;
use crate::models::{DashboardView, PlanDetail, Snapshot, SubscribeResponse};
use crate::source::DataSource;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub source: DataSource,
    pub member_limit: usize,
    pub dashboard: Arc<Mutex<Dashboard>>,
    subscribe_gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(source: DataSource, snapshot: Snapshot, config: &Config) -> Self {
        let dashboard = Dashboard::new(snapshot, config.cost_model.clone(), source.is_remote());
        Self {
            source,
            member_limit: config.member_limit,
            dashboard: Arc::new(Mutex::new(dashboard)),
            subscribe_gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn connect(config: &Config) -> Self {
        let (source, snapshot) = DataSource::connect(config).await;
        Self::new(source, snapshot, config)
    }

    pub async fn view(&self) -> DashboardView {
        let mut view = self.dashboard.lock().await.view();
        if let Some(detail) = view.detail.take() {
            view.detail = Some(self.attach_members(detail).await);
        }
        view
    }

    /// Selects `key` and returns its detail with members from the backend.
    pub async fn select(&self, key: &str) -> Result<PlanDetail, DashboardError> {
        let detail = {
            let mut dashboard = self.dashboard.lock().await;
            let key = dashboard.select_plan(key)?;
            dashboard.detail(&key)?
        };
        Ok(self.attach_members(detail).await)
    }

    async fn attach_members(&self, detail: PlanDetail) -> PlanDetail {
        let Some(api) = self.source.remote() else {
            return dashboard::with_members(detail, None);
        };
        match api.members(&detail.key, self.member_limit).await {
            Ok(members) => dashboard::with_members(detail, Some(members)),
            Err(err) => {
                warn!("unable to load members for {}: {err}", detail.key);
                dashboard::with_members(detail, None)
            }
        }
    }

    /// Validates, forwards to the backend, and swaps in the returned summary.
    /// Failures leave plans and summary untouched.
    pub async fn subscribe(
        &self,
        name: &str,
        plan: Option<&str>,
    ) -> Result<SubscribeResponse, DashboardError> {
        let result = self.try_subscribe(name, plan).await;
        if let Err(err) = &result {
            if !matches!(err, DashboardError::Busy) {
                self.dashboard.lock().await.record_failure(err);
            }
        }
        result
    }

    async fn try_subscribe(
        &self,
        name: &str,
        plan: Option<&str>,
    ) -> Result<SubscribeResponse, DashboardError> {
        let _in_flight = self
            .subscribe_gate
            .try_lock()
            .map_err(|_| DashboardError::Busy)?;

        let (name, key) = self.dashboard.lock().await.prepare_subscription(name, plan)?;
        let api = self.source.remote().ok_or(DashboardError::Offline)?;

        let reply = api.subscribe(&name, &key).await?;
        let response = self.dashboard.lock().await.apply_subscription(&key, reply)?;
        info!("{} subscribed to {}", response.full_name, response.plan);
        Ok(response)
    }

    /// Marks `key` favorite on the backend, or locally when that fails.
    pub async fn mark_favorite(&self, key: &str) -> Result<String, DashboardError> {
        let key = self.dashboard.lock().await.resolve_key(key)?;

        let remote = match self.source.remote() {
            Some(api) => api.set_favorite(&key).await,
            None => Err(DashboardError::Offline),
        };

        let mut dashboard = self.dashboard.lock().await;
        match remote {
            Ok(catalog) if catalog.plans.contains_key(&key) => dashboard.apply_catalog(catalog),
            Ok(_) => {
                warn!("backend catalog is missing {key}, favorite set locally");
                dashboard.mark_favorite_locally(&key)?;
            }
            Err(err) => {
                warn!("favorite set locally: {err}");
                dashboard.mark_favorite_locally(&key)?;
            }
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::models::StatusKind;
    use crate::source::RemoteApi;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn spawn_backend(subscribe_status: StatusCode, subscribe_body: Value) -> String {
        let snapshot = fallback::embedded();
        let members = json!({ "users": [{
            "full_name": "Mara Quill",
            "favorite_genre": "RPG",
            "preferred_device": "Windows PC",
            "hours_per_month": 31
        }]});
        let favorite_catalog = {
            let mut catalog = snapshot.catalog.clone();
            for (key, plan) in catalog.plans.iter_mut() {
                plan.is_favorite = key == "PC";
            }
            catalog
        };

        let app = Router::new()
            .route(
                "/api/users/:plan",
                get(move |Path(_plan): Path<String>| async move { Json(members) }),
            )
            .route(
                "/api/subscribe",
                post(move || async move { (subscribe_status, Json(subscribe_body)) }),
            )
            .route(
                "/api/plans/favorite",
                post(move || async move { Json(favorite_catalog) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn online_state(base_url: String) -> AppState {
        let config = Config::default();
        let api = RemoteApi::new(base_url, &config).unwrap();
        AppState::new(DataSource::Remote(api), fallback::embedded(), &config)
    }

    fn offline_state() -> AppState {
        AppState::new(DataSource::Static, fallback::embedded(), &Config::default())
    }

    #[tokio::test]
    async fn rejected_subscription_keeps_summary_and_reports_message() {
        let base = spawn_backend(StatusCode::BAD_REQUEST, json!({ "error": "plan full" })).await;
        let state = online_state(base).await;
        let before = state.dashboard.lock().await.summary().clone();

        let err = state.subscribe("Ada", Some("PC")).await.unwrap_err();
        assert_eq!(err.to_string(), "plan full");

        let dashboard = state.dashboard.lock().await;
        assert_eq!(dashboard.summary(), &before);
        assert_eq!(dashboard.status().text, "plan full");
        assert_eq!(dashboard.status().kind, StatusKind::Error);
    }

    #[tokio::test]
    async fn error_field_on_success_status_is_a_failure() {
        let base = spawn_backend(StatusCode::OK, json!({ "error": "billing paused" })).await;
        let state = online_state(base).await;

        let err = state.subscribe("Ada", Some("PC")).await.unwrap_err();
        assert!(matches!(err, DashboardError::Application(ref message) if message == "billing paused"));
    }

    #[tokio::test]
    async fn accepted_subscription_swaps_summary() {
        let mut summary = fallback::embedded().summary;
        summary.get_mut("Ultimate").unwrap().count = 2_000;
        let body = json!({
            "status": "ok",
            "plan": "Ultimate",
            "user": { "full_name": "Ada Lovelace" },
            "summary": summary
        });
        let base = spawn_backend(StatusCode::OK, body).await;
        let state = online_state(base).await;

        let response = state.subscribe("Ada Lovelace", Some("ultimate")).await.unwrap();
        assert_eq!(response.plan, "Ultimate");

        let dashboard = state.dashboard.lock().await;
        assert_eq!(dashboard.summary()["Ultimate"].count, 2_000);
        assert_eq!(dashboard.favorite(), Some("Ultimate"));
        assert_eq!(dashboard.status().kind, StatusKind::Success);
    }

    #[tokio::test]
    async fn offline_subscription_never_calls_out() {
        let state = offline_state();
        let err = state.subscribe("Ada", Some("PC")).await.unwrap_err();
        assert!(matches!(err, DashboardError::Offline));
    }

    #[tokio::test]
    async fn concurrent_subscription_is_rejected() {
        let state = offline_state();
        let _held = state.subscribe_gate.lock().await;
        let err = state.subscribe("Ada", Some("PC")).await.unwrap_err();
        assert!(matches!(err, DashboardError::Busy));
    }

    #[tokio::test]
    async fn favorite_uses_backend_catalog() {
        let base = spawn_backend(StatusCode::OK, json!({})).await;
        let state = online_state(base).await;
        assert_eq!(state.mark_favorite("pc").await.unwrap(), "PC");
        assert_eq!(state.dashboard.lock().await.favorite(), Some("PC"));
    }

    #[tokio::test]
    async fn favorite_falls_back_to_local_flag() {
        let state = offline_state();
        state.mark_favorite("Ultimate").await.unwrap();
        let dashboard = state.dashboard.lock().await;
        assert_eq!(dashboard.favorite(), Some("Ultimate"));
        assert_eq!(
            dashboard.catalog().plans.values().filter(|plan| plan.is_favorite).count(),
            1
        );
    }

    #[tokio::test]
    async fn selecting_loads_members() {
        let base = spawn_backend(StatusCode::OK, json!({})).await;
        let state = online_state(base).await;
        let detail = state.select("PC").await.unwrap();
        assert!(detail.members_available);
        assert_eq!(detail.members[0].full_name, "Mara Quill");
        assert_eq!(state.dashboard.lock().await.selected(), Some("PC"));

        let offline = offline_state().select("PC").await.unwrap();
        assert!(!offline.members_available);
        assert!(offline.members.is_empty());
    }
}
