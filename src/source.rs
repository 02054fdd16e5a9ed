use crate::config::Config;
use crate::errors::DashboardError;
use crate::fallback;
use crate::models::{
    Member, MembersPayload, MonthlyPerformance, PlanCatalog, Snapshot,
    SubscribeReply, UsageSummary,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Client for the plan backend.
#[derive(Debug, Clone)]
pub struct RemoteApi {
    base_url: String,
    client: Client,
}

impl RemoteApi {
    pub fn new(base_url: impl Into<String>, config: &Config) -> Result<Self, DashboardError> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|err| DashboardError::NetworkUnavailable(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DashboardError> {
        let response = self.client.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, DashboardError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    pub async fn plans(&self) -> Result<PlanCatalog, DashboardError> {
        self.get_json("/api/plans").await
    }

    pub async fn summary(&self) -> Result<UsageSummary, DashboardError> {
        self.get_json("/api/users/summary").await
    }

    pub async fn monthly(&self) -> Result<MonthlyPerformance, DashboardError> {
        self.get_json("/api/analytics/monthly").await
    }

    /// `base_url` plus `segments`, each percent-encoded as one path segment.
    fn segment_url(&self, segments: &[&str]) -> Result<Url, DashboardError> {
        let invalid =
            || DashboardError::NetworkUnavailable(format!("invalid backend url: {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments.iter().copied());
        Ok(url)
    }

    pub async fn members(&self, plan: &str, limit: usize) -> Result<Vec<Member>, DashboardError> {
        let response = self
            .client
            .get(self.segment_url(&["api", "users", plan])?)
            .query(&[("limit", limit)])
            .send()
            .await?;
        let payload: MembersPayload = decode(response).await?;
        Ok(payload.users)
    }

    pub async fn subscribe(&self, name: &str, plan: &str) -> Result<SubscribeReply, DashboardError> {
        let reply: SubscribeReply = self
            .post_json("/api/subscribe", &json!({ "name": name, "plan": plan }))
            .await?;
        if let Some(message) = reply.error.clone() {
            return Err(DashboardError::Application(message));
        }
        Ok(reply)
    }

    pub async fn set_favorite(&self, plan: &str) -> Result<PlanCatalog, DashboardError> {
        let catalog: PlanCatalog = self
            .post_json("/api/plans/favorite", &json!({ "plan": plan }))
            .await?;
        Ok(catalog.normalized())
    }

    /// Plans, summary and monthly figures as one unit; any failure fails the whole load.
    pub async fn snapshot(&self) -> Result<Snapshot, DashboardError> {
        let (catalog, summary, monthly) =
            tokio::try_join!(self.plans(), self.summary(), self.monthly())?;
        Ok(Snapshot {
            catalog: catalog.normalized(),
            summary,
            monthly,
        })
    }
}

/// Non-2xx replies become `Http` errors carrying the body's `error` text when
/// there is one.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DashboardError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|err| {
            DashboardError::Application(format!("Unexpected response from backend: {err}"))
        });
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("Request failed: {}", status.as_u16()));
    Err(DashboardError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Where the dashboard's data came from, decided once at startup.
#[derive(Debug, Clone)]
pub enum DataSource {
    Remote(RemoteApi),
    Static,
}

impl DataSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, DataSource::Remote(_))
    }

    pub fn remote(&self) -> Option<&RemoteApi> {
        match self {
            DataSource::Remote(api) => Some(api),
            DataSource::Static => None,
        }
    }

    /// Tries the backend when one is configured and swaps in the static
    /// dataset wholesale on any failure.
    pub async fn connect(config: &Config) -> (DataSource, Snapshot) {
        let Some(url) = config.upstream_url.as_deref() else {
            info!("no UPSTREAM_URL configured, serving static data");
            let snapshot = fallback::load_fallback(config.fallback_path.as_deref()).await;
            return (DataSource::Static, snapshot);
        };

        let attempt = match RemoteApi::new(url, config) {
            Ok(api) => api.snapshot().await.map(|snapshot| (api, snapshot)),
            Err(err) => Err(err),
        };

        match attempt {
            Ok((api, snapshot)) => {
                info!(
                    "loaded {} plans from {}",
                    snapshot.catalog.order.len(),
                    api.base_url()
                );
                (DataSource::Remote(api), snapshot)
            }
            Err(err) => {
                warn!("falling back to static data: {err}");
                (
                    DataSource::Static,
                    fallback::load_fallback(config.fallback_path.as_deref()).await,
                )
            }
        }
    }
}
