use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PlanTable = BTreeMap<String, Plan>;
pub type UsageSummary = BTreeMap<String, PlanUsage>;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Plan {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub best_for: String,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub hours_range: [f64; 2],
    #[serde(default)]
    pub perks: Vec<String>,
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl Plan {
    pub fn has_feature(&self, key: &str) -> bool {
        self.features.get(key).copied().unwrap_or(false)
    }

    pub fn average_hours(&self) -> f64 {
        (self.hours_range[0] + self.hours_range[1]) / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlanCatalog {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub plans: PlanTable,
}

impl PlanCatalog {
    /// Drops unknown and repeated keys from `order`; an empty order falls
    /// back to the table's key order.
    pub fn normalized(mut self) -> Self {
        if self.order.is_empty() {
            self.order = self.plans.keys().cloned().collect();
            return self;
        }

        let mut seen = Vec::with_capacity(self.order.len());
        for key in self.order {
            if self.plans.contains_key(&key) && !seen.contains(&key) {
                seen.push(key);
            }
        }
        self.order = seen;
        self
    }

    pub fn favorite(&self) -> Option<&str> {
        self.order
            .iter()
            .find(|key| self.plans.get(*key).is_some_and(|plan| plan.is_favorite))
            .map(String::as_str)
    }

    /// Case-insensitive lookup returning the canonical key.
    pub fn resolve_key(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        self.plans
            .get_key_value(key)
            .or_else(|| {
                self.plans
                    .iter()
                    .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            })
            .map(|(candidate, _)| candidate.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlanUsage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub avg_hours: f64,
    #[serde(default)]
    pub top_genres: Vec<String>,
    #[serde(default)]
    pub top_devices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlanMonth {
    #[serde(default)]
    pub users: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_hours: Option<f64>,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MonthRecord {
    pub month: String,
    #[serde(default)]
    pub plans: BTreeMap<String, PlanMonth>,
    #[serde(default)]
    pub total_profit: f64,
    #[serde(default)]
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MonthlyPerformance {
    #[serde(default)]
    pub months: Vec<MonthRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamer_tag: Option<String>,
    #[serde(default)]
    pub favorite_genre: String,
    #[serde(default)]
    pub preferred_device: String,
    #[serde(default)]
    pub hours_per_month: f64,
}

#[derive(Debug, Deserialize)]
pub struct MembersPayload {
    #[serde(default)]
    pub users: Vec<Member>,
}

/// One full load of upstream data, swapped in as a unit.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Snapshot {
    pub catalog: PlanCatalog,
    pub summary: UsageSummary,
    #[serde(default)]
    pub monthly: MonthlyPerformance,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub plan: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectQuery {
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribedUser {
    pub full_name: String,
}

/// Upstream reply to `POST /api/subscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeReply {
    #[serde(default)]
    pub error: Option<String>,
    pub user: Option<SubscribedUser>,
    pub plan: Option<String>,
    pub summary: Option<UsageSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    pub full_name: String,
    pub plan: String,
    pub message: String,
    pub summary: UsageSummary,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanShare {
    pub plan: String,
    pub count: u64,
    pub avg_hours: f64,
    pub share: f64,
    pub percent: String,
    pub community_hours: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analytics {
    pub total_members: u64,
    pub plans: Vec<PlanShare>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub feature: String,
    pub label: String,
    pub included: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Capability {
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Experience {
    pub welcome: String,
    pub copy: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanDetail {
    pub key: String,
    pub plan: Plan,
    pub differences: Vec<String>,
    pub usage: Option<PlanUsage>,
    pub capabilities: Vec<Capability>,
    pub experience: Experience,
    pub members: Vec<Member>,
    pub members_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub backend_online: bool,
    pub loaded_at: String,
    pub order: Vec<String>,
    pub plans: Vec<Plan>,
    pub favorite: Option<String>,
    pub selected: Option<String>,
    pub detail: Option<PlanDetail>,
    pub comparison: Vec<ComparisonRow>,
    pub analytics: Analytics,
    pub status: StatusLine,
}
