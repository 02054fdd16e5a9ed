use crate::errors::DashboardError;
use crate::insight::{self, CostModel};
use crate::models::{
    Analytics, Capability, ComparisonRow, DashboardView, Experience, Member, MonthlyPerformance,
    Plan, PlanCatalog, PlanDetail, PlanUsage, Snapshot, StatusKind, StatusLine, SubscribeReply,
    SubscribeResponse, UsageSummary,
};
use chrono::{DateTime, Local};

/// All dashboard state, replaced wholesale on load, subscribe and favorite.
#[derive(Debug, Clone)]
pub struct Dashboard {
    catalog: PlanCatalog,
    summary: UsageSummary,
    monthly: MonthlyPerformance,
    cost_model: CostModel,
    favorite: Option<String>,
    selected: Option<String>,
    backend_online: bool,
    status: StatusLine,
    loaded_at: DateTime<Local>,
}

impl Dashboard {
    pub fn new(snapshot: Snapshot, cost_model: CostModel, backend_online: bool) -> Self {
        let mut dashboard = Self {
            catalog: snapshot.catalog.normalized(),
            summary: snapshot.summary,
            monthly: snapshot.monthly,
            cost_model,
            favorite: None,
            selected: None,
            backend_online,
            status: StatusLine {
                text: String::new(),
                kind: StatusKind::Info,
            },
            loaded_at: Local::now(),
        };

        insight::apply_cost_model(
            &mut dashboard.monthly,
            &dashboard.catalog.plans,
            &dashboard.cost_model,
        );
        dashboard.refresh_favorite();
        dashboard.selected = dashboard
            .favorite
            .clone()
            .or_else(|| dashboard.catalog.order.first().cloned());
        dashboard.status = dashboard.ready_status();
        dashboard
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn summary(&self) -> &UsageSummary {
        &self.summary
    }

    pub fn monthly(&self) -> &MonthlyPerformance {
        &self.monthly
    }

    pub fn favorite(&self) -> Option<&str> {
        self.favorite.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn analytics(&self) -> Analytics {
        insight::aggregate(&self.catalog.order, &self.summary)
    }

    pub fn comparison(&self) -> Vec<ComparisonRow> {
        insight::comparison_table(&self.catalog.plans, &self.catalog.order)
    }

    fn refresh_favorite(&mut self) {
        self.favorite = insight::select_favorite(
            &self.catalog.order,
            &self.summary,
            &mut self.catalog.plans,
        );
    }

    pub fn resolve_key(&self, key: &str) -> Result<String, DashboardError> {
        self.catalog
            .resolve_key(key)
            .map(str::to_string)
            .ok_or_else(|| DashboardError::UnknownPlan(key.trim().to_string()))
    }

    pub fn select_plan(&mut self, key: &str) -> Result<String, DashboardError> {
        let key = self.resolve_key(key)?;
        self.selected = Some(key.clone());
        self.status = self.ready_status();
        Ok(key)
    }

    fn ready_status(&self) -> StatusLine {
        if !self.backend_online {
            return status(StatusKind::Error, "Start the backend server to enable subscriptions.");
        }
        match self.selected.as_deref().and_then(|key| self.catalog.plans.get(key)) {
            Some(_) => status(StatusKind::Info, "Enter your gamer name to join instantly."),
            None => status(StatusKind::Info, "Pick a plan to enable subscriptions."),
        }
    }

    /// Everything shown in the selected-plan panel except the member list,
    /// which comes from the backend.
    pub fn detail(&self, key: &str) -> Result<PlanDetail, DashboardError> {
        let key = self.resolve_key(key)?;
        let plan = self.catalog.plans[&key].clone();
        let usage = self.summary.get(&key).cloned();

        let capabilities = insight::feature_matrix(&self.catalog.plans, &self.catalog.order)
            .into_iter()
            .map(|feature| Capability {
                enabled: plan.has_feature(&feature.key),
                label: feature.label,
            })
            .collect();

        Ok(PlanDetail {
            differences: insight::compute_differences(
                &key,
                &self.catalog.plans,
                &self.catalog.order,
            ),
            experience: experience(&plan, usage.as_ref()),
            capabilities,
            usage,
            members: Vec::new(),
            members_available: false,
            plan,
            key,
        })
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            backend_online: self.backend_online,
            loaded_at: self.loaded_at.to_rfc3339(),
            order: self.catalog.order.clone(),
            plans: self
                .catalog
                .order
                .iter()
                .filter_map(|key| self.catalog.plans.get(key).cloned())
                .collect(),
            favorite: self.favorite.clone(),
            selected: self.selected.clone(),
            detail: self.selected.as_deref().and_then(|key| self.detail(key).ok()),
            comparison: self.comparison(),
            analytics: self.analytics(),
            status: self.status.clone(),
        }
    }

    /// Checks a subscribe request before any network call: backend online,
    /// a plan chosen (the selection by default), a non-blank name.
    pub fn prepare_subscription(
        &self,
        name: &str,
        plan: Option<&str>,
    ) -> Result<(String, String), DashboardError> {
        if !self.backend_online {
            return Err(DashboardError::Offline);
        }
        let plan = plan
            .map(str::trim)
            .filter(|plan| !plan.is_empty())
            .or(self.selected.as_deref())
            .ok_or_else(|| DashboardError::Validation("Select a plan before subscribing.".into()))?;
        let key = self.resolve_key(plan)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(DashboardError::Validation("Please enter your name.".into()));
        }
        Ok((name.to_string(), key))
    }

    /// Swaps in the summary from a successful subscribe reply. Nothing changes
    /// when the reply is incomplete.
    pub fn apply_subscription(
        &mut self,
        requested_plan: &str,
        reply: SubscribeReply,
    ) -> Result<SubscribeResponse, DashboardError> {
        let summary = reply.summary.ok_or_else(|| {
            DashboardError::Application("Backend reply is missing the usage summary.".into())
        })?;
        let full_name = reply
            .user
            .map(|user| user.full_name)
            .ok_or_else(|| DashboardError::Application("Backend reply is missing the user.".into()))?;
        let plan = reply.plan.unwrap_or_else(|| requested_plan.to_string());

        self.summary = summary;
        self.refresh_favorite();

        let message = format!("Welcome, {full_name}! You're now part of {plan}.");
        self.status = status(StatusKind::Success, &message);
        Ok(SubscribeResponse {
            full_name,
            plan,
            message,
            summary: self.summary.clone(),
        })
    }

    pub fn record_failure(&mut self, err: &DashboardError) {
        self.status = status(StatusKind::Error, &err.to_string());
    }

    /// Replaces the catalog with the backend's copy after a favorite change.
    pub fn apply_catalog(&mut self, catalog: PlanCatalog) {
        let catalog = catalog.normalized();
        let favorite = catalog.favorite().map(str::to_string);
        self.catalog = catalog;
        insight::mark_favorite(&mut self.catalog.plans, favorite.as_deref());
        self.favorite = favorite;
        if self
            .selected
            .as_deref()
            .is_none_or(|key| !self.catalog.plans.contains_key(key))
        {
            self.selected = self.favorite.clone().or_else(|| self.catalog.order.first().cloned());
        }
    }

    pub fn mark_favorite_locally(&mut self, key: &str) -> Result<String, DashboardError> {
        let key = self.resolve_key(key)?;
        insight::mark_favorite(&mut self.catalog.plans, Some(&key));
        self.favorite = Some(key.clone());
        Ok(key)
    }
}

fn status(kind: StatusKind, text: &str) -> StatusLine {
    StatusLine {
        text: text.to_string(),
        kind,
    }
}

fn experience(plan: &Plan, usage: Option<&PlanUsage>) -> Experience {
    let members = usage.map_or_else(|| "hundreds of".to_string(), |usage| format_count(usage.count));
    let avg_hours = usage.map_or_else(
        || "fresh sessions every week".to_string(),
        |usage| format!("{} hrs/month", usage.avg_hours),
    );
    let genres = usage
        .filter(|usage| !usage.top_genres.is_empty())
        .map_or_else(|| "mixed genres".to_string(), |usage| usage.top_genres.join(", "));
    let perks = plan.perks.iter().take(2).cloned().collect::<Vec<_>>().join(" & ");
    let perks = if perks.is_empty() {
        "exclusive launch titles".to_string()
    } else {
        perks
    };

    Experience {
        welcome: format!("Welcome to the {} community", plan.name),
        copy: format!("You now stand alongside {members} players. {}", plan.best_for),
        actions: vec![
            format!("Jump into {} immediately.", plan.devices.join(", ")),
            format!("Average playtime: {avg_hours}."),
            format!("Popular genres here: {genres}."),
            format!("Claim perks such as {perks}."),
        ],
    }
}

/// `1234567` -> `1,234,567`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Attaches a member list fetched for `detail`.
pub fn with_members(mut detail: PlanDetail, members: Option<Vec<Member>>) -> PlanDetail {
    detail.members_available = members.is_some();
    detail.members = members.unwrap_or_default();
    detail
}
