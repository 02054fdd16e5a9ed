use crate::errors::AppError;
use crate::models::{
    Analytics, DashboardView, FavoriteRequest, MonthlyPerformance, PlanDetail, SelectQuery,
    SubscribeRequest, SubscribeResponse,
};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Form, Json,
};
use tracing::warn;

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<SelectQuery>,
) -> Html<String> {
    if let Some(plan) = query.plan.as_deref() {
        if let Err(err) = state.dashboard.lock().await.select_plan(plan) {
            warn!("ignoring plan selection: {err}");
        }
    }

    let view = state.view().await;
    let monthly = state.dashboard.lock().await.monthly().clone();
    Html(render_index(&view, &monthly))
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.view().await)
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<PlanDetail>, AppError> {
    Ok(Json(state.select(&key).await?))
}

pub async fn get_analytics(State(state): State<AppState>) -> Json<Analytics> {
    Json(state.dashboard.lock().await.analytics())
}

pub async fn get_monthly(State(state): State<AppState>) -> Json<MonthlyPerformance> {
    Json(state.dashboard.lock().await.monthly().clone())
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let response = state
        .subscribe(&payload.name, payload.plan.as_deref())
        .await?;
    Ok(Json(response))
}

pub async fn favorite(
    State(state): State<AppState>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<DashboardView>, AppError> {
    apply_favorite(&state, &payload.plan).await?;
    Ok(Json(state.view().await))
}

/// Form variant; the outcome is shown in the page's status line.
pub async fn subscribe_form(
    State(state): State<AppState>,
    Form(payload): Form<SubscribeRequest>,
) -> Redirect {
    if let Err(err) = state.subscribe(&payload.name, payload.plan.as_deref()).await {
        warn!("subscribe failed: {err}");
    }
    Redirect::to("/")
}

pub async fn favorite_form(
    State(state): State<AppState>,
    Form(payload): Form<FavoriteRequest>,
) -> Result<Redirect, AppError> {
    apply_favorite(&state, &payload.plan).await?;
    Ok(Redirect::to("/"))
}

async fn apply_favorite(state: &AppState, plan: &str) -> Result<String, AppError> {
    let plan = plan.trim();
    if plan.is_empty() {
        return Err(AppError::bad_request("Plan is required."));
    }
    Ok(state.mark_favorite(plan).await?)
}
