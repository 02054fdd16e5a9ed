//! Derived, display-ready facts over a plan table and usage summary.
//!
//! Everything here is pure apart from the favorite flag overwrite and the
//! in-place cost model, both of which only touch the values passed in.

use crate::models::{
    Analytics, ComparisonRow, MonthlyPerformance, PlanShare, PlanTable, UsageSummary,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Gap between a plan's average playtime and the others' mean before the
/// plan is called out as heavy-use or casual.
pub const PLAYTIME_THRESHOLD_HOURS: f64 = 5.0;

/// Per-hour infrastructure cost for plans without an explicit rate. Matches
/// the flat rate the backend's simulator charges every plan.
pub const DEFAULT_COST_RATE: f64 = 0.20;

pub const SHARED_BENEFITS_LINE: &str = "Shares the core benefits across all plans.";
pub const HEAVY_USE_LINE: &str = "Built for marathon sessions and heavy users.";
pub const CASUAL_LINE: &str = "Perfect for casual or social sessions.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub key: String,
    pub label: String,
}

const KNOWN_FEATURES: [(&str, &str); 7] = [
    ("consoleAccess", "Console library"),
    ("pcAccess", "PC library"),
    ("cloudGaming", "Cloud gaming & streaming"),
    ("eaPlay", "EA Play included"),
    ("dayOne", "Day-one releases"),
    ("onlineMultiplayer", "Online multiplayer"),
    ("memberDiscounts", "Member discounts & quests"),
];

/// The known capabilities in their fixed order, followed by any other flag
/// found on the listed plans (first seen, labelled by key).
pub fn feature_matrix(plans: &PlanTable, order: &[String]) -> Vec<Feature> {
    let mut matrix: Vec<Feature> = KNOWN_FEATURES
        .iter()
        .map(|(key, label)| Feature {
            key: (*key).to_string(),
            label: (*label).to_string(),
        })
        .collect();

    for plan in order.iter().filter_map(|key| plans.get(key)) {
        for key in plan.features.keys() {
            if !matrix.iter().any(|feature| &feature.key == key) {
                matrix.push(Feature {
                    key: key.clone(),
                    label: key.clone(),
                });
            }
        }
    }

    matrix
}

pub fn comparison_table(plans: &PlanTable, order: &[String]) -> Vec<ComparisonRow> {
    feature_matrix(plans, order)
        .into_iter()
        .map(|feature| ComparisonRow {
            included: order
                .iter()
                .map(|key| plans.get(key).is_some_and(|plan| plan.has_feature(&feature.key)))
                .collect(),
            feature: feature.key,
            label: feature.label,
        })
        .collect()
}

/// What sets `plan_key` apart from every other plan in `order`.
pub fn compute_differences(plan_key: &str, plans: &PlanTable, order: &[String]) -> Vec<String> {
    let Some(plan) = plans.get(plan_key) else {
        return Vec::new();
    };
    let others: Vec<_> = order
        .iter()
        .filter(|key| key.as_str() != plan_key)
        .filter_map(|key| plans.get(key))
        .collect();

    let mut diffs = Vec::new();

    for feature in feature_matrix(plans, order) {
        if !plan.has_feature(&feature.key) {
            continue;
        }
        let missing: Vec<&str> = others
            .iter()
            .filter(|other| !other.has_feature(&feature.key))
            .map(|other| other.name.as_str())
            .collect();
        if !missing.is_empty() {
            diffs.push(format!("{} (absent from {})", feature.label, missing.join(" & ")));
        }
    }

    for perk in &plan.perks {
        if others.iter().all(|other| !other.perks.contains(perk)) {
            diffs.push(format!("Exclusive perk: {perk}"));
        }
    }

    if !others.is_empty() {
        let others_mean =
            others.iter().map(|other| other.average_hours()).sum::<f64>() / others.len() as f64;
        let own = plan.average_hours();
        if own > others_mean + PLAYTIME_THRESHOLD_HOURS {
            diffs.push(HEAVY_USE_LINE.to_string());
        } else if own < others_mean - PLAYTIME_THRESHOLD_HOURS {
            diffs.push(CASUAL_LINE.to_string());
        }
    }

    if diffs.is_empty() {
        diffs.push(SHARED_BENEFITS_LINE.to_string());
    }

    diffs
}

/// Percentage of `total` held by `count`, rounded to one decimal.
pub fn share_percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(count as f64 / total as f64 * 100.0, 1)
}

pub fn aggregate(order: &[String], summary: &UsageSummary) -> Analytics {
    let total_members: u64 = order
        .iter()
        .map(|key| summary.get(key).map_or(0, |usage| usage.count))
        .sum();

    let plans = order
        .iter()
        .map(|key| {
            let (count, avg_hours) = summary
                .get(key)
                .map_or((0, 0.0), |usage| (usage.count, usage.avg_hours));
            let share = share_percent(count, total_members);
            PlanShare {
                plan: key.clone(),
                count,
                avg_hours,
                share,
                percent: format!("{share:.1}"),
                community_hours: (count as f64 * avg_hours).round().max(0.0) as u64,
            }
        })
        .collect();

    Analytics {
        total_members,
        plans,
    }
}

/// Plan with the strictly greatest member count; ties go to the earlier key.
pub fn most_popular(order: &[String], summary: &UsageSummary) -> Option<String> {
    let count_of = |key: &String| summary.get(key).map_or(0, |usage| usage.count);

    let mut iter = order.iter();
    let mut best = iter.next()?;
    let mut best_count = count_of(best);
    for key in iter {
        let count = count_of(key);
        if count > best_count {
            best = key;
            best_count = count;
        }
    }
    Some(best.clone())
}

/// Overwrites every plan's favorite flag so only `favorite` is set.
pub fn mark_favorite(plans: &mut PlanTable, favorite: Option<&str>) {
    for (key, plan) in plans.iter_mut() {
        plan.is_favorite = Some(key.as_str()) == favorite;
    }
}

pub fn select_favorite(
    order: &[String],
    summary: &UsageSummary,
    plans: &mut PlanTable,
) -> Option<String> {
    let favorite = most_popular(order, summary);
    mark_favorite(plans, favorite.as_deref());
    favorite
}

#[derive(Debug, Error, PartialEq)]
pub enum CostRateError {
    #[error("expected Plan=rate, got '{0}'")]
    Malformed(String),

    #[error("invalid cost rate for {plan}: '{value}'")]
    Unparsable { plan: String, value: String },

    #[error("cost rate for {0} must be non-negative")]
    Negative(String),
}

/// Per-plan overrides on top of one flat per-hour rate.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    pub rates: BTreeMap<String, f64>,
    pub default_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            rates: BTreeMap::new(),
            default_rate: DEFAULT_COST_RATE,
        }
    }
}

impl CostModel {
    pub fn rate(&self, plan: &str) -> f64 {
        self.rates.get(plan).copied().unwrap_or(self.default_rate)
    }

    /// Parses `Key=rate,Key=rate` overrides on top of the defaults.
    pub fn with_overrides(mut self, overrides: &str) -> Result<Self, CostRateError> {
        for entry in overrides.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (plan, value) = entry
                .split_once('=')
                .ok_or_else(|| CostRateError::Malformed(entry.to_string()))?;
            let (plan, value) = (plan.trim(), value.trim());
            let rate: f64 = value.parse().map_err(|_| CostRateError::Unparsable {
                plan: plan.to_string(),
                value: value.to_string(),
            })?;
            if !rate.is_finite() || rate < 0.0 {
                return Err(CostRateError::Negative(plan.to_string()));
            }
            self.rates.insert(plan.to_string(), rate);
        }
        Ok(self)
    }
}

/// Fills in missing averages and profits and recomputes month totals.
pub fn apply_cost_model(monthly: &mut MonthlyPerformance, plans: &PlanTable, costs: &CostModel) {
    for month in &mut monthly.months {
        let mut total_profit = 0.0;
        let mut total_hours = 0.0;

        for (key, record) in month.plans.iter_mut() {
            if record.avg_hours.is_none() && record.users > 0 {
                record.avg_hours = Some(round_to(record.total_hours / record.users as f64, 1));
            }

            let profit = match record.profit {
                Some(reported) => reported,
                None => {
                    let price = plans.get(key).map_or(0.0, |plan| plan.price);
                    let revenue = record.users as f64 * price;
                    let cost = record.total_hours * costs.rate(key);
                    revenue - cost
                }
            };
            let profit = round_to(profit.max(0.0), 2);
            record.profit = Some(profit);

            total_profit += profit;
            total_hours += record.total_hours;
        }

        month.total_profit = round_to(total_profit, 2);
        month.total_hours = total_hours;
    }
}

/// Rounds half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
