use crate::dashboard::format_count;
use crate::models::{DashboardView, MonthlyPerformance, PlanDetail, StatusKind};

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 260.0;

pub fn render_index(view: &DashboardView, monthly: &MonthlyPerformance) -> String {
    let hours: Vec<(String, f64)> = view
        .analytics
        .plans
        .iter()
        .map(|share| (share.plan.clone(), share.community_hours as f64))
        .collect();
    let profit: Vec<(String, f64)> = monthly
        .months
        .iter()
        .map(|month| (month.month.chars().take(3).collect(), month.total_profit))
        .collect();

    INDEX_HTML
        .replace("{{BANNER}}", &offline_banner(view))
        .replace("{{PLAN_CARDS}}", &plan_cards(view))
        .replace("{{COMPARISON_HEAD}}", &comparison_head(view))
        .replace("{{COMPARISON_ROWS}}", &comparison_rows(view))
        .replace("{{DETAIL}}", &view.detail.as_ref().map(detail_panel).unwrap_or_default())
        .replace("{{COMMUNITY}}", &community_list(view))
        .replace("{{ANALYTICS_ROWS}}", &analytics_rows(view))
        .replace("{{TOTAL}}", &format_count(view.analytics.total_members))
        .replace("{{PLAN_CHART}}", &plan_bars(view))
        .replace("{{HOURS_CHART}}", &line_chart(&hours, "Start the backend to plot playtime hours."))
        .replace("{{PROFIT_CHART}}", &line_chart(&profit, "No monthly figures yet."))
        .replace("{{SUBSCRIBE}}", &subscribe_form(view))
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn offline_banner(view: &DashboardView) -> String {
    if view.backend_online {
        return String::new();
    }
    r#"<p class="banner">Backend offline: showing sample data. Subscriptions are disabled.</p>"#
        .to_string()
}

fn plan_cards(view: &DashboardView) -> String {
    let mut html = String::new();
    for (key, plan) in view.order.iter().zip(&view.plans) {
        let key = escape(key);
        let favorite_class = if plan.is_favorite { " favorite" } else { "" };
        let favorite_label = if plan.is_favorite {
            "★ Favorite plan"
        } else {
            "☆ Mark favorite"
        };
        let chip = if plan.is_favorite {
            r#"<span class="favorite-chip">Favorite</span>"#
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<article class="plan-card{favorite_class}" data-plan="{key}">
  <div class="plan-card__header">
    <p class="eyebrow">{tagline}</p>
    <form method="post" action="/favorite"><input type="hidden" name="plan" value="{key}" /><button class="favorite-toggle" type="submit" aria-pressed="{pressed}">{favorite_label}</button></form>
  </div>
  <h3>{name}</h3>
  <p class="plan-card__desc">{description}</p>
  <div class="plan-card__price">${price:.2}<span>/month</span></div>
  <ul>
    <li>Best for: {best_for}</li>
    <li>Devices: {devices}</li>
    <li>Typical playtime: {low}-{high} hrs/month</li>
  </ul>
  <div class="plan-card__footer"><a class="cta" href="/?plan={key}">Choose {name}</a>{chip}</div>
</article>
"#,
            tagline = escape(&plan.tagline),
            pressed = plan.is_favorite,
            name = escape(&plan.name),
            description = escape(&plan.description),
            price = plan.price,
            best_for = escape(&plan.best_for),
            devices = escape(&plan.devices.join(", ")),
            low = plan.hours_range[0],
            high = plan.hours_range[1],
        ));
    }
    html
}

fn comparison_head(view: &DashboardView) -> String {
    view.plans
        .iter()
        .map(|plan| format!("<th scope=\"col\">{}</th>", escape(&plan.name)))
        .collect()
}

fn comparison_rows(view: &DashboardView) -> String {
    let mut html = String::new();
    for row in &view.comparison {
        html.push_str(&format!("<tr><th scope=\"row\">{}</th>", escape(&row.label)));
        for included in &row.included {
            let text = if *included { "Included" } else { "—" };
            html.push_str(&format!("<td data-value=\"{included}\">{text}</td>"));
        }
        html.push_str("</tr>\n");
    }
    html
}

fn list_items<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|item| format!("<li>{}</li>", escape(item)))
        .collect()
}

fn detail_panel(detail: &PlanDetail) -> String {
    let plan = &detail.plan;
    let chip = if plan.is_favorite {
        r#" <span class="favorite-chip favorite-chip--inline">Favorite</span>"#
    } else {
        ""
    };

    let stats = match &detail.usage {
        Some(usage) => {
            let genres = or_dash(&usage.top_genres.join(", "));
            let devices = or_dash(&usage.top_devices.join(", "));
            format!(
                "<span>Members: {}</span><span>Average hours/month: {}</span><span>Top genres: {}</span><span>Preferred devices: {}</span>",
                format_count(usage.count),
                usage.avg_hours,
                escape(&genres),
                escape(&devices),
            )
        }
        None => "<span>No data available yet.</span>".to_string(),
    };

    let members = if !detail.members_available {
        "<li>Unable to load members. Start the backend to view live data.</li>".to_string()
    } else if detail.members.is_empty() {
        "<li>No members recorded yet.</li>".to_string()
    } else {
        detail
            .members
            .iter()
            .map(|member| {
                format!(
                    "<li><strong>{}</strong> · {}<br />{} · {} hrs/mo</li>",
                    escape(&member.full_name),
                    escape(&member.favorite_genre),
                    escape(&member.preferred_device),
                    member.hours_per_month,
                )
            })
            .collect()
    };

    let capabilities: String = detail
        .capabilities
        .iter()
        .map(|capability| {
            let (class, state) = if capability.enabled {
                ("enabled", "Included")
            } else {
                ("disabled", "Locked")
            };
            format!("<li class=\"{class}\">{}: {state}</li>", escape(&capability.label))
        })
        .collect();

    format!(
        r#"<section class="detail" id="selected">
  <h2>{name} membership{chip}</h2>
  <p class="subtitle">{tagline} • {description} {best_for}</p>
  <p class="price">${price:.2}/month</p>
  <div class="columns">
    <div><h3>Perks</h3><ul>{perks}</ul></div>
    <div><h3>What makes it different</h3><ul>{differences}</ul></div>
  </div>
  <div class="stats">{stats}</div>
  <div class="columns">
    <div><h3>{welcome}</h3><p>{copy}</p><ul>{actions}</ul></div>
    <div><h3>Capabilities</h3><ul>{capabilities}</ul></div>
  </div>
  <h3>Players on this plan</h3>
  <ul class="members">{members}</ul>
</section>"#,
        name = escape(&plan.name),
        tagline = escape(&plan.tagline),
        description = escape(&plan.description),
        best_for = escape(&plan.best_for),
        price = plan.price,
        perks = list_items(&plan.perks),
        differences = list_items(&detail.differences),
        welcome = escape(&detail.experience.welcome),
        copy = escape(&detail.experience.copy),
        actions = list_items(&detail.experience.actions),
    )
}

fn or_dash(text: &str) -> String {
    if text.is_empty() {
        "—".to_string()
    } else {
        text.to_string()
    }
}

fn community_list(view: &DashboardView) -> String {
    view.analytics
        .plans
        .iter()
        .map(|share| {
            format!(
                "<li><strong>{}</strong>: {} members · {} avg hrs/mo · {}% of total</li>",
                escape(&share.plan),
                share.count,
                share.avg_hours,
                share.percent,
            )
        })
        .collect()
}

fn analytics_rows(view: &DashboardView) -> String {
    view.analytics
        .plans
        .iter()
        .map(|share| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}%</td></tr>",
                escape(&share.plan),
                format_count(share.count),
                share.percent,
            )
        })
        .collect()
}

fn plan_bars(view: &DashboardView) -> String {
    if view.analytics.total_members == 0 {
        return r#"<p class="hint">Start the backend to visualize live stats.</p>"#.to_string();
    }
    view.analytics
        .plans
        .iter()
        .enumerate()
        .map(|(index, share)| {
            format!(
                r#"<div class="bar-row"><span class="bar-label">{plan}</span><div class="bar-track"><div class="bar bar-{color}" style="width: {width:.1}%"></div></div><span class="bar-value">{percent}%</span></div>"#,
                plan = escape(&share.plan),
                color = index % 3,
                width = share.share.max(0.5),
                percent = share.percent,
            )
        })
        .collect()
}

/// Inline SVG polyline with a grid, zero line, points and x labels.
pub fn line_chart(points: &[(String, f64)], empty: &str) -> String {
    if points.is_empty() || points.iter().all(|(_, value)| *value == 0.0) {
        return format!(
            r#"<svg class="chart" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" role="img"><text class="chart-label" x="50%" y="50%" text-anchor="middle">{}</text></svg>"#,
            escape(empty)
        );
    }

    let padding_x = 52.0;
    let padding_y = 34.0;
    let top = 24.0;

    let mut min = points.iter().map(|(_, value)| *value).fold(0.0_f64, f64::min);
    let mut max = points.iter().map(|(_, value)| *value).fold(0.0_f64, f64::max);
    if min == max {
        min -= 1.0;
        max += 1.0;
    }
    let range = max - min;
    let x_step = if points.len() > 1 {
        (CHART_WIDTH - padding_x * 2.0) / (points.len() - 1) as f64
    } else {
        0.0
    };
    let scale_y = (CHART_HEIGHT - top - padding_y) / range;
    let x = |index: usize| padding_x + index as f64 * x_step;
    let y = |value: f64| CHART_HEIGHT - padding_y - (value - min) * scale_y;

    let mut svg = format!(r#"<svg class="chart" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" role="img">"#);

    let ticks = 4;
    for tick in 0..=ticks {
        let value = min + range * f64::from(tick) / f64::from(ticks);
        let y_pos = y(value);
        svg.push_str(&format!(
            r#"<line class="chart-grid" x1="{padding_x}" y1="{y_pos:.2}" x2="{x2}" y2="{y_pos:.2}" /><text class="chart-label" x="{lx}" y="{ly:.2}" text-anchor="end">{label}</text>"#,
            x2 = CHART_WIDTH - padding_x,
            lx = padding_x - 10.0,
            ly = y_pos + 4.0,
            label = axis_label(value),
        ));
    }
    svg.push_str(&format!(
        r#"<line class="chart-axis" x1="{padding_x}" y1="{zero:.2}" x2="{x2}" y2="{zero:.2}" />"#,
        zero = y(0.0),
        x2 = CHART_WIDTH - padding_x,
    ));

    let path: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(index, (_, value))| {
            let command = if index == 0 { 'M' } else { 'L' };
            format!("{command} {:.2} {:.2}", x(index), y(*value))
        })
        .collect();
    svg.push_str(&format!(r#"<path class="chart-line" d="{}" />"#, path.join(" ")));

    let label_every = if points.len() > 8 { 2 } else { 1 };
    for (index, (label, value)) in points.iter().enumerate() {
        svg.push_str(&format!(
            r#"<circle class="chart-point" cx="{:.2}" cy="{:.2}" r="4" />"#,
            x(index),
            y(*value)
        ));
        if index % label_every == 0 {
            svg.push_str(&format!(
                r#"<text class="chart-label" x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
                x(index),
                CHART_HEIGHT - padding_y + 18.0,
                escape(label)
            ));
        }
    }

    svg.push_str("</svg>");
    svg
}

fn axis_label(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

fn subscribe_form(view: &DashboardView) -> String {
    let selected = view
        .selected
        .as_deref()
        .and_then(|key| view.order.iter().position(|candidate| candidate == key))
        .map(|index| (&view.order[index], &view.plans[index]));

    let options: String = view
        .order
        .iter()
        .zip(&view.plans)
        .map(|(key, plan)| {
            let chosen = if Some(key.as_str()) == view.selected.as_deref() {
                " selected"
            } else {
                ""
            };
            let star = if plan.is_favorite { " ★" } else { "" };
            format!(
                "<option value=\"{}\"{chosen}>{} - ${:.2}/mo{star}</option>",
                escape(key),
                escape(&plan.name),
                plan.price
            )
        })
        .collect();

    let disabled = if view.backend_online && selected.is_some() {
        ""
    } else {
        " disabled"
    };
    let button = match selected {
        Some((_, plan)) => format!("Subscribe to {}", escape(&plan.name)),
        None => "Subscribe".to_string(),
    };
    let status_kind = match view.status.kind {
        StatusKind::Info => "info",
        StatusKind::Success => "success",
        StatusKind::Error => "error",
    };

    format!(
        r#"<form id="subscribeForm" method="post" action="/subscribe">
  <label>Plan <select name="plan">{options}</select></label>
  <label>Gamer name <input name="name" autocomplete="name" /></label>
  <button type="submit"{disabled}>{button}</button>
</form>
<p class="status status-{status_kind}">{status}</p>"#,
        status = escape(&view.status.text),
    )
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Plan Dashboard</title>
  <style>
    :root {
      --bg: #0f1720;
      --ink: #f5f8fa;
      --muted: #9ba7b4;
      --accent: #3fe077;
      --accent-2: #73ff85;
      --accent-3: #32b561;
      --card: rgba(255, 255, 255, 0.06);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    main {
      width: min(1100px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 28px;
    }

    .banner {
      background: #5a1f1f;
      border-radius: 12px;
      padding: 12px 16px;
    }

    .plans {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
      gap: 16px;
    }

    .plan-card,
    .detail,
    .panel {
      background: var(--card);
      border-radius: 20px;
      padding: 20px;
    }

    .plan-card.favorite {
      outline: 2px solid var(--accent);
    }

    .favorite-chip {
      background: var(--accent);
      color: var(--bg);
      border-radius: 999px;
      padding: 2px 10px;
      font-size: 0.8rem;
    }

    .plan-card__price,
    .price {
      font-size: 1.6rem;
      font-weight: 600;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th,
    td {
      padding: 8px;
      text-align: left;
      border-bottom: 1px solid rgba(255, 255, 255, 0.08);
    }

    td[data-value="true"] {
      color: var(--accent);
    }

    .columns {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));
      gap: 16px;
    }

    .stats {
      display: flex;
      flex-wrap: wrap;
      gap: 16px;
      color: var(--muted);
    }

    li.disabled {
      color: var(--muted);
    }

    .bar-row {
      display: grid;
      grid-template-columns: 100px 1fr 60px;
      align-items: center;
      gap: 12px;
      margin-bottom: 12px;
    }

    .bar-track {
      background: rgba(255, 255, 255, 0.08);
      height: 28px;
    }

    .bar {
      height: 100%;
    }

    .bar-0 {
      background: var(--accent);
    }

    .bar-1 {
      background: var(--accent-2);
    }

    .bar-2 {
      background: var(--accent-3);
    }

    .chart {
      width: 100%;
      height: 260px;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: var(--accent-2);
    }

    .chart-grid {
      stroke: rgba(255, 255, 255, 0.08);
    }

    .chart-axis {
      stroke: rgba(255, 255, 255, 0.2);
      stroke-dasharray: 4 6;
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    .status-error {
      color: #ff7b6b;
    }

    .status-success {
      color: var(--accent);
    }

    .hint {
      color: var(--muted);
    }
  </style>
</head>
<body>
  <main>
    <header>
      <h1>Choose your plan</h1>
      {{BANNER}}
    </header>

    <section class="plans" id="planGrid">
{{PLAN_CARDS}}
    </section>

    <section class="panel">
      <h2>Compare plans</h2>
      <table id="comparisonTable">
        <thead><tr><th scope="col">Feature</th>{{COMPARISON_HEAD}}</tr></thead>
        <tbody>
{{COMPARISON_ROWS}}
        </tbody>
      </table>
    </section>

    {{DETAIL}}

    <section class="panel" id="analytics">
      <h2>Community</h2>
      <ul id="communityStats">{{COMMUNITY}}</ul>
      <table>
        <thead><tr><th>Plan</th><th>Members</th><th>Share</th></tr></thead>
        <tbody id="analyticsTableBody">{{ANALYTICS_ROWS}}</tbody>
        <tfoot><tr><th>Total</th><th id="analyticsTotal">{{TOTAL}}</th><th></th></tr></tfoot>
      </table>
      <h3>Plan share</h3>
      <div id="planChart">{{PLAN_CHART}}</div>
      <h3>Community hours per month</h3>
      <div id="hoursChart">{{HOURS_CHART}}</div>
      <h3>Monthly profit</h3>
      <div id="profitChart">{{PROFIT_CHART}}</div>
    </section>

    <section class="panel" id="subscribe">
      <h2>Join now</h2>
      {{SUBSCRIBE}}
    </section>
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Dashboard;
    use crate::fallback;
    use crate::insight::CostModel;

    fn page(online: bool) -> String {
        let dashboard = Dashboard::new(fallback::embedded(), CostModel::default(), online);
        render_index(&dashboard.view(), dashboard.monthly())
    }

    #[test]
    fn page_lists_every_plan_and_the_comparison() {
        let html = page(true);
        for name in ["Core", "PC", "Ultimate"] {
            assert!(html.contains(&format!("<h3>{name}</h3>")));
        }
        assert!(html.contains("Cloud gaming &amp; streaming"));
        assert!(html.contains("Core membership"));
        assert!(!html.contains("{{"));
        assert!(!html.contains("Backend offline"));
    }

    #[test]
    fn offline_page_shows_banner_and_disables_subscribe() {
        let html = page(false);
        assert!(html.contains("Backend offline"));
        assert!(html.contains("<button type=\"submit\" disabled>"));
        assert!(html.contains("Start the backend server to enable subscriptions."));
    }

    #[test]
    fn analytics_table_uses_shared_percentages() {
        let html = page(true);
        // 400 / 1000 members.
        assert!(html.contains("<tr><td>Core</td><td>400</td><td>40.0%</td></tr>"));
        assert!(html.contains("40.0% of total"));
        assert!(html.contains(">40.0%</span>"));
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn empty_series_renders_placeholder() {
        let svg = line_chart(&[], "No monthly figures yet.");
        assert!(svg.contains("No monthly figures yet."));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn series_renders_one_point_per_value() {
        let points = vec![("Jan".to_string(), 10.0), ("Feb".to_string(), 25.5)];
        let svg = line_chart(&points, "");
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("<path class=\"chart-line\" d=\"M "));
    }

    #[test]
    fn comparison_rows_and_cards_cover_every_plan() {
        let dashboard = Dashboard::new(fallback::embedded(), CostModel::default(), true);
        let view = dashboard.view();

        let rows = comparison_rows(&view);
        assert_eq!(rows.matches("<tr>").count(), view.comparison.len());
        assert_eq!(rows.matches("<td ").count(), view.comparison.len() * 3);
        assert!(rows.contains("<tr><th scope=\"row\">Console library</th>"));

        let cards = plan_cards(&view);
        assert_eq!(cards.matches("<article class=\"plan-card").count(), 3);
        assert_eq!(cards.matches("<article class=\"plan-card favorite\"").count(), 1);
        assert!(cards.contains("href=\"/?plan=Ultimate\""));
    }
}
