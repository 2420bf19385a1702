// happiness-core/src/infrastructure/web/handlers.rs

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Html;
use serde::Serialize;
use serde_json::{Value, json};

use crate::application::dashboard::{
    self, COUNTRY, FrameFilter, LADDER, MAX_TABLE_ROWS, REGION, YEAR, query_value, query_values,
};
use crate::application::eda::correlation_matrix;
use crate::domain::frame::Frame;
use crate::domain::naming::label;
use crate::domain::project::CorrelationMethod;
use crate::domain::stats;
use crate::infrastructure::charts::{self, LineSeriesData};

use super::{AppState, WebError};

type Params = Query<Vec<(String, String)>>;

#[derive(Serialize)]
struct NavLink {
    path: &'static str,
    label: &'static str,
}

const PAGES: &[NavLink] = &[
    NavLink { path: "/", label: "Home" },
    NavLink { path: "/dataset", label: "Dataset" },
    NavLink { path: "/distribution", label: "Distribution" },
    NavLink { path: "/relationship", label: "Relationship" },
    NavLink { path: "/geo", label: "Geo" },
    NavLink { path: "/trends", label: "Trends" },
    NavLink { path: "/averages", label: "Averages" },
];

fn page(state: &AppState, template: &str, title: &str, current: &str, body: Value) -> Result<Html<String>, WebError> {
    let mut context = json!({ "title": title, "pages": PAGES, "current": current });
    if let (Some(ctx), Value::Object(extra)) = (context.as_object_mut(), body) {
        ctx.extend(extra);
    }
    Ok(Html(state.renderer.render(template, context)?))
}

/// Requested metric if the frame has it, else ladder score, else the first numeric column.
fn pick_metric(frame: &Frame, requested: Option<&str>, fallback: &str) -> String {
    let options = dashboard::metric_options(frame);
    requested
        .filter(|m| options.iter().any(|o| o == m))
        .or_else(|| options.iter().find(|o| *o == fallback).map(String::as_str))
        .or_else(|| options.first().map(String::as_str))
        .unwrap_or(fallback)
        .to_string()
}

fn years(frame: &Frame) -> Vec<i64> {
    frame.distinct_ints(YEAR).unwrap_or_default()
}

fn regions(frame: &Frame) -> Vec<String> {
    frame.distinct_text(REGION).unwrap_or_default()
}

pub async fn home(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let view = dashboard::home_view(&state.gold, 5);
    page(&state, "home.html", "World Happiness", "/", json!({ "view": view }))
}

pub async fn dataset(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Html<String>, WebError> {
    let filter = FrameFilter::from_pairs(&params);
    let frame = filter.apply(&state.gold);

    let requested = query_values(&params, "column");
    let selected: Vec<String> = if requested.is_empty() {
        frame.columns.clone()
    } else {
        requested
    };
    let table = dashboard::table_view(&frame.select(&selected)?, MAX_TABLE_ROWS);

    let metric = pick_metric(&state.gold, query_value(&params, "metric"), LADDER);
    let overall = dashboard::overall_summary(&frame, &metric)?;
    let regional = if frame.has_column(REGION) {
        dashboard::regional_summary(&frame, &metric)?
    } else {
        Vec::new()
    };

    page(
        &state,
        "dataset.html",
        "Dataset explorer",
        "/dataset",
        json!({
            "years": years(&state.gold),
            "year": filter.year_from,
            "regions": regions(&state.gold),
            "selected_regions": filter.regions,
            "country": filter.country,
            "columns": state.gold.columns,
            "selected_columns": selected,
            "metrics": dashboard::metric_options(&state.gold),
            "metric": metric,
            "table": table,
            "overall": overall,
            "regional": regional,
        }),
    )
}

pub async fn distribution(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Html<String>, WebError> {
    let filter = FrameFilter::from_pairs(&params);
    let frame = filter.apply(&state.gold);
    let metric = pick_metric(&state.gold, query_value(&params, "metric"), LADDER);
    let bins = query_value(&params, "bins")
        .and_then(|b| b.parse::<usize>().ok())
        .filter(|b| (1..=200).contains(b))
        .unwrap_or(state.eda.histogram_bins);

    let values = frame.numeric_values(&metric)?;
    let chart = charts::histogram_grid(
        &format!("Distribution of {}", label(&metric)),
        &[(label(&metric), stats::histogram(&values, bins))],
    )?;

    page(
        &state,
        "distribution.html",
        "Distribution",
        "/distribution",
        json!({
            "metrics": dashboard::metric_options(&state.gold),
            "metric": metric,
            "years": years(&state.gold),
            "year": filter.year_from,
            "regions": regions(&state.gold),
            "selected_regions": filter.regions,
            "bins": bins,
            "chart": chart,
        }),
    )
}

pub async fn relationship(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Html<String>, WebError> {
    let filter = FrameFilter::from_pairs(&params);
    let frame = filter.apply(&state.gold);
    let x = pick_metric(&state.gold, query_value(&params, "x"), "logged_gdp_per_capita");
    let y = pick_metric(&state.gold, query_value(&params, "y"), LADDER);

    let groups = dashboard::scatter_groups(&frame, &x, &y, Some(REGION))?;
    let (xs, ys): (Vec<f64>, Vec<f64>) = groups.iter().flat_map(|(_, pts)| pts.iter().copied()).unzip();
    let scatter = charts::scatter(
        &format!("{} vs {}", label(&y), label(&x)),
        &label(&x),
        &label(&y),
        &groups,
    )?;

    let matrix = correlation_matrix(&frame, CorrelationMethod::Pearson, None)?;
    let heatmap = if matrix.columns.is_empty() {
        String::new()
    } else {
        charts::heatmap("Correlation heatmap (pearson)", &matrix.columns, &matrix.values)?
    };

    page(
        &state,
        "relationship.html",
        "Relationship",
        "/relationship",
        json!({
            "metrics": dashboard::metric_options(&state.gold),
            "x": x,
            "y": y,
            "years": years(&state.gold),
            "year": filter.year_from,
            "correlation": stats::pearson(&xs, &ys),
            "scatter": scatter,
            "heatmap": heatmap,
        }),
    )
}

pub async fn geo(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Html<String>, WebError> {
    let mut filter = FrameFilter::from_pairs(&params);
    let explicit_all = params.iter().any(|(k, v)| k == "year" && v.trim().is_empty());
    if filter.year_from.is_none() && !explicit_all {
        if let Some(latest) = dashboard::latest_year(&state.gold) {
            filter.year_from = Some(latest);
            filter.year_to = Some(latest);
        }
    }
    let frame = filter.apply(&state.gold);
    let metric = pick_metric(&state.gold, query_value(&params, "metric"), LADDER);

    let groups = dashboard::geo_groups(&frame, &metric, 4)?;
    let chart = charts::scatter("Geographic scatter (lon vs lat)", "longitude", "latitude", &groups)?;
    let regional = if frame.has_column(REGION) {
        dashboard::regional_summary(&frame, &metric)?
    } else {
        Vec::new()
    };
    let top = dashboard::ranking(&frame, &metric, false, 10)?;

    page(
        &state,
        "geo.html",
        "Geography",
        "/geo",
        json!({
            "metrics": dashboard::metric_options(&state.gold),
            "metric": metric,
            "years": years(&state.gold),
            "year": filter.year_from,
            "chart": chart,
            "regional": regional,
            "top": top,
        }),
    )
}

pub async fn trends(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Html<String>, WebError> {
    let gold = state.gold.as_ref();
    let options = dashboard::metric_options(gold);
    let requested: Vec<String> = query_values(&params, "metric")
        .into_iter()
        .filter(|m| options.contains(m))
        .collect();
    let selected = if requested.is_empty() {
        dashboard::default_trend_metrics(gold)
    } else {
        requested
    };

    let mut series = Vec::new();
    for metric in &selected {
        series.push(LineSeriesData {
            label: label(metric),
            points: dashboard::yearly_mean(gold, metric)?
                .into_iter()
                .map(|(year, mean)| (year as f64, mean))
                .collect(),
        });
    }
    let chart = charts::line_chart("Yearly mean", "Year", "Mean", &series)?;

    let latest = dashboard::latest_year(gold);
    let (snapshot, yoy) = match latest {
        Some(year) => (
            Some(dashboard::table_view(
                &dashboard::snapshot_table(gold, &selected, year)?,
                MAX_TABLE_ROWS,
            )),
            if gold.has_column(LADDER) {
                dashboard::top_yoy_change(gold, LADDER, year, 10)?
            } else {
                Vec::new()
            },
        ),
        None => (None, Vec::new()),
    };

    page(
        &state,
        "trends.html",
        "Trends",
        "/trends",
        json!({
            "metrics": options,
            "selected_metrics": selected,
            "chart": chart,
            "latest_year": latest,
            "snapshot": snapshot,
            "yoy": yoy,
        }),
    )
}

pub async fn averages(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Html<String>, WebError> {
    let gold = state.gold.as_ref();
    let groupings = gold.text_columns();
    let by = query_value(&params, "by")
        .filter(|b| groupings.iter().any(|g| g == b))
        .map(str::to_string)
        .or_else(|| gold.has_column(REGION).then(|| REGION.to_string()))
        .or_else(|| groupings.first().cloned())
        .unwrap_or_else(|| COUNTRY.to_string());
    let metric = pick_metric(gold, query_value(&params, "metric"), LADDER);
    let top = query_value(&params, "top")
        .and_then(|t| t.parse::<usize>().ok())
        .filter(|t| (1..=200).contains(t))
        .unwrap_or(10);

    let averages = dashboard::group_average(gold, &by, &metric, top)?;
    let labels: Vec<String> = averages.iter().map(|(g, _)| g.clone()).collect();
    let values: Vec<f64> = averages.iter().map(|(_, v)| *v).collect();
    let chart = charts::bar_chart(
        &format!("Average {} by {}", label(&metric), label(&by)),
        &label(&metric),
        &labels,
        &values,
    )?;

    page(
        &state,
        "averages.html",
        "Averages",
        "/averages",
        json!({
            "groupings": groupings,
            "by": by,
            "metrics": dashboard::metric_options(gold),
            "metric": metric,
            "top": top,
            "averages": averages,
            "chart": chart,
        }),
    )
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "rows": state.gold.height() }))
}

/// Filtered gold rows as JSON records.
pub async fn gold(
    State(state): State<AppState>,
    Query(params): Params,
) -> Json<Value> {
    let frame = FrameFilter::from_pairs(&params).apply(&state.gold);
    let limit = query_value(&params, "limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let records: Vec<_> = frame.head(limit).to_records();
    Json(json!({ "rows": frame.height(), "records": records }))
}
