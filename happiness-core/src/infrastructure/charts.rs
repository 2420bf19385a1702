// happiness-core/src/infrastructure/charts.rs
//
// SVG chart rendering. Every function returns the SVG document as a string;
// callers decide whether it goes to artifacts/ or straight into an HTML page.

use plotters::prelude::*;

use crate::domain::stats::{self, Bin};
use crate::infrastructure::error::InfrastructureError;

const FONT: &str = "sans-serif";
const PANEL_W: u32 = 420;
const PANEL_H: u32 = 300;

fn chart_err<E: std::fmt::Display>(e: E) -> InfrastructureError {
    InfrastructureError::Chart(e.to_string())
}

/// Padded (min, max) of finite values; `fallback` when there are none.
fn bounds<I: IntoIterator<Item = f64>>(values: I, fallback: (f64, f64)) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return fallback;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

fn grid_shape(panels: usize) -> (usize, usize) {
    let cols = panels.clamp(1, 3);
    (panels.div_ceil(cols).max(1), cols)
}

fn series_color(idx: usize) -> RGBAColor {
    Palette99::pick(idx).to_rgba()
}

/// Diverging blue-white-red scale for values in [-1, 1].
fn diverging(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    let fade = |t: f64| (255.0 * (1.0 - t)).round() as u8;
    if v >= 0.0 {
        RGBColor(255, fade(v), fade(v))
    } else {
        RGBColor(fade(-v), fade(-v), 255)
    }
}

fn center_label(labels: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| labels.get(i))
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// One bar per label. Negative values hang below zero.
pub fn bar_chart(
    title: &str,
    y_desc: &str,
    labels: &[String],
    values: &[f64],
) -> Result<String, InfrastructureError> {
    let n = labels.len().min(values.len()) as i32;
    let (lo, hi) = bounds(values.iter().copied().chain([0.0]), (0.0, 1.0));
    let mut svg = String::new();
    {
        let width = (PANEL_W).max(60 * n as u32 + 120);
        let root = SVGBackend::with_string(&mut svg, (width, PANEL_H + 80)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 20))
            .margin(10)
            .x_label_area_size(80)
            .y_label_area_size(60)
            .build_cartesian_2d((0..n.max(1)).into_segmented(), lo..hi)
            .map_err(chart_err)?;

        let formatter = |v: &SegmentValue<i32>| center_label(labels, v);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.max(1) as usize)
            .x_label_formatter(&formatter)
            .y_desc(y_desc)
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(values.iter().take(n as usize).enumerate().map(|(i, &v)| {
                let i = i as i32;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                    series_color(0).filled(),
                );
                bar.set_margin(0, 0, 4, 4);
                bar
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// One histogram panel per (column, bins) pair, laid out in a grid.
pub fn histogram_grid(
    title: &str,
    panels: &[(String, Vec<Bin>)],
) -> Result<String, InfrastructureError> {
    let (rows, cols) = grid_shape(panels.len());
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(
            &mut svg,
            (PANEL_W * cols as u32, PANEL_H * rows as u32 + 40),
        )
        .into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        let root = root.titled(title, (FONT, 22)).map_err(chart_err)?;

        for (area, (column, bins)) in root.split_evenly((rows, cols)).iter().zip(panels) {
            let (x_lo, x_hi) = match (bins.first(), bins.last()) {
                (Some(first), Some(last)) => (first.start, last.end),
                _ => (0.0, 1.0),
            };
            let y_hi = bins.iter().map(|b| b.count).max().unwrap_or(1).max(1) as f64 * 1.1;

            let mut chart = ChartBuilder::on(area)
                .caption(column, (FONT, 15))
                .margin(8)
                .x_label_area_size(28)
                .y_label_area_size(40)
                .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)
                .map_err(chart_err)?;
            chart
                .configure_mesh()
                .x_labels(5)
                .y_labels(5)
                .draw()
                .map_err(chart_err)?;
            chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], series_color(0).filled())
                }))
                .map_err(chart_err)?;
        }
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Tukey box (whiskers at 1.5 IQR, outliers as dots) per column.
pub fn boxplot_grid(
    title: &str,
    panels: &[(String, Vec<f64>)],
) -> Result<String, InfrastructureError> {
    let (rows, cols) = grid_shape(panels.len());
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(
            &mut svg,
            (PANEL_W * cols as u32, PANEL_H * rows as u32 + 40),
        )
        .into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        let root = root.titled(title, (FONT, 22)).map_err(chart_err)?;

        for (area, (column, values)) in root.split_evenly((rows, cols)).iter().zip(panels) {
            let Some(d) = stats::describe(values) else {
                continue;
            };
            let iqr = d.q75 - d.q25;
            let lo_fence = d.q25 - 1.5 * iqr;
            let hi_fence = d.q75 + 1.5 * iqr;
            let inside = values.iter().copied().filter(|v| (lo_fence..=hi_fence).contains(v));
            let whisker_lo = inside.clone().fold(d.q25, f64::min);
            let whisker_hi = inside.fold(d.q75, f64::max);
            let (y_lo, y_hi) = bounds([d.min, d.max], (0.0, 1.0));

            let mut chart = ChartBuilder::on(area)
                .caption(column, (FONT, 15))
                .margin(8)
                .y_label_area_size(45)
                .build_cartesian_2d(0.0..1.0, y_lo..y_hi)
                .map_err(chart_err)?;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_x_axis()
                .y_labels(6)
                .draw()
                .map_err(chart_err)?;

            let stroke = series_color(1).stroke_width(2);
            chart
                .draw_series([
                    PathElement::new(vec![(0.5, whisker_lo), (0.5, d.q25)], stroke),
                    PathElement::new(vec![(0.5, d.q75), (0.5, whisker_hi)], stroke),
                    PathElement::new(vec![(0.4, whisker_lo), (0.6, whisker_lo)], stroke),
                    PathElement::new(vec![(0.4, whisker_hi), (0.6, whisker_hi)], stroke),
                    PathElement::new(vec![(0.3, d.median), (0.7, d.median)], BLACK.stroke_width(2)),
                ])
                .map_err(chart_err)?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(0.3, d.q25), (0.7, d.q75)],
                    stroke,
                )))
                .map_err(chart_err)?;
            chart
                .draw_series(
                    values
                        .iter()
                        .filter(|v| !(lo_fence..=hi_fence).contains(*v))
                        .map(|&v| Circle::new((0.5, v), 2, RED.filled())),
                )
                .map_err(chart_err)?;
        }
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Scatter plot, one colour per group.
pub fn scatter(
    title: &str,
    x_desc: &str,
    y_desc: &str,
    groups: &[(String, Vec<(f64, f64)>)],
) -> Result<String, InfrastructureError> {
    let all = || groups.iter().flat_map(|(_, pts)| pts.iter());
    let (x_lo, x_hi) = bounds(all().map(|p| p.0), (0.0, 1.0));
    let (y_lo, y_hi) = bounds(all().map(|p| p.1), (0.0, 1.0));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (760, 480)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(chart_err)?;
        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .draw()
            .map_err(chart_err)?;

        for (idx, (label, points)) in groups.iter().enumerate() {
            let color = series_color(idx);
            let drawn = chart
                .draw_series(
                    points
                        .iter()
                        .filter(|(x, y)| x.is_finite() && y.is_finite())
                        .map(move |&p| Circle::new(p, 3, color.mix(0.8).filled())),
                )
                .map_err(chart_err)?;
            if !label.is_empty() {
                drawn
                    .label(label.as_str())
                    .legend(move |(x, y)| Circle::new((x + 8, y), 4, color.filled()));
            }
        }
        if groups.iter().any(|(label, _)| !label.is_empty()) {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(chart_err)?;
        }
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

pub struct LineSeriesData {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Line chart with markers, one line per series.
pub fn line_chart(
    title: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[LineSeriesData],
) -> Result<String, InfrastructureError> {
    let all = || series.iter().flat_map(|s| s.points.iter());
    let (x_lo, x_hi) = bounds(all().map(|p| p.0), (0.0, 1.0));
    let (y_lo, y_hi) = bounds(all().map(|p| p.1), (0.0, 1.0));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (820, 460)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(55)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(chart_err)?;
        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_label_formatter(&|x: &f64| format!("{:.0}", x))
            .draw()
            .map_err(chart_err)?;

        for (idx, s) in series.iter().enumerate() {
            let color = series_color(idx);
            chart
                .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))
                .map_err(chart_err)?
                .label(s.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            chart
                .draw_series(s.points.iter().map(|&p| Circle::new(p, 3, color.filled())))
                .map_err(chart_err)?;
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Square matrix of values in [-1, 1] (correlations), annotated.
pub fn heatmap(
    title: &str,
    labels: &[String],
    matrix: &[Vec<Option<f64>>],
) -> Result<String, InfrastructureError> {
    let n = labels.len() as i32;
    let side = (48 * n as u32 + 220).max(360);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (side, side)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 20))
            .margin(10)
            .x_label_area_size(140)
            .y_label_area_size(170)
            .build_cartesian_2d((0..n.max(1)).into_segmented(), (0..n.max(1)).into_segmented())
            .map_err(chart_err)?;

        // Row 0 at the top.
        let reversed: Vec<String> = labels.iter().rev().cloned().collect();
        let x_fmt = |v: &SegmentValue<i32>| center_label(labels, v);
        let y_fmt = |v: &SegmentValue<i32>| center_label(&reversed, v);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n.max(1) as usize)
            .y_labels(n.max(1) as usize)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .x_label_style((FONT, 11).into_font().transform(FontTransform::Rotate90))
            .draw()
            .map_err(chart_err)?;

        let cells = matrix.iter().enumerate().flat_map(|(i, row)| {
            row.iter().enumerate().map(move |(j, v)| (i as i32, j as i32, *v))
        });
        for (i, j, value) in cells {
            let y = n - 1 - i;
            let fill = value.map(diverging).unwrap_or(RGBColor(200, 200, 200));
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [
                        (SegmentValue::Exact(j), SegmentValue::Exact(y)),
                        (SegmentValue::Exact(j + 1), SegmentValue::Exact(y + 1)),
                    ],
                    fill.filled(),
                )))
                .map_err(chart_err)?;
            if let Some(v) = value {
                chart
                    .draw_series(std::iter::once(Text::new(
                        format!("{:.2}", v),
                        (SegmentValue::CenterOf(j), SegmentValue::CenterOf(y)),
                        (FONT, 11).into_font().color(&BLACK),
                    )))
                    .map_err(chart_err)?;
            }
        }
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}
