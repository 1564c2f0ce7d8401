use std::ops::Range;

use anyhow::Result;
use plotters::prelude::*;

use crate::analysis::Bin;
use crate::canvas::CanvasArea;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 20);

pub fn draw_histogram(area: &CanvasArea<'_>, title: &str, column: &str, bins: &[Bin]) -> Result<()> {
    area.fill(&WHITE)?;
    if bins.is_empty() {
        return Ok(());
    }
    let lo = bins[0].start;
    let hi = bins[bins.len() - 1].end;
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, CAPTION_FONT)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(lo..hi, 0usize..max_count + max_count / 10 + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(column)
        .y_desc("count")
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.start, 0), (b.end, b.count)], BLUE.mix(0.6).filled())
    }))?;
    Ok(())
}

/// Vertical bars, one per label, in the given order.
pub fn draw_bar(area: &CanvasArea<'_>, title: &str, y_desc: &str, bars: &[(String, f64)]) -> Result<()> {
    area.fill(&WHITE)?;
    if bars.is_empty() {
        return Ok(());
    }
    let lo = bars.iter().map(|b| b.1).fold(0.0, f64::min);
    let hi = bars.iter().map(|b| b.1).fold(0.0, f64::max);
    let y_range = padded_range(lo, hi);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, CAPTION_FONT)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..bars.len() as f64, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().min(20))
        .x_label_formatter(&|x| {
            let idx = (*x).floor() as usize;
            bars.get(idx).map(|b| b.0.clone()).unwrap_or_default()
        })
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(idx, (_, value))| {
        let idx = idx as f64;
        Rectangle::new([(idx + 0.1, 0.0), (idx + 0.9, *value)], BLUE.mix(0.6).filled())
    }))?;
    Ok(())
}

pub fn draw_scatter(
    area: &CanvasArea<'_>,
    title: &str,
    (x_desc, y_desc): (&str, &str),
    points: &[(f64, f64)],
) -> Result<()> {
    area.fill(&WHITE)?;
    if points.is_empty() {
        return Ok(());
    }
    let (x_range, y_range) = bounds(points);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, CAPTION_FONT)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;

    chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;
    chart.draw_series(points.iter().map(|p| Circle::new(*p, 3, BLUE.filled())))?;
    Ok(())
}

/// Line through the points ordered by x.
pub fn draw_line(
    area: &CanvasArea<'_>,
    title: &str,
    (x_desc, y_desc): (&str, &str),
    points: &[(f64, f64)],
) -> Result<()> {
    area.fill(&WHITE)?;
    if points.is_empty() {
        return Ok(());
    }
    let mut ordered = points.to_vec();
    ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let (x_range, y_range) = bounds(&ordered);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, CAPTION_FONT)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;

    chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;
    chart.draw_series(LineSeries::new(ordered, &BLUE))?;
    Ok(())
}

fn bounds(points: &[(f64, f64)]) -> (Range<f64>, Range<f64>) {
    let (mut x_lo, mut x_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_lo, mut y_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in points {
        x_lo = x_lo.min(*x);
        x_hi = x_hi.max(*x);
        y_lo = y_lo.min(*y);
        y_hi = y_hi.max(*y);
    }
    (padded_range(x_lo, x_hi), padded_range(y_lo, y_hi))
}

/// Range with 5% headroom on each side; degenerate ranges widen to ±0.5.
fn padded_range(lo: f64, hi: f64) -> Range<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if hi <= lo {
        return (lo - 0.5)..(lo + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}
