//! Static Figure Renderer
//! Draws the four report figures into in-memory PNG bytes.
//!
//! Figures:
//! 1. Choropleth: average dairy consumption on the world map
//! 2. Stacked bars: per-country gender split with in-stack labels
//! 3. Paired scatters: dairy vs GDP and vs life expectancy, with trend lines
//! 4. Dual-axis lines: yearly dairy and GDP totals on a shared x axis

use plotters::coord::Shift;
use plotters::element::Polygon;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

use crate::data::{CountryAverage, EconomicSummaryRow, GenderSplitRow, Sex, WorldMap, YearlyTrend};
use crate::stats::StatsCalculator;

// Colors (RGB)
const MALE_COLOR: RGBColor = RGBColor(91, 155, 213); // lower stack segment
const FEMALE_COLOR: RGBColor = RGBColor(237, 125, 49); // upper stack segment
const DAIRY_COLOR: RGBColor = RGBColor(31, 119, 180); // primary-axis series
const GDP_COLOR: RGBColor = RGBColor(44, 160, 44); // secondary-axis series
const POINT_COLOR: RGBColor = RGBColor(31, 119, 180); // scatter points
const TREND_COLOR: RGBColor = RGBColor(214, 39, 40); // fitted lines
const LABEL_COLOR: RGBColor = RGBColor(60, 60, 60); // country name labels
const NO_DATA_FILL: RGBColor = RGBColor(224, 224, 224); // regions without a match
const MAP_BORDER: RGBColor = RGBColor(255, 255, 255); // polygon outlines
const RAMP_LOW: RGBColor = RGBColor(222, 235, 247); // choropleth ramp start
const RAMP_HIGH: RGBColor = RGBColor(8, 81, 156); // choropleth ramp end

const BAR_HALF_WIDTH: f64 = 0.38;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("no rows to plot")]
    EmptyTable,
}

fn draw_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Renders the derived tables into static raster figures.
pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// World map filled from the per-country averages.
    ///
    /// Regions whose name matches no derived country keep the no-data
    /// fill; those gaps are expected and left uncorrected.
    pub fn render_choropleth(
        map: &WorldMap,
        averages: &[CountryAverage],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        let by_country: HashMap<&str, f64> = averages
            .iter()
            .map(|r| (r.country.as_str(), r.avg_dairy))
            .collect();
        let lo = averages
            .iter()
            .map(|r| r.avg_dairy)
            .fold(f64::INFINITY, f64::min);
        let hi = averages
            .iter()
            .map(|r| r.avg_dairy)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut buf = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "Average dairy consumption by country",
                    ("sans-serif", 28),
                )
                .margin(12)
                .build_cartesian_2d(-180.0..180.0, -90.0..90.0)
                .map_err(draw_err)?;

            // No mesh or axes on the map; the polygons carry the picture
            chart
                .draw_series(map.polygons.iter().filter(|p| p.points.len() >= 3).map(
                    |poly| {
                        let style = match by_country.get(poly.region.as_str()) {
                            Some(&avg) => ramp_color(avg, lo, hi).filled(),
                            None => NO_DATA_FILL.filled(),
                        };
                        Polygon::new(poly.points.clone(), style)
                    },
                ))
                .map_err(draw_err)?;

            chart
                .draw_series(map.polygons.iter().filter(|p| p.points.len() >= 3).map(
                    |poly| {
                        let mut outline = poly.points.clone();
                        if let Some(&first) = outline.first() {
                            outline.push(first);
                        }
                        PathElement::new(outline, MAP_BORDER)
                    },
                ))
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }
        encode_png(width, height, buf)
    }

    /// Stacked bars of the gender split, in derived row order.
    pub fn render_gender_split(
        rows: &[GenderSplitRow],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        if rows.is_empty() {
            return Err(RenderError::EmptyTable);
        }

        // Countries in first-appearance order match the sorted rows
        let mut countries: Vec<&str> = Vec::new();
        for row in rows {
            if countries.last().copied() != Some(row.country.as_str()) {
                countries.push(row.country.as_str());
            }
        }
        let index: HashMap<&str, usize> = countries
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i))
            .collect();

        let max_tot = rows.iter().map(|r| r.tot_dairy).fold(0.0, f64::max);
        let y_max = (max_tot * 1.12).max(1.0);
        let n = countries.len();

        let mut buf = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "Average dairy consumption by country and sex",
                    ("sans-serif", 28),
                )
                .margin(12)
                .x_label_area_size(120)
                .y_label_area_size(60)
                .build_cartesian_2d(-0.6..(n as f64 - 0.4), 0.0..y_max)
                .map_err(draw_err)?;

            let x_fmt = |x: &f64| {
                let i = x.round() as i64;
                if i >= 0 && (i as usize) < countries.len() {
                    countries[i as usize].to_string()
                } else {
                    String::new()
                }
            };
            chart
                .configure_mesh()
                .disable_x_mesh()
                .y_desc("Dairy consumption (%)")
                .x_labels(n)
                .x_label_formatter(&x_fmt)
                .x_label_style(
                    ("sans-serif", 13)
                        .into_font()
                        .transform(FontTransform::Rotate90),
                )
                .draw()
                .map_err(draw_err)?;

            // Segments stack in row order: the running base restarts per country
            let mut bases: HashMap<&str, f64> = HashMap::new();
            for row in rows {
                let Some(&i) = index.get(row.country.as_str()) else {
                    continue;
                };
                let base = bases.entry(row.country.as_str()).or_insert(0.0);
                let y0 = *base;
                let y1 = *base + row.avg_dairy;
                *base = y1;

                let color = match row.sex {
                    Sex::Male => MALE_COLOR,
                    Sex::Female => FEMALE_COLOR,
                };
                let x = i as f64;
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(x - BAR_HALF_WIDTH, y0), (x + BAR_HALF_WIDTH, y1)],
                        color.filled(),
                    )))
                    .map_err(draw_err)?;

                let label_style = ("sans-serif", 12)
                    .into_font()
                    .color(&WHITE)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                chart
                    .draw_series(std::iter::once(Text::new(
                        format_pct(row.avg_dairy),
                        (x, row.label_pos),
                        label_style,
                    )))
                    .map_err(draw_err)?;
            }

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(0.0, 0.0), (0.0, 0.0)],
                    MALE_COLOR.filled(),
                )))
                .map_err(draw_err)?
                .label(Sex::Male.as_str())
                .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], MALE_COLOR.filled()));
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(0.0, 0.0), (0.0, 0.0)],
                    FEMALE_COLOR.filled(),
                )))
                .map_err(draw_err)?
                .label(Sex::Female.as_str())
                .legend(|(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 14, y + 6)], FEMALE_COLOR.filled())
                });

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK.mix(0.4))
                .draw()
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }
        encode_png(width, height, buf)
    }

    /// Two scatter panels off the same summary table: dairy vs GDP on the
    /// left, dairy vs life expectancy on the right. Rows missing either
    /// coordinate contribute no point.
    pub fn render_economic_scatter(
        rows: &[EconomicSummaryRow],
        highlights: &[String],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        if rows.is_empty() {
            return Err(RenderError::EmptyTable);
        }
        let highlights: HashSet<&str> = highlights.iter().map(|s| s.as_str()).collect();

        let gdp_points: Vec<(f64, f64, &str)> = rows
            .iter()
            .filter_map(|r| match (r.avg_gdp, r.avg_dairy) {
                (Some(x), Some(y)) => Some((x, y, r.country.as_str())),
                _ => None,
            })
            .collect();
        let life_points: Vec<(f64, f64, &str)> = rows
            .iter()
            .filter_map(|r| match (r.avg_life_exp, r.avg_dairy) {
                (Some(x), Some(y)) => Some((x, y, r.country.as_str())),
                _ => None,
            })
            .collect();

        let mut buf = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            let panels = root.split_evenly((1, 2));

            scatter_panel(
                &panels[0],
                "Dairy consumption vs GDP per capita",
                "Avg GDP per capita (constant 2015 US$)",
                &gdp_points,
                &highlights,
            )?;
            scatter_panel(
                &panels[1],
                "Dairy consumption vs life expectancy",
                "Avg life expectancy at birth (years)",
                &life_points,
                &highlights,
            )?;

            root.present().map_err(draw_err)?;
        }
        encode_png(width, height, buf)
    }

    /// Yearly totals with GDP carried on a secondary axis scaled back by the
    /// derived factor, and `$Nk` labels on the GDP points.
    pub fn render_yearly_trend(
        trend: &YearlyTrend,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        if trend.rows.is_empty() {
            return Err(RenderError::EmptyTable);
        }

        let x_lo = trend.rows.first().map(|r| r.year).unwrap_or(0) as f64 - 0.5;
        let x_hi = trend.rows.last().map(|r| r.year).unwrap_or(0) as f64 + 0.5;
        let max_dairy = trend
            .rows
            .iter()
            .map(|r| r.tot_dairy)
            .fold(0.0, f64::max);
        let y_max = (max_dairy * 1.15).max(1.0);
        // The secondary range is the primary range divided back through the
        // scaling factor, so both series share one visual scale
        let y2_max = if trend.scaling_factor > 0.0 {
            y_max / trend.scaling_factor
        } else {
            1.0
        };

        let mut buf = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "Total dairy consumption and GDP per capita by year",
                    ("sans-serif", 28),
                )
                .margin(12)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .right_y_label_area_size(90)
                .build_cartesian_2d(x_lo..x_hi, 0.0..y_max)
                .map_err(draw_err)?
                .set_secondary_coord(x_lo..x_hi, 0.0..y2_max);

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc("Year")
                .y_desc("Total dairy consumption (%)")
                .x_label_formatter(&|x| format!("{}", x.round() as i64))
                .draw()
                .map_err(draw_err)?;
            chart
                .configure_secondary_axes()
                .y_desc("Total GDP per capita (constant 2015 US$)")
                .draw()
                .map_err(draw_err)?;

            chart
                .draw_series(LineSeries::new(
                    trend.rows.iter().map(|r| (r.year as f64, r.tot_dairy)),
                    DAIRY_COLOR.stroke_width(3),
                ))
                .map_err(draw_err)?
                .label("Total dairy consumption")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], DAIRY_COLOR.stroke_width(3)));
            chart
                .draw_series(
                    trend
                        .rows
                        .iter()
                        .map(|r| Circle::new((r.year as f64, r.tot_dairy), 4, DAIRY_COLOR.filled())),
                )
                .map_err(draw_err)?;

            chart
                .draw_secondary_series(LineSeries::new(
                    trend.rows.iter().map(|r| (r.year as f64, r.tot_gdp)),
                    GDP_COLOR.stroke_width(3),
                ))
                .map_err(draw_err)?
                .label("Total GDP per capita")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], GDP_COLOR.stroke_width(3)));
            chart
                .draw_secondary_series(
                    trend
                        .rows
                        .iter()
                        .map(|r| Circle::new((r.year as f64, r.tot_gdp), 4, GDP_COLOR.filled())),
                )
                .map_err(draw_err)?;

            // Rounded-thousands labels ride just above the GDP points
            let label_style = ("sans-serif", 14)
                .into_font()
                .color(&GDP_COLOR)
                .pos(Pos::new(HPos::Center, VPos::Bottom));
            chart
                .draw_secondary_series(trend.rows.iter().map(|r| {
                    Text::new(
                        format_gdp_label(r.tot_gdp),
                        (r.year as f64, r.tot_gdp + y2_max * 0.02),
                        label_style.clone(),
                    )
                }))
                .map_err(draw_err)?;

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK.mix(0.4))
                .draw()
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }
        encode_png(width, height, buf)
    }
}

/// One scatter panel: points, least-squares line, highlight labels.
fn scatter_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    points: &[(f64, f64, &str)],
    highlights: &HashSet<&str>,
) -> Result<(), RenderError> {
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.clone(), y_range)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Avg dairy consumption (%)")
        .max_light_lines(2)
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y, _)| Circle::new((*x, *y), 4, POINT_COLOR.filled())),
        )
        .map_err(draw_err)?;

    let pairs: Vec<(f64, f64)> = points.iter().map(|(x, y, _)| (*x, *y)).collect();
    if let Some(fit) = StatsCalculator::fit_points(&pairs) {
        debug!(
            panel = title,
            n = fit.n,
            slope = fit.slope,
            r_squared = fit.r_squared,
            p_value = fit.p_value,
            significant = fit.is_significant(),
            "fitted trend line"
        );
        chart
            .draw_series(LineSeries::new(
                [
                    (x_range.start, fit.predict(x_range.start)),
                    (x_range.end, fit.predict(x_range.end)),
                ],
                TREND_COLOR.stroke_width(2),
            ))
            .map_err(draw_err)?;
    }

    let label_style = ("sans-serif", 14)
        .into_font()
        .color(&LABEL_COLOR)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(
            points
                .iter()
                .filter(|(_, _, name)| highlights.contains(name))
                .map(|(x, y, name)| {
                    Text::new((*name).to_string(), (*x, *y), label_style.clone())
                }),
        )
        .map_err(draw_err)?;

    Ok(())
}

/// Data range padded for plotting; falls back to a unit range when the
/// input is empty or degenerate.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if hi - lo <= f64::EPSILON {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = (hi - lo) * 0.06;
    (lo - pad)..(hi + pad)
}

/// Linear two-color ramp over [lo, hi].
fn ramp_color(value: f64, lo: f64, hi: f64) -> RGBColor {
    let t = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(
        lerp(RAMP_LOW.0, RAMP_HIGH.0),
        lerp(RAMP_LOW.1, RAMP_HIGH.1),
        lerp(RAMP_LOW.2, RAMP_HIGH.2),
    )
}

/// Percentage label with one decimal place.
fn format_pct(value: f64) -> String {
    format!("{value:.1}")
}

/// GDP point label in rounded thousands.
fn format_gdp_label(tot_gdp: f64) -> String {
    format!("${}k", (tot_gdp / 1000.0).round() as i64)
}

fn encode_png(width: u32, height: u32, buf: Vec<u8>) -> Result<Vec<u8>, RenderError> {
    let img = image::RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| RenderError::Draw("pixel buffer size mismatch".to_string()))?;
    let mut bytes: Vec<u8> = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
