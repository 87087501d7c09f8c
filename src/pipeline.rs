//! Report Pipeline Module
//! Runs the whole build: load the source tables, derive the four summary
//! tables, render their figures in parallel and write the deck.
//!
//! A failed figure is dropped from the deck and reported in the summary;
//! only a failed source load or a deck with zero figures aborts the build.

use thiserror::Error;
use tracing::{error, info};

use crate::charts::{RenderError, StaticChartRenderer};
use crate::config::ReportConfig;
use crate::data::{
    self, DataProcessor, DatasetBundle, DeriveError, LoadError,
};
use crate::report::{DocError, ReportFigure, ReportGenerator};

/// Figure names, in deck order.
pub const MAP_FIGURE: &str = "World dairy map";
pub const GENDER_FIGURE: &str = "Dairy consumption by sex";
pub const ECONOMICS_FIGURE: &str = "Consumption vs economy";
pub const TREND_FIGURE: &str = "Yearly trend";

const MAP_CAPTION: &str = "Average share of children consuming dairy products, by country. \
    Countries without survey data keep the base fill.";
const GENDER_CAPTION: &str = "Top countries by combined dairy consumption, split by sex. \
    Segment labels give each group's mean share.";
const ECONOMICS_CAPTION: &str = "Country mean dairy consumption against GDP per capita and \
    life expectancy, with least-squares trend lines.";
const TREND_CAPTION: &str = "Total reported dairy consumption and summed GDP per capita by \
    survey year. Dollar labels mark the GDP curve.";

#[derive(Error, Debug)]
pub enum FigureError {
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error("no figure could be produced")]
    NoFigures,
}

/// What the build delivered and what it had to drop.
#[derive(Debug)]
pub struct BuildSummary {
    pub rendered: usize,
    pub failed: Vec<(&'static str, FigureError)>,
}

impl BuildSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build the full report deck described by the configuration.
pub fn build_report(config: &ReportConfig) -> Result<BuildSummary, BuildError> {
    let datasets = data::load_datasets(config)?;

    let mut ready = Vec::new();
    let mut failed = Vec::new();
    for (name, result) in build_figures(config, &datasets) {
        match result {
            Ok(figure) => {
                info!(figure = name, bytes = figure.png.len(), "figure rendered");
                ready.push(figure);
            }
            Err(err) => {
                error!(figure = name, error = %err, "figure dropped from the deck");
                failed.push((name, err));
            }
        }
    }

    if ready.is_empty() {
        return Err(BuildError::NoFigures);
    }

    if let Some(dir) = &config.figures_dir {
        let paths = ReportGenerator::export_figures_png(&ready, dir)?;
        info!(count = paths.len(), dir = %dir.display(), "figures exported");
    }

    ReportGenerator::write_deck(&ready, &config.output_path, &config.report_title)?;

    Ok(BuildSummary {
        rendered: ready.len(),
        failed,
    })
}

/// Derive and render the four figures, two rayon pairs at a time.
/// Results come back in deck order regardless of completion order.
fn build_figures(
    config: &ReportConfig,
    datasets: &DatasetBundle,
) -> Vec<(&'static str, Result<ReportFigure, FigureError>)> {
    let ((map, gender), (economics, trend)) = rayon::join(
        || {
            rayon::join(
                || map_figure(config, datasets),
                || gender_figure(config, datasets),
            )
        },
        || {
            rayon::join(
                || economics_figure(config, datasets),
                || trend_figure(config, datasets),
            )
        },
    );

    vec![
        (MAP_FIGURE, map),
        (GENDER_FIGURE, gender),
        (ECONOMICS_FIGURE, economics),
        (TREND_FIGURE, trend),
    ]
}

fn map_figure(
    config: &ReportConfig,
    datasets: &DatasetBundle,
) -> Result<ReportFigure, FigureError> {
    let averages = DataProcessor::country_averages(&datasets.nutrition)?;
    let png = StaticChartRenderer::render_choropleth(
        &datasets.world_map,
        &averages,
        config.figure_width,
        config.figure_height,
    )?;
    Ok(new_figure(MAP_FIGURE, MAP_CAPTION, png, config))
}

fn gender_figure(
    config: &ReportConfig,
    datasets: &DatasetBundle,
) -> Result<ReportFigure, FigureError> {
    let rows = DataProcessor::gender_split(&datasets.nutrition)?;
    let png = StaticChartRenderer::render_gender_split(
        &rows,
        config.figure_width,
        config.figure_height,
    )?;
    Ok(new_figure(GENDER_FIGURE, GENDER_CAPTION, png, config))
}

fn economics_figure(
    config: &ReportConfig,
    datasets: &DatasetBundle,
) -> Result<ReportFigure, FigureError> {
    let rows = DataProcessor::economic_summary(
        &datasets.nutrition,
        datasets.nutrition_extra.as_ref(),
        &datasets.metadata,
    )?;
    let png = StaticChartRenderer::render_economic_scatter(
        &rows,
        &config.highlight_countries,
        config.figure_width,
        config.figure_height,
    )?;
    Ok(new_figure(ECONOMICS_FIGURE, ECONOMICS_CAPTION, png, config))
}

fn trend_figure(
    config: &ReportConfig,
    datasets: &DatasetBundle,
) -> Result<ReportFigure, FigureError> {
    let trend = DataProcessor::yearly_trend(
        &datasets.nutrition,
        datasets.nutrition_extra.as_ref(),
        &datasets.metadata,
    )?;
    let png = StaticChartRenderer::render_yearly_trend(
        &trend,
        config.figure_width,
        config.figure_height,
    )?;
    Ok(new_figure(TREND_FIGURE, TREND_CAPTION, png, config))
}

fn new_figure(title: &str, caption: &str, png: Vec<u8>, config: &ReportConfig) -> ReportFigure {
    ReportFigure {
        title: title.to_string(),
        caption: caption.to_string(),
        png,
        width: config.figure_width,
        height: config.figure_height,
    }
}
