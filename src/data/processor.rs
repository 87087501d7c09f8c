//! Data Derivation Module
//! Builds the four summary tables from the loaded source frames.

use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// Column names of the nutrition tables.
pub const COUNTRY_COL: &str = "country";
pub const SEX_COL: &str = "sex";
pub const TIME_COL: &str = "time_period";
pub const VALUE_COL: &str = "obs_value";

/// Column names of the country metadata table.
pub const YEAR_COL: &str = "year";
pub const GDP_COL: &str = "GDP per capita (constant 2015 US$)";
pub const LIFE_COL: &str = "Life expectancy at birth total (years)";

pub const SEX_TOTAL: &str = "Total";
pub const SEX_MALE: &str = "Male";
pub const SEX_FEMALE: &str = "Female";

/// The gender split keeps the first 30 rows after sorting.
pub const GENDER_SPLIT_ROW_CAP: usize = 30;

/// Vertical nudges keeping stacked labels clear of the segment boundary.
const MALE_LABEL_NUDGE: f64 = -0.25;
const FEMALE_LABEL_NUDGE: f64 = 0.25;

/// Reporting year dropped from the trend table.
const EXCLUDED_YEAR: i64 = 2020;

const MACEDONIA_LONG: &str = "Macedonia, the former Yugoslav Republic of";
const MACEDONIA_SHORT: &str = "Macedonia";

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },
}

/// Mean dairy-consumption ratio of one country over all years (Total rows).
#[derive(Debug, Clone, PartialEq)]
pub struct CountryAverage {
    pub country: String,
    pub avg_dairy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => SEX_MALE,
            Sex::Female => SEX_FEMALE,
        }
    }
}

/// One stacked-bar segment: a country/sex mean plus its label geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GenderSplitRow {
    pub country: String,
    pub sex: Sex,
    pub avg_dairy: f64,
    /// Sum of this country's sex-level means.
    pub tot_dairy: f64,
    /// Y position of the percentage label inside the stack.
    pub label_pos: f64,
}

/// Per-country means over the three-way join. Aggregates that the joins
/// cannot supply stay missing rather than collapsing to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicSummaryRow {
    pub country: String,
    pub avg_dairy: Option<f64>,
    pub avg_gdp: Option<f64>,
    pub avg_life_exp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearlyTrendRow {
    pub year: i64,
    pub tot_dairy: f64,
    pub tot_gdp: f64,
}

/// Per-year sums plus the factor mapping GDP onto the dairy axis.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyTrend {
    pub rows: Vec<YearlyTrendRow>,
    /// max(tot_dairy) / max(tot_gdp) over the kept rows.
    pub scaling_factor: f64,
}

/// Builds the derived tables. Every derivation is a pure function of the
/// source frames; nothing is cached between calls.
pub struct DataProcessor;

impl DataProcessor {
    /// Mean dairy ratio per country over the Total rows.
    ///
    /// Countries without Total rows are absent, not zero-filled. Output is
    /// sorted by country name for reproducibility.
    pub fn country_averages(nutrition: &DataFrame) -> Result<Vec<CountryAverage>, DeriveError> {
        require_columns(nutrition, &[COUNTRY_COL, SEX_COL, VALUE_COL])?;

        let grouped = nutrition
            .clone()
            .lazy()
            .filter(col(SEX_COL).eq(lit(SEX_TOTAL)))
            .group_by([col(COUNTRY_COL)])
            .agg([col(VALUE_COL)
                .cast(DataType::Float64)
                .mean()
                .alias("avg_dairy")])
            .collect()?;

        let countries = grouped.column(COUNTRY_COL)?;
        let values = grouped.column("avg_dairy")?.f64()?;

        let mut rows: Vec<CountryAverage> = Vec::with_capacity(grouped.height());
        for i in 0..grouped.height() {
            let country = countries.get(i)?;
            if country.is_null() {
                continue;
            }
            // A group whose observations are all missing has no mean
            let Some(avg) = values.get(i) else { continue };
            rows.push(CountryAverage {
                country: country.to_string().trim_matches('"').to_string(),
                avg_dairy: avg,
            });
        }
        rows.sort_by(|a, b| a.country.cmp(&b.country));
        Ok(rows)
    }

    /// Per-country sex-level means arranged for the stacked bar chart.
    ///
    /// Only Male and Female rows participate. Rows are ordered Male before
    /// Female within a country, stable-sorted by country total descending,
    /// and cut to the first [`GENDER_SPLIT_ROW_CAP`] rows. Label positions
    /// come from a running cumulative sum within each country.
    pub fn gender_split(nutrition: &DataFrame) -> Result<Vec<GenderSplitRow>, DeriveError> {
        require_columns(nutrition, &[COUNTRY_COL, SEX_COL, VALUE_COL])?;

        let grouped = nutrition
            .clone()
            .lazy()
            .filter(
                col(SEX_COL)
                    .eq(lit(SEX_MALE))
                    .or(col(SEX_COL).eq(lit(SEX_FEMALE))),
            )
            .group_by([col(COUNTRY_COL), col(SEX_COL)])
            .agg([col(VALUE_COL)
                .cast(DataType::Float64)
                .mean()
                .alias("avg_dairy")])
            .collect()?;

        let countries = grouped.column(COUNTRY_COL)?;
        let sexes = grouped.column(SEX_COL)?;
        let values = grouped.column("avg_dairy")?.f64()?;

        let mut entries: Vec<(String, Sex, f64)> = Vec::with_capacity(grouped.height());
        for i in 0..grouped.height() {
            let country = countries.get(i)?;
            let sex = sexes.get(i)?;
            if country.is_null() || sex.is_null() {
                continue;
            }
            let Some(avg) = values.get(i) else { continue };
            // Display-name rewrite, applied before sorting and labeling
            let mut country = country.to_string().trim_matches('"').to_string();
            if country == MACEDONIA_LONG {
                country = MACEDONIA_SHORT.to_string();
            }
            let sex = if sex.to_string().trim_matches('"') == SEX_MALE {
                Sex::Male
            } else {
                Sex::Female
            };
            entries.push((country, sex, avg));
        }

        // Country ascending with Male first; the hash grouping above has no
        // usable order of its own
        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut totals: HashMap<String, f64> = HashMap::new();
        for (country, _, avg) in &entries {
            *totals.entry(country.clone()).or_insert(0.0) += avg;
        }

        // Stable sort keeps the arrangement above for equal totals
        entries.sort_by(|a, b| {
            totals[&b.0]
                .partial_cmp(&totals[&a.0])
                .unwrap_or(Ordering::Equal)
        });
        entries.truncate(GENDER_SPLIT_ROW_CAP);

        let mut rows: Vec<GenderSplitRow> = Vec::with_capacity(entries.len());
        let mut current: Option<String> = None;
        let mut cumsum = 0.0;
        for (country, sex, avg) in entries {
            if current.as_deref() != Some(country.as_str()) {
                current = Some(country.clone());
                cumsum = 0.0;
            }
            cumsum += avg;
            let nudge = match sex {
                Sex::Male => MALE_LABEL_NUDGE,
                Sex::Female => FEMALE_LABEL_NUDGE,
            };
            let tot_dairy = totals[&country];
            rows.push(GenderSplitRow {
                country,
                sex,
                avg_dairy: avg,
                tot_dairy,
                label_pos: cumsum - avg / 2.0 + nudge,
            });
        }
        Ok(rows)
    }

    /// Per-country means of dairy ratio, GDP and life expectancy over the
    /// three-way join, Total rows only.
    ///
    /// Means ignore missing values, so a country absent from the metadata
    /// keeps its dairy average and gets `None` for the other two.
    pub fn economic_summary(
        nutrition: &DataFrame,
        extra: Option<&DataFrame>,
        metadata: &DataFrame,
    ) -> Result<Vec<EconomicSummaryRow>, DeriveError> {
        let grouped = combined_lazy(nutrition, extra, metadata)?
            .filter(col(SEX_COL).eq(lit(SEX_TOTAL)))
            .group_by([col(COUNTRY_COL)])
            .agg([
                col(VALUE_COL).mean().alias("avg_dairy"),
                col("gdp_per_capita").mean().alias("avg_gdp"),
                col("life_expectancy").mean().alias("avg_life_exp"),
            ])
            .collect()?;

        let countries = grouped.column(COUNTRY_COL)?;
        let dairy = grouped.column("avg_dairy")?.f64()?;
        let gdp = grouped.column("avg_gdp")?.f64()?;
        let life = grouped.column("avg_life_exp")?.f64()?;

        let mut rows: Vec<EconomicSummaryRow> = Vec::with_capacity(grouped.height());
        for i in 0..grouped.height() {
            let country = countries.get(i)?;
            if country.is_null() {
                continue;
            }
            rows.push(EconomicSummaryRow {
                country: country.to_string().trim_matches('"').to_string(),
                avg_dairy: dairy.get(i),
                avg_gdp: gdp.get(i),
                avg_life_exp: life.get(i),
            });
        }
        rows.sort_by(|a, b| a.country.cmp(&b.country));
        Ok(rows)
    }

    /// Per-year sums of dairy ratio and GDP, Total rows only.
    ///
    /// Sums count missing values as zero, unlike the means in
    /// [`Self::economic_summary`]. Years with a non-positive GDP sum and
    /// the 2020 reporting year are dropped; rows come back sorted by year.
    pub fn yearly_trend(
        nutrition: &DataFrame,
        extra: Option<&DataFrame>,
        metadata: &DataFrame,
    ) -> Result<YearlyTrend, DeriveError> {
        let grouped = combined_lazy(nutrition, extra, metadata)?
            .filter(col(SEX_COL).eq(lit(SEX_TOTAL)))
            .group_by([col(TIME_COL)])
            .agg([
                col(VALUE_COL).sum().alias("tot_dairy"),
                col("gdp_per_capita").sum().alias("tot_gdp"),
            ])
            .collect()?;

        let years = grouped.column(TIME_COL)?.i64()?;
        let dairy = grouped.column("tot_dairy")?.f64()?;
        let gdp = grouped.column("tot_gdp")?.f64()?;

        let mut rows: Vec<YearlyTrendRow> = Vec::with_capacity(grouped.height());
        for i in 0..grouped.height() {
            // Unparseable periods carry null keys and never join anyway
            let Some(year) = years.get(i) else { continue };
            let tot_dairy = dairy.get(i).unwrap_or(0.0);
            let tot_gdp = gdp.get(i).unwrap_or(0.0);
            if year == EXCLUDED_YEAR || tot_gdp <= 0.0 {
                continue;
            }
            rows.push(YearlyTrendRow {
                year,
                tot_dairy,
                tot_gdp,
            });
        }
        rows.sort_by_key(|r| r.year);

        let max_dairy = rows.iter().map(|r| r.tot_dairy).fold(f64::NAN, f64::max);
        let max_gdp = rows.iter().map(|r| r.tot_gdp).fold(f64::NAN, f64::max);
        let scaling_factor = if max_gdp > 0.0 { max_dairy / max_gdp } else { 0.0 };

        Ok(YearlyTrend {
            rows,
            scaling_factor,
        })
    }
}

fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), DeriveError> {
    let names = df.get_column_names();
    for &column in columns {
        if !names.iter().any(|c| c.as_str() == column) {
            return Err(DeriveError::MissingColumn {
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Normalize a nutrition frame to (country, sex, time_period: i64, obs_value: f64).
fn nutrition_lazy(df: &DataFrame) -> Result<LazyFrame, DeriveError> {
    require_columns(df, &[COUNTRY_COL, SEX_COL, TIME_COL, VALUE_COL])?;
    Ok(df.clone().lazy().select([
        col(COUNTRY_COL),
        col(SEX_COL),
        col(TIME_COL).cast(DataType::Int64),
        col(VALUE_COL).cast(DataType::Float64),
    ]))
}

/// Normalize the metadata frame and shorten its indicator column names.
fn metadata_lazy(df: &DataFrame) -> Result<LazyFrame, DeriveError> {
    require_columns(df, &[COUNTRY_COL, YEAR_COL, GDP_COL, LIFE_COL])?;
    Ok(df.clone().lazy().select([
        col(COUNTRY_COL),
        col(YEAR_COL).cast(DataType::Int64),
        col(GDP_COL).cast(DataType::Float64).alias("gdp_per_capita"),
        col(LIFE_COL).cast(DataType::Float64).alias("life_expectancy"),
    ]))
}

/// The shared three-way combination behind
/// [`DataProcessor::economic_summary`] and [`DataProcessor::yearly_trend`]:
/// union the nutrition sources, drop duplicate rows, then full-outer join
/// the metadata on (country, time_period = year) with key coalescing.
fn combined_lazy(
    nutrition: &DataFrame,
    extra: Option<&DataFrame>,
    metadata: &DataFrame,
) -> Result<LazyFrame, DeriveError> {
    let mut sources = vec![nutrition_lazy(nutrition)?];
    if let Some(extra) = extra {
        sources.push(nutrition_lazy(extra)?);
    }
    let merged =
        concat(sources, UnionArgs::default())?.unique_stable(None, UniqueKeepStrategy::First);

    Ok(merged.join(
        metadata_lazy(metadata)?,
        [col(COUNTRY_COL), col(TIME_COL)],
        [col(COUNTRY_COL), col(YEAR_COL)],
        JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nutrition_fixture() -> DataFrame {
        df!(
            COUNTRY_COL => &[
                "United States",
                "United States",
                "United States",
                "France",
                "France",
                "France",
            ],
            SEX_COL => &["Total", "Total", "Male", "Male", "Female", "Total"],
            TIME_COL => &[2010i64, 2012, 2010, 2010, 2010, 2010],
            VALUE_COL => &[10.0, 20.0, 99.0, 40.0, 60.0, 50.0],
        )
        .unwrap()
    }

    fn metadata_fixture() -> DataFrame {
        df!(
            COUNTRY_COL => &["France"],
            YEAR_COL => &[2010i64],
            GDP_COL => &[40000.0],
            LIFE_COL => &[82.0],
        )
        .unwrap()
    }

    #[test]
    fn test_country_average_means_total_rows_only() {
        let rows = DataProcessor::country_averages(&nutrition_fixture()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country, "France");
        assert!((rows[0].avg_dairy - 50.0).abs() < 1e-9);
        assert_eq!(rows[1].country, "United States");
        assert!((rows[1].avg_dairy - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_country_average_omits_countries_without_total_rows() {
        let df = df!(
            COUNTRY_COL => &["Elbonia", "Elbonia"],
            SEX_COL => &["Male", "Female"],
            TIME_COL => &[2010i64, 2010],
            VALUE_COL => &[30.0, 35.0],
        )
        .unwrap();
        let rows = DataProcessor::country_averages(&df).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_country_average_missing_column_names_it() {
        let df = df!(
            COUNTRY_COL => &["France"],
            TIME_COL => &[2010i64],
            VALUE_COL => &[50.0],
        )
        .unwrap();
        let err = DataProcessor::country_averages(&df).unwrap_err();
        assert!(matches!(err, DeriveError::MissingColumn { .. }));
        assert!(err.to_string().contains(SEX_COL));
    }

    #[test]
    fn test_gender_split_label_positions_match_worked_example() {
        let rows = DataProcessor::gender_split(&nutrition_fixture()).unwrap();
        // France (tot 100) ahead of United States (tot 99, Male only)
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].country, "France");
        assert_eq!(rows[0].sex, Sex::Male);
        assert!((rows[0].tot_dairy - 100.0).abs() < 1e-9);
        assert!((rows[0].label_pos - 19.75).abs() < 1e-9);

        assert_eq!(rows[1].country, "France");
        assert_eq!(rows[1].sex, Sex::Female);
        assert!((rows[1].label_pos - 70.25).abs() < 1e-9);

        assert_eq!(rows[2].country, "United States");
        assert_eq!(rows[2].sex, Sex::Male);
    }

    #[test]
    fn test_gender_split_totals_are_sum_of_sex_means() {
        let rows = DataProcessor::gender_split(&nutrition_fixture()).unwrap();
        let france: Vec<_> = rows.iter().filter(|r| r.country == "France").collect();
        assert_eq!(france.len(), 2);
        let sum: f64 = france.iter().map(|r| r.avg_dairy).sum();
        assert!((sum - france[0].tot_dairy).abs() < 1e-9);
    }

    #[test]
    fn test_gender_split_caps_rows_and_sorts_descending() {
        let mut countries: Vec<String> = Vec::new();
        let mut sexes: Vec<String> = Vec::new();
        let mut years: Vec<i64> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        for i in 0..16 {
            let name = format!("Country{i:02}");
            countries.push(name.clone());
            sexes.push(SEX_MALE.to_string());
            years.push(2010);
            values.push(50.0 + i as f64);
            countries.push(name);
            sexes.push(SEX_FEMALE.to_string());
            years.push(2010);
            values.push(40.0);
        }
        let df = DataFrame::new(vec![
            Column::new(COUNTRY_COL.into(), countries),
            Column::new(SEX_COL.into(), sexes),
            Column::new(TIME_COL.into(), years),
            Column::new(VALUE_COL.into(), values),
        ])
        .unwrap();

        let rows = DataProcessor::gender_split(&df).unwrap();
        assert_eq!(rows.len(), GENDER_SPLIT_ROW_CAP);

        // Country00 has the smallest total and is the one cut
        assert!(rows.iter().all(|r| r.country != "Country00"));
        assert_eq!(rows[0].country, "Country15");

        // Two rows per surviving country, Male first, totals descending
        for pair in rows.chunks(2) {
            assert_eq!(pair[0].country, pair[1].country);
            assert_eq!(pair[0].sex, Sex::Male);
            assert_eq!(pair[1].sex, Sex::Female);
        }
        for pair in rows.windows(2) {
            assert!(pair[0].tot_dairy >= pair[1].tot_dairy);
        }
    }

    #[test]
    fn test_gender_split_renames_macedonia() {
        let df = df!(
            COUNTRY_COL => &[
                "Macedonia, the former Yugoslav Republic of",
                "Macedonia, the former Yugoslav Republic of",
            ],
            SEX_COL => &["Male", "Female"],
            TIME_COL => &[2010i64, 2010],
            VALUE_COL => &[30.0, 35.0],
        )
        .unwrap();
        let rows = DataProcessor::gender_split(&df).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.country == "Macedonia"));
    }

    #[test]
    fn test_gender_split_equal_totals_keep_name_order() {
        let df = df!(
            COUNTRY_COL => &["Betaland", "Betaland", "Alphaland", "Alphaland"],
            SEX_COL => &["Male", "Female", "Male", "Female"],
            TIME_COL => &[2010i64, 2010, 2010, 2010],
            VALUE_COL => &[50.0, 50.0, 50.0, 50.0],
        )
        .unwrap();
        let rows = DataProcessor::gender_split(&df).unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(order, vec!["Alphaland", "Alphaland", "Betaland", "Betaland"]);
    }

    #[test]
    fn test_economic_summary_keeps_dairy_when_metadata_is_absent() {
        let nutrition = df!(
            COUNTRY_COL => &["France", "Elbonia"],
            SEX_COL => &["Total", "Total"],
            TIME_COL => &[2010i64, 2010],
            VALUE_COL => &[50.0, 20.0],
        )
        .unwrap();
        let rows =
            DataProcessor::economic_summary(&nutrition, None, &metadata_fixture()).unwrap();
        assert_eq!(rows.len(), 2);

        let elbonia = &rows[0];
        assert_eq!(elbonia.country, "Elbonia");
        assert_eq!(elbonia.avg_dairy, Some(20.0));
        assert_eq!(elbonia.avg_gdp, None);
        assert_eq!(elbonia.avg_life_exp, None);

        let france = &rows[1];
        assert_eq!(france.avg_dairy, Some(50.0));
        assert_eq!(france.avg_gdp, Some(40000.0));
        assert_eq!(france.avg_life_exp, Some(82.0));
    }

    #[test]
    fn test_economic_summary_deduplicates_shared_rows() {
        let nutrition = df!(
            COUNTRY_COL => &["France"],
            SEX_COL => &["Total"],
            TIME_COL => &[2010i64],
            VALUE_COL => &[10.0],
        )
        .unwrap();
        // The first row duplicates the primary source and must not bias the mean
        let extra = df!(
            COUNTRY_COL => &["France", "France"],
            SEX_COL => &["Total", "Total"],
            TIME_COL => &[2010i64, 2012],
            VALUE_COL => &[10.0, 30.0],
        )
        .unwrap();

        let rows =
            DataProcessor::economic_summary(&nutrition, Some(&extra), &metadata_fixture())
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_dairy, Some(20.0));
    }

    #[test]
    fn test_economic_summary_missing_metadata_column_names_it() {
        let bad_metadata = df!(
            COUNTRY_COL => &["France"],
            YEAR_COL => &[2010i64],
            LIFE_COL => &[82.0],
        )
        .unwrap();
        let err =
            DataProcessor::economic_summary(&nutrition_fixture(), None, &bad_metadata)
                .unwrap_err();
        assert!(matches!(err, DeriveError::MissingColumn { .. }));
        assert!(err.to_string().contains(GDP_COL));
    }

    #[test]
    fn test_yearly_trend_excludes_2020_and_nonpositive_gdp_years() {
        let nutrition = df!(
            COUNTRY_COL => &["France", "Spain", "France", "France"],
            SEX_COL => &["Total", "Total", "Total", "Total"],
            TIME_COL => &[2010i64, 2010, 2015, 2020],
            VALUE_COL => &[10.0, 20.0, 30.0, 40.0],
        )
        .unwrap();
        let metadata = df!(
            COUNTRY_COL => &["France", "Spain", "France"],
            YEAR_COL => &[2010i64, 2010, 2020],
            GDP_COL => &[1000.0, 2000.0, 500.0],
            LIFE_COL => &[82.0, 83.0, 82.5],
        )
        .unwrap();

        let trend = DataProcessor::yearly_trend(&nutrition, None, &metadata).unwrap();
        // 2015 has no GDP and 2020 is excluded outright
        assert_eq!(trend.rows.len(), 1);
        assert_eq!(trend.rows[0].year, 2010);
        assert!((trend.rows[0].tot_dairy - 30.0).abs() < 1e-9);
        assert!((trend.rows[0].tot_gdp - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_yearly_trend_sums_count_missing_as_zero() {
        let nutrition = df!(
            COUNTRY_COL => &["France", "Spain"],
            SEX_COL => &["Total", "Total"],
            TIME_COL => &[2012i64, 2012],
            VALUE_COL => &[Some(10.0), None],
        )
        .unwrap();
        let metadata = df!(
            COUNTRY_COL => &["France", "Spain"],
            YEAR_COL => &[2012i64, 2012],
            GDP_COL => &[1000.0, 2000.0],
            LIFE_COL => &[82.0, 83.0],
        )
        .unwrap();

        let trend = DataProcessor::yearly_trend(&nutrition, None, &metadata).unwrap();
        assert_eq!(trend.rows.len(), 1);
        // Spain's missing observation counts as zero, its GDP still counts
        assert!((trend.rows[0].tot_dairy - 10.0).abs() < 1e-9);
        assert!((trend.rows[0].tot_gdp - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_yearly_trend_scaling_factor_maps_gdp_onto_dairy_axis() {
        let nutrition = df!(
            COUNTRY_COL => &["France", "France", "France"],
            SEX_COL => &["Total", "Total", "Total"],
            TIME_COL => &[2010i64, 2011, 2012],
            VALUE_COL => &[10.0, 50.0, 30.0],
        )
        .unwrap();
        let metadata = df!(
            COUNTRY_COL => &["France", "France", "France"],
            YEAR_COL => &[2010i64, 2011, 2012],
            GDP_COL => &[1000.0, 4000.0, 2000.0],
            LIFE_COL => &[82.0, 82.1, 82.2],
        )
        .unwrap();

        let trend = DataProcessor::yearly_trend(&nutrition, None, &metadata).unwrap();
        assert_eq!(trend.rows.len(), 3);
        assert_eq!(trend.rows[0].year, 2010);
        assert_eq!(trend.rows[2].year, 2012);

        let max_dairy = trend.rows.iter().map(|r| r.tot_dairy).fold(0.0, f64::max);
        let max_gdp = trend.rows.iter().map(|r| r.tot_gdp).fold(0.0, f64::max);
        assert!((trend.scaling_factor * max_gdp - max_dairy).abs() < 1e-9);
        assert!((trend.scaling_factor - 50.0 / 4000.0).abs() < 1e-12);
    }
}
