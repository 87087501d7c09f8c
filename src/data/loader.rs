//! Data Loading Module
//! Reads the delimited source tables and the world map reference using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::ReportConfig;

/// Column names of the world map reference table.
pub const MAP_LONG: &str = "long";
pub const MAP_LAT: &str = "lat";
pub const MAP_GROUP: &str = "group";
pub const MAP_ORDER: &str = "order";
pub const MAP_REGION: &str = "region";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("{} contains no rows", path.display())]
    Empty { path: PathBuf },
}

/// One closed country outline from the map reference.
#[derive(Debug, Clone)]
pub struct MapPolygon {
    pub region: String,
    pub points: Vec<(f64, f64)>,
}

/// All country outlines, keyed by region name via `polygons`.
#[derive(Debug, Clone, Default)]
pub struct WorldMap {
    pub polygons: Vec<MapPolygon>,
}

/// The loaded source tables for one report build.
pub struct DatasetBundle {
    pub nutrition: DataFrame,
    pub nutrition_extra: Option<DataFrame>,
    pub metadata: DataFrame,
    pub world_map: WorldMap,
}

/// Load a delimited file into a DataFrame.
///
/// The parse is lenient: rows that fail to parse under the inferred schema
/// become nulls instead of aborting the load. Column presence is checked at
/// derivation time, not here.
pub fn load_table(path: &Path) -> Result<DataFrame, LoadError> {
    let path_str = path.to_string_lossy().to_string();

    // Use lazy evaluation for memory efficiency, then collect
    let df = LazyCsvReader::new(&path_str)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    if df.height() == 0 {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(df)
}

/// Load the map reference and assemble country outlines.
///
/// Vertices are ordered by (group, order); each group id closes one polygon.
/// Rows with a missing region or coordinate are skipped.
pub fn load_world_map(path: &Path) -> Result<WorldMap, LoadError> {
    let df = load_table(path)?;

    let to_load_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let longs = df
        .column(MAP_LONG)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(to_load_err)?;
    let lats = df
        .column(MAP_LAT)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(to_load_err)?;
    let groups = df
        .column(MAP_GROUP)
        .and_then(|c| c.cast(&DataType::Int64))
        .map_err(to_load_err)?;
    let orders = df
        .column(MAP_ORDER)
        .and_then(|c| c.cast(&DataType::Int64))
        .map_err(to_load_err)?;
    let regions = df.column(MAP_REGION).map_err(to_load_err)?;

    let longs = longs.f64().map_err(to_load_err)?;
    let lats = lats.f64().map_err(to_load_err)?;
    let groups = groups.i64().map_err(to_load_err)?;
    let orders = orders.i64().map_err(to_load_err)?;

    // (group, order, long, lat, region) with nulls dropped
    let mut vertices: Vec<(i64, i64, f64, f64, String)> = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(g), Some(o), Some(x), Some(y)) =
            (groups.get(i), orders.get(i), longs.get(i), lats.get(i))
        else {
            continue;
        };
        let Ok(region) = regions.get(i) else { continue };
        if region.is_null() {
            continue;
        }
        let region = region.to_string().trim_matches('"').to_string();
        vertices.push((g, o, x, y, region));
    }
    vertices.sort_by_key(|v| (v.0, v.1));

    let mut map = WorldMap::default();
    let mut current_group: Option<i64> = None;
    for (g, _, x, y, region) in vertices {
        if current_group != Some(g) {
            map.polygons.push(MapPolygon {
                region,
                points: Vec::new(),
            });
            current_group = Some(g);
        }
        if let Some(poly) = map.polygons.last_mut() {
            poly.points.push((x, y));
        }
    }

    Ok(map)
}

/// Load every source table named by the configuration.
pub fn load_datasets(cfg: &ReportConfig) -> Result<DatasetBundle, LoadError> {
    let nutrition = load_table(&cfg.nutrition_path)?;
    info!(
        rows = nutrition.height(),
        path = %cfg.nutrition_path.display(),
        "loaded nutrition table"
    );

    let nutrition_extra = match &cfg.extra_nutrition_path {
        Some(path) => {
            let df = load_table(path)?;
            info!(rows = df.height(), path = %path.display(), "loaded extra nutrition table");
            Some(df)
        }
        None => None,
    };

    let metadata = load_table(&cfg.metadata_path)?;
    info!(
        rows = metadata.height(),
        path = %cfg.metadata_path.display(),
        "loaded country metadata table"
    );

    let world_map = load_world_map(&cfg.world_map_path)?;
    info!(polygons = world_map.polygons.len(), "loaded world map reference");

    Ok(DatasetBundle {
        nutrition,
        nutrition_extra,
        metadata,
        world_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_table_reads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "nutrition.csv",
            "country,sex,time_period,obs_value\nFrance,Total,2010,41.5\nFrance,Male,2010,39.0\n",
        );

        let df = load_table(&path).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["country", "sex", "time_period", "obs_value"]);
    }

    #[test]
    fn test_load_table_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
        assert!(err.to_string().contains("absent.csv"));
    }

    #[test]
    fn test_load_table_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "empty.csv", "country,sex,time_period,obs_value\n");
        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn test_world_map_groups_polygons_in_vertex_order() {
        let dir = tempfile::tempdir().unwrap();
        // Group 2 listed first and with shuffled vertex order
        let path = write_csv(
            &dir,
            "map.csv",
            "long,lat,group,order,region\n\
             10.0,20.0,2,2,Borduria\n\
             9.0,19.0,2,1,Borduria\n\
             0.0,0.0,1,1,Syldavia\n\
             1.0,0.0,1,2,Syldavia\n\
             1.0,1.0,1,3,Syldavia\n",
        );

        let map = load_world_map(&path).unwrap();
        assert_eq!(map.polygons.len(), 2);

        assert_eq!(map.polygons[0].region, "Syldavia");
        assert_eq!(
            map.polygons[0].points,
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]
        );

        assert_eq!(map.polygons[1].region, "Borduria");
        assert_eq!(map.polygons[1].points, vec![(9.0, 19.0), (10.0, 20.0)]);
    }

    #[test]
    fn test_world_map_skips_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "map.csv",
            "long,lat,group,order,region\n\
             0.0,0.0,1,1,Syldavia\n\
             ,1.0,1,2,Syldavia\n\
             1.0,1.0,1,3,Syldavia\n",
        );

        let map = load_world_map(&path).unwrap();
        assert_eq!(map.polygons.len(), 1);
        assert_eq!(map.polygons[0].points.len(), 2);
    }
}
