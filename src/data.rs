use crate::config::InputConfig;
use crate::types::{GeoFeature, ZipRecord};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Loads the tabular records and the shapes concurrently. Both must succeed.
pub async fn load_inputs(input: &InputConfig) -> Result<(Vec<ZipRecord>, Vec<GeoFeature>)> {
    let records_input = input.clone();
    let shapes_input = input.clone();

    let records = tokio::task::spawn_blocking(move || load_records(&records_input));
    let features = tokio::task::spawn_blocking(move || load_features(&shapes_input));

    let (records, features) = tokio::try_join!(records, features)
        .context("Loader task panicked")?;
    let records = records?;
    let features = features?;

    info!(
        records = records.len(),
        features = features.len(),
        "Loaded map inputs"
    );
    Ok((records, features))
}

fn extension_of(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input file has no extension: {:?}", path))
}

pub fn load_records(input: &InputConfig) -> Result<Vec<ZipRecord>> {
    let records = match extension_of(&input.data)?.as_str() {
        "json" => load_json_records(input)?,
        "csv" => load_csv_records(input)?,
        other => return Err(anyhow!("Unsupported data format: {}", other)),
    };
    debug!("Loaded {} records from {:?}", records.len(), input.data);
    Ok(records)
}

fn load_json_records(input: &InputConfig) -> Result<Vec<ZipRecord>> {
    let file = File::open(&input.data)
        .with_context(|| format!("Failed to open data file: {:?}", input.data))?;
    let rows: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse JSON records: {:?}", input.data))?;

    rows.into_iter()
        .map(|mut row| {
            // Normalise a custom join column onto `zipcode`.
            if input.join_column_data != "zipcode" {
                let id = row
                    .remove(&input.join_column_data)
                    .ok_or_else(|| anyhow!("Join column '{}' missing from record", input.join_column_data))?;
                row.insert("zipcode".to_string(), id);
            }
            serde_json::from_value(serde_json::Value::Object(row))
                .context("Malformed record in JSON data")
        })
        .collect()
}

fn load_csv_records(input: &InputConfig) -> Result<Vec<ZipRecord>> {
    let file = File::open(&input.data)
        .with_context(|| format!("Failed to open CSV file: {:?}", input.data))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let join_col_idx = headers
        .iter()
        .position(|h| h == input.join_column_data)
        .ok_or_else(|| anyhow!("Join column '{}' not found in CSV", input.join_column_data))?;
    let column = |name: &str| headers.iter().position(|h| h == name);
    let neighborhood_idx = column("neighborhood");
    let sleep_idx = column("sleep_deprivation");
    let income_idx = column("median_income");
    let education_idx = column("education_ba_plus");
    let poverty_idx = column("poverty_rate");

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).filter(|s| !s.is_empty());
        let number = |idx: Option<usize>| -> Result<Option<f64>> {
            field(idx)
                .map(|s| {
                    s.trim()
                        .parse::<f64>()
                        .with_context(|| format!("Non-numeric CSV value '{}'", s))
                })
                .transpose()
        };

        records.push(ZipRecord {
            zipcode: row.get(join_col_idx).unwrap_or("").to_string(),
            neighborhood: field(neighborhood_idx).map(str::to_string),
            sleep_deprivation: number(sleep_idx)?,
            median_income: number(income_idx)?,
            education_ba_plus: number(education_idx)?,
            poverty_rate: number(poverty_idx)?,
        });
    }

    Ok(records)
}

pub fn load_features(input: &InputConfig) -> Result<Vec<GeoFeature>> {
    let features = match extension_of(&input.shapes)?.as_str() {
        "shp" => load_shapefile(input)?,
        "json" | "geojson" => load_geojson(input)?,
        other => return Err(anyhow!("Unsupported geometry format: {}", other)),
    };
    debug!("Loaded {} features from {:?}", features.len(), input.shapes);
    Ok(features)
}

fn load_shapefile(input: &InputConfig) -> Result<Vec<GeoFeature>> {
    let mut reader = Reader::from_path(&input.shapes)
        .with_context(|| format!("Failed to open Shapefile: {:?}", input.shapes))?;

    let mut features = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let zcta5 = match record.get(&input.join_column_shape) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
            Some(shapefile::dbase::FieldValue::Numeric(Some(n))) => Some(n.to_string()),
            Some(_) => None,
            None => {
                return Err(anyhow!(
                    "Join column '{}' not found in Shapefile",
                    input.join_column_shape
                ))
            }
        };

        let geometry: Option<MultiPolygon<f64>> = match shape {
            shapefile::Shape::Polygon(polygon) => Some(
                polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            ),
            shapefile::Shape::PolygonM(polygon) => Some(
                polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            ),
            shapefile::Shape::PolygonZ(polygon) => Some(
                polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            ),
            _ => None,
        };

        features.push(GeoFeature { zcta5, geometry });
    }

    Ok(features)
}

fn load_geojson(input: &InputConfig) -> Result<Vec<GeoFeature>> {
    let file = File::open(&input.shapes)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", input.shapes))?;
    let content = std::io::read_to_string(BufReader::new(file))
        .with_context(|| format!("Failed to read GeoJSON file: {:?}", input.shapes))?;
    parse_geojson(&content, &input.join_column_shape)
}

/// Parses a GeoJSON FeatureCollection into features keyed by `join_column`.
pub fn parse_geojson(content: &str, join_column: &str) -> Result<Vec<GeoFeature>> {
    use geojson::GeoJson;

    let geojson: GeoJson = content.parse().context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let zcta5 = match feature.properties.as_ref().and_then(|p| p.get(join_column)) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match geometry {
                    geo::Geometry::MultiPolygon(mp) => Some(mp),
                    geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
                    _ => None,
                }
            }
            None => None,
        };

        features.push(GeoFeature { zcta5, geometry });
    }

    Ok(features)
}
