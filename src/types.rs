use anyhow::{anyhow, Result};
use geo::MultiPolygon;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One row of the tabular dataset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ZipRecord {
    #[serde(deserialize_with = "zipcode_from_any")]
    pub zipcode: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub sleep_deprivation: Option<f64>,
    #[serde(default)]
    pub median_income: Option<f64>,
    #[serde(default)]
    pub education_ba_plus: Option<f64>,
    #[serde(default)]
    pub poverty_rate: Option<f64>,
}

// Zip codes sometimes arrive as bare JSON numbers.
fn zipcode_from_any<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "zipcode must be a string or number, got {}",
            other
        ))),
    }
}

/// A shape from the geographic document. `geometry` is `None` for features
/// without polygonal geometry; they still get a (empty) path when rendered.
#[derive(Debug, Clone)]
pub struct GeoFeature {
    pub zcta5: Option<String>,
    pub geometry: Option<MultiPolygon<f64>>,
}

/// The selectable demographic variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKey {
    #[default]
    SleepDeprivation,
    MedianIncome,
    EducationBaPlus,
    PovertyRate,
}

impl VariableKey {
    pub const ALL: [VariableKey; 4] = [
        VariableKey::SleepDeprivation,
        VariableKey::MedianIncome,
        VariableKey::EducationBaPlus,
        VariableKey::PovertyRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKey::SleepDeprivation => "sleep_deprivation",
            VariableKey::MedianIncome => "median_income",
            VariableKey::EducationBaPlus => "education_ba_plus",
            VariableKey::PovertyRate => "poverty_rate",
        }
    }

    /// Field value of this variable on a record.
    pub fn value_of(&self, record: &ZipRecord) -> Option<f64> {
        match self {
            VariableKey::SleepDeprivation => record.sleep_deprivation,
            VariableKey::MedianIncome => record.median_income,
            VariableKey::EducationBaPlus => record.education_ba_plus,
            VariableKey::PovertyRate => record.poverty_rate,
        }
    }

    /// Underscores replaced by spaces, e.g. "sleep deprivation".
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Upper-cased label split into words, one per legend title line.
    pub fn title_words(&self) -> Vec<String> {
        self.label()
            .to_uppercase()
            .split(' ')
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        VariableKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown variable '{}'", s))
    }
}

/// Records plus the zipcode index built once after load.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<ZipRecord>,
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(records: Vec<ZipRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            // first occurrence wins on duplicate zipcodes
            index.entry(record.zipcode.clone()).or_insert(i);
        }
        Self { records, index }
    }

    pub fn lookup(&self, zipcode: &str) -> Option<&ZipRecord> {
        self.index.get(zipcode).map(|&i| &self.records[i])
    }

    /// Non-missing values of `variable`, in record order.
    pub fn values(&self, variable: VariableKey) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| variable.value_of(r))
            .filter(|v| !v.is_nan())
            .collect()
    }
}
