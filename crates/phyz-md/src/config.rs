//! JSON configuration of a pair fix.
//!
//! ```json
//! {
//!   "style": "LJCut",
//!   "species": [
//!     { "handle": "A", "epsilon": 1.0, "sigma": 1.0, "rCut": 2.5 },
//!     { "handle": "B", "epsilon": 4.0, "sigma": 2.0, "rCut": 5.0, "alpha_A": 0.1 }
//!   ],
//!   "pairs": [ { "a": "A", "b": "B", "epsilon": 1.5 } ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PairError, Result};
use crate::fix::PairFix;
use crate::registry::LJ_CUT_TAG;
use crate::species::{FIELD_COUNT, Field, ParameterTable, SpeciesId};

/// Optional values for each field. Absent fields stay unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(rename = "rCut", default, skip_serializing_if = "Option::is_none")]
    pub r_cut: Option<f64>,
    #[serde(rename = "sigma_R", default, skip_serializing_if = "Option::is_none")]
    pub sigma_r: Option<f64>,
    #[serde(rename = "r_A", default, skip_serializing_if = "Option::is_none")]
    pub r_a: Option<f64>,
    #[serde(rename = "alpha_A", default, skip_serializing_if = "Option::is_none")]
    pub alpha_a: Option<f64>,
    #[serde(rename = "G", default, skip_serializing_if = "Option::is_none")]
    pub g: Option<f64>,
    #[serde(rename = "r_G", default, skip_serializing_if = "Option::is_none")]
    pub r_g: Option<f64>,
    #[serde(rename = "sigma_G", default, skip_serializing_if = "Option::is_none")]
    pub sigma_g: Option<f64>,
}

impl FieldValues {
    /// Values in restart order.
    pub fn to_array(&self) -> [Option<f64>; FIELD_COUNT] {
        [
            self.epsilon,
            self.sigma,
            self.r_cut,
            self.sigma_r,
            self.r_a,
            self.alpha_a,
            self.g,
            self.r_g,
            self.sigma_g,
        ]
    }

    pub fn from_array(values: [Option<f64>; FIELD_COUNT]) -> Self {
        let [epsilon, sigma, r_cut, sigma_r, r_a, alpha_a, g, r_g, sigma_g] = values;
        Self {
            epsilon,
            sigma,
            r_cut,
            sigma_r,
            r_a,
            alpha_a,
            g,
            r_g,
            sigma_g,
        }
    }

    fn set_values(&self) -> impl Iterator<Item = (Field, f64)> {
        Field::ALL
            .into_iter()
            .zip(self.to_array())
            .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

/// One species entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub handle: String,
    #[serde(flatten)]
    pub values: FieldValues,
}

/// Explicit parameters for one unlike pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub a: String,
    pub b: String,
    #[serde(flatten)]
    pub values: FieldValues,
}

fn default_style() -> String {
    LJ_CUT_TAG.to_string()
}

/// Complete configuration of a pair fix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairStyleConfig {
    #[serde(default = "default_style")]
    pub style: String,
    pub species: Vec<SpeciesConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<PairConfig>,
}

impl PairStyleConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot a table as configuration.
    pub fn from_table(table: &ParameterTable) -> Self {
        let handle = |id: SpeciesId| {
            table
                .record(id)
                .map(|r| r.handle().to_string())
                .unwrap_or_default()
        };
        Self {
            style: default_style(),
            species: table
                .records()
                .map(|(_, record)| SpeciesConfig {
                    handle: record.handle().to_string(),
                    values: FieldValues::from_array(Field::ALL.map(|f| record.get(f))),
                })
                .collect(),
            pairs: table
                .overrides()
                .map(|((a, b), values)| PairConfig {
                    a: handle(a),
                    b: handle(b),
                    values: FieldValues::from_array(*values),
                })
                .collect(),
        }
    }

    /// Build a configured Lennard-Jones fix.
    pub fn build(&self, handle: &str) -> Result<PairFix> {
        if self.style != LJ_CUT_TAG {
            return Err(PairError::UnknownStyle(self.style.clone()));
        }

        let mut fix = PairFix::new(handle);
        for species in &self.species {
            let id = fix.add_species(&species.handle)?;
            for (field, value) in species.values.set_values() {
                fix.set_field(id, field, value)?;
            }
        }
        for pair in &self.pairs {
            let a = fix.table().species(&pair.a)?;
            let b = fix.table().species(&pair.b)?;
            for (field, value) in pair.values.set_values() {
                fix.set_pair_field(a, b, field, value)?;
            }
        }
        Ok(fix)
    }
}
