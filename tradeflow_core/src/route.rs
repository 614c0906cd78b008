//! Route input: the ordered stops a sequence visits.

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which side of the trade a stop is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Exporter,
    Importer,
}

impl Role {
    /// Short tag used in labels.
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Exporter => "EXP",
            Role::Importer => "IMP",
        }
    }

    /// Label colour (CSS hex).
    pub fn label_color(&self) -> &'static str {
        match self {
            Role::Exporter => "#00ff78",
            Role::Importer => "#00b0ff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Exporter => write!(f, "exporter"),
            Role::Importer => write!(f, "importer"),
        }
    }
}

/// One stop of a trade route.
///
/// The sequence flies from `steps[i].origin` to `steps[i + 1].origin`;
/// `destination` is the partner the record itself names and is only
/// carried along for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Country visited at this stop
    #[serde(alias = "country")]
    pub origin: String,

    /// Declared trading partner, if the record names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    pub role: Role,

    /// Traded material
    #[serde(default)]
    pub material: String,

    /// Commodity code (e.g. HS code)
    #[serde(default, alias = "hs_code")]
    pub code: String,
}

impl RouteStep {
    pub fn new(origin: impl Into<String>, role: Role) -> Self {
        Self {
            origin: origin.into(),
            destination: None,
            role,
            material: String::new(),
            code: String::new(),
        }
    }

    pub fn with_material(mut self, material: impl Into<String>, code: impl Into<String>) -> Self {
        self.material = material.into();
        self.code = code.into();
        self
    }

    /// Label text shown at this stop, e.g. `[EXP] China`.
    pub fn label(&self) -> String {
        format!("[{}] {}", self.role.tag(), self.origin)
    }
}

/// Parses a JSON array of route steps.
pub fn parse_route_json(text: &str) -> Result<Vec<RouteStep>, DataError> {
    Ok(serde_json::from_str(text)?)
}

/// Reads a JSON array of route steps from disk.
pub fn load_route_file(path: impl AsRef<Path>) -> Result<Vec<RouteStep>, DataError> {
    let text = std::fs::read_to_string(path)?;
    parse_route_json(&text)
}

/// Moves exporters in front of importers, keeping the relative order
/// within each group.
pub fn order_exporters_first(mut steps: Vec<RouteStep>) -> Vec<RouteStep> {
    steps.sort_by_key(|s| s.role != Role::Exporter);
    steps
}
