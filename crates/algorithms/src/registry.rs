//! Algorithm registry with declarative parameter definitions.
//!
//! Hosts list algorithms with [`build_registry`], collect a value for each
//! [`ParamDef`], and call [`run_algorithm`] with the resulting map. Results
//! come back keyed by output parameter name (`OUTPUT`).

use std::collections::HashMap;
use std::path::PathBuf;

use geoproc_core::io::{read_layer, FormatRegistry, JsonLayerProvider};
use geoproc_core::vector::{FeatureSource, MemoryLayer, SinkProvider};
use geoproc_core::{Error, Feedback, Result};
use tracing::info;

use crate::classification::QuantileParams;
use crate::processing::{
    discretize_raster, feature_passthrough, DiscretizeParams, PassThroughParams, INPUT, OUTPUT,
};
use crate::statistics::IntervalClosure;

/// Parameter key of the discretizer's tie-rule switch
pub const RIGHT_CLOSED: &str = "RIGHT_CLOSED";
/// Parameter key of the discretizer's declared-nodata switch
pub const SKIP_NODATA: &str = "SKIP_NODATA";

/// Category of algorithms (maps to tree structure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgoCategory {
    Vector,
    Raster,
}

impl AlgoCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vector => "Vector",
            Self::Raster => "Raster",
        }
    }
}

/// Definition of a single parameter for an algorithm.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub optional: bool,
}

/// The kind of a parameter, determining how a host collects its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Existing vector layer (a loaded layer name or a `.json` layer file).
    FeatureSource,
    /// Destination for a new vector layer.
    FeatureSink,
    /// Existing raster file.
    RasterLayer,
    /// Path of a raster file to create.
    RasterDestination,
    /// Boolean toggle.
    Bool { default: bool },
}

impl ParamKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FeatureSource => "feature source",
            Self::FeatureSink => "feature sink",
            Self::RasterLayer => "raster layer",
            Self::RasterDestination => "raster destination",
            Self::Bool { .. } => "boolean",
        }
    }

    /// Convert a textual value (e.g. from the command line) into a typed value.
    pub fn parse(&self, param: &str, raw: &str) -> Result<ParamValue> {
        match self {
            Self::FeatureSource | Self::FeatureSink => Ok(ParamValue::Text(raw.to_string())),
            Self::RasterLayer | Self::RasterDestination => Ok(ParamValue::Path(PathBuf::from(raw))),
            Self::Bool { .. } => parse_bool(raw).map(ParamValue::Bool).ok_or_else(|| {
                Error::Config(format!("parameter {} expects true/false, got '{}'", param, raw))
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Runtime parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Path(PathBuf),
    Bool(bool),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Path(p) => p.to_str(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<PathBuf> {
        match self {
            Self::Path(p) => Some(p.clone()),
            Self::Text(s) => Some(PathBuf::from(s)),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => parse_bool(s),
            Self::Path(_) => None,
        }
    }
}

/// An algorithm entry in the registry.
#[derive(Debug, Clone)]
pub struct AlgorithmEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: AlgoCategory,
    pub description: &'static str,
    pub params: Vec<ParamDef>,
}

impl AlgorithmEntry {
    pub fn param(&self, name: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.name == name)
    }
}

fn param_input(kind: ParamKind, label: &'static str) -> ParamDef {
    ParamDef { name: INPUT, label, kind, optional: false }
}

fn param_output(kind: ParamKind, label: &'static str) -> ParamDef {
    ParamDef { name: OUTPUT, label, kind, optional: false }
}

/// Build the algorithm registry.
pub fn build_registry() -> Vec<AlgorithmEntry> {
    vec![
        AlgorithmEntry {
            id: "feature_passthrough", name: "Feature Pass-Through", category: AlgoCategory::Vector,
            description: "Copy every feature of the input layer to the output layer unchanged",
            params: vec![
                param_input(ParamKind::FeatureSource, "Input layer"),
                param_output(ParamKind::FeatureSink, "Output layer"),
            ],
        },
        AlgorithmEntry {
            id: "discretize_raster", name: "Quantile Discretizer", category: AlgoCategory::Raster,
            description: "Discretize band 1 into quartile buckets (0-4) using quantile breakpoints",
            params: vec![
                param_input(ParamKind::RasterLayer, "Input raster"),
                param_output(ParamKind::RasterDestination, "Discretized raster"),
                ParamDef {
                    name: RIGHT_CLOSED,
                    label: "Values equal to a breakpoint stay in the lower bucket",
                    kind: ParamKind::Bool { default: false },
                    optional: true,
                },
                ParamDef {
                    name: SKIP_NODATA,
                    label: "Leave the band's nodata value out of the breakpoints",
                    kind: ParamKind::Bool { default: false },
                    optional: true,
                },
            ],
        },
    ]
}

/// Look up a registry entry by id.
pub fn find_algorithm(id: &str) -> Option<AlgorithmEntry> {
    build_registry().into_iter().find(|e| e.id == id)
}

/// Everything a run needs from its host.
pub struct RunContext {
    pub formats: FormatRegistry,
    pub sinks: Box<dyn SinkProvider>,
    pub feedback: Feedback,
    layers: HashMap<String, MemoryLayer>,
}

impl RunContext {
    /// Context with the given formats, JSON layer sinks and a fresh feedback.
    pub fn new(formats: FormatRegistry) -> Self {
        Self {
            formats,
            sinks: Box::new(JsonLayerProvider),
            feedback: Feedback::new(),
            layers: HashMap::new(),
        }
    }

    pub fn with_sinks(mut self, sinks: impl SinkProvider + 'static) -> Self {
        self.sinks = Box::new(sinks);
        self
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }

    /// Make a loaded layer available to feature-source parameters by name.
    pub fn add_layer(&mut self, name: impl Into<String>, layer: MemoryLayer) {
        self.layers.insert(name.into(), layer);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(FormatRegistry::detect())
    }
}

fn required<'p>(
    entry: &AlgorithmEntry,
    params: &'p HashMap<String, ParamValue>,
    name: &str,
) -> Result<&'p ParamValue> {
    params
        .get(name)
        .ok_or_else(|| Error::Config(format!("missing parameter {} for {}", name, entry.id)))
}

fn mistyped(entry: &AlgorithmEntry, name: &str) -> Error {
    let kind = entry.param(name).map_or("value", |p| p.kind.name());
    Error::Config(format!("parameter {} of {} must be a {}", name, entry.id, kind))
}

/// Value of a boolean parameter, falling back to its declared default.
fn flag(entry: &AlgorithmEntry, params: &HashMap<String, ParamValue>, name: &str) -> Result<bool> {
    if let Some(value) = params.get(name) {
        return value.as_bool().ok_or_else(|| mistyped(entry, name));
    }
    match entry.param(name).map(|p| &p.kind) {
        Some(ParamKind::Bool { default }) => Ok(*default),
        _ => Err(Error::Config(format!("{} has no boolean parameter {}", entry.id, name))),
    }
}

/// Dispatch an algorithm by id.
///
/// Returns the algorithm's outputs keyed by parameter name. Unknown ids,
/// missing required parameters and values of the wrong type are
/// [`Error::Config`].
pub fn run_algorithm(
    id: &str,
    params: &HashMap<String, ParamValue>,
    ctx: &RunContext,
) -> Result<HashMap<String, String>> {
    let entry = find_algorithm(id)
        .ok_or_else(|| Error::Config(format!("unknown algorithm: {}", id)))?;
    info!(algorithm = entry.id, "running {}", entry.name);

    match entry.id {
        "feature_passthrough" => {
            let input = required(&entry, params, INPUT)?
                .as_str()
                .ok_or_else(|| mistyped(&entry, INPUT))?;
            let output = required(&entry, params, OUTPUT)?
                .as_str()
                .ok_or_else(|| mistyped(&entry, OUTPUT))?
                .to_string();

            let loaded;
            let source: &dyn FeatureSource = match ctx.layers.get(input) {
                Some(layer) => layer,
                None => {
                    loaded = read_layer(input)?;
                    &loaded
                }
            };

            let result = feature_passthrough(
                PassThroughParams { input: source, output },
                ctx.sinks.as_ref(),
                &ctx.feedback,
            )?;
            Ok(result.to_outputs())
        }
        "discretize_raster" => {
            let input = required(&entry, params, INPUT)?
                .as_path()
                .ok_or_else(|| mistyped(&entry, INPUT))?;
            let output = required(&entry, params, OUTPUT)?
                .as_path()
                .ok_or_else(|| mistyped(&entry, OUTPUT))?;
            let closure = if flag(&entry, params, RIGHT_CLOSED)? {
                IntervalClosure::Right
            } else {
                IntervalClosure::Left
            };
            let result = discretize_raster(
                DiscretizeParams {
                    input,
                    output,
                    quantile: QuantileParams {
                        closure,
                        skip_nodata: flag(&entry, params, SKIP_NODATA)?,
                    },
                },
                &ctx.formats,
            )?;
            Ok(result.to_outputs())
        }
        other => Err(Error::Config(format!("no runner for algorithm: {}", other))),
    }
}
