//! Layer schema model
//!
//! The ordered collection of texture layer definitions driving one run:
//! which geographic features each layer matches, how wide linear features
//! are painted, how many weight-variant files the layer produces, and where
//! the layer sits in the compositing order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// One rule matched against a feature attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagMatch {
    /// The attribute must equal this value exactly
    Exact(String),
    /// The attribute must equal one of these values
    OneOf(Vec<String>),
    /// `true`: the attribute key only has to be present; `false` never matches
    Any(bool),
}

impl TagMatch {
    /// Evaluates this rule against the value stored under its key, if any.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            TagMatch::Exact(expected) => value == Some(expected.as_str()),
            TagMatch::OneOf(options) => {
                value.is_some_and(|v| options.iter().any(|o| o == v))
            }
            TagMatch::Any(wildcard) => *wildcard && value.is_some(),
        }
    }
}

/// Attribute filter selecting the features a layer paints.
///
/// A feature matches when any one of the declared attribute rules matches,
/// mirroring how tag-based feature stores interpret multi-key queries. An
/// empty filter matches nothing: the layer is structural and never queried.
pub type TagFilter = BTreeMap<String, TagMatch>;

/// Evaluates a filter against a feature's attribute mapping.
pub fn filter_matches(filter: &TagFilter, attributes: &BTreeMap<String, String>) -> bool {
    filter
        .iter()
        .any(|(key, rule)| rule.matches(attributes.get(key).map(String::as_str)))
}

/// Compositing rank of a layer.
///
/// `Ordered(0)` marks the base layer that absorbs all unclaimed pixels.
/// Unordered layers are processed before any ordered layer, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Priority {
    #[default]
    Unordered,
    Ordered(u32),
}

impl From<Option<u32>> for Priority {
    fn from(value: Option<u32>) -> Self {
        match value {
            Some(p) => Priority::Ordered(p),
            None => Priority::Unordered,
        }
    }
}

impl From<Priority> for Option<u32> {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Ordered(p) => Some(p),
            Priority::Unordered => None,
        }
    }
}

/// A single texture layer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique layer name, also the output file stem
    pub name: String,
    /// Feature attribute filter; empty means structural layer, never queried
    #[serde(default)]
    pub tags: TagFilter,
    /// Buffer width in meters for linear features; absent means linear
    /// features contribute nothing
    #[serde(default)]
    pub width: Option<f64>,
    /// Display-only color, no effect on generated masks
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    /// Compositing rank; `Ordered(0)` is the base layer
    #[serde(default)]
    pub priority: Priority,
    /// Number of weight-variant files to produce (0 = weightless layer)
    #[serde(default = "default_count")]
    pub count: u32,
    /// Omit the weight suffix from generated file names
    #[serde(default)]
    pub exclude_weight: bool,
}

fn default_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_count() -> u32 {
    1
}

impl Layer {
    /// Creates a minimal layer with the given name and priority.
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Layer {
            name: name.into(),
            tags: TagFilter::new(),
            width: None,
            color: default_color(),
            priority,
            count: default_count(),
            exclude_weight: false,
        }
    }

    /// True when this layer absorbs unclaimed pixels.
    pub fn is_base(&self) -> bool {
        self.priority == Priority::Ordered(0)
    }

    /// True when this layer queries the feature store.
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// File name for one weight variant, 1-based.
    ///
    /// `asphalt` with two variants yields `asphalt01_weight.png` and
    /// `asphalt02_weight.png`; with `exclude_weight` set, `asphalt01.png`.
    pub fn weight_file_name(&self, variant: u32) -> String {
        let suffix = if self.exclude_weight { "" } else { "_weight" };
        format!("{}{:02}{}.png", self.name, variant, suffix)
    }
}

/// A validated, ordered collection of layers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSchema {
    layers: Vec<Layer>,
}

impl LayerSchema {
    /// Validates and wraps an ordered list of layer records.
    pub fn new(layers: Vec<Layer>) -> Result<Self, SchemaError> {
        let mut base: Option<&Layer> = None;
        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].iter().any(|other| other.name == layer.name) {
                return Err(SchemaError::DuplicateName(layer.name.clone()));
            }
            if layer.is_base() {
                if let Some(first) = base {
                    return Err(SchemaError::MultipleBaseLayers(
                        first.name.clone(),
                        layer.name.clone(),
                    ));
                }
                base = Some(layer);
            }
            if let Some(width) = layer.width {
                if width <= 0.0 {
                    return Err(SchemaError::NonPositiveWidth(layer.name.clone(), width));
                }
            }
        }
        Ok(LayerSchema { layers })
    }

    /// Parses a schema from a JSON array of layer records.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let layers: Vec<Layer> =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::new(layers)
    }

    /// Layers in schema order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The single `priority == 0` layer, if the schema declares one.
    pub fn base_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.is_base())
    }

    /// Layers in compositing order.
    ///
    /// Unordered layers come first in schema order, then ordered layers by
    /// descending priority (ties keep schema order), and the base layer is
    /// always last. Earlier-processed layers win pixel ownership.
    pub fn ordered_by_priority(&self) -> Vec<&Layer> {
        let mut ordered: Vec<&Layer> = Vec::with_capacity(self.layers.len());
        ordered.extend(self.layers.iter().filter(|l| l.priority == Priority::Unordered));

        let mut ranked: Vec<&Layer> = self
            .layers
            .iter()
            .filter(|l| matches!(l.priority, Priority::Ordered(p) if p > 0))
            .collect();
        ranked.sort_by_key(|l| match l.priority {
            Priority::Ordered(p) => std::cmp::Reverse(p),
            Priority::Unordered => unreachable!(),
        });
        ordered.extend(ranked);

        ordered.extend(self.layers.iter().filter(|l| l.is_base()));
        ordered
    }
}
