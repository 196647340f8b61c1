//! Declarative model definitions: variables, references and modifiers.

use crate::error::ModelError;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Evaluation rank of a variable that declares no priority.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Priority assumed for an unprioritized variable when it is the *source* of
/// a reference. Being "very late" forces previous-tick reads of parameters.
pub const UNSET_SOURCE_PRIORITY: i32 = 99;

/// Where a value comes from: a constant, another variable, or the variable
/// being evaluated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    /// Numeric constant.
    Literal(f64),
    /// Name of another variable in the model.
    Variable(String),
    /// The evaluated variable's own previous-tick value.
    #[default]
    SelfValue,
}

impl Reference {
    pub fn one() -> Self {
        Reference::Literal(1.0)
    }

    /// Variable name this reference points at, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            Reference::Variable(name) => Some(name),
            _ => None,
        }
    }
}

impl From<f64> for Reference {
    fn from(v: f64) -> Self {
        Reference::Literal(v)
    }
}

impl From<&str> for Reference {
    fn from(name: &str) -> Self {
        Reference::Variable(name.to_string())
    }
}

impl From<String> for Reference {
    fn from(name: String) -> Self {
        Reference::Variable(name)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Literal(v) => write!(f, "{v}"),
            Reference::Variable(name) => write!(f, "{name}"),
            Reference::SelfValue => write!(f, "<self>"),
        }
    }
}

/// Operation a modifier folds into the running accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Adds a fraction of the variable's original base value, not of the
    /// running accumulator.
    AddPercentOfBase,
}

/// One step in a variable's formula.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Caller-assigned tag used by `Engine::remove_modifier`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ModifierKind,
    pub source: Reference,
    #[serde(default = "Reference::one")]
    pub scale: Reference,
    /// Only meaningful for `Multiply`: apply `1 + (source - 1) * scale`.
    #[serde(default)]
    pub is_percentage: bool,
}

impl Modifier {
    pub fn new(kind: ModifierKind, source: impl Into<Reference>) -> Self {
        Self {
            id: None,
            kind,
            source: source.into(),
            scale: Reference::one(),
            is_percentage: false,
        }
    }

    pub fn add(source: impl Into<Reference>) -> Self {
        Self::new(ModifierKind::Add, source)
    }

    pub fn subtract(source: impl Into<Reference>) -> Self {
        Self::new(ModifierKind::Subtract, source)
    }

    pub fn multiply(source: impl Into<Reference>) -> Self {
        Self::new(ModifierKind::Multiply, source)
    }

    pub fn divide(source: impl Into<Reference>) -> Self {
        Self::new(ModifierKind::Divide, source)
    }

    pub fn add_percent_of_base(source: impl Into<Reference>) -> Self {
        Self::new(ModifierKind::AddPercentOfBase, source)
    }

    pub fn scaled(mut self, scale: impl Into<Reference>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn as_percentage(mut self) -> Self {
        self.is_percentage = true;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Definition of a single named quantity.
///
/// Deserialization also accepts the grouped `additive_modifiers`,
/// `subtractive_modifiers` and `multiplicative_modifiers` lists and folds them
/// into the ordered modifier list (adds, then subtracts, then multiplies).
/// Grouped multipliers become `multiply(1.0)` scaled by the reference, so an
/// unresolved name leaves the product unchanged in lenient mode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVariableDef")]
pub struct VariableDef {
    /// Seed value, used once when the variable enters the engine.
    pub initial_value: f64,
    pub priority: Option<i32>,
    pub base_value: Reference,
    pub modifiers: Vec<Modifier>,
}

impl VariableDef {
    /// Unprioritized variable with no formula; carries its value forward.
    pub fn parameter(initial_value: f64) -> Self {
        Self {
            initial_value,
            ..Self::default()
        }
    }

    /// Accumulator: base value is the variable's own previous value.
    pub fn stock(priority: i32, initial_value: f64) -> Self {
        Self {
            initial_value,
            priority: Some(priority),
            ..Self::default()
        }
    }

    /// Value recomputed every tick from `base`.
    pub fn derived(priority: i32, base: impl Into<Reference>) -> Self {
        Self {
            priority: Some(priority),
            base_value: base.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_initial_value(mut self, initial_value: f64) -> Self {
        self.initial_value = initial_value;
        self
    }

    pub fn with_base(mut self, base: impl Into<Reference>) -> Self {
        self.base_value = base.into();
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Rank used to order evaluation.
    pub fn rank(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Priority compared against when another variable references this one.
    pub fn source_priority(&self) -> i32 {
        self.priority.unwrap_or(UNSET_SOURCE_PRIORITY)
    }

    /// Every reference in the definition, base value first.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        std::iter::once(&self.base_value)
            .chain(self.modifiers.iter().flat_map(|m| [&m.source, &m.scale]))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVariableDef {
    #[serde(default)]
    initial_value: f64,
    #[serde(default)]
    priority: Option<i32>,
    #[serde(default)]
    base_value: Reference,
    #[serde(default)]
    modifiers: Vec<Modifier>,
    #[serde(default)]
    additive_modifiers: Vec<Reference>,
    #[serde(default)]
    subtractive_modifiers: Vec<Reference>,
    #[serde(default)]
    multiplicative_modifiers: Vec<Reference>,
}

impl From<RawVariableDef> for VariableDef {
    fn from(raw: RawVariableDef) -> Self {
        let mut modifiers = raw.modifiers;
        modifiers.extend(raw.additive_modifiers.into_iter().map(Modifier::add));
        modifiers.extend(raw.subtractive_modifiers.into_iter().map(Modifier::subtract));
        modifiers.extend(
            raw.multiplicative_modifiers
                .into_iter()
                .map(|factor| Modifier::multiply(1.0).scaled(factor)),
        );
        VariableDef {
            initial_value: raw.initial_value,
            priority: raw.priority,
            base_value: raw.base_value,
            modifiers,
        }
    }
}

/// Ordered set of uniquely named variable definitions.
///
/// Declaration order is kept: it breaks ties between equal priorities.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    variables: Vec<(String, VariableDef)>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, def: VariableDef) -> Result<(), ModelError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(ModelError::DuplicateVariable(name));
        }
        self.variables.push((name, def));
        Ok(())
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (S, VariableDef)>,
        S: Into<String>,
    {
        let mut model = Model::new();
        for (name, def) in pairs {
            model.insert(name, def)?;
        }
        Ok(model)
    }

    /// Parse a `variables:` map from YAML, preserving declaration order.
    pub fn from_yaml_str(text: &str) -> Result<Self, ModelError> {
        #[derive(Deserialize)]
        struct ModelFile {
            variables: Model,
        }
        let file: ModelFile = serde_yaml::from_str(text)?;
        Ok(file.variables)
    }

    pub fn get(&self, name: &str) -> Option<&VariableDef> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableDef)> {
        self.variables.iter().map(|(n, d)| (n.as_str(), d))
    }
}

impl IntoIterator for Model {
    type Item = (String, VariableDef);
    type IntoIter = std::vec::IntoIter<(String, VariableDef)>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ModelVisitor;

        impl<'de> Visitor<'de> for ModelVisitor {
            type Value = Model;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of variable names to definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Model, A::Error> {
                let mut seen = HashSet::new();
                let mut variables = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, def)) = map.next_entry::<String, VariableDef>()? {
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!("duplicate variable: {name}")));
                    }
                    variables.push((name, def));
                }
                Ok(Model { variables })
            }
        }

        deserializer.deserialize_map(ModelVisitor)
    }
}
