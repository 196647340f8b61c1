//! The evaluation engine: value table, evaluation order and `advance()`.

use crate::error::EngineError;
use crate::model::{Model, Modifier, ModifierKind, Reference, VariableDef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

/// How references to unknown variables are treated during `advance()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Fail the tick with `EngineError::UnresolvedReference`.
    #[default]
    Strict,
    /// Resolve to the context default (0, or 1 for a scale).
    Lenient,
}

/// Engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub reference_policy: ReferencePolicy,
}

impl EngineConfig {
    pub fn lenient() -> Self {
        Self {
            reference_policy: ReferencePolicy::Lenient,
        }
    }
}

/// Non-fatal condition observed while evaluating a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// Lenient mode substituted a default for an unknown variable.
    UnresolvedReference { variable: String, reference: String },
    /// A divide modifier had a zero divisor and was skipped.
    DivisionByZero { variable: String, modifier: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedReference {
                variable,
                reference,
            } => write!(f, "{variable}: unresolved reference `{reference}` defaulted"),
            Diagnostic::DivisionByZero { variable, modifier } => {
                write!(f, "{variable}: modifier #{modifier} divides by zero, skipped")
            }
        }
    }
}

/// Summary of one successful `advance()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Tick number just completed (first tick is 1).
    pub tick: u64,
    /// Number of variables recomputed.
    pub evaluated: usize,
    pub diagnostics: Vec<Diagnostic>,
}

struct Slot {
    name: String,
    def: VariableDef,
    value: f64,
    /// Insertion sequence; breaks priority ties.
    seq: u64,
}

/// Owns the variable definitions and their current values.
///
/// Definitions and values live in the same slot, so every defined variable
/// always has exactly one value.
pub struct Engine {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    /// Slot indices sorted by `(rank, seq)`.
    order: Vec<usize>,
    next_seq: u64,
    tick: u64,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine with the default (strict) configuration.
    pub fn new(model: Model) -> Self {
        Self::with_config(model, EngineConfig::default())
    }

    pub fn with_config(model: Model, config: EngineConfig) -> Self {
        let mut engine = Self {
            slots: Vec::with_capacity(model.len()),
            index: HashMap::with_capacity(model.len()),
            order: Vec::new(),
            next_seq: 0,
            tick: 0,
            config,
        };
        for (name, def) in model {
            engine.push_slot(name, def);
        }
        engine.resort();
        debug!(variables = engine.slots.len(), "engine initialized");
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<&VariableDef> {
        self.index.get(name).map(|&i| &self.slots[i].def)
    }

    pub fn get_value(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&i| self.slots[i].value)
    }

    /// Overwrite the current value. Definitions are not consulted.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), EngineError> {
        let i = self.slot_index(name)?;
        self.slots[i].value = value;
        Ok(())
    }

    pub fn add_to_value(&mut self, name: &str, delta: f64) -> Result<(), EngineError> {
        let i = self.slot_index(name)?;
        self.slots[i].value += delta;
        Ok(())
    }

    pub fn multiply_value(&mut self, name: &str, factor: f64) -> Result<(), EngineError> {
        let i = self.slot_index(name)?;
        self.slots[i].value *= factor;
        Ok(())
    }

    /// Insert a new variable seeded from its `initial_value`.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        def: VariableDef,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(EngineError::NameConflict(name));
        }
        debug!(variable = %name, priority = def.rank(), "adding variable");
        self.push_slot(name, def);
        self.resort();
        Ok(())
    }

    /// Remove a variable and its value. Returns `false` if it was absent.
    pub fn remove_variable(&mut self, name: &str) -> bool {
        let Some(i) = self.index.remove(name) else {
            return false;
        };
        self.slots.remove(i);
        self.index = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        self.resort();
        debug!(variable = %name, "removed variable");
        true
    }

    /// Append a modifier to the end of `target`'s formula.
    pub fn add_modifier(&mut self, target: &str, modifier: Modifier) -> Result<(), EngineError> {
        let i = self.slot_index(target)?;
        self.slots[i].def.modifiers.push(modifier);
        Ok(())
    }

    /// Remove every modifier on `target` tagged with `id`. Returns how many
    /// were removed; unknown targets and ids remove nothing.
    pub fn remove_modifier(&mut self, target: &str, id: &str) -> usize {
        let Some(&i) = self.index.get(target) else {
            return 0;
        };
        let modifiers = &mut self.slots[i].def.modifiers;
        let before = modifiers.len();
        modifiers.retain(|m| m.id.as_deref() != Some(id));
        before - modifiers.len()
    }

    /// Variable names in evaluation order.
    pub fn evaluation_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.slots[i].name.as_str())
            .collect()
    }

    /// `(name, value)` pairs in evaluation order.
    pub fn values(&self) -> Vec<(&str, f64)> {
        self.order
            .iter()
            .map(|&i| (self.slots[i].name.as_str(), self.slots[i].value))
            .collect()
    }

    /// Every reference to a variable that is not defined, in evaluation order.
    pub fn unresolved_references(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for &i in &self.order {
            let slot = &self.slots[i];
            for name in slot.def.references().filter_map(Reference::variable) {
                if !self.index.contains_key(name) {
                    out.push(Diagnostic::UnresolvedReference {
                        variable: slot.name.clone(),
                        reference: name.to_string(),
                    });
                }
            }
        }
        out
    }

    /// Recompute every variable for one tick.
    ///
    /// On error all values are restored to their pre-tick state and the tick
    /// counter is left unchanged.
    pub fn advance(&mut self) -> Result<TickReport, EngineError> {
        let old_values: Vec<f64> = self.slots.iter().map(|s| s.value).collect();
        let mut diagnostics = Vec::new();

        for pos in 0..self.order.len() {
            let i = self.order[pos];
            match self.evaluate(i, &old_values, &mut diagnostics) {
                Ok(value) => {
                    let slot = &mut self.slots[i];
                    trace!(variable = %slot.name, value, "evaluated");
                    slot.value = value;
                }
                Err(e) => {
                    for (slot, &old) in self.slots.iter_mut().zip(&old_values) {
                        slot.value = old;
                    }
                    warn!(error = %e, tick = self.tick + 1, "tick rolled back");
                    return Err(e);
                }
            }
        }

        self.tick += 1;
        debug!(
            tick = self.tick,
            evaluated = self.order.len(),
            diagnostics = diagnostics.len(),
            "tick complete"
        );
        Ok(TickReport {
            tick: self.tick,
            evaluated: self.order.len(),
            diagnostics,
        })
    }

    /// Diagnostic listing of every variable in evaluation order.
    pub fn dump(&self) -> Dump<'_> {
        Dump {
            rows: self
                .order
                .iter()
                .map(|&i| {
                    let s = &self.slots[i];
                    DumpRow {
                        name: &s.name,
                        priority: s.def.rank(),
                        value: s.value,
                    }
                })
                .collect(),
        }
    }

    fn slot_index(&self, name: &str) -> Result<usize, EngineError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    fn push_slot(&mut self, name: String, def: VariableDef) {
        let value = def.initial_value;
        self.index.insert(name.clone(), self.slots.len());
        self.slots.push(Slot {
            name,
            def,
            value,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    fn resort(&mut self) {
        let slots = &self.slots;
        let mut order: Vec<usize> = (0..slots.len()).collect();
        order.sort_by_key(|&i| (slots[i].def.rank(), slots[i].seq));
        self.order = order;
    }

    fn evaluate(
        &self,
        i: usize,
        old_values: &[f64],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<f64, EngineError> {
        let slot = &self.slots[i];
        let def = &slot.def;
        let p = def.rank();
        let base = self.resolve(&def.base_value, i, p, old_values, 0.0, diagnostics)?;
        let mut acc = base;

        for (n, m) in def.modifiers.iter().enumerate() {
            let source = self.resolve(&m.source, i, p, old_values, 0.0, diagnostics)?;
            let scale = self.resolve(&m.scale, i, p, old_values, 1.0, diagnostics)?;
            match m.kind {
                ModifierKind::Add => acc += source * scale,
                ModifierKind::Subtract => acc -= source * scale,
                ModifierKind::Multiply if m.is_percentage => acc *= 1.0 + (source - 1.0) * scale,
                ModifierKind::Multiply => acc *= source * scale,
                ModifierKind::Divide => {
                    let divisor = source * scale;
                    if divisor != 0.0 {
                        acc /= divisor;
                    } else {
                        self.note(
                            diagnostics,
                            Diagnostic::DivisionByZero {
                                variable: slot.name.clone(),
                                modifier: n,
                            },
                        );
                    }
                }
                // Base resolution is stable within one variable's evaluation,
                // so the already-resolved base is the original base.
                ModifierKind::AddPercentOfBase => acc += base * source * scale,
            }
        }
        Ok(acc)
    }

    /// Read a reference as seen from a variable of priority `current`.
    ///
    /// Fresh values are only visible from strictly lower priorities; anything
    /// at the same or a higher priority (self included) reads the snapshot.
    fn resolve(
        &self,
        reference: &Reference,
        owner: usize,
        current: i32,
        old_values: &[f64],
        default: f64,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<f64, EngineError> {
        match reference {
            Reference::Literal(v) => Ok(*v),
            Reference::SelfValue => Ok(old_values[owner]),
            Reference::Variable(name) => match self.index.get(name) {
                Some(&j) => {
                    let source = &self.slots[j];
                    if source.def.source_priority() < current {
                        Ok(source.value)
                    } else {
                        Ok(old_values[j])
                    }
                }
                None => {
                    let variable = self.slots[owner].name.clone();
                    match self.config.reference_policy {
                        ReferencePolicy::Strict => Err(EngineError::UnresolvedReference {
                            variable,
                            reference: name.clone(),
                        }),
                        ReferencePolicy::Lenient => {
                            diagnostics.push(Diagnostic::UnresolvedReference {
                                variable,
                                reference: name.clone(),
                            });
                            Ok(default)
                        }
                    }
                }
            },
        }
    }

    fn note(&self, diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
        match self.config.reference_policy {
            ReferencePolicy::Strict => warn!(%diagnostic, "evaluation diagnostic"),
            ReferencePolicy::Lenient => debug!(%diagnostic, "evaluation diagnostic"),
        }
        diagnostics.push(diagnostic);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("tick", &self.tick)
            .field("values", &self.values())
            .field("config", &self.config)
            .finish()
    }
}

/// One line of an engine dump.
#[derive(Clone, Debug, PartialEq)]
pub struct DumpRow<'a> {
    pub name: &'a str,
    pub priority: i32,
    pub value: f64,
}

/// Snapshot of the engine for debugging; render with `Display`.
#[derive(Clone, Debug, PartialEq)]
pub struct Dump<'a> {
    pub rows: Vec<DumpRow<'a>>,
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} VARIABLE DUMP {}", "=".repeat(15), "=".repeat(15))?;
        for row in &self.rows {
            let prio = format!("P{}", row.priority);
            if row.value.abs() > 1000.0 {
                writeln!(
                    f,
                    "  {prio:<3} | {:<30} | {}",
                    row.name,
                    group_thousands(row.value, 2)
                )?;
            } else {
                writeln!(f, "  {prio:<3} | {:<30} | {}", row.name, row.value)?;
            }
        }
        write!(f, "{}", "=".repeat(45))
    }
}

/// Format `v` with `decimals` fraction digits and comma thousands separators.
pub fn group_thousands(v: f64, decimals: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let fixed = format!("{:.*}", decimals, v.abs());
    let (int_part, frac) = match fixed.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (fixed.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (n, c) in int_part.chars().enumerate() {
        if n > 0 && (int_part.len() - n) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
