//! Auxiliary artifacts a subgraph needs besides its statements: generated functions,
//! mixins, declarations and external inputs, plus delegate aggregation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::CollisionPolicy;
use crate::error::{ComposeError, Result};
use crate::template::ValueMap;
use crate::types::ValueType;

/// A generated function definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub signature: String,
    pub source: String,
}

/// Generated functions keyed by signature, in insertion order.
///
/// Callees are always merged before the function that calls them, so iteration order is a
/// valid definition order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionRegistry {
    entries: Vec<FunctionDef>,
    index: HashMap<String, usize>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, signature: &str) -> Option<&str> {
        self.index
            .get(signature)
            .map(|&i| self.entries[i].source.as_str())
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.index.contains_key(signature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> {
        self.entries.iter()
    }

    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|f| f.signature.as_str())
    }

    /// Register `source` under `signature`. A repeated signature is deduplicated.
    pub fn insert(
        &mut self,
        signature: &str,
        source: &str,
        policy: CollisionPolicy,
    ) -> Result<()> {
        let Some(&i) = self.index.get(signature) else {
            tracing::debug!(signature, "registering generated function");
            self.index.insert(signature.to_string(), self.entries.len());
            self.entries.push(FunctionDef {
                signature: signature.to_string(),
                source: source.to_string(),
            });
            return Ok(());
        };

        if self.entries[i].source == source {
            tracing::trace!(signature, "function already registered");
            return Ok(());
        }

        match policy {
            CollisionPolicy::Overwrite => {
                tracing::warn!(signature, "overwriting function with a different body");
                self.entries[i].source = source.to_string();
                Ok(())
            }
            CollisionPolicy::Reject => Err(ComposeError::SignatureConflict {
                signature: signature.to_string(),
            }),
        }
    }

    pub fn merge(&mut self, other: &FunctionRegistry, policy: CollisionPolicy) -> Result<()> {
        for f in &other.entries {
            self.insert(&f.signature, &f.source, policy)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FunctionRegistry {
    type Item = &'a FunctionDef;
    type IntoIter = std::slice::Iter<'a, FunctionDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// An externally bound leaf input (user parameter) required by a subgraph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpuInput {
    pub name: String,
    pub ty: ValueType,
}

/// Everything besides statements that a node or subgraph needs to compile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub functions: FunctionRegistry,
    pub mixins: Vec<String>,
    pub declarations: Vec<String>,
    pub inputs: Vec<GpuInput>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.mixins.is_empty()
            && self.declarations.is_empty()
            && self.inputs.is_empty()
    }

    /// Copy `other` into `self`: functions merged by signature, lists appended in order.
    pub fn absorb(&mut self, other: &Artifacts, policy: CollisionPolicy) -> Result<()> {
        self.functions.merge(&other.functions, policy)?;
        self.mixins.extend(other.mixins.iter().cloned());
        self.declarations.extend(other.declarations.iter().cloned());
        self.inputs.extend(other.inputs.iter().cloned());
        Ok(())
    }

    /// Drop repeated mixins, declarations and inputs, keeping first occurrences.
    pub fn dedup(&mut self) {
        dedup_in_order(&mut self.mixins);
        dedup_in_order(&mut self.declarations);
        dedup_in_order(&mut self.inputs);
    }
}

fn dedup_in_order<T: Clone + Eq + std::hash::Hash>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// A node snapshot usable by a composing node: callable under `name` in the composing
/// node's template, contributing its own artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegate {
    pub name: String,
    pub function_name: String,
    pub artifacts: Artifacts,
}

/// Fold `delegates` into a composing node's substitution values and artifacts, in order.
///
/// `None` entries are skipped.
pub fn aggregate_delegates(
    delegates: &[Option<Delegate>],
    node: &str,
    values: &mut ValueMap,
    artifacts: &mut Artifacts,
    policy: CollisionPolicy,
) -> Result<()> {
    for delegate in delegates.iter().flatten() {
        if values.contains_key(&delegate.name) {
            return Err(ComposeError::DuplicatePlaceholder {
                key: delegate.name.clone(),
                node: node.to_string(),
            });
        }
        values.insert(delegate.name.clone(), delegate.function_name.clone());
        artifacts.absorb(&delegate.artifacts, policy)?;
    }
    Ok(())
}
