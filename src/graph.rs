//! Composition graph: an arena of [`ShaderNode`]s wired through [`GpuValue`] handles.
//!
//! Nodes are added through the constructors in [`crate::nodes`]. Every constructor returns the
//! node's output value, which later nodes take as an operand. Rendering walks operands
//! producer-first and emits each node exactly once.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::collections::hash_map::RandomState;
use std::fmt::{self, Debug};
use std::hash::{BuildHasher, Hasher};

use crate::artifacts::{Artifacts, Delegate};
use crate::config::ComposeOptions;
use crate::error::{ComposeError, Result};
use crate::template::{ValueMap, evaluate};
use crate::types::{Dialect, TypeMapper, ValueType};

/// Index of a node inside its [`ShaderGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tag shared by a graph and every value it hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct GraphId(u64);

impl GraphId {
    fn fresh() -> Self {
        // std keys every `RandomState` differently.
        GraphId(RandomState::new().build_hasher().finish())
    }
}

/// Typed handle to the value a node computes.
///
/// `parent` refers back to the producing node without owning it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GpuValue {
    id: String,
    ty: ValueType,
    parent: NodeId,
    graph: GraphId,
}

impl GpuValue {
    /// Identifier of the value in generated source.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn type_name(&self, mapper: &dyn TypeMapper) -> Result<String> {
        mapper.shader_type_name(self.ty)
    }
}

/// Closed set of node variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Externally bound leaf (user parameter).
    Input { name: String },
    Constant { literal: String },
    /// Call to a built-in function.
    Intrinsic { function: String },
    /// Built-in call that requires a mixin to be included.
    Mixin { function: String, mixin: String },
    /// Caller-templated function with an identity-derived signature.
    Custom { function: String, signature: String },
    /// Function synthesized from another subgraph, with a content-derived signature.
    /// `body` is the root of the subgraph rendered into the definition.
    Patched {
        name: String,
        signature: String,
        body: NodeId,
    },
    /// Formal parameter inside a patched function body.
    Parameter { index: usize },
}

impl NodeKind {
    /// Name a composing node calls this node by, if it defines a callable function.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            NodeKind::Intrinsic { function } | NodeKind::Mixin { function, .. } => {
                Some(function.as_str())
            }
            NodeKind::Custom { signature, .. } | NodeKind::Patched { signature, .. } => {
                Some(signature.as_str())
            }
            NodeKind::Input { .. } | NodeKind::Constant { .. } | NodeKind::Parameter { .. } => {
                None
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            NodeKind::Input { name } => format!("input `{name}`"),
            NodeKind::Constant { literal } => format!("constant `{literal}`"),
            NodeKind::Intrinsic { function } => format!("intrinsic `{function}`"),
            NodeKind::Mixin { function, mixin } => format!("mixin function `{mixin}::{function}`"),
            NodeKind::Custom { function, .. } => format!("custom function `{function}`"),
            NodeKind::Patched { name, .. } => format!("patched function `{name}`"),
            NodeKind::Parameter { index } => format!("parameter #{index}"),
        }
    }
}

/// One composition node.
pub struct ShaderNode {
    kind: NodeKind,
    output: GpuValue,
    ins: Vec<GpuValue>,
    template: String,
    values: ValueMap,
    artifacts: Artifacts,
    source: OnceCell<String>,
}

impl Debug for ShaderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderNode")
            .field("kind", &self.kind)
            .field("output", &self.output)
            .field("ins", &self.ins)
            .finish_non_exhaustive()
    }
}

impl ShaderNode {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn output(&self) -> &GpuValue {
        &self.output
    }

    /// Ordered operands.
    pub fn ins(&self) -> &[GpuValue] {
        &self.ins
    }

    /// Statement template; empty for nodes that only contribute an identifier.
    pub fn source_template(&self) -> &str {
        &self.template
    }

    /// Functions, mixins, declarations and inputs this node contributes.
    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn function_name(&self) -> Option<&str> {
        self.kind.function_name()
    }

    /// Human readable label used in errors and logs.
    pub fn label(&self) -> String {
        format!("{} ({})", self.kind.describe(), self.output.id)
    }

    /// The node's own statement, rendered once and cached.
    pub fn statement(&self, mapper: &dyn TypeMapper) -> Result<&str> {
        if let Some(source) = self.source.get() {
            return Ok(source.as_str());
        }
        let rendered = self.render_statement(mapper)?;
        Ok(self.source.get_or_init(|| rendered).as_str())
    }

    fn render_statement(&self, mapper: &dyn TypeMapper) -> Result<String> {
        if self.template.is_empty() {
            return Ok(String::new());
        }

        let mut values = self.values.clone();
        values.insert("resultType".into(), self.output.type_name(mapper)?);
        values.insert("resultName".into(), self.output.id.clone());
        values.insert(
            "arguments".into(),
            self.ins.iter().map(GpuValue::id).collect::<Vec<_>>().join(", "),
        );
        for (i, input) in self.ins.iter().enumerate() {
            values.insert(format!("arg{i}"), input.id.clone());
        }

        evaluate(&self.template, &values)
    }
}

/// Everything needed to add one node to a [`ShaderGraph`].
pub(crate) struct NewNode {
    pub kind: NodeKind,
    pub ty: ValueType,
    pub ins: Vec<GpuValue>,
    pub template: String,
    pub values: ValueMap,
    pub artifacts: Artifacts,
    /// Fixed output identifier; computed nodes get `val<index>`.
    pub id: Option<String>,
}

/// Arena owning every node of one shader composition.
pub struct ShaderGraph {
    id: GraphId,
    nodes: Vec<ShaderNode>,
    mapper: Box<dyn TypeMapper>,
    options: ComposeOptions,
}

impl Debug for ShaderGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderGraph")
            .field("nodes", &self.nodes)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for ShaderGraph {
    fn default() -> Self {
        Self::new(ComposeOptions::default())
    }
}

impl ShaderGraph {
    /// Create a graph using the dialect's built-in type mapper.
    pub fn new(options: ComposeOptions) -> Self {
        let mapper = options.dialect.type_mapper();
        Self::with_mapper(options, mapper)
    }

    pub fn with_mapper(options: ComposeOptions, mapper: Box<dyn TypeMapper>) -> Self {
        Self {
            id: GraphId::fresh(),
            nodes: Vec::new(),
            mapper,
            options,
        }
    }

    pub fn wgsl() -> Self {
        Self::new(ComposeOptions::wgsl())
    }

    pub fn hlsl() -> Self {
        Self::new(ComposeOptions::hlsl())
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    pub fn mapper(&self) -> &dyn TypeMapper {
        self.mapper.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&ShaderNode> {
        self.nodes
            .get(id.0)
            .ok_or(ComposeError::UnknownNode { index: id.0 })
    }

    /// Shader type spelling of a value.
    pub fn type_name(&self, value: &GpuValue) -> Result<String> {
        value.type_name(self.mapper())
    }

    /// Ensure `value` was produced by this graph.
    ///
    /// Values carry their graph's tag, so a handle from another graph is rejected even when
    /// its index, identifier and type match a local node.
    pub(crate) fn check_value(&self, value: &GpuValue) -> Result<&ShaderNode> {
        let node = self.node(value.parent)?;
        if node.output != *value {
            return Err(ComposeError::UnknownNode {
                index: value.parent.0,
            });
        }
        Ok(node)
    }

    /// Arena index the next node will get.
    pub(crate) fn next_index(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn push_node(&mut self, new: NewNode) -> Result<GpuValue> {
        for input in &new.ins {
            self.check_value(input)?;
        }
        // Surface unsupported result types at construction rather than at render time.
        self.mapper.shader_type_name(new.ty)?;

        let index = self.nodes.len();
        let output = GpuValue {
            id: new.id.unwrap_or_else(|| format!("val{index}")),
            ty: new.ty,
            parent: NodeId(index),
            graph: self.id,
        };

        let node = ShaderNode {
            kind: new.kind,
            output: output.clone(),
            ins: new.ins,
            template: new.template,
            values: new.values,
            artifacts: new.artifacts,
            source: OnceCell::new(),
        };
        tracing::debug!(node = %node.label(), "added node");
        self.nodes.push(node);

        Ok(output)
    }

    /// Replace operand `slot` of `node` with `value` of the same semantic type.
    ///
    /// This is the only mutation after construction; it may introduce a cycle, which
    /// rendering reports. Nodes already rendered into a patched function body are frozen.
    pub fn set_input(&mut self, node: NodeId, slot: usize, value: &GpuValue) -> Result<()> {
        self.check_value(value)?;
        let label = self.node(node)?.label();
        if let Some(function) = self.capturing_function(node)? {
            return Err(ComposeError::FrozenNode {
                node: label,
                function,
            });
        }

        let target = &mut self.nodes[node.0];

        let Some(current) = target.ins.get(slot) else {
            return Err(ComposeError::ArityMismatch {
                node: label,
                expected: target.ins.len(),
                got: slot + 1,
            });
        };
        if current.ty != value.ty {
            return Err(ComposeError::TypeMismatch {
                context: format!("input {slot} of {label}"),
                expected: current.ty,
                got: value.ty,
            });
        }

        target.ins[slot] = value.clone();
        target.source = OnceCell::new();
        Ok(())
    }

    /// Signature of a patched function whose captured body contains `node`.
    fn capturing_function(&self, node: NodeId) -> Result<Option<String>> {
        for owner in &self.nodes {
            if let NodeKind::Patched {
                signature, body, ..
            } = &owner.kind
            {
                if self.dependency_order(*body)?.contains(&node) {
                    return Ok(Some(signature.clone()));
                }
            }
        }
        Ok(None)
    }

    /// Node whose output is named `name`, if any.
    pub(crate) fn find_identifier(&self, name: &str) -> Option<&ShaderNode> {
        self.nodes.iter().find(|node| node.output.id == name)
    }

    /// Nodes reachable from `root` (inclusive), producers before consumers, each once.
    pub fn dependency_order(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut visiting = HashSet::new();
        let mut emitted = HashSet::new();
        let mut order = Vec::new();
        self.visit(root, &mut visiting, &mut emitted, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        id: NodeId,
        visiting: &mut HashSet<NodeId>,
        emitted: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<()> {
        if emitted.contains(&id) {
            return Ok(());
        }
        let node = self.node(id)?;
        if !visiting.insert(id) {
            return Err(ComposeError::CyclicGraph { node: node.label() });
        }

        for input in &node.ins {
            self.visit(input.parent, visiting, emitted, order)?;
        }

        visiting.remove(&id);
        emitted.insert(id);
        order.push(id);
        Ok(())
    }

    /// Non-empty statements of the subgraph ending at `root`, producer-first.
    pub fn statements(&self, root: NodeId) -> Result<Vec<&str>> {
        let mut out = Vec::new();
        for id in self.dependency_order(root)? {
            let statement = self.nodes[id.0].statement(self.mapper())?;
            if !statement.is_empty() {
                out.push(statement);
            }
        }
        Ok(out)
    }

    /// Rendered source of the subgraph producing `value`, one statement per line.
    pub fn build_source_code(&self, value: &GpuValue) -> Result<String> {
        self.check_value(value)?;
        Ok(self.statements(value.parent)?.join("\n"))
    }

    /// Artifacts of every node reachable from `root`, merged producer-first.
    pub fn collect_artifacts(&self, root: NodeId) -> Result<Artifacts> {
        let mut artifacts = Artifacts::default();
        for id in self.dependency_order(root)? {
            artifacts.absorb(&self.nodes[id.0].artifacts, self.options.collision_policy)?;
        }
        Ok(artifacts)
    }

    /// Snapshot the node producing `value` as a delegate callable under `name`.
    ///
    /// The snapshot carries the artifacts of the node's whole subgraph.
    pub fn delegate(&self, name: &str, value: &GpuValue) -> Result<Delegate> {
        let node = self.check_value(value)?;
        let function_name = node
            .function_name()
            .ok_or_else(|| ComposeError::NotCallable { node: node.label() })?
            .to_string();

        Ok(Delegate {
            name: name.to_string(),
            function_name,
            artifacts: self.collect_artifacts(value.parent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::FunctionSpec;

    #[test]
    fn rendering_twice_is_byte_identical() {
        let mut g = ShaderGraph::wgsl();
        let a = g.add_input("a", ValueType::F32).unwrap();
        let b = g.add_constant("2.0", ValueType::F32).unwrap();
        let m = g
            .add_intrinsic(FunctionSpec::new("max", vec![a, b], ValueType::F32))
            .unwrap();

        let first = g.build_source_code(&m).unwrap();
        let second = g.build_source_code(&m).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "let val1: f32 = 2.0;\nlet val2: f32 = max(a, val1);"
        );
    }

    #[test]
    fn shared_producer_is_emitted_once_before_consumers() {
        let mut g = ShaderGraph::hlsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        let p = g
            .add_intrinsic(FunctionSpec::new("sin", vec![x], ValueType::F32))
            .unwrap();
        let left = g
            .add_intrinsic(FunctionSpec::new("abs", vec![p.clone()], ValueType::F32))
            .unwrap();
        let right = g
            .add_intrinsic(FunctionSpec::new("exp", vec![p.clone()], ValueType::F32))
            .unwrap();
        let join = g
            .add_intrinsic(FunctionSpec::new("max", vec![left, right], ValueType::F32))
            .unwrap();

        let source = g.build_source_code(&join).unwrap();
        let producer = format!("float {} = sin(x);", p.id());
        assert_eq!(source.matches(&producer).count(), 1);
        let lines: Vec<&str> = source.lines().collect();
        assert_eq!(lines[0], producer);
        assert!(lines[3].starts_with(&format!("float {} = max(", join.id())));
    }

    #[test]
    fn rewiring_into_a_cycle_is_detected() {
        let mut g = ShaderGraph::wgsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        let a = g
            .add_intrinsic(FunctionSpec::new("abs", vec![x], ValueType::F32))
            .unwrap();
        let b = g
            .add_intrinsic(FunctionSpec::new("sqrt", vec![a.clone()], ValueType::F32))
            .unwrap();

        g.set_input(a.parent(), 0, &b).unwrap();

        let err = g.build_source_code(&b).unwrap_err();
        assert!(matches!(err, ComposeError::CyclicGraph { .. }));
    }

    #[test]
    fn set_input_invalidates_the_cached_statement() {
        let mut g = ShaderGraph::wgsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        let y = g.add_input("y", ValueType::F32).unwrap();
        let a = g
            .add_intrinsic(FunctionSpec::new("abs", vec![x], ValueType::F32))
            .unwrap();
        assert!(g.build_source_code(&a).unwrap().contains("abs(x)"));

        g.set_input(a.parent(), 0, &y).unwrap();
        assert!(g.build_source_code(&a).unwrap().contains("abs(y)"));
    }

    #[test]
    fn set_input_checks_slot_and_type() {
        let mut g = ShaderGraph::wgsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        let v = g.add_input("v", ValueType::Vec3).unwrap();
        let a = g
            .add_intrinsic(FunctionSpec::new("abs", vec![x.clone()], ValueType::F32))
            .unwrap();

        assert!(matches!(
            g.set_input(a.parent(), 1, &x).unwrap_err(),
            ComposeError::ArityMismatch { expected: 1, got: 2, .. }
        ));
        assert!(matches!(
            g.set_input(a.parent(), 0, &v).unwrap_err(),
            ComposeError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn values_from_another_graph_are_rejected() {
        let mut g = ShaderGraph::wgsl();
        let mut other = ShaderGraph::wgsl();
        other.add_input("a", ValueType::F32).unwrap();
        let foreign = other.add_input("b", ValueType::F32).unwrap();
        g.add_input("x", ValueType::F32).unwrap();

        let err = g
            .add_intrinsic(FunctionSpec::new("abs", vec![foreign], ValueType::F32))
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownNode { .. }));
    }

    #[test]
    fn foreign_value_with_a_matching_shape_is_rejected() {
        let mut g = ShaderGraph::wgsl();
        let mut twin = ShaderGraph::wgsl();
        let local = g.add_input("x", ValueType::F32).unwrap();
        let foreign = twin.add_input("x", ValueType::F32).unwrap();
        assert_eq!(
            (local.id(), local.ty(), local.parent()),
            (foreign.id(), foreign.ty(), foreign.parent())
        );

        assert_eq!(
            g.build_source_code(&foreign).unwrap_err(),
            ComposeError::UnknownNode { index: 0 }
        );
        let abs = g
            .add_intrinsic(FunctionSpec::new("abs", vec![local], ValueType::F32))
            .unwrap();
        assert!(matches!(
            g.set_input(abs.parent(), 0, &foreign).unwrap_err(),
            ComposeError::UnknownNode { .. }
        ));
    }

    #[test]
    fn leaf_inputs_cannot_be_delegates() {
        let mut g = ShaderGraph::wgsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        assert!(matches!(
            g.delegate("f", &x).unwrap_err(),
            ComposeError::NotCallable { .. }
        ));
    }
}
