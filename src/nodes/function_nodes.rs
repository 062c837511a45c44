//! Function call nodes: intrinsic, mixin-attached and custom-templated.

use crate::artifacts::{Artifacts, aggregate_delegates};
use crate::error::{ComposeError, Result};
use crate::graph::{GpuValue, NewNode, NodeKind, ShaderGraph};
use crate::template::{ValueMap, evaluate, indent_code, sanitize_ident};

use super::{Composition, FunctionSpec};

/// A call to a function defined by a caller-supplied code template.
#[derive(Clone, Debug)]
pub struct CustomFunctionSpec {
    pub call: FunctionSpec,
    /// Complete function definition. `${signature}` and `${resultType}` are always bound,
    /// as is every delegate name and every entry of `function_values`.
    pub code_template: String,
    pub composition: Composition,
    pub function_values: Vec<(String, String)>,
}

impl CustomFunctionSpec {
    pub fn new(call: FunctionSpec, code_template: impl Into<String>) -> Self {
        Self {
            call,
            code_template: code_template.into(),
            composition: Composition::default(),
            function_values: Vec::new(),
        }
    }
}

impl ShaderGraph {
    /// Direct call to a built-in function; registers nothing.
    pub fn add_intrinsic(&mut self, spec: FunctionSpec) -> Result<GpuValue> {
        let kind = NodeKind::Intrinsic {
            function: spec.function.clone(),
        };
        let callee = spec.function.clone();
        self.push_call(kind, spec, callee, Artifacts::default())
    }

    /// Built-in call only available once `mixin` is included.
    pub fn add_mixin_function(&mut self, spec: FunctionSpec, mixin: &str) -> Result<GpuValue> {
        let kind = NodeKind::Mixin {
            function: spec.function.clone(),
            mixin: mixin.to_string(),
        };
        let callee = spec.function.clone();
        let artifacts = Artifacts {
            mixins: vec![mixin.to_string()],
            ..Artifacts::default()
        };
        self.push_call(kind, spec, callee, artifacts)
    }

    /// Register a new function rendered from `spec.code_template` and call it.
    ///
    /// The signature is `<function>_<node index>`: unique per node, so textually identical
    /// templates never share a definition.
    pub fn add_custom(&mut self, spec: CustomFunctionSpec) -> Result<GpuValue> {
        let CustomFunctionSpec {
            call,
            code_template,
            composition,
            function_values,
        } = spec;

        let signature = format!("{}_{}", sanitize_ident(&call.function), self.next_index());
        let label = format!("custom function `{}`", call.function);
        let policy = self.options().collision_policy;

        let mut values = ValueMap::from([
            ("resultType".to_string(), self.mapper().shader_type_name(call.result)?),
            ("signature".to_string(), signature.clone()),
        ]);
        let mut artifacts = Artifacts {
            mixins: composition.mixins,
            ..Artifacts::default()
        };
        aggregate_delegates(&composition.delegates, &label, &mut values, &mut artifacts, policy)?;

        for (key, value) in function_values {
            if values.contains_key(&key) {
                return Err(ComposeError::DuplicatePlaceholder { key, node: label });
            }
            values.insert(key, value);
        }

        let code = indent_code(&code_template, 0, self.options().indent_width);
        let source = evaluate(&code, &values)?;
        artifacts.functions.insert(&signature, &source, policy)?;

        let kind = NodeKind::Custom {
            function: call.function.clone(),
            signature: signature.clone(),
        };
        self.push_call(kind, call, signature, artifacts)
    }

    /// Add a node whose statement calls `callee` with the spec's operands.
    pub(crate) fn push_call(
        &mut self,
        kind: NodeKind,
        spec: FunctionSpec,
        callee: String,
        artifacts: Artifacts,
    ) -> Result<GpuValue> {
        let template = spec
            .template
            .clone()
            .unwrap_or_else(|| self.dialect().call_template().to_string());
        spec.check_arity(&template)?;

        self.push_node(NewNode {
            kind,
            ty: spec.result,
            ins: spec.args,
            template,
            values: ValueMap::from([("function".to_string(), callee)]),
            artifacts,
            id: None,
        })
    }
}
