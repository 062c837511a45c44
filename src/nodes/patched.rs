//! Patched function nodes: turn a subgraph into a reusable named function.
//!
//! The subgraph ending at `function` becomes the body; [`ShaderGraph::add_parameter`]
//! placeholders inside it stand for the call-site arguments. The signature only depends on
//! the logical name and the argument/result types, so every call site with the same shape
//! shares one definition.

use crate::artifacts::{Artifacts, aggregate_delegates};
use crate::error::{ComposeError, Result};
use crate::graph::{GpuValue, NodeKind, ShaderGraph};
use crate::template::{ValueMap, build_parameter_list, build_type_signature, evaluate, sanitize_ident};
use crate::types::ValueType;

use super::{Composition, FunctionSpec};

#[derive(Clone, Debug)]
pub struct PatchedFunctionSpec {
    /// Logical function name, the signature prefix.
    pub name: String,
    /// Call-site arguments, bound to parameters `arg_0..` in order.
    pub args: Vec<GpuValue>,
    /// Result of the subgraph that becomes the function body.
    pub function: GpuValue,
    pub composition: Composition,
}

impl PatchedFunctionSpec {
    pub fn new(name: impl Into<String>, args: Vec<GpuValue>, function: GpuValue) -> Self {
        Self {
            name: name.into(),
            args,
            function,
            composition: Composition::default(),
        }
    }
}

impl ShaderGraph {
    pub fn add_patched(&mut self, spec: PatchedFunctionSpec) -> Result<GpuValue> {
        let PatchedFunctionSpec {
            name,
            args,
            function,
            composition,
        } = spec;

        let label = format!("patched function `{name}`");
        let policy = self.options().collision_policy;
        let indent = self.options().indent();
        self.check_value(&function)?;
        for arg in &args {
            self.check_value(arg)?;
        }

        let arg_types: Vec<ValueType> = args.iter().map(GpuValue::ty).collect();
        let result = function.ty();

        let mut artifacts = Artifacts {
            mixins: composition.mixins,
            ..Artifacts::default()
        };
        let mut body = String::new();
        for id in self.dependency_order(function.parent())? {
            let node = self.node(id)?;
            if let NodeKind::Parameter { index } = *node.kind() {
                let Some(arg) = args.get(index) else {
                    return Err(ComposeError::ArityMismatch {
                        node: label,
                        expected: index + 1,
                        got: args.len(),
                    });
                };
                if arg.ty() != node.output().ty() {
                    return Err(ComposeError::TypeMismatch {
                        context: format!("argument {index} of {label}"),
                        expected: node.output().ty(),
                        got: arg.ty(),
                    });
                }
            }

            artifacts.absorb(node.artifacts(), policy)?;
            let statement = node.statement(self.mapper())?;
            if !statement.is_empty() {
                body.push_str(&indent);
                body.push_str(statement);
                body.push('\n');
            }
        }

        let signature =
            build_type_signature(self.mapper(), &sanitize_ident(&name), &arg_types, result)?;

        let mut values = ValueMap::from([
            ("resultType".to_string(), self.mapper().shader_type_name(result)?),
            ("functionName".to_string(), signature.clone()),
            (
                "arguments".to_string(),
                build_parameter_list(self.dialect(), self.mapper(), &arg_types)?,
            ),
            ("functionImplementation".to_string(), body),
            ("result".to_string(), function.id().to_string()),
            ("indent".to_string(), indent),
        ]);
        aggregate_delegates(&composition.delegates, &label, &mut values, &mut artifacts, policy)?;

        let source = evaluate(self.dialect().function_template(), &values)?;
        artifacts.functions.insert(&signature, &source, policy)?;

        let kind = NodeKind::Patched {
            name,
            signature: signature.clone(),
            body: function.parent(),
        };
        let call = FunctionSpec::new(signature.clone(), args, result);
        self.push_call(kind, call, signature, artifacts)
    }
}
