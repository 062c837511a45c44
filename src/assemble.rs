//! Assembly of a rooted subgraph into one compilable [`ShaderUnit`].

use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::artifacts::{Artifacts, FunctionDef, GpuInput};
use crate::error::{ComposeError, Result};
use crate::graph::{GpuValue, NodeKind, ShaderGraph};
use crate::template::{ValueMap, evaluate};
use crate::types::Dialect;

/// A fully assembled unit of shader source plus the metadata the compiler needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderUnit {
    pub dialect: Dialect,
    /// Name of the function wrapping the root statements.
    pub entry: String,
    /// Identifier the entry function returns.
    pub result: String,
    pub result_type: String,
    /// Generated functions, callees before callers.
    pub functions: Vec<FunctionDef>,
    pub mixins: Vec<String>,
    pub declarations: Vec<String>,
    pub inputs: Vec<GpuInput>,
    /// Root statements, producer-first, unindented.
    pub body: String,
    /// Declarations, functions and the entry function.
    pub source: String,
}

/// Downstream compiler/material system receiving assembled units.
pub trait CompilationSink {
    fn accept(&mut self, unit: &ShaderUnit) -> anyhow::Result<()>;
}

impl ShaderGraph {
    /// Assemble the subgraph producing `root` into a [`ShaderUnit`].
    ///
    /// Mixins, declarations and inputs are deduplicated here, keeping first occurrences.
    pub fn assemble(&self, root: &GpuValue) -> Result<ShaderUnit> {
        self.check_value(root)?;
        let entry = self.options().entry_name.clone();

        for id in self.dependency_order(root.parent())? {
            let node = self.node(id)?;
            if let NodeKind::Parameter { index } = node.kind() {
                return Err(ComposeError::ArityMismatch {
                    node: format!("entry function `{entry}`"),
                    expected: 0,
                    got: index + 1,
                });
            }
        }

        let mut artifacts = self.collect_artifacts(root.parent())?;
        artifacts.dedup();
        check_module_names(&artifacts, &entry)?;

        let statements = self.statements(root.parent())?;
        let indent = self.options().indent();
        let implementation: String = statements
            .iter()
            .map(|s| format!("{indent}{s}\n"))
            .collect();

        let result_type = self.type_name(root)?;
        let values = ValueMap::from([
            ("resultType".to_string(), result_type.clone()),
            ("functionName".to_string(), entry.clone()),
            ("arguments".to_string(), String::new()),
            ("functionImplementation".to_string(), implementation),
            ("result".to_string(), root.id().to_string()),
            ("indent".to_string(), indent),
        ]);
        let entry_source = evaluate(self.dialect().function_template(), &values)?;

        let mut sections: Vec<String> = Vec::new();
        if !artifacts.declarations.is_empty() {
            sections.push(artifacts.declarations.join("\n"));
        }
        sections.extend(artifacts.functions.iter().map(|f| f.source.clone()));
        sections.push(entry_source);
        let mut source = sections.join("\n\n");
        source.push('\n');

        tracing::debug!(
            entry = %entry,
            functions = artifacts.functions.len(),
            mixins = artifacts.mixins.len(),
            "assembled shader unit"
        );

        Ok(ShaderUnit {
            dialect: self.dialect(),
            entry,
            result: root.id().to_string(),
            result_type,
            functions: artifacts.functions.iter().cloned().collect(),
            mixins: artifacts.mixins,
            declarations: artifacts.declarations,
            inputs: artifacts.inputs,
            body: statements.join("\n"),
            source,
        })
    }

    /// Assemble `root` and hand the unit to `sink`.
    pub fn compile_into(
        &self,
        root: &GpuValue,
        sink: &mut dyn CompilationSink,
    ) -> anyhow::Result<ShaderUnit> {
        let unit = self
            .assemble(root)
            .with_context(|| format!("failed to assemble shader unit for `{}`", root.id()))?;
        sink.accept(&unit)
            .with_context(|| format!("compilation sink rejected unit `{}`", unit.entry))?;
        Ok(unit)
    }
}

/// Inputs, generated functions and the entry function share one module scope.
fn check_module_names(artifacts: &Artifacts, entry: &str) -> Result<()> {
    let inputs = artifacts
        .inputs
        .iter()
        .map(|input| (input.name.as_str(), format!("input `{}`", input.name)));
    let functions = artifacts
        .functions
        .iter()
        .map(|f| (f.signature.as_str(), format!("function `{}`", f.signature)));
    let entry = std::iter::once((entry, "the entry function".to_string()));

    let mut seen: HashMap<&str, String> = HashMap::new();
    for (name, owner) in inputs.chain(functions).chain(entry) {
        if let Some(first) = seen.insert(name, owner) {
            return Err(ComposeError::DuplicateIdentifier {
                name: name.to_string(),
                owner: first,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{FunctionSpec, PatchedFunctionSpec};
    use crate::types::ValueType;

    #[derive(Default)]
    struct Recorder {
        units: Vec<ShaderUnit>,
    }

    impl CompilationSink for Recorder {
        fn accept(&mut self, unit: &ShaderUnit) -> anyhow::Result<()> {
            self.units.push(unit.clone());
            Ok(())
        }
    }

    struct Refuse;

    impl CompilationSink for Refuse {
        fn accept(&mut self, _unit: &ShaderUnit) -> anyhow::Result<()> {
            anyhow::bail!("no")
        }
    }

    #[test]
    fn combine_end_to_end() {
        let mut g = ShaderGraph::hlsl();
        let p0 = g.add_parameter(0, ValueType::F32).unwrap();
        let p1 = g.add_parameter(1, ValueType::F32).unwrap();
        let add = g
            .add_intrinsic(FunctionSpec::new("add", vec![p0, p1], ValueType::F32))
            .unwrap();
        let a = g.add_input("a", ValueType::F32).unwrap();
        let b = g.add_input("b", ValueType::F32).unwrap();
        let combined = g
            .add_patched(PatchedFunctionSpec::new("combine", vec![a, b], add.clone()))
            .unwrap();

        let unit = g.assemble(&combined).unwrap();

        assert_eq!(unit.functions.len(), 1);
        let f = &unit.functions[0];
        assert_eq!(f.signature, "combineFloatFloatToFloat");
        assert_eq!(f.source.matches("return ").count(), 1);
        assert!(f.source.contains(&format!("return {};", add.id())));
        assert_eq!(unit.body, "float val5 = combineFloatFloatToFloat(a, b);");
        assert_eq!(unit.declarations, ["uniform float a;", "uniform float b;"]);
        assert_eq!(
            unit.source,
            "uniform float a;\nuniform float b;\n\n\
             float combineFloatFloatToFloat(float arg_0, float arg_1)\n{\n    float val2 = add(arg_0, arg_1);\n    return val2;\n}\n\n\
             float compose_main()\n{\n    float val5 = combineFloatFloatToFloat(a, b);\n    return val5;\n}\n"
        );
    }

    #[test]
    fn mixins_are_deduplicated_in_first_use_order() {
        let mut g = ShaderGraph::hlsl();
        let uv = g.add_input("uv", ValueType::Vec2).unwrap();
        let n1 = g
            .add_mixin_function(FunctionSpec::new("noise", vec![uv.clone()], ValueType::F32), "Noise")
            .unwrap();
        let n2 = g
            .add_mixin_function(FunctionSpec::new("cells", vec![uv.clone()], ValueType::F32), "Voronoi")
            .unwrap();
        let n3 = g
            .add_mixin_function(FunctionSpec::new("noise", vec![uv], ValueType::F32), "Noise")
            .unwrap();
        let m = g
            .add_intrinsic(FunctionSpec::new("max", vec![n1, n2], ValueType::F32))
            .unwrap();
        let root = g
            .add_intrinsic(FunctionSpec::new("max", vec![m, n3], ValueType::F32))
            .unwrap();

        let unit = g.assemble(&root).unwrap();
        assert_eq!(unit.mixins, ["Noise", "Voronoi"]);
        assert_eq!(unit.inputs.len(), 1);
    }

    #[test]
    fn unbound_parameter_in_entry_is_rejected() {
        let mut g = ShaderGraph::wgsl();
        let p = g.add_parameter(0, ValueType::F32).unwrap();
        let r = g
            .add_intrinsic(FunctionSpec::new("abs", vec![p], ValueType::F32))
            .unwrap();
        assert!(matches!(
            g.assemble(&r).unwrap_err(),
            ComposeError::ArityMismatch { expected: 0, got: 1, .. }
        ));
    }

    #[test]
    fn inputs_cannot_shadow_generated_functions() {
        let mut g = ShaderGraph::wgsl();
        let p = g.add_parameter(0, ValueType::F32).unwrap();
        let body = g
            .add_intrinsic(FunctionSpec::new("abs", vec![p], ValueType::F32))
            .unwrap();
        let clash = g.add_input("magF32ToF32", ValueType::F32).unwrap();
        let call = g
            .add_patched(PatchedFunctionSpec::new("mag", vec![clash], body))
            .unwrap();
        assert_eq!(
            g.assemble(&call).unwrap_err(),
            ComposeError::DuplicateIdentifier {
                name: "magF32ToF32".into(),
                owner: "input `magF32ToF32`".into(),
            }
        );

        let mut g = ShaderGraph::wgsl();
        let main = g.add_input("compose_main", ValueType::F32).unwrap();
        assert!(matches!(
            g.assemble(&main).unwrap_err(),
            ComposeError::DuplicateIdentifier { ref name, .. } if name == "compose_main"
        ));
    }

    #[test]
    fn compile_into_hands_the_unit_to_the_sink() {
        let mut g = ShaderGraph::wgsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        let r = g
            .add_intrinsic(FunctionSpec::new("abs", vec![x], ValueType::F32))
            .unwrap();

        let mut recorder = Recorder::default();
        let unit = g.compile_into(&r, &mut recorder).unwrap();
        assert_eq!(recorder.units, [unit]);

        let err = g.compile_into(&r, &mut Refuse).unwrap_err();
        assert!(format!("{err:#}").contains("compilation sink rejected unit `compose_main`"));
    }

    #[test]
    fn unit_metadata_round_trips_through_json() {
        let mut g = ShaderGraph::wgsl();
        let x = g.add_input("x", ValueType::F32).unwrap();
        let unit = g.assemble(&x).unwrap();
        let json = serde_json::to_string(&unit).unwrap();
        assert!(json.contains("\"dialect\":\"wgsl\""));
        assert_eq!(serde_json::from_str::<ShaderUnit>(&json).unwrap(), unit);
    }
}
