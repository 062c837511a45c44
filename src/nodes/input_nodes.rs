//! Leaf nodes: external inputs, constants and patched-function parameters.

use crate::artifacts::{Artifacts, GpuInput};
use crate::error::{ComposeError, Result};
use crate::graph::{GpuValue, NewNode, NodeKind, ShaderGraph};
use crate::template::{ValueMap, is_reserved_ident, parameter_name, sanitize_ident};
use crate::types::ValueType;

impl ShaderGraph {
    /// External leaf input. Its identifier is `name` (sanitized); it emits no statement but
    /// contributes a declaration and a [`GpuInput`].
    ///
    /// Names shaped like generated identifiers, and names already used in the graph, are
    /// rejected.
    pub fn add_input(&mut self, name: &str, ty: ValueType) -> Result<GpuValue> {
        let name = sanitize_ident(name);
        if is_reserved_ident(&name) {
            return Err(ComposeError::ReservedIdentifier { name });
        }
        if let Some(owner) = self.find_identifier(&name) {
            return Err(ComposeError::DuplicateIdentifier {
                owner: owner.label(),
                name,
            });
        }
        let type_name = self.mapper().shader_type_name(ty)?;

        let artifacts = Artifacts {
            declarations: vec![self.dialect().input_declaration(&type_name, &name)],
            inputs: vec![GpuInput {
                name: name.clone(),
                ty,
            }],
            ..Artifacts::default()
        };

        self.push_node(NewNode {
            kind: NodeKind::Input { name: name.clone() },
            ty,
            ins: Vec::new(),
            template: String::new(),
            values: ValueMap::new(),
            artifacts,
            id: Some(name),
        })
    }

    /// Literal value bound to a fresh identifier.
    pub fn add_constant(&mut self, literal: &str, ty: ValueType) -> Result<GpuValue> {
        let values = ValueMap::from([("value".to_string(), literal.to_string())]);
        let template = self.dialect().constant_template().to_string();
        self.push_node(NewNode {
            kind: NodeKind::Constant {
                literal: literal.to_string(),
            },
            ty,
            ins: Vec::new(),
            template,
            values,
            artifacts: Artifacts::default(),
            id: None,
        })
    }

    /// Placeholder for the `index`-th parameter of a patched function body, named `arg_<index>`.
    pub fn add_parameter(&mut self, index: usize, ty: ValueType) -> Result<GpuValue> {
        self.push_node(NewNode {
            kind: NodeKind::Parameter { index },
            ty,
            ins: Vec::new(),
            template: String::new(),
            values: ValueMap::new(),
            artifacts: Artifacts::default(),
            id: Some(parameter_name(index)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposeError;

    #[test]
    fn input_contributes_declaration_but_no_statement() {
        let mut g = ShaderGraph::wgsl();
        let t = g.add_input("time", ValueType::F32).unwrap();

        assert_eq!(t.id(), "time");
        assert_eq!(g.build_source_code(&t).unwrap(), "");
        let node = g.node(t.parent()).unwrap();
        assert_eq!(node.artifacts().declarations, ["var<private> time: f32;"]);
        assert_eq!(
            node.artifacts().inputs,
            [GpuInput { name: "time".into(), ty: ValueType::F32 }]
        );
    }

    #[test]
    fn hlsl_input_declaration() {
        let mut g = ShaderGraph::hlsl();
        let c = g.add_input("tint color", ValueType::Vec4).unwrap();
        assert_eq!(c.id(), "tint_color");
        assert_eq!(
            g.node(c.parent()).unwrap().artifacts().declarations,
            ["uniform float4 tint_color;"]
        );
    }

    #[test]
    fn constant_renders_a_binding() {
        let mut g = ShaderGraph::hlsl();
        let c = g.add_constant("float3(1, 0, 0)", ValueType::Vec3).unwrap();
        assert_eq!(g.build_source_code(&c).unwrap(), "float3 val0 = float3(1, 0, 0);");
    }

    #[test]
    fn parameter_has_an_empty_template_and_positional_name() {
        let mut g = ShaderGraph::wgsl();
        let p = g.add_parameter(2, ValueType::Vec2).unwrap();
        assert_eq!(p.id(), "arg_2");
        assert_eq!(g.type_name(&p).unwrap(), "vec2f");
        assert_eq!(g.node(p.parent()).unwrap().source_template(), "");
    }

    #[test]
    fn generated_identifier_shapes_are_reserved() {
        let mut g = ShaderGraph::wgsl();
        for name in ["val1", "arg_0"] {
            assert_eq!(
                g.add_input(name, ValueType::F32).unwrap_err(),
                ComposeError::ReservedIdentifier { name: name.into() }
            );
        }
        assert!(g.is_empty());

        let input = g.add_input("value1", ValueType::F32).unwrap();
        let constant = g.add_constant("2.0", ValueType::F32).unwrap();
        assert_ne!(input.id(), constant.id());
    }

    #[test]
    fn input_names_are_unique_per_graph() {
        let mut g = ShaderGraph::wgsl();
        g.add_input("a", ValueType::F32).unwrap();
        assert!(matches!(
            g.add_input("a", ValueType::Vec3).unwrap_err(),
            ComposeError::DuplicateIdentifier { ref name, .. } if name == "a"
        ));
        // Sanitizing can map distinct names onto one identifier.
        g.add_input("tint color", ValueType::Vec4).unwrap();
        assert!(matches!(
            g.add_input("tint-color", ValueType::Vec4).unwrap_err(),
            ComposeError::DuplicateIdentifier { .. }
        ));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn unsupported_type_fails_at_construction() {
        let mut g = ShaderGraph::wgsl();
        assert!(matches!(
            g.add_constant("1.0", ValueType::F64).unwrap_err(),
            ComposeError::UnsupportedType { ty: ValueType::F64, .. }
        ));
        assert!(g.is_empty());
    }
}
