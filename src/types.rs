//! Semantic value types and their mapping to shader-language type names.

use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, Result};

/// Host-side semantic type carried by every [`GpuValue`](crate::graph::GpuValue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    F32,
    F64,
    I32,
    U32,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

/// Target shading language family. Picks the statement/function templates and the
/// built-in [`TypeMapper`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// HLSL-style C syntax (`float3 x = f(a);`), as consumed by effect/mixin systems.
    #[default]
    Hlsl,
    Wgsl,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Hlsl => "hlsl",
            Dialect::Wgsl => "wgsl",
        }
    }

    /// Built-in mapper for this dialect.
    pub fn type_mapper(self) -> Box<dyn TypeMapper> {
        match self {
            Dialect::Hlsl => Box::new(HlslTypes),
            Dialect::Wgsl => Box::new(WgslTypes),
        }
    }

    /// Template for a node that calls `${function}` and binds the result.
    pub fn call_template(self) -> &'static str {
        match self {
            Dialect::Hlsl => "${resultType} ${resultName} = ${function}(${arguments});",
            Dialect::Wgsl => "let ${resultName}: ${resultType} = ${function}(${arguments});",
        }
    }

    pub fn constant_template(self) -> &'static str {
        match self {
            Dialect::Hlsl => "${resultType} ${resultName} = ${value};",
            Dialect::Wgsl => "let ${resultName}: ${resultType} = ${value};",
        }
    }

    /// Template for a complete function definition. `${functionImplementation}` holds the
    /// rendered body, one indented line per statement, each ending in a newline.
    pub fn function_template(self) -> &'static str {
        match self {
            Dialect::Hlsl => {
                "${resultType} ${functionName}(${arguments})\n{\n${functionImplementation}${indent}return ${result};\n}"
            }
            Dialect::Wgsl => {
                "fn ${functionName}(${arguments}) -> ${resultType} {\n${functionImplementation}${indent}return ${result};\n}"
            }
        }
    }

    /// One formal parameter as it appears in a parameter list.
    pub fn parameter(self, type_name: &str, name: &str) -> String {
        match self {
            Dialect::Hlsl => format!("{type_name} {name}"),
            Dialect::Wgsl => format!("{name}: {type_name}"),
        }
    }

    /// Free-standing declaration for an externally bound input.
    pub fn input_declaration(self, type_name: &str, name: &str) -> String {
        match self {
            Dialect::Hlsl => format!("uniform {type_name} {name};"),
            Dialect::Wgsl => format!("var<private> {name}: {type_name};"),
        }
    }
}

/// Maps semantic types to shader type names.
///
/// Implementations must be deterministic and total over the types they support, failing with
/// [`ComposeError::UnsupportedType`] for the rest.
pub trait TypeMapper: Send + Sync {
    fn shader_type_name(&self, ty: ValueType) -> Result<String>;

    /// Compact code used when deriving content-based function signatures.
    fn type_code(&self, ty: ValueType) -> Result<String> {
        let name = self.shader_type_name(ty)?;
        let mut chars = name.chars().filter(|c| c.is_ascii_alphanumeric());
        Ok(match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + &chars.collect::<String>(),
            None => String::new(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HlslTypes;

impl TypeMapper for HlslTypes {
    fn shader_type_name(&self, ty: ValueType) -> Result<String> {
        let name = match ty {
            ValueType::F32 => "float",
            ValueType::F64 => "double",
            ValueType::I32 => "int",
            ValueType::U32 => "uint",
            ValueType::Bool => "bool",
            ValueType::Vec2 => "float2",
            ValueType::Vec3 => "float3",
            ValueType::Vec4 => "float4",
            ValueType::Mat4 => "float4x4",
        };
        Ok(name.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WgslTypes;

impl TypeMapper for WgslTypes {
    fn shader_type_name(&self, ty: ValueType) -> Result<String> {
        let name = match ty {
            ValueType::F32 => "f32",
            ValueType::I32 => "i32",
            ValueType::U32 => "u32",
            ValueType::Bool => "bool",
            ValueType::Vec2 => "vec2f",
            ValueType::Vec3 => "vec3f",
            ValueType::Vec4 => "vec4f",
            ValueType::Mat4 => "mat4x4f",
            // Core WGSL has no double precision.
            ValueType::F64 => {
                return Err(ComposeError::UnsupportedType {
                    ty,
                    dialect: Dialect::Wgsl.name(),
                });
            }
        };
        Ok(name.to_string())
    }
}
