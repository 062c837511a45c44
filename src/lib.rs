//! Shader function composition and code generation.
//!
//! Build a [`ShaderGraph`] by wiring the [`GpuValue`] outputs of earlier nodes into later
//! ones, then [`assemble`](ShaderGraph::assemble) a root value into a [`ShaderUnit`]: the
//! root's statements wrapped in an entry function, every generated function it depends on
//! (deduplicated by signature, callees first), and the mixins, declarations and external
//! inputs the unit needs.
//!
//! ```
//! use shader_fuse::{FunctionSpec, PatchedFunctionSpec, ShaderGraph, ValueType};
//!
//! let mut graph = ShaderGraph::wgsl();
//! let x = graph.add_parameter(0, ValueType::F32)?;
//! let y = graph.add_parameter(1, ValueType::F32)?;
//! let body = graph.add_intrinsic(FunctionSpec::new("max", vec![x, y], ValueType::F32))?;
//!
//! let a = graph.add_input("a", ValueType::F32)?;
//! let b = graph.add_input("b", ValueType::F32)?;
//! let call = graph.add_patched(PatchedFunctionSpec::new("pick", vec![a, b], body))?;
//!
//! let unit = graph.assemble(&call)?;
//! assert_eq!(unit.functions[0].signature, "pickF32F32ToF32");
//! shader_fuse::validation::validate_wgsl(&unit.source)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod artifacts;
pub mod assemble;
pub mod config;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod template;
pub mod types;
pub mod validation;

pub use artifacts::{Artifacts, Delegate, FunctionDef, FunctionRegistry, GpuInput};
pub use assemble::{CompilationSink, ShaderUnit};
pub use config::{CollisionPolicy, ComposeOptions};
pub use error::{ComposeError, Result};
pub use graph::{GpuValue, NodeId, NodeKind, ShaderGraph, ShaderNode};
pub use nodes::{Composition, CustomFunctionSpec, FunctionSpec, PatchedFunctionSpec};
pub use types::{Dialect, HlslTypes, TypeMapper, ValueType, WgslTypes};
pub use validation::{WgslValidationSink, validate_unit, validate_wgsl};
