//! Node constructors, grouped by family.
//!
//! Each family adds `ShaderGraph::add_*` methods returning the new node's output value.

pub mod function_nodes;
pub mod input_nodes;
pub mod patched;

use crate::artifacts::Delegate;
use crate::error::{ComposeError, Result};
use crate::graph::GpuValue;
use crate::template::max_positional_reference;
use crate::types::ValueType;

pub use function_nodes::CustomFunctionSpec;
pub use patched::PatchedFunctionSpec;

/// A call site: function name, ordered operands and result type.
#[derive(Clone, Debug)]
pub struct FunctionSpec {
    pub function: String,
    pub args: Vec<GpuValue>,
    pub result: ValueType,
    /// Declared operand count, checked against `args` at construction.
    pub arity: Option<usize>,
    /// Statement template replacing the dialect's generic call template.
    ///
    /// May reference operands positionally as `${arg0}`, `${arg1}`, ...
    pub template: Option<String>,
}

impl FunctionSpec {
    pub fn new(function: impl Into<String>, args: Vec<GpuValue>, result: ValueType) -> Self {
        Self {
            function: function.into(),
            args,
            result,
            arity: None,
            template: None,
        }
    }

    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Check operand count against the declared arity and any positional references in the
    /// statement template.
    pub(crate) fn check_arity(&self, template: &str) -> Result<()> {
        let got = self.args.len();
        if let Some(expected) = self.arity {
            if expected != got {
                return Err(ComposeError::ArityMismatch {
                    node: format!("`{}`", self.function),
                    expected,
                    got,
                });
            }
        }
        if let Some(max) = max_positional_reference(template) {
            if max >= got {
                return Err(ComposeError::ArityMismatch {
                    node: format!("`{}`", self.function),
                    expected: max + 1,
                    got,
                });
            }
        }
        Ok(())
    }
}

/// Optional delegates and extra mixins shared by the function-defining variants.
#[derive(Clone, Debug, Default)]
pub struct Composition {
    /// `None` entries are skipped.
    pub delegates: Vec<Option<Delegate>>,
    pub mixins: Vec<String>,
}
