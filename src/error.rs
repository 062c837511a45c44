//! Error types raised while composing a shader graph.

use thiserror::Error;

use crate::types::ValueType;

/// Result type alias used throughout the composer.
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Errors surfaced to the code assembling a shader graph.
///
/// None of these are retryable: they all describe a malformed composition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// The type mapper has no shader spelling for a semantic type.
    #[error("no {dialect} shader type for {ty:?}")]
    UnsupportedType { ty: ValueType, dialect: &'static str },

    /// A `${key}` placeholder had no value at render time.
    #[error("unresolved placeholder `${{{placeholder}}}` in template:\n{template}")]
    TemplateSubstitution { placeholder: String, template: String },

    /// Operand count does not match what the node declares or references.
    #[error("{node} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        node: String,
        expected: usize,
        got: usize,
    },

    /// A node is reachable from itself through its own inputs.
    #[error("cycle detected while rendering {node}")]
    CyclicGraph { node: String },

    #[error("{context}: expected {expected:?}, got {got:?}")]
    TypeMismatch {
        context: String,
        expected: ValueType,
        got: ValueType,
    },

    /// The node has no function name to call (inputs, constants, parameters).
    #[error("{node} cannot be used as a delegate: it defines no callable function")]
    NotCallable { node: String },

    #[error("substitution key `{key}` is already defined for {node}")]
    DuplicatePlaceholder { key: String, node: String },

    /// Two different bodies were registered under one signature.
    #[error("signature `{signature}` registered twice with different bodies")]
    SignatureConflict { signature: String },

    #[error("node #{index} does not belong to this graph")]
    UnknownNode { index: usize },

    /// `val<n>` and `arg_<n>` are reserved for generated values and parameters.
    #[error("identifier `{name}` is reserved for generated values")]
    ReservedIdentifier { name: String },

    /// Two declarations in one unit would share an identifier.
    #[error("identifier `{name}` is already declared by {owner}")]
    DuplicateIdentifier { name: String, owner: String },

    /// The node was captured into a generated function body and can no longer change.
    #[error("{node} is part of the body of `{function}` and cannot be rewired")]
    FrozenNode { node: String, function: String },
}
