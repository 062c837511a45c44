//! `${key}` template evaluation plus the signature and parameter-list builders.

use std::collections::HashMap;

use crate::error::{ComposeError, Result};
use crate::types::{Dialect, TypeMapper, ValueType};

/// Substitution values for one template, keyed by placeholder name.
pub type ValueMap = HashMap<String, String>;

/// Iterate the placeholder names of `template` in order of appearance.
///
/// An unterminated `${` is left as literal text.
pub fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    let mut rest = template;
    std::iter::from_fn(move || {
        let start = rest.find("${")?;
        let after = &rest[start + 2..];
        let end = after.find('}')?;
        rest = &after[end + 1..];
        Some(&after[..end])
    })
}

/// Replace every `${key}` in `template` with its value.
///
/// All placeholders must resolve; replacement text is inserted verbatim and never re-scanned.
pub fn evaluate(template: &str, values: &ValueMap) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let key = &after[..end];
        let value = values
            .get(key)
            .ok_or_else(|| ComposeError::TemplateSubstitution {
                placeholder: key.to_string(),
                template: template.to_string(),
            })?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Highest `${argN}` index referenced by `template`, if any.
pub fn max_positional_reference(template: &str) -> Option<usize> {
    placeholders(template)
        .filter_map(|key| key.strip_prefix("arg"))
        .filter_map(|digits| digits.parse::<usize>().ok())
        .max()
}

/// Re-indent a multi-line code block by `levels` steps of `width` spaces.
///
/// Common leading indentation (ASCII spaces and tabs) is removed first, trailing whitespace
/// trimmed, and blank lines kept empty.
pub fn indent_code(source: &str, levels: usize, width: usize) -> String {
    let normalized = source.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().collect();

    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_indent(line))
        .min()
        .unwrap_or(0);

    let indent = " ".repeat(levels * width);
    let start = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);

    lines[start..end]
        .iter()
        .map(|line| {
            let line = line.trim_end();
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", &line[common..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formal parameter list `arg_0, arg_1, ...` for the given argument types.
///
/// Empty for no arguments; never ends with a separator.
pub fn build_parameter_list(
    dialect: Dialect,
    mapper: &dyn TypeMapper,
    types: &[ValueType],
) -> Result<String> {
    let mut out = String::new();
    for (i, ty) in types.iter().enumerate() {
        out.push_str(&dialect.parameter(&mapper.shader_type_name(*ty)?, &parameter_name(i)));
        out.push_str(", ");
    }
    if !out.is_empty() {
        out.truncate(out.len() - 2);
    }
    Ok(out)
}

/// Identifier of the `index`-th formal parameter of a patched function.
pub fn parameter_name(index: usize) -> String {
    format!("arg_{index}")
}

/// Whether `name` has the shape of a generated value (`val<n>`) or parameter (`arg_<n>`).
pub fn is_reserved_ident(name: &str) -> bool {
    ["val", "arg_"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    })
}

fn leading_indent(line: &str) -> usize {
    line.bytes().take_while(|b| matches!(b, b' ' | b'\t')).count()
}

/// Content-derived signature: `name + <arg type codes> + "To" + <result type code>`.
///
/// Depends only on its inputs, so equal calls always produce equal names.
pub fn build_type_signature(
    mapper: &dyn TypeMapper,
    name: &str,
    args: &[ValueType],
    result: ValueType,
) -> Result<String> {
    let mut signature = String::from(name);
    for ty in args {
        signature.push_str(&mapper.type_code(*ty)?);
    }
    signature.push_str("To");
    signature.push_str(&mapper.type_code(result)?);
    Ok(signature)
}

/// Sanitize a string to be a valid shader identifier.
pub fn sanitize_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
