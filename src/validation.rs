//! WGSL validation of assembled units using the naga library.

use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow, bail};
use naga::front::wgsl::ParseError;

use crate::assemble::{CompilationSink, ShaderUnit};
use crate::types::Dialect;

/// Parse WGSL source with naga.
///
/// On failure the error carries the source listing with the rejected line marked `>`.
pub fn validate_wgsl(source: &str) -> Result<naga::Module> {
    naga::front::wgsl::parse_str(source).map_err(|e| anyhow!(describe_rejection(source, &e)))
}

/// Parse an assembled unit, naming its entry function and generated functions on failure.
pub fn validate_unit(unit: &ShaderUnit) -> Result<naga::Module> {
    validate_wgsl(&unit.source).with_context(|| {
        let functions: Vec<&str> = unit.functions.iter().map(|f| f.signature.as_str()).collect();
        format!(
            "shader unit `{}` (functions: [{}]) is not valid WGSL",
            unit.entry,
            functions.join(", ")
        )
    })
}

fn describe_rejection(source: &str, error: &ParseError) -> String {
    let rejected = error
        .location(source)
        .map(|location| location.line_number as usize);

    let mut out = match rejected {
        Some(line) => format!("naga rejected line {line}: {}\n", error.message()),
        None => format!("naga rejected the source: {}\n", error.message()),
    };
    for (number, line) in (1..).zip(source.lines()) {
        let marker = if Some(number) == rejected { '>' } else { ' ' };
        let _ = writeln!(out, "{marker}{number:4} | {line}");
    }
    out
}

/// Sink that accepts WGSL units only if naga parses them, keeping the parsed modules.
#[derive(Default)]
pub struct WgslValidationSink {
    modules: Vec<(String, naga::Module)>,
}

impl WgslValidationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed modules, keyed by entry function name, in acceptance order.
    pub fn modules(&self) -> &[(String, naga::Module)] {
        &self.modules
    }
}

impl CompilationSink for WgslValidationSink {
    fn accept(&mut self, unit: &ShaderUnit) -> Result<()> {
        if unit.dialect != Dialect::Wgsl {
            bail!(
                "cannot validate `{}`: unit is {}, not wgsl",
                unit.entry,
                unit.dialect.name()
            );
        }
        let module = validate_unit(unit)?;
        self.modules.push((unit.entry.clone(), module));
        Ok(())
    }
}
