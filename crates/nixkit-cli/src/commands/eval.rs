//! Print the generated expression

use std::io::Write;

use anyhow::{Context, Result};
use nixkit_codegen::{CompilationOptions, Orchestrator};
use nixkit_core::RecipeModule;

/// Run eval-only mode: the expression goes to stdout, nothing is built
pub fn run(
    orchestrator: &Orchestrator,
    module: &dyn RecipeModule,
    options: &CompilationOptions,
) -> Result<()> {
    let text = orchestrator
        .evaluate(module, options)
        .with_context(|| format!("Failed to compile '{}'", options.attribute))?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("Failed to write expression")?;
    Ok(())
}
