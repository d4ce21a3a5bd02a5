//! Build a package with nix-build

use anyhow::{Context, Result};
use nixkit_codegen::{BuildOptions, Orchestrator};
use nixkit_core::RecipeModule;

/// Run the build and print each output path on its own line
pub async fn run(
    orchestrator: &Orchestrator,
    module: &dyn RecipeModule,
    options: &BuildOptions,
) -> Result<()> {
    let attribute = &options.compilation.attribute;
    tracing::info!(
        "Building '{}' with {}",
        attribute,
        orchestrator.settings().program
    );

    let result = orchestrator
        .build(module, options)
        .await
        .with_context(|| format!("Failed to build '{}'", attribute))?;

    if let Some(expression) = &result.expression {
        tracing::info!("Expression kept at {}", expression.display());
    }
    for path in &result.out_paths {
        println!("{}", path.display());
    }
    Ok(())
}
