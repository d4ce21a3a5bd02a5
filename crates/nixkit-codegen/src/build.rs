//! Build orchestration
//!
//! Drives one build request through `Compiling → Writing → Invoking` and
//! ends in `Succeeded` or `Failed`. The assembled expression is written to
//! a transient `.nix` file which is handed to `nix-build`; the file is
//! removed afterwards unless keep-failed was requested.

use std::ffi::OsString;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempPath;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, Command};

use nixkit_core::RecipeModule;

use crate::compiler::{CompiledExpression, Compiler};
use crate::error::{Error, Result};
use crate::options::{BuildOptions, CompilationOptions, OutLink};

/// How the external builder is run
#[derive(Debug, Clone)]
pub struct BuilderSettings {
    /// Builder executable
    pub program: String,

    /// Directory for transient expression files (system default if unset)
    pub temp_dir: Option<PathBuf>,

    /// Kill the builder after this long
    pub timeout: Option<Duration>,

    /// Copy the builder's standard error to ours as it arrives
    pub forward_output: bool,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            program: "nix-build".to_string(),
            temp_dir: None,
            timeout: None,
            forward_output: true,
        }
    }
}

/// Stage of a build request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Classifying, emitting and assembling
    Compiling,
    /// Persisting the expression
    Writing,
    /// Waiting for the builder
    Invoking,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Compiling => "compiling",
            BuildState::Writing => "writing",
            BuildState::Invoking => "invoking",
            BuildState::Succeeded => "succeeded",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Store paths reported by the builder
    pub out_paths: Vec<PathBuf>,

    /// Expression file left on disk (keep-failed)
    pub expression: Option<PathBuf>,
}

/// Compiles recipes and hands them to the builder
#[derive(Debug, Clone)]
pub struct Orchestrator {
    compiler: Compiler,
    settings: BuilderSettings,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(compiler: Compiler, settings: BuilderSettings) -> Self {
        Self { compiler, settings }
    }

    /// The compiler in use
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// The builder settings in use
    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// Eval-only mode: compile and return the expression text without
    /// touching the filesystem or starting a process
    pub fn evaluate(
        &self,
        module: &dyn RecipeModule,
        options: &CompilationOptions,
    ) -> Result<String> {
        let compiled = self.compile(module, options)?;
        transition(BuildState::Succeeded);
        Ok(compiled.text)
    }

    /// Build the selected package
    pub async fn build(
        &self,
        module: &dyn RecipeModule,
        options: &BuildOptions,
    ) -> Result<BuildResult> {
        let compiled = self.compile(module, &options.compilation)?;

        transition(BuildState::Writing);
        let file = self.write_expression(&compiled).inspect_err(|_| {
            transition(BuildState::Failed);
        })?;

        transition(BuildState::Invoking);
        let args = builder_args(&file, options);
        let outcome = self.invoke(&args).await;
        let kept = release_expression(file, options.keep_failed);

        match outcome {
            Ok(out_paths) => {
                transition(BuildState::Succeeded);
                Ok(BuildResult {
                    out_paths,
                    expression: kept,
                })
            }
            Err(Error::ExternalTool {
                program,
                status,
                stderr,
                ..
            }) => {
                transition(BuildState::Failed);
                Err(Error::ExternalTool {
                    program,
                    status,
                    stderr,
                    kept,
                })
            }
            Err(e) => {
                transition(BuildState::Failed);
                Err(e)
            }
        }
    }

    fn compile(
        &self,
        module: &dyn RecipeModule,
        options: &CompilationOptions,
    ) -> Result<CompiledExpression> {
        transition(BuildState::Compiling);
        let compiled = self
            .compiler
            .compile_module(module, options)
            .inspect_err(|_| transition(BuildState::Failed))?;
        tracing::info!(
            "Compiled '{}' (sha256 {})",
            compiled.attribute,
            compiled.hash
        );
        Ok(compiled)
    }

    fn write_expression(&self, compiled: &CompiledExpression) -> Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("nixkit-").suffix(".nix");

        let created = match &self.settings.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = created.map_err(|source| Error::Write {
            path: self
                .settings
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        let write_error = |path: &Path, source| Error::Write {
            path: path.to_path_buf(),
            source,
        };
        file.write_all(compiled.text.as_bytes())
            .map_err(|e| write_error(file.path(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| write_error(file.path(), e))?;

        let path = file.into_temp_path();
        tracing::debug!("Wrote expression: {}", path.display());
        Ok(path)
    }

    async fn invoke(&self, args: &[OsString]) -> Result<Vec<PathBuf>> {
        let program = &self.settings.program;
        tracing::debug!("Running {} {:?}", program, args);

        let tool_error = |status: String, stderr: String| Error::ExternalTool {
            program: program.clone(),
            status,
            stderr,
            kept: None,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| tool_error(format!("could not be started: {}", e), String::new()))?;

        let stderr = child.stderr.take();
        let forward = self.settings.forward_output;
        let stderr_task = tokio::spawn(collect_stderr(stderr, forward));

        let mut stdout = child.stdout.take();
        let run = async {
            let mut out = Vec::new();
            if let Some(pipe) = stdout.as_mut() {
                pipe.read_to_end(&mut out).await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out))
        };

        let waited = match self.settings.timeout {
            Some(limit) => {
                let timed = tokio::time::timeout(limit, run).await;
                match timed {
                    Ok(waited) => waited,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            tracing::warn!("Failed to kill {}: {}", program, e);
                        }
                        stderr_task.abort();
                        return Err(tool_error(
                            format!("timed out after {:?}", limit),
                            String::new(),
                        ));
                    }
                }
            }
            None => run.await,
        };

        let (status, out) = waited.map_err(|e| tool_error(e.to_string(), String::new()))?;
        let captured = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(tool_error(status.to_string(), captured));
        }

        let out_paths = parse_out_paths(&String::from_utf8_lossy(&out));
        tracing::info!("{} produced {} path(s)", program, out_paths.len());
        Ok(out_paths)
    }
}

/// Keep or delete the expression file. Failures here only warn; the
/// builder's outcome stands.
fn release_expression(file: TempPath, keep: bool) -> Option<PathBuf> {
    let path = file.to_path_buf();
    if keep {
        return match file.keep() {
            Ok(kept) => {
                tracing::info!("Keeping expression: {}", kept.display());
                Some(kept)
            }
            Err(e) => {
                tracing::warn!("Failed to keep {}: {}", path.display(), e.error);
                None
            }
        };
    }

    if let Err(e) = file.close() {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
    None
}

fn transition(state: BuildState) {
    tracing::info!("Build {}", state);
}

/// Arguments for the builder, in `nix-build` syntax
pub fn builder_args(file: &Path, options: &BuildOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        file.as_os_str().to_owned(),
        "-A".into(),
        options.compilation.attribute.to_string().into(),
    ];
    if options.show_trace {
        args.push("--show-trace".into());
    }
    if options.keep_failed {
        args.push("-K".into());
    }
    match &options.out_link {
        OutLink::Default => {}
        OutLink::Named(link) => {
            args.push("-o".into());
            args.push(link.as_os_str().to_owned());
        }
        OutLink::Suppressed => args.push("--no-out-link".into()),
    }
    args
}

/// One path per non-empty line
fn parse_out_paths(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

async fn collect_stderr(pipe: Option<ChildStderr>, forward: bool) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };

    // Builder logs are not necessarily UTF-8; drain raw lines until EOF.
    let mut captured = Vec::new();
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if forward {
                    let mut stderr = std::io::stderr().lock();
                    if let Err(e) = stderr.write_all(&line).and_then(|()| stderr.flush()) {
                        tracing::debug!("Failed to forward builder stderr: {}", e);
                    }
                }
                captured.extend_from_slice(&line);
            }
            Err(e) => {
                tracing::debug!("Stopped reading builder stderr: {}", e);
                break;
            }
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}
