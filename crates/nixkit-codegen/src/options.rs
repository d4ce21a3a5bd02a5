//! Compilation and build options

use std::path::PathBuf;

use nixkit_core::AttrPath;

use crate::error::{Error, Result};

/// Options that affect the generated expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    /// Package selected from the recipe module
    pub attribute: AttrPath,

    /// Insert newlines and indentation
    pub format_pretty: bool,

    /// Treat exported packages as asynchronously defined
    pub asynchronous_modules: bool,
}

impl CompilationOptions {
    /// Options selecting `attribute`; fails with a usage error if it is not
    /// a dotted identifier path
    pub fn new(attribute: &str) -> Result<Self> {
        let attribute = AttrPath::parse(attribute).map_err(|e| Error::usage(e.to_string()))?;
        Ok(Self {
            attribute,
            format_pretty: false,
            asynchronous_modules: false,
        })
    }

    /// Set pretty formatting
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.format_pretty = pretty;
        self
    }

    /// Set asynchronous module handling
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous_modules = asynchronous;
        self
    }
}

/// What the builder does with the `result` symlink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutLink {
    /// Builder default (`./result`)
    #[default]
    Default,
    /// `-o <path>`
    Named(PathBuf),
    /// `--no-out-link`
    Suppressed,
}

impl OutLink {
    /// Combine the two command-line controls; setting both is a usage error
    pub fn from_flags(out_link: Option<PathBuf>, no_out_link: bool) -> Result<Self> {
        match (out_link, no_out_link) {
            (Some(_), true) => Err(Error::usage(
                "--out-link and --no-out-link cannot be used together",
            )),
            (Some(path), false) => Ok(OutLink::Named(path)),
            (None, true) => Ok(OutLink::Suppressed),
            (None, false) => Ok(OutLink::Default),
        }
    }
}

/// Options for a full build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Expression options
    pub compilation: CompilationOptions,

    /// Ask the builder for stack traces on evaluation errors
    pub show_trace: bool,

    /// Keep build directories and the expression file after the build
    pub keep_failed: bool,

    /// Result symlink handling
    pub out_link: OutLink,
}

impl BuildOptions {
    /// Build options with builder defaults
    pub fn new(compilation: CompilationOptions) -> Self {
        Self {
            compilation,
            show_trace: false,
            keep_failed: false,
            out_link: OutLink::Default,
        }
    }

    /// Set `--show-trace`
    pub fn show_trace(mut self, show_trace: bool) -> Self {
        self.show_trace = show_trace;
        self
    }

    /// Set `--keep-failed`
    pub fn keep_failed(mut self, keep_failed: bool) -> Self {
        self.keep_failed = keep_failed;
        self
    }

    /// Set the result symlink handling
    pub fn out_link(mut self, out_link: OutLink) -> Self {
        self.out_link = out_link;
        self
    }
}
