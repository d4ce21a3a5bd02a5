//! nixkit Core Library
//!
//! This crate provides the data side of nixkit:
//! - The recipe value graph (`RecipeValue`) and its special forms
//! - The injected package-set capability (`Args`)
//! - Recipe modules and the YAML module loader
//! - Tool configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Recipe    │────▶│    Args     │────▶│ RecipeValue │
//! │   Module    │     │ (injected)  │     │    graph    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nixkit_core::{AttrPath, Args, RecipeModule, YamlModule};
//!
//! let module = YamlModule::load("pkgs.yaml")?;
//! let export = module.export(&Args::new(), &AttrPath::parse("hello")?)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod config;
pub mod error;
pub mod loader;
pub mod module;
pub mod names;
pub mod value;

pub use args::{Accessor, Args};
pub use config::Config;
pub use error::{Error, Result};
pub use loader::YamlModule;
pub use module::{FnModule, ModuleExport, Readiness, RecipeModule};
pub use names::AttrPath;
pub use value::{AttrSet, DeferredCall, LocalFile, ModuleContext, RecipeValue, Shared, Wrapper};
