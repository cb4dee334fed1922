//! Bundler plugin that keeps ironframe-generated stylesheets in sync with the
//! sources they are generated from.
//!
//! Every source unit the Host transforms is scanned for candidate class
//! names. Stylesheets containing `@tailwind utilities` are generated from the
//! accumulated candidates, then replayed through the Host's other transform
//! steps. During a dev session, new candidates invalidate the stylesheets
//! generated so far; in a production build the emitted stylesheet assets are
//! rewritten once the bundle is complete.
//!
//! The Scanner, Compiler and Host are reached through traits:
//! [`Scanner`], [`Compiler`], [`DevSession`] and [`PluginContext`].
//! [`ClassScanner`] is the stock scanner.

pub mod candidates;
pub mod config;
pub mod error;
pub mod generator;
pub mod host;
pub mod invalidation;
pub mod plugin;
pub mod scanner;
pub mod transform;

#[cfg(test)]
mod testing;

pub use candidates::CandidateStore;
pub use config::Config;
pub use error::{CompileError, CompileStage, ConfigError, ContextError, Error, Result};
pub use generator::{CompiledStylesheet, Compiler, OptimizeOptions, StylesheetGenerator};
pub use host::{
    AssetSource, DevSession, HotPayload, ModuleKind, ModuleNode, OutputAsset, OutputBundle,
    OutputChunk, OutputItem, PluginContext, PluginRegistration, ResolvedConfig, Update,
};
pub use invalidation::{InvalidationCoordinator, UnitState};
pub use plugin::{GENERATION_MARKER, IronframePlugin, Mode};
pub use scanner::{ClassScanner, Scanner, SourceScanner};
pub use transform::{ForeignTransforms, TransformHandler, TransformHook, TransformOutput};
