//! Fakes for the Host, Compiler and foreign steps used across unit tests.

use crate::error::{CompileError, ContextError};
use crate::generator::{CompiledStylesheet, Compiler, OptimizeOptions};
use crate::host::{DevSession, HotPayload, ModuleKind, ModuleNode, PluginContext};
use crate::plugin::GENERATION_MARKER;
use crate::transform::{TransformHandler, transform_fn};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct RecordingContext {
    warnings: Mutex<Vec<String>>,
    watch_files: Mutex<Vec<String>>,
}

impl RecordingContext {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    pub fn watch_files(&self) -> Vec<String> {
        self.watch_files.lock().clone()
    }
}

impl PluginContext for RecordingContext {
    fn warn(&self, message: &str) {
        self.warnings.lock().push(message.to_string());
    }

    fn add_watch_file(&self, id: &str) {
        self.watch_files.lock().push(id.to_string());
    }

    fn get_combined_sourcemap(&self) -> Result<String, ContextError> {
        Ok(r#"{"version":3,"mappings":""}"#.to_string())
    }
}

/// Replaces the generation marker with one `.candidate{}` rule per line.
/// Entries containing `@error` fail to compile.
pub struct MarkerCompiler;

struct MarkerStylesheet {
    entry: String,
}

#[async_trait]
impl Compiler for MarkerCompiler {
    async fn compile(&self, entry: &str) -> Result<Box<dyn CompiledStylesheet>, CompileError> {
        if entry.contains("@error") {
            return Err(CompileError::compile("unexpected @error"));
        }
        Ok(Box::new(MarkerStylesheet {
            entry: entry.to_string(),
        }))
    }

    async fn optimize(&self, css: &str, options: OptimizeOptions) -> Result<String, CompileError> {
        if options.minify {
            Ok(css.lines().map(str::trim).collect())
        } else {
            Ok(format!("{css}\n"))
        }
    }
}

#[async_trait]
impl CompiledStylesheet for MarkerStylesheet {
    async fn build(&self, candidates: &[String]) -> Result<String, CompileError> {
        let rules = candidates
            .iter()
            .map(|candidate| format!(".{candidate}{{}}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(self.entry.replace(GENERATION_MARKER, &rules))
    }
}

#[derive(Default)]
pub struct FakeSession {
    modules: Mutex<HashMap<String, ModuleNode>>,
    invalidated: Mutex<Vec<String>>,
    sent: Mutex<Vec<HotPayload>>,
}

impl FakeSession {
    pub fn add_module(&self, id: &str, url: &str, kind: ModuleKind) {
        self.modules.lock().insert(
            id.to_string(),
            ModuleNode {
                id: id.to_string(),
                url: url.to_string(),
                kind,
            },
        );
    }

    pub fn remove_module(&self, id: &str) {
        self.modules.lock().remove(id);
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().clone()
    }

    pub fn sent(&self) -> Vec<HotPayload> {
        self.sent.lock().clone()
    }
}

impl DevSession for FakeSession {
    fn module_by_id(&self, id: &str) -> Option<ModuleNode> {
        self.modules.lock().get(id).cloned()
    }

    fn invalidate_module(&self, module: &ModuleNode) {
        self.invalidated.lock().push(module.id.clone());
    }

    fn send(&self, payload: HotPayload) {
        self.sent.lock().push(payload);
    }
}

pub fn uppercase() -> Arc<dyn TransformHandler> {
    transform_fn(|code, _id| Ok(Some(code.to_uppercase())))
}

pub fn append(suffix: &'static str) -> Arc<dyn TransformHandler> {
    transform_fn(move |code, _id| Ok(Some(format!("{code}{suffix}"))))
}

pub fn failing() -> Arc<dyn TransformHandler> {
    transform_fn(|_code, _id| Err(anyhow::anyhow!("boom")))
}
