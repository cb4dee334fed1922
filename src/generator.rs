use crate::candidates::CandidateStore;
use crate::error::{CompileError, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptimizeOptions {
    pub minify: bool,
}

/// The stylesheet compiler the plugin drives.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Parses an entry stylesheet into something candidates can be built
    /// against.
    async fn compile(
        &self,
        entry: &str,
    ) -> std::result::Result<Box<dyn CompiledStylesheet>, CompileError>;

    async fn optimize(
        &self,
        css: &str,
        options: OptimizeOptions,
    ) -> std::result::Result<String, CompileError>;
}

#[async_trait]
pub trait CompiledStylesheet: Send + Sync {
    async fn build(&self, candidates: &[String]) -> std::result::Result<String, CompileError>;
}

/// Builds stylesheet text from an entry source and the shared candidates.
pub struct StylesheetGenerator {
    compiler: Arc<dyn Compiler>,
    candidates: Arc<CandidateStore>,
}

impl StylesheetGenerator {
    pub fn new(compiler: Arc<dyn Compiler>, candidates: Arc<CandidateStore>) -> Self {
        Self {
            compiler,
            candidates,
        }
    }

    pub async fn generate(&self, entry: &str) -> Result<String> {
        let compiled = self.compiler.compile(entry).await?;
        let candidates = self.candidates.snapshot();
        let css = compiled.build(&candidates).await?;
        tracing::debug!(
            candidates = candidates.len(),
            bytes = css.len(),
            "generated stylesheet"
        );
        Ok(css)
    }

    pub async fn generate_optimized(&self, entry: &str, minify: bool) -> Result<String> {
        let css = self.generate(entry).await?;
        let optimized = self
            .compiler
            .optimize(&css, OptimizeOptions { minify })
            .await?;
        Ok(optimized)
    }
}
