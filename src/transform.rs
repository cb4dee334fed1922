//! Replays the Host's other transform steps over generated stylesheets.
//!
//! Generated stylesheet text never travels through the Host's normal module
//! pipeline, so third-party CSS post-processors would not see it. The steps
//! are captured once when the Host configuration is resolved and replayed in
//! registration order every time a stylesheet is generated.

use crate::error::ContextError;
use crate::host::{PluginContext, PluginRegistration};
use async_trait::async_trait;
use std::sync::Arc;

/// Name prefix shared by every step this plugin registers.
pub const PLUGIN_PREFIX: &str = "ironframe:";

/// Module id handed to foreign steps for generated stylesheet text.
pub const GENERATED_ASSET_ID: &str = "ironframe.css";

/// Wraps stylesheets into script modules; only valid in the Host's own
/// terminal stage.
const CSS_POST_STEP: &str = "vite:css-post";

/// Parses imports with a script grammar and fails on stylesheet syntax.
const IMPORT_ANALYSIS_STEP: &str = "vite:import-analysis";

/// What a transform handler may hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    Code(String),
    Result {
        code: Option<String>,
        map: Option<String>,
    },
}

impl TransformOutput {
    pub fn into_code(self) -> Option<String> {
        match self {
            Self::Code(code) => Some(code),
            Self::Result { code, .. } => code,
        }
    }
}

#[async_trait]
pub trait TransformHandler: Send + Sync {
    async fn transform(
        &self,
        ctx: &dyn PluginContext,
        code: &str,
        id: &str,
    ) -> anyhow::Result<Option<TransformOutput>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOrder {
    Pre,
    Post,
}

/// A transform hook as registered with the Host: either the handler itself
/// or an object carrying the handler plus ordering metadata.
#[derive(Clone)]
pub enum TransformHook {
    Handler(Arc<dyn TransformHandler>),
    Object {
        handler: Arc<dyn TransformHandler>,
        order: Option<HookOrder>,
    },
}

impl TransformHook {
    pub fn handler(&self) -> Arc<dyn TransformHandler> {
        match self {
            Self::Handler(handler) | Self::Object { handler, .. } => Arc::clone(handler),
        }
    }
}

/// Adapts a synchronous `(code, id)` function into a [`TransformHandler`].
pub struct FnTransform<F>(F);

#[async_trait]
impl<F> TransformHandler for FnTransform<F>
where
    F: Fn(&str, &str) -> anyhow::Result<Option<String>> + Send + Sync,
{
    async fn transform(
        &self,
        _ctx: &dyn PluginContext,
        code: &str,
        id: &str,
    ) -> anyhow::Result<Option<TransformOutput>> {
        Ok((self.0)(code, id)?.map(TransformOutput::Code))
    }
}

pub fn transform_fn<F>(f: F) -> Arc<dyn TransformHandler>
where
    F: Fn(&str, &str) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
{
    Arc::new(FnTransform(f))
}

/// Whether the combined source map of the synthetic context reaches the
/// Host or is reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcemapAccess {
    Forwarded,
    Unavailable,
}

/// The Host context as seen by replayed steps.
///
/// Every capability is forwarded to the real context except the combined
/// source map: generated text has no transform history to combine.
pub struct TransformContext<'a> {
    host: &'a dyn PluginContext,
    combined_sourcemap: SourcemapAccess,
}

impl<'a> TransformContext<'a> {
    pub fn new(host: &'a dyn PluginContext) -> Self {
        Self {
            host,
            combined_sourcemap: SourcemapAccess::Unavailable,
        }
    }

    pub fn with_combined_sourcemap(mut self, access: SourcemapAccess) -> Self {
        self.combined_sourcemap = access;
        self
    }
}

impl PluginContext for TransformContext<'_> {
    fn warn(&self, message: &str) {
        self.host.warn(message);
    }

    fn add_watch_file(&self, id: &str) {
        self.host.add_watch_file(id);
    }

    fn get_combined_sourcemap(&self) -> Result<String, ContextError> {
        match self.combined_sourcemap {
            SourcemapAccess::Forwarded => self.host.get_combined_sourcemap(),
            SourcemapAccess::Unavailable => {
                Err(ContextError::NotImplemented("get_combined_sourcemap"))
            }
        }
    }
}

struct ForeignStep {
    name: String,
    handler: Arc<dyn TransformHandler>,
}

/// The ordered, filtered list of foreign transform steps.
#[derive(Default)]
pub struct ForeignTransforms {
    steps: Vec<ForeignStep>,
}

impl ForeignTransforms {
    pub fn capture(plugins: &[PluginRegistration], skip: &[String]) -> Self {
        let steps = plugins
            .iter()
            .filter_map(|plugin| {
                let hook = plugin.transform.as_ref()?;
                if is_excluded(&plugin.name, skip) {
                    tracing::debug!(
                        step = %plugin.name,
                        "leaving transform step out of stylesheet replay"
                    );
                    return None;
                }
                Some(ForeignStep {
                    name: plugin.name.clone(),
                    handler: hook.handler(),
                })
            })
            .collect();
        Self { steps }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every captured step over `css`, one after another.
    ///
    /// A failing step is logged and skipped; the text it was given flows on
    /// to the next step unchanged.
    pub async fn apply(&self, host: &dyn PluginContext, mut css: String) -> String {
        let context = TransformContext::new(host);
        for step in &self.steps {
            match step
                .handler
                .transform(&context, &css, GENERATED_ASSET_ID)
                .await
            {
                Ok(Some(output)) => {
                    if let Some(code) = output.into_code() {
                        css = code;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        step = %step.name,
                        error = %err,
                        "transform step failed on generated stylesheet, skipping"
                    );
                }
            }
        }
        css
    }
}

pub fn is_excluded(name: &str, skip: &[String]) -> bool {
    name.starts_with(PLUGIN_PREFIX)
        || name == CSS_POST_STEP
        || name == IMPORT_ANALYSIS_STEP
        || skip.iter().any(|skipped| skipped == name)
}
