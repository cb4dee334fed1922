//! Types describing the bundler that hosts the plugin.
//!
//! The Host owns the module graph, the hot-update channel and the output
//! bundle. The plugin only sees them through the traits and plain data types
//! below.

use crate::error::ContextError;
use crate::transform::TransformHook;
use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Cow;

/// Per-build settings the Host hands over once its configuration is final.
#[derive(Default)]
pub struct ResolvedConfig {
    /// The Host's stylesheet minification flag; `None` means "Host default".
    pub css_minify: Option<bool>,
    /// Every registered plugin, in the order the Host runs them.
    pub plugins: Vec<PluginRegistration>,
}

/// Where a plugin asked to be placed relative to the Host's own steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforce {
    Pre,
    Post,
}

pub struct PluginRegistration {
    pub name: String,
    pub enforce: Option<Enforce>,
    pub transform: Option<TransformHook>,
}

impl PluginRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enforce: None,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: TransformHook) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_enforce(mut self, enforce: Enforce) -> Self {
        self.enforce = Some(enforce);
        self
    }
}

/// A node of the live module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub id: String,
    pub url: String,
    pub kind: ModuleKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Js,
    Css,
}

impl ModuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }
}

/// Live dev-server session. Absent during one-shot builds.
pub trait DevSession: Send + Sync {
    fn module_by_id(&self, id: &str) -> Option<ModuleNode>;

    fn invalidate_module(&self, module: &ModuleNode);

    /// Pushes a payload to every connected client.
    fn send(&self, payload: HotPayload);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HotPayload {
    Update { updates: Vec<Update> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub accepted_path: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Capabilities the Host exposes to a running plugin hook.
pub trait PluginContext: Send + Sync {
    fn warn(&self, message: &str);

    fn add_watch_file(&self, id: &str);

    /// Source map of every transform applied so far to the current module.
    fn get_combined_sourcemap(&self) -> Result<String, ContextError>;
}

/// Output files of a finished build, keyed by file name in emission order.
pub type OutputBundle = IndexMap<String, OutputItem>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    Asset(OutputAsset),
    Chunk(OutputChunk),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputAsset {
    pub file_name: String,
    pub source: AssetSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub file_name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Text(String),
    Bytes(Vec<u8>),
}

impl AssetSource {
    /// Decodes byte sources as UTF-8, replacing invalid sequences.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}
