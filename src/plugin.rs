//! The plugin object the Host drives.
//!
//! One [`IronframePlugin`] lives for one Host session. Every hook borrows it,
//! so all hooks share the same candidates, tracked units and captured
//! transform steps. Whether a live dev session exists is decided once, in
//! [`Mode`], and every hook branches on that value.

use crate::candidates::CandidateStore;
use crate::config::Config;
use crate::error::Result;
use crate::generator::{Compiler, StylesheetGenerator};
use crate::host::{
    AssetSource, DevSession, OutputBundle, OutputItem, PluginContext, ResolvedConfig,
};
use crate::invalidation::InvalidationCoordinator;
use crate::scanner::{Scanner, SourceScanner};
use crate::transform::ForeignTransforms;
use globset::GlobSet;
use ironframe_scanner::collect_sources;
use std::sync::Arc;

/// Token inside a stylesheet that opts it into generation.
pub const GENERATION_MARKER: &str = "@tailwind utilities";

pub const SCAN_PLUGIN: &str = "ironframe:scan";
pub const SERVE_PLUGIN: &str = "ironframe:generate:serve";
pub const BUILD_PLUGIN: &str = "ironframe:generate:build";

/// Pre-bundled dependencies live here; they never carry project classes.
const HOST_CACHE_DIR: &str = "/.vite/";

pub enum Mode {
    /// Interactive: stylesheets are regenerated per request and stale ones
    /// are pushed to connected clients.
    Serve(Arc<dyn DevSession>),
    /// Finalize: stylesheets are rewritten once, in the output bundle.
    Build,
}

pub struct IronframePlugin {
    config: Config,
    candidates: Arc<CandidateStore>,
    scanner: SourceScanner,
    generator: StylesheetGenerator,
    transforms: ForeignTransforms,
    invalidation: InvalidationCoordinator,
    ignore: GlobSet,
    minify: bool,
    mode: Mode,
}

impl IronframePlugin {
    pub fn new(
        scanner: Arc<dyn Scanner>,
        compiler: Arc<dyn Compiler>,
        config: Config,
    ) -> Result<Self> {
        let candidates = Arc::new(CandidateStore::new());
        let ignore = config.ignore_set()?;
        let minify = config.resolve_minify(None);
        Ok(Self {
            scanner: SourceScanner::new(scanner, Arc::clone(&candidates)),
            generator: StylesheetGenerator::new(compiler, Arc::clone(&candidates)),
            transforms: ForeignTransforms::default(),
            invalidation: InvalidationCoordinator::new(),
            candidates,
            ignore,
            minify,
            mode: Mode::Build,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn candidates(&self) -> &CandidateStore {
        &self.candidates
    }

    pub fn invalidation(&self) -> &InvalidationCoordinator {
        &self.invalidation
    }

    pub fn transforms(&self) -> &ForeignTransforms {
        &self.transforms
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn minify(&self) -> bool {
        self.minify
    }

    /// Called when the Host starts a dev server.
    pub fn configure_server(&mut self, session: Arc<dyn DevSession>) {
        self.mode = Mode::Serve(session);
    }

    /// Called once the Host configuration is final, before any unit is
    /// processed.
    pub fn config_resolved(&mut self, resolved: &ResolvedConfig) {
        self.minify = self.config.resolve_minify(resolved.css_minify);
        self.transforms =
            ForeignTransforms::capture(&resolved.plugins, &self.config.skip_transforms);
        tracing::debug!(
            steps = self.transforms.len(),
            minify = self.minify,
            "captured foreign transform steps"
        );
    }

    /// Scans the configured `sources` from disk. Returns whether any
    /// candidate was found that was not known yet.
    pub async fn build_start(&self) -> Result<bool> {
        if self.config.sources.is_empty() {
            return Ok(false);
        }
        let paths = collect_sources(
            &self.config.sources,
            &self.config.ignore,
            &self.config.source_options(),
        )?;
        tracing::debug!(files = paths.len(), "pre-scanning sources");
        let changed = self.scanner.scan_files(paths).await?;
        self.after_scan(changed);
        Ok(changed)
    }

    pub async fn transform_index_html(&self, html: &str, path: &str) -> Result<bool> {
        let changed = self.scanner.scan(html, "html").await?;
        if changed {
            tracing::debug!(path, "index html added candidates");
        }
        self.after_scan(changed);
        Ok(changed)
    }

    /// The `ironframe:scan` transform. Never changes `src`; returns whether
    /// the unit contributed a new candidate.
    pub async fn scan_transform(&self, src: &str, id: &str) -> Result<bool> {
        if id.contains(HOST_CACHE_DIR) {
            return Ok(false);
        }
        let extension = extension_of(id);
        if extension.is_empty() || extension == "css" {
            return Ok(false);
        }
        if self.ignore.is_match(strip_query(id)) {
            tracing::debug!(id, "unit matches an ignore pattern, not scanning");
            return Ok(false);
        }

        let changed = self.scanner.scan(src, extension).await?;
        self.after_scan(changed);
        Ok(changed)
    }

    /// The `ironframe:generate:serve` transform. Returns the generated
    /// stylesheet for generation targets, `None` for everything else and
    /// for every unit outside a dev session.
    pub async fn generate_transform(
        &self,
        ctx: &dyn PluginContext,
        src: &str,
        id: &str,
        ssr: bool,
    ) -> Result<Option<String>> {
        if !matches!(self.mode, Mode::Serve(_)) || !is_generation_target(id, src) {
            return Ok(None);
        }

        // Server-rendered requests get styles but never hot updates.
        if !ssr && self.invalidation.record_tracked(id) {
            tracing::debug!(id, "tracking generated stylesheet");
        }

        let css = self.generator.generate(src).await?;
        let css = self.transforms.apply(ctx, css).await;
        self.invalidation.mark_regenerated(id);
        Ok(Some(css))
    }

    /// The `ironframe:generate:build` bundle hook. Rewrites every stylesheet
    /// asset that still carries the generation marker and returns how many
    /// were rewritten.
    pub async fn generate_bundle(
        &self,
        ctx: &dyn PluginContext,
        bundle: &mut OutputBundle,
    ) -> Result<usize> {
        if matches!(self.mode, Mode::Serve(_)) {
            return Ok(0);
        }

        let mut rewritten = 0;
        for (file_name, item) in bundle.iter_mut() {
            let OutputItem::Asset(asset) = item else {
                continue;
            };
            if !is_stylesheet(file_name) {
                continue;
            }
            let source = asset.source.as_text().into_owned();
            if !source.contains(GENERATION_MARKER) {
                continue;
            }

            let css = self.generator.generate_optimized(&source, self.minify).await?;
            let css = self.transforms.apply(ctx, css).await;
            asset.source = AssetSource::Text(css);
            rewritten += 1;
            tracing::debug!(file = %file_name, "rewrote stylesheet asset");
        }
        Ok(rewritten)
    }

    fn after_scan(&self, changed: bool) {
        if !changed {
            return;
        }
        match &self.mode {
            Mode::Serve(session) => {
                self.invalidation.notify_if_changed(session.as_ref());
            }
            // Output assets are regenerated in full once the bundle exists.
            Mode::Build => {}
        }
    }
}

fn strip_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

/// Extension of the path part of a unit id, without the dot. Empty when
/// the last segment has none.
fn extension_of(id: &str) -> &str {
    let path = strip_query(id);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .map_or("", |(_, extension)| extension)
}

fn is_stylesheet(id: &str) -> bool {
    match extension_of(id) {
        "css" => true,
        "vue" => id.contains("&lang.css"),
        _ => false,
    }
}

fn is_generation_target(id: &str, src: &str) -> bool {
    is_stylesheet(id) && src.contains(GENERATION_MARKER)
}
