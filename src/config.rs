use crate::error::{ConfigError, Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ironframe_scanner::SourceOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Plugin options, usually read from `ironframe.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Overrides the Host's stylesheet minification flag when set.
    #[serde(default)]
    pub minify: Option<bool>,
    /// Globs pre-scanned from disk when the build starts.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Unit ids matching these globs are never scanned.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Extra foreign transform steps to leave out of the replay.
    #[serde(default)]
    pub skip_transforms: Vec<String>,
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
}

pub fn load(path: &Path) -> std::result::Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// `minify` wins over the Host flag; a Host that leaves minification
    /// unset still gets minified output.
    pub fn resolve_minify(&self, host_css_minify: Option<bool>) -> bool {
        self.minify.unwrap_or(host_css_minify != Some(false))
    }

    pub fn ignore_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore {
            let glob = Glob::new(pattern).map_err(|source| Error::IgnorePattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| Error::IgnorePattern {
            pattern: self.ignore.join(","),
            source,
        })
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            base_path: self.base_path.clone(),
            ..SourceOptions::default()
        }
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minify: None,
            sources: Vec::new(),
            ignore: Vec::new(),
            skip_transforms: Vec::new(),
            base_path: default_base_path(),
        }
    }
}
