//! Candidate extraction for ironframe.
//!
//! Turns raw source content into utility-class candidates. Content can be
//! handed over inline or as files on disk; [`scan_many`] reads and parses a
//! batch of units either sequentially or on the rayon pool.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One unit of source content to extract candidates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangedContent {
    /// Content already in memory, with the extension of the unit it came from.
    Content { content: String, extension: String },
    /// A file to read; the extension is taken from the path.
    File(PathBuf),
}

impl ChangedContent {
    pub fn content(content: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
            extension: extension.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel,
}

/// Selects how [`scan_many`] reads and parses its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanMode {
    pub io: Strategy,
    pub parsing: Strategy,
}

impl ScanMode {
    pub const SEQUENTIAL: Self = Self {
        io: Strategy::Sequential,
        parsing: Strategy::Sequential,
    };

    pub const PARALLEL: Self = Self {
        io: Strategy::Parallel,
        parsing: Strategy::Parallel,
    };
}

impl Default for ScanMode {
    fn default() -> Self {
        Self::SEQUENTIAL
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("collect_sources requires at least one pattern")]
    NoPatterns,
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("failed to build glob set: {0}")]
    GlobSet(#[source] globset::Error),
}

/// Filters applied by [`collect_sources`] on top of the glob patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    pub base_path: PathBuf,
    pub respect_gitignore: bool,
    pub include_node_modules: bool,
    pub include_binary_files: bool,
    pub include_css_files: bool,
    pub include_lock_files: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            respect_gitignore: true,
            include_node_modules: false,
            include_binary_files: false,
            include_css_files: false,
            include_lock_files: false,
        }
    }
}

struct Source<'a> {
    text: Cow<'a, str>,
    extension: &'a str,
}

/// Extracts the candidates of every unit, deduplicated in first-seen order.
///
/// Files that exist but cannot be read as UTF-8 are skipped. A missing file
/// is an error.
pub fn scan_many(units: &[ChangedContent], mode: ScanMode) -> Result<Vec<String>, ScanError> {
    let sources: Vec<Option<Source<'_>>> = match mode.io {
        Strategy::Sequential => units.iter().map(load).collect::<Result<_, _>>()?,
        Strategy::Parallel => units.par_iter().map(load).collect::<Result<_, _>>()?,
    };
    let sources: Vec<Source<'_>> = sources.into_iter().flatten().collect();

    let batches: Vec<Vec<String>> = match mode.parsing {
        Strategy::Sequential => sources
            .iter()
            .map(|source| extract_candidates(&source.text, source.extension))
            .collect(),
        Strategy::Parallel => sources
            .par_iter()
            .map(|source| extract_candidates(&source.text, source.extension))
            .collect(),
    };

    let mut seen = HashSet::new();
    Ok(batches
        .into_iter()
        .flatten()
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect())
}

fn load(unit: &ChangedContent) -> Result<Option<Source<'_>>, ScanError> {
    match unit {
        ChangedContent::Content { content, extension } => Ok(Some(Source {
            text: Cow::Borrowed(content),
            extension,
        })),
        ChangedContent::File(path) => {
            if !path.exists() {
                return Err(ScanError::NotFound(path.clone()));
            }
            let extension = path
                .extension()
                .and_then(|value| value.to_str())
                .unwrap_or_default();
            match fs::read_to_string(path) {
                Ok(text) => Ok(Some(Source {
                    text: Cow::Owned(text),
                    extension,
                })),
                Err(err) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable file"
                    );
                    Ok(None)
                }
            }
        }
    }
}

/// Walks `options.base_path` and returns every file matching `patterns` and
/// none of `ignore`.
pub fn collect_sources(
    patterns: &[String],
    ignore: &[String],
    options: &SourceOptions,
) -> Result<Vec<PathBuf>, ScanError> {
    if patterns.is_empty() {
        return Err(ScanError::NoPatterns);
    }

    let include = build_globset(patterns)?;
    let exclude = build_globset(ignore)?;

    let mut builder = WalkBuilder::new(&options.base_path);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore);

    let mut seen = HashSet::new();
    let paths = builder
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| {
            let relative = path.strip_prefix(&options.base_path).unwrap_or(path);
            (include.is_match(relative) || include.is_match(path))
                && !exclude.is_match(relative)
                && !exclude.is_match(path)
                && !is_skipped_by_default(path, options)
        })
        .filter(|path| seen.insert(path.clone()))
        .collect();

    Ok(paths)
}

fn is_skipped_by_default(path: &Path, options: &SourceOptions) -> bool {
    if !options.include_node_modules
        && path
            .components()
            .any(|component| component.as_os_str() == "node_modules")
    {
        return true;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if !options.include_lock_files && is_lock_file(file_name) {
        return true;
    }

    let Some(ext) = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
    else {
        return false;
    };
    (!options.include_css_files && is_css_extension(&ext))
        || (!options.include_binary_files && is_binary_extension(&ext))
}

fn is_css_extension(ext: &str) -> bool {
    matches!(ext, "css" | "scss" | "sass" | "less" | "styl" | "pcss")
}

fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "webp"
            | "ico"
            | "avif"
            | "mp4"
            | "webm"
            | "mp3"
            | "wav"
            | "zip"
            | "gz"
            | "pdf"
            | "woff"
            | "woff2"
            | "ttf"
            | "otf"
    )
}

fn is_lock_file(file_name: &str) -> bool {
    matches!(
        file_name,
        "package-lock.json"
            | "pnpm-lock.yaml"
            | "yarn.lock"
            | "bun.lock"
            | "bun.lockb"
            | "Cargo.lock"
    )
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(ScanError::GlobSet)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extractor {
    /// Only class attributes are trusted.
    Markup,
    /// Every string literal is a potential class list.
    Script,
}

impl Extractor {
    fn for_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "html" | "htm" | "vue" | "svelte" | "astro" | "yaml" | "yml" | "toml" | "json" => {
                Self::Markup
            }
            _ => Self::Script,
        }
    }
}

/// Extracts candidates from `text`, choosing extraction rules from the
/// extension hint (`"html"`, `"tsx"`, ...).
pub fn extract_candidates(text: &str, extension: &str) -> Vec<String> {
    let class_lists = match Extractor::for_extension(extension) {
        Extractor::Markup => class_attribute_values(text),
        Extractor::Script => {
            let mut lists = string_literals(text);
            lists.extend(class_attribute_values(text));
            lists
        }
    };

    let mut seen = HashSet::new();
    class_lists
        .iter()
        .flat_map(|list| split_class_list(list.trim()))
        .filter(|token| is_candidate(token) && seen.insert(token.clone()))
        .collect()
}

fn class_attribute_values(text: &str) -> Vec<String> {
    const ATTRIBUTES: [&str; 3] = ["class", "className", ":class"];
    let mut values = Vec::new();

    for attribute in ATTRIBUTES {
        for (start, _) in text.match_indices(attribute) {
            let end = start + attribute.len();
            if !is_attribute_boundary(text, start, end) {
                continue;
            }
            let Some(value) = text[end..].trim_start().strip_prefix('=') else {
                continue;
            };
            let value = value.trim_start();
            match value.chars().next() {
                Some(quote @ ('"' | '\'')) => values.push(read_quoted(&value[1..], quote).0),
                Some('{') => values.extend(string_literals(braced_body(value))),
                Some(_) => values.extend(
                    value
                        .split(|c: char| c.is_whitespace() || c == '>')
                        .next()
                        .map(str::to_string),
                ),
                None => {}
            }
        }
    }

    values
}

fn is_attribute_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_none_or(|c| !is_word_char(c)) && after.is_none_or(|c| !is_word_char(c))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn string_literals(text: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut idx = 0;

    while let Some(ch) = text[idx..].chars().next() {
        let body = idx + ch.len_utf8();
        match ch {
            '"' | '\'' => {
                let (value, consumed) = read_quoted(&text[body..], ch);
                if !value.is_empty() {
                    literals.push(value);
                }
                idx = body + consumed;
            }
            '`' => {
                let (pieces, consumed) = read_template(&text[body..]);
                literals.extend(pieces);
                idx = body + consumed;
            }
            _ => idx = body,
        }
    }

    literals
}

/// Reads up to the closing `quote`. Escapes are kept verbatim. Returns the
/// value and the number of bytes consumed, closing quote included.
fn read_quoted(text: &str, quote: char) -> (String, usize) {
    let mut value = String::new();
    let mut chars = text.char_indices();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => {
                value.push('\\');
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            c if c == quote => return (value, idx + c.len_utf8()),
            c => value.push(c),
        }
    }

    (value, text.len())
}

/// Reads a template literal body, splitting the static pieces around
/// `${...}` interpolations.
fn read_template(text: &str) -> (Vec<String>, usize) {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '`' => {
                push_piece(&mut pieces, &mut current);
                return (pieces, idx + 1);
            }
            '\\' => {
                current.push('\\');
                if let Some((_, escaped)) = chars.next() {
                    current.push(escaped);
                }
            }
            '$' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                push_piece(&mut pieces, &mut current);
                let mut depth = 1usize;
                for (_, inner) in chars.by_ref() {
                    match inner {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            c => current.push(c),
        }
    }

    push_piece(&mut pieces, &mut current);
    (pieces, text.len())
}

fn push_piece(pieces: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        pieces.push(std::mem::take(current));
    }
}

/// `text` starts at an opening brace; returns what is between it and the
/// matching close, skipping over string literals.
fn braced_body(text: &str) -> &str {
    let mut depth = 0usize;
    let mut idx = 0;

    while let Some(ch) = text[idx..].chars().next() {
        let next = idx + ch.len_utf8();
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &text[1..idx];
                }
            }
            '"' | '\'' => {
                let (_, consumed) = read_quoted(&text[next..], ch);
                idx = next + consumed;
                continue;
            }
            '`' => {
                let (_, consumed) = read_template(&text[next..]);
                idx = next + consumed;
                continue;
            }
            _ => {}
        }
        idx = next;
    }

    text.get(1..).unwrap_or_default()
}

/// Splits on whitespace that is not inside brackets or parentheses, so
/// arbitrary values like `grid-cols-[1fr_auto]` stay whole.
fn split_class_list(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                continue;
            }
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn is_candidate(token: &str) -> bool {
    if token.is_empty() || token.starts_with(['.', '/']) || token.ends_with([':', '\\']) {
        return false;
    }

    let mut brackets = 0usize;
    let mut parens = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut has_letter = false;

    for (idx, ch) in token.chars().enumerate() {
        if !is_allowed_char(ch) {
            return false;
        }
        has_letter |= ch.is_ascii_alphabetic() || ch == '[';

        if let Some(active) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == active {
                quote = None;
            }
            continue;
        }

        let nested = brackets > 0 || parens > 0;
        match ch {
            '[' => brackets += 1,
            ']' if brackets == 0 => return false,
            ']' => brackets -= 1,
            '(' => parens += 1,
            ')' if parens == 0 => return false,
            ')' => parens -= 1,
            '\'' | '"' if !nested => return false,
            '\'' | '"' => quote = Some(ch),
            '>' | '&' | ',' if !nested => return false,
            '!' if idx > 0 && !nested => return false,
            _ => {}
        }
    }

    quote.is_none() && brackets == 0 && parens == 0 && has_letter
}

fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '-' | '_'
                | '/'
                | ':'
                | '.'
                | '%'
                | '#'
                | '['
                | ']'
                | '('
                | ')'
                | '!'
                | '&'
                | '>'
                | '+'
                | ','
                | '\''
                | '"'
                | '\\'
        )
}

#[cfg(test)]
mod tests {
    use super::{
        ChangedContent, ScanError, ScanMode, SourceOptions, collect_sources, extract_candidates,
        scan_many,
    };
    use std::fs;

    fn contains(candidates: &[String], needle: &str) -> bool {
        candidates.iter().any(|candidate| candidate == needle)
    }

    #[test]
    fn extracts_from_class_attribute() {
        let candidates = extract_candidates(r#"<div class="text-sm bg-red-500"></div>"#, "html");
        assert_eq!(candidates, vec!["text-sm", "bg-red-500"]);
    }

    #[test]
    fn markup_ignores_plain_string_literals() {
        let candidates = extract_candidates(
            r#"<p title="hello world" class="flex">it's here</p>"#,
            "html",
        );
        assert_eq!(candidates, vec!["flex"]);
    }

    #[test]
    fn script_extracts_string_and_template_literals() {
        let candidates = extract_candidates(r#"const cls = `p-4 ${active ? "ring" : ""} m-2`;"#, "ts");
        assert!(contains(&candidates, "p-4"));
        assert!(contains(&candidates, "m-2"));
        assert!(!candidates.iter().any(|c| c.contains("active")));
    }

    #[test]
    fn extracts_string_literals_from_braced_class_bindings() {
        let candidates = extract_candidates(
            r#"<div className={cx("underline", isOpen && "block")}></div>"#,
            "html",
        );
        assert!(contains(&candidates, "underline"));
        assert!(contains(&candidates, "block"));
    }

    #[test]
    fn keeps_arbitrary_values_and_variants_intact() {
        let candidates = extract_candidates(
            r#"<div class="grid-cols-[1fr_auto] dark:hover:bg-indigo-600 bg-[url('/a.png')] !text-sm"></div>"#,
            "html",
        );
        assert!(contains(&candidates, "grid-cols-[1fr_auto]"));
        assert!(contains(&candidates, "dark:hover:bg-indigo-600"));
        assert!(contains(&candidates, "bg-[url('/a.png')]"));
        assert!(contains(&candidates, "!text-sm"));
    }

    #[test]
    fn rejects_tokens_with_markup_fragments() {
        let candidates = extract_candidates(
            r#"<div class="text-sm text-xs\">Sound [broken"></div>"#,
            "html",
        );
        assert!(contains(&candidates, "text-sm"));
        assert!(!candidates.iter().any(|c| c.contains('>')));
        assert!(!contains(&candidates, "[broken"));
    }

    #[test]
    fn content_without_candidates_yields_nothing() {
        assert!(extract_candidates("", "html").is_empty());
        assert!(extract_candidates("fn main() {}", "rs").is_empty());
    }

    #[test]
    fn scan_many_dedupes_across_units() {
        let units = vec![
            ChangedContent::content(r#"<a class="flex p-4"></a>"#, "html"),
            ChangedContent::content(r#"const a = "flex m-2";"#, "js"),
        ];
        let candidates = scan_many(&units, ScanMode::SEQUENTIAL).expect("scan should succeed");
        assert_eq!(candidates, vec!["flex", "p-4", "m-2"]);
    }

    #[test]
    fn parallel_mode_matches_sequential_mode() {
        let units: Vec<_> = (0..32)
            .map(|idx| ChangedContent::content(format!(r#"<i class="p-{idx} flex"></i>"#), "html"))
            .collect();
        let sequential = scan_many(&units, ScanMode::SEQUENTIAL).expect("sequential scan");
        let parallel = scan_many(&units, ScanMode::PARALLEL).expect("parallel scan");
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn scan_many_reads_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.html");
        fs::write(&path, r#"<div class="underline"></div>"#).expect("write fixture");

        let candidates =
            scan_many(&[ChangedContent::file(&path)], ScanMode::SEQUENTIAL).expect("scan files");
        assert_eq!(candidates, vec!["underline"]);
    }

    #[test]
    fn scan_many_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = scan_many(
            &[ChangedContent::file(dir.path().join("missing.html"))],
            ScanMode::SEQUENTIAL,
        )
        .expect_err("missing file should fail");
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn collect_sources_applies_default_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path();
        fs::create_dir_all(base.join("src")).expect("mkdir src");
        fs::create_dir_all(base.join("node_modules/lib")).expect("mkdir node_modules");
        fs::write(base.join("src/index.html"), "").expect("write html");
        fs::write(base.join("src/app.css"), "").expect("write css");
        fs::write(base.join("src/logo.png"), "").expect("write png");
        fs::write(base.join("package-lock.json"), "{}").expect("write lock");
        fs::write(base.join("node_modules/lib/index.html"), "").expect("write dep");

        let options = SourceOptions {
            base_path: base.to_path_buf(),
            ..SourceOptions::default()
        };
        let paths = collect_sources(&["**/*".to_string()], &[], &options).expect("collect");
        assert_eq!(paths, vec![base.join("src/index.html")]);
    }

    #[test]
    fn collect_sources_honours_ignore_patterns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path();
        fs::create_dir_all(base.join("generated")).expect("mkdir");
        fs::write(base.join("a.html"), "").expect("write a");
        fs::write(base.join("generated/b.html"), "").expect("write b");

        let options = SourceOptions {
            base_path: base.to_path_buf(),
            ..SourceOptions::default()
        };
        let paths = collect_sources(
            &["**/*.html".to_string()],
            &["generated/**".to_string()],
            &options,
        )
        .expect("collect");
        assert_eq!(paths, vec![base.join("a.html")]);
    }

    #[test]
    fn collect_sources_requires_patterns() {
        let err = collect_sources(&[], &[], &SourceOptions::default()).expect_err("no patterns");
        assert!(matches!(err, ScanError::NoPatterns));
    }
}
