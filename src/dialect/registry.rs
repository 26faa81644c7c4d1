//! Dialect Registry
//!
//! In-memory set of compiled dialects: the built-ins plus any loaded from
//! user dialect directories, with one of them active.

use anyhow::{Context, anyhow};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::schema::DialectFile;
use super::{DEFAULT_DIALECT, Dialect};

#[derive(Debug, Clone)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<Dialect>>,
    active_dialect: Option<String>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self {
            dialects: HashMap::new(),
            active_dialect: None,
        }
    }

    /// Registry holding every built-in dialect, with the default active.
    pub fn with_builtins() -> crate::Result<Self> {
        let mut registry = Self::new();
        for name in super::builtin_names() {
            registry.add_dialect(super::builtin(name)?);
        }
        registry.set_active_dialect(DEFAULT_DIALECT);
        Ok(registry)
    }

    /// Add a dialect, replacing any with the same name.
    pub fn add_dialect(&mut self, dialect: Arc<Dialect>) {
        if self.dialects.contains_key(dialect.name()) {
            log::debug!("replacing dialect {}", dialect.name());
        }
        self.dialects.insert(dialect.name().to_string(), dialect);
    }

    pub fn set_active_dialect(&mut self, name: &str) -> bool {
        if self.dialects.contains_key(name) {
            self.active_dialect = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn active_dialect(&self) -> Option<&Arc<Dialect>> {
        self.active_dialect
            .as_ref()
            .and_then(|name| self.dialects.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Dialect>> {
        self.dialects.get(name)
    }

    /// Registered dialect names, sorted.
    pub fn list_dialects(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Compile a dialect from TOML text and register it.
    ///
    /// A table that `extends` another is layered onto the registered parent.
    pub fn load_str(&mut self, content: &str) -> anyhow::Result<Arc<Dialect>> {
        let file: DialectFile = toml::from_str(content).context("invalid dialect TOML")?;
        let file = match file.dialect.extends.clone() {
            Some(parent) => {
                let parent = self.get(&parent).ok_or_else(|| {
                    anyhow!(
                        "dialect {} extends unknown dialect '{}'",
                        file.dialect.name,
                        parent
                    )
                })?;
                file.merged_onto(parent.source())
            }
            None => file,
        };
        let dialect = Arc::new(Dialect::from_file(file)?);
        self.add_dialect(dialect.clone());
        Ok(dialect)
    }

    pub fn load_file(&mut self, path: &Path) -> anyhow::Result<Arc<Dialect>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dialect file {}", path.display()))?;
        let dialect = self
            .load_str(&content)
            .with_context(|| format!("failed to load dialect file {}", path.display()))?;
        log::debug!("loaded dialect {} from {}", dialect.name(), path.display());
        Ok(dialect)
    }

    /// Load every `*.toml` file of `dir`, in file name order.
    ///
    /// A missing directory loads nothing; files that fail to load are
    /// logged and skipped. Returns the number of dialects loaded.
    pub fn load_directory(&mut self, dir: &Path) -> anyhow::Result<usize> {
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read dialect directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match self.load_file(&path) {
                Ok(_) => loaded += 1,
                Err(e) => log::warn!("skipping dialect file: {:#}", e),
            }
        }
        Ok(loaded)
    }

    /// Dialect named by a `gcode_dialect=<name>` modeline in the first or
    /// last five lines of `content`, if it is registered.
    pub fn detect_modeline_dialect(&self, content: &str) -> Option<String> {
        let lines: Vec<&str> = content.lines().collect();
        let head = lines.iter().take(5);
        let tail = lines.iter().skip(lines.len().saturating_sub(5).max(5));

        head.chain(tail)
            .filter_map(|line| extract_dialect_from_modeline(line))
            .find(|name| self.dialects.contains_key(name))
    }
}

fn extract_dialect_from_modeline(line: &str) -> Option<String> {
    static MODELINE: OnceLock<Regex> = OnceLock::new();
    let re = MODELINE.get_or_init(|| {
        Regex::new(r"gcode_dialect\s*=\s*([A-Za-z0-9_-]+)").expect("modeline pattern is valid")
    });
    re.captures(line).map(|caps| caps[1].to_string())
}
