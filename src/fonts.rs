//! Font files loaded by family name.
//!
//! Family lists follow the CSS shorthand convention: `"Noto Sans, DejaVu Sans"`
//! resolves to the first entry that has been loaded. Matching ignores case and
//! surrounding quotes.

use ab_glyph::FontArc;
use ahash::RandomState;
use anyhow::{Context, Result, anyhow};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::LayoutError;

#[derive(Clone, Default)]
pub struct FontLibrary {
    fonts: HashMap<String, FontArc, RandomState>,
    /// Families in load order, as given.
    names: Vec<String>,
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary").field("families", &self.names).finish()
    }
}

fn normalize(family: &str) -> String {
    family
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TTF/OTF file and register it as `family`.
    pub fn load_file(&mut self, family: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("reading font file {}", path.display()))?;
        self.load_bytes(family, bytes)
            .with_context(|| format!("loading font file {}", path.display()))
    }

    /// Register in-memory font data as `family`, replacing an earlier load.
    pub fn load_bytes(&mut self, family: &str, bytes: Vec<u8>) -> Result<()> {
        let key = normalize(family);
        if key.is_empty() {
            return Err(anyhow!("font family name is empty"));
        }
        let font = FontArc::try_from_vec(bytes).map_err(|e| anyhow!("{:?}", e))?;
        debug!("loaded font family {family:?}");
        if self.fonts.insert(key, font).is_none() {
            self.names.push(family.trim().to_string());
        }
        Ok(())
    }

    /// Parse a `family=path` pair as accepted on the command line.
    pub fn load_spec(&mut self, spec: &str) -> Result<()> {
        let (family, path) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("expected FAMILY=PATH, got {spec:?}"))?;
        self.load_file(family, path.trim())
    }

    /// First loaded family of a comma-separated list.
    pub fn resolve(&self, families: &str) -> Option<&FontArc> {
        families
            .split(',')
            .map(normalize)
            .find_map(|name| self.fonts.get(&name))
    }

    /// Like [`resolve`](Self::resolve), but an unresolved list is an error.
    pub fn require(&self, families: &str) -> Result<&FontArc, LayoutError> {
        self.resolve(families)
            .ok_or_else(|| LayoutError::UnknownFont(families.to_string()))
    }

    /// Loaded families in load order.
    pub fn families(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
