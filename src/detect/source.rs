//! Source units
//!
//! A source unit is the text to compile plus, when it came from disk, its
//! file identity. The identity drives dialect hints and the generated
//! class's package and name.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::error::{CfmlError, CfmlResult};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// The two surface syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// Markup with `<cf...>` tags
    TagBased,
    /// Bare script syntax
    ScriptBased,
}

impl Dialect {
    /// Dialect implied by a file extension, when only one dialect uses it
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "cfm" | "cfml" | "bxm" => Some(Self::TagBased),
            "cfs" | "bxs" | "bx" => Some(Self::ScriptBased),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagBased => write!(f, "tag-based"),
            Self::ScriptBased => write!(f, "script-based"),
        }
    }
}

/// Where a source unit came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    /// Lower-cased extension without the dot
    pub extension: Option<String>,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        Self { path, extension }
    }

    /// File name without the extension
    pub fn stem(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Directory holding the file
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// Source text plus optional file identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    text: String,
    identity: Option<FileIdentity>,
}

impl SourceUnit {
    /// An in-memory unit with no identity
    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            text: strip_bom(text.into()),
            identity: None,
        }
    }

    /// Read a unit from disk, dropping a leading byte-order mark
    pub fn from_file(path: impl AsRef<Path>) -> CfmlResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CfmlError::io(path.display().to_string(), e))?;
        Ok(Self::from_string(text).with_identity(path))
    }

    /// Attach a file identity to an in-memory unit
    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(FileIdentity::new(path));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn identity(&self) -> Option<&FileIdentity> {
        self.identity.as_ref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|id| id.extension.as_deref())
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> String {
        match &self.identity {
            Some(identity) => identity.path.display().to_string(),
            None => "<memory>".to_string(),
        }
    }

    /// Modification time of the backing file, if there is one
    pub fn last_modified(&self) -> Option<SystemTime> {
        let identity = self.identity.as_ref()?;
        fs::metadata(&identity.path).and_then(|m| m.modified()).ok()
    }
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix(BYTE_ORDER_MARK) {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_hints() {
        assert_eq!(Dialect::from_extension("cfm"), Some(Dialect::TagBased));
        assert_eq!(Dialect::from_extension("CFML"), Some(Dialect::TagBased));
        assert_eq!(Dialect::from_extension("bxs"), Some(Dialect::ScriptBased));
        assert_eq!(Dialect::from_extension("cfc"), None);
        assert_eq!(Dialect::from_extension("inc"), None);
    }

    #[test]
    fn test_identity_parts() {
        let unit = SourceUnit::from_string("x = 1;").with_identity("/www/app/Index.CFM");
        let identity = unit.identity().unwrap();

        assert_eq!(unit.extension(), Some("cfm"));
        assert_eq!(identity.stem().as_deref(), Some("Index"));
        assert_eq!(identity.directory(), Some(Path::new("/www/app")));
        assert_eq!(unit.display_name(), "/www/app/Index.CFM");
    }

    #[test]
    fn test_bom_is_stripped() {
        let unit = SourceUnit::from_string("\u{feff}<cfset x = 1>");
        assert_eq!(unit.text(), "<cfset x = 1>");
        assert_eq!(unit.display_name(), "<memory>");
    }

    #[test]
    fn test_from_file_reads_and_strips_bom() {
        let path = std::env::temp_dir().join(format!("cfmlc-source-{}.cfs", std::process::id()));
        fs::write(&path, "\u{feff}x = 1;").unwrap();

        let unit = SourceUnit::from_file(&path).unwrap();
        assert_eq!(unit.text(), "x = 1;");
        assert_eq!(unit.extension(), Some("cfs"));
        assert!(unit.last_modified().is_some());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SourceUnit::from_file("/definitely/not/here.cfm").unwrap_err();
        assert_eq!(err.kind(), "I/O Error");
    }
}
