//! Source units and dialect detection

pub mod detector;
pub mod source;

pub use detector::{scan_declarations, DialectDetector, GrammarCheck, PestCheck, Verdict};
pub use source::{Dialect, FileIdentity, SourceUnit};
