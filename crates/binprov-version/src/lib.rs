//! Version parsing for the free-form text programs print on `--version`.
//!
//! The grammar is deliberately lenient: it finds the first numeric token on
//! the first line that has one and reads up to three dotted components from
//! it, so `ls (coreutils) 9.1`, `GNU bash, version 5.2.15(1)-release` and
//! `v20.11.0` all parse.

pub use self::version::{SemVer, VersionError};

mod version;
