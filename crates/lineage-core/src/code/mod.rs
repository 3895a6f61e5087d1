//! Source-code declaration extraction.
//!
//! Parsers turn one source file into a [`SourceUnit`] holding its direct
//! declarations; [`CodeFacts`] turns units into `Class`, `Function` and
//! `Method` facts linked by `DECLARES` edges from the project's `Root`.

mod golang;
mod python;
mod treesitter;

pub mod extract;
pub mod walk;

use std::path::Path;

use crate::error::{CoreError, CoreResult};

pub use extract::{CodeFacts, SourceLinks};
pub use walk::{discover_sources, load_unit};

/// Source languages with a declaration parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Go,
}

impl Language {
    /// Language of a file, judged by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" | "pyi" => Some(Self::Python),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    /// Whether a file of this language is analysed at all.
    pub fn accepts(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match self {
            Self::Python => true,
            Self::Go => !name.ends_with("_test.go"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationKind {
    Class,
    Function,
    /// A method declared outside its owner's body (e.g. a Go receiver method).
    Method { receiver: String },
}

/// A declaration found directly in a source unit or directly in a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// 1-based line of the declaration.
    pub line: u32,
    pub members: Vec<Declaration>,
}

impl Declaration {
    pub fn class(name: impl Into<String>, line: u32, members: Vec<Declaration>) -> Self {
        Self {
            kind: DeclarationKind::Class,
            name: name.into(),
            line,
            members,
        }
    }

    pub fn function(name: impl Into<String>, line: u32) -> Self {
        Self {
            kind: DeclarationKind::Function,
            name: name.into(),
            line,
            members: Vec::new(),
        }
    }

    pub fn method(receiver: impl Into<String>, name: impl Into<String>, line: u32) -> Self {
        Self {
            kind: DeclarationKind::Method {
                receiver: receiver.into(),
            },
            name: name.into(),
            line,
            members: Vec::new(),
        }
    }
}

/// Parsed declarations of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Path relative to the source root, `/`-separated.
    pub path: String,
    pub language: Language,
    pub declarations: Vec<Declaration>,
}

/// Parse `content` as `language`.
pub fn parse_source(language: Language, path: &str, content: &str) -> CoreResult<SourceUnit> {
    let declarations = match language {
        Language::Python => python::declarations(content),
        Language::Go => golang::declarations(content),
    }
    .map_err(|reason| CoreError::parse(path, reason))?;

    Ok(SourceUnit {
        path: path.to_string(),
        language,
        declarations,
    })
}
