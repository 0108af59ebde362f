use crate::error::{Error, Result};
use std::path::Path;

/// Source languages whose controllers and referenced types can be resolved.
///
/// Each variant carries everything the declaration search needs: the grammar,
/// the node kinds that count as a declaration, the node kinds that count as an
/// import at the top of a file, and how to pull a name out of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Kotlin,
    Java,
    TypeScript,
    JavaScript,
    Python,
    Go,
}

/// How a declaration node exposes its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// Only the structural `name` field is consulted.
    Field,
    /// The `name` field, else the first direct child whose kind is listed.
    FieldThenChildKinds(&'static [&'static str]),
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Kotlin,
        Language::Java,
        Language::TypeScript,
        Language::JavaScript,
        Language::Python,
        Language::Go,
    ];

    /// Looks a language up by file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        Self::ALL.into_iter().find(|lang| lang.extension() == ext)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Language::Kotlin => "kt",
            Language::Java => "java",
            Language::TypeScript => "ts",
            Language::JavaScript => "js",
            Language::Python => "py",
            Language::Go => "go",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Kotlin => "kotlin",
            Language::Java => "java",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
        }
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Language::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Create a parser already configured for this language.
    pub fn parser(self) -> Result<tree_sitter::Parser> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.tree_sitter_language())
            .map_err(|e| Error::Grammar(format!("{}: {e}", self.as_str())))?;
        Ok(parser)
    }

    /// Node kinds searched when looking for a named declaration.
    pub fn declaration_kinds(self) -> &'static [&'static str] {
        match self {
            // Interfaces and enum classes are `class_declaration` in the grammar;
            // `typealias_declaration` covers the older Kotlin grammar naming.
            Language::Kotlin => &[
                "class_declaration",
                "object_declaration",
                "interface_declaration",
                "companion_object",
                "enum_class_body",
                "type_alias",
                "typealias_declaration",
            ],
            Language::Java => &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
                "record_declaration",
            ],
            Language::TypeScript => &[
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "type_alias_declaration",
                "enum_declaration",
                "ambient_declaration",
            ],
            Language::JavaScript => &[
                "class_declaration",
                "function_declaration",
                "generator_function_declaration",
            ],
            Language::Python => &[
                "class_definition",
                "function_definition",
                "decorated_definition",
            ],
            Language::Go => &[
                "type_declaration",
                "type_spec",
                "type_alias",
                "function_declaration",
                "method_declaration",
            ],
        }
    }

    /// Node kinds that count as an import when they are direct children of the root.
    pub fn import_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Kotlin => &["import", "import_header", "import_list"],
            Language::Java => &["import_declaration"],
            Language::TypeScript | Language::JavaScript => &["import_statement"],
            Language::Python => &["import_statement", "import_from_statement"],
            Language::Go => &["import_declaration"],
        }
    }

    pub fn name_strategy(self) -> NameStrategy {
        match self {
            Language::Kotlin => NameStrategy::FieldThenChildKinds(&[
                "identifier",
                "type_identifier",
                "simple_identifier",
            ]),
            Language::Python => NameStrategy::FieldThenChildKinds(&["identifier"]),
            Language::Java | Language::TypeScript | Language::JavaScript | Language::Go => {
                NameStrategy::Field
            }
        }
    }
}
