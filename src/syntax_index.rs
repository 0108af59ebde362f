//! Per-language declaration search over concrete syntax trees.
//!
//! A [`SyntaxIndex`] wraps a tree-sitter parser for one [`Language`] and answers
//! two questions about a parsed file: where is the declaration called `X`, and
//! which import statements sit at the top level. All slicing goes through the
//! byte ranges reported by the parser, so files with non-ASCII comments or
//! identifiers come back intact.

use crate::error::{Error, Result};
use crate::language::{Language, NameStrategy};
use log::debug;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Parser plus the language profile that drives the queries.
pub struct SyntaxIndex {
    language: Language,
    parser: Parser,
}

/// One file's text together with the tree parsed from it.
pub struct ParsedSource {
    source: String,
    tree: Tree,
}

impl ParsedSource {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Exact source text covered by `node`.
    pub fn text_of(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }
}

impl SyntaxIndex {
    pub fn new(language: Language) -> Result<Self> {
        Ok(Self {
            language,
            parser: language.parser()?,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parses `source` into a tree. `origin` only labels errors.
    pub fn parse(&mut self, source: String, origin: &Path) -> Result<ParsedSource> {
        let tree = self.parser.parse(&source, None).ok_or_else(|| Error::Parse {
            file: origin.to_path_buf(),
            message: format!("{} parser produced no tree", self.language.as_str()),
        })?;
        Ok(ParsedSource { source, tree })
    }

    /// Depth-first pre-order search for the first declaration named `name`.
    ///
    /// Only nodes whose kind is one of the language's declaration kinds are
    /// considered. Returns `None` when nothing matches; a file without any
    /// declaration of the requested kind is not an error.
    pub fn find_declaration<'a>(&self, parsed: &'a ParsedSource, name: &str) -> Option<Node<'a>> {
        let kinds = self.language.declaration_kinds();
        let mut stack = vec![parsed.root()];

        while let Some(node) = stack.pop() {
            if kinds.contains(&node.kind())
                && self.declaration_name(parsed, node).as_deref() == Some(name)
            {
                debug!(
                    "Found {} `{}` at line {}",
                    node.kind(),
                    name,
                    node.start_position().row + 1
                );
                return Some(node);
            }

            // Reverse so the leftmost child is visited first.
            let mut cursor = node.walk();
            let children: Vec<Node<'a>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        None
    }

    /// Source text of every import-shaped direct child of the root, in document order.
    pub fn list_imports(&self, parsed: &ParsedSource) -> Vec<String> {
        let kinds = self.language.import_kinds();
        let root = parsed.root();
        let mut cursor = root.walk();

        root.children(&mut cursor)
            .filter(|child| kinds.contains(&child.kind()))
            .map(|child| parsed.text_of(child).to_string())
            .collect()
    }

    fn declaration_name(&self, parsed: &ParsedSource, node: Node<'_>) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(parsed.text_of(name).to_string());
        }

        match self.language.name_strategy() {
            NameStrategy::Field => None,
            NameStrategy::FieldThenChildKinds(kinds) => {
                let mut cursor = node.walk();
                let found = node
                    .children(&mut cursor)
                    .find(|child| kinds.contains(&child.kind()))
                    .map(|child| parsed.text_of(child).to_string());
                found
            }
        }
    }
}
