use crate::pool::with_parser;
use crate::source::{CharSourceRange, SourceLoc};
use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser wrapper for Swift source code.
pub struct SwiftParser {
    parser: Parser,
}

impl SwiftParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        // Get the tree-sitter Language from ast-grep-language
        let ts_lang = SupportLang::Swift.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }
}

/// A Swift source file together with its syntax tree.
///
/// This is the tree the name matcher resolves locations against. It owns its
/// text so it can be handed across the C boundary as a single pointer.
pub struct SourceFile {
    source: String,
    tree: Tree,
}

impl SourceFile {
    /// Parse `source` with this thread's pooled parser.
    pub fn parse(source: impl Into<String>) -> Result<Self, TreeSitterError> {
        let source = source.into();
        let tree = with_parser(|parser| parser.parse(&source))??;
        Ok(SourceFile { source, tree })
    }

    /// Read and parse a file.
    pub fn read(path: &Path) -> Result<Self, TreeSitterError> {
        let source = std::fs::read_to_string(path).map_err(|e| TreeSitterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(source)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Get the root node of the tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Check if the tree contains any ERROR nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Get all ERROR and MISSING nodes in the tree.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    /// Start offsets of every identifier token, in source order.
    pub fn identifier_starts(&self) -> Vec<SourceLoc> {
        let mut starts = Vec::new();
        let mut cursor = self.tree.walk();
        loop {
            let node = cursor.node();
            if matches!(node.kind(), "simple_identifier" | "type_identifier") {
                starts.push(SourceLoc::new(node.start_byte()));
            } else if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    return starts;
                }
            }
        }
    }

    /// Extract text for a node's byte range.
    pub fn node_text(&self, node: Node<'_>) -> &str {
        &self.source[node.byte_range()]
    }

    /// Extract text for a resolved range, if it lies inside this file.
    pub fn text(&self, range: CharSourceRange) -> Option<&str> {
        range.text(&self.source)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("len", &self.source.len())
            .field("has_errors", &self.has_errors())
            .finish()
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    pub end_point: tree_sitter::Point,
}

fn collect_error_nodes(node: Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
            end_point: node.end_position(),
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_swift() {
        let file = SourceFile::parse("let x = foo(a: 1, 2)\n").unwrap();

        assert!(!file.has_errors());
        assert!(file.error_nodes().is_empty());
        assert_eq!(file.root_node().kind(), "source_file");
    }

    #[test]
    fn parse_invalid_swift() {
        let file = SourceFile::parse("func foo( {").unwrap();

        assert!(file.has_errors());
        assert!(!file.error_nodes().is_empty());
    }

    #[test]
    fn text_of_range() {
        let file = SourceFile::parse("foo(a: 1)").unwrap();
        assert_eq!(file.text(CharSourceRange::from_offsets(0, 3)), Some("foo"));
        assert_eq!(file.text(CharSourceRange::from_offsets(5, 50)), None);
    }

    #[test]
    fn identifier_starts_in_order() {
        let source = "foo(a: bar)\n";
        let file = SourceFile::parse(source).unwrap();
        let starts = file.identifier_starts();
        assert!(starts.contains(&SourceLoc::new(0)));
        assert!(starts.contains(&SourceLoc::new(source.find("bar").unwrap())));
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn pooled_parser_is_reused() {
        let first = SourceFile::parse("a()").unwrap();
        let second = SourceFile::parse("b()").unwrap();
        assert_eq!(first.node_text(first.root_node()), "a()");
        assert_eq!(second.node_text(second.root_node()), "b()");
    }
}
