//! Name matching over Swift syntax trees.

use crate::conditions::{ActiveRegions, ConditionSet};
use crate::matcher::NameMatchEngine;
use crate::resolved::{LabelRangeType, ResolvedLoc, ResolvedLocContext};
use crate::source::{CharSourceRange, SourceLoc};
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::SourceFile;
use serde::Deserialize;
use tree_sitter::Node;

/// Nodes that open a new body. Resolution never looks past them, so a
/// location inside a closure or function body does not resolve to the call
/// or declaration that owns the body.
const SCOPE_KINDS: &[&str] = &[
    "lambda_literal",
    "function_body",
    "computed_property",
    "class_body",
    "protocol_body",
    "enum_class_body",
    "statements",
];

const IDENTIFIER_KINDS: &[&str] = &["simple_identifier", "type_identifier"];

const COMMENT_KINDS: &[&str] = &["comment", "multiline_comment"];

const STRING_KINDS: &[&str] = &[
    "line_string_literal",
    "multi_line_string_literal",
    "raw_string_literal",
];

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "protocol_function_declaration",
    "init_declaration",
];

const TRAILING_CLOSURE_KINDS: &[&str] = &["lambda_literal", "annotated_lambda"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherOptions {
    /// Resolve locations inside comments to the word at the location.
    pub resolve_in_comments: bool,
    /// Resolve locations inside string literal text to the word at the location.
    pub resolve_in_strings: bool,
    /// Fail the whole batch when the tree contains syntax errors.
    pub reject_syntax_errors: bool,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        MatcherOptions {
            resolve_in_comments: true,
            resolve_in_strings: true,
            reject_syntax_errors: false,
        }
    }
}

/// [`NameMatchEngine`] for Swift source files.
///
/// Each location resolves to the innermost call, function/initializer
/// declaration, subscript declaration or `#selector` reference around it.
/// `is_active` reports whether the start of the base name lies in an active
/// `#if` branch for the configured conditions.
#[derive(Debug, Clone, Default)]
pub struct SwiftNameMatcher {
    conditions: ConditionSet,
    options: MatcherOptions,
}

impl SwiftNameMatcher {
    pub fn new(conditions: ConditionSet, options: MatcherOptions) -> Self {
        SwiftNameMatcher {
            conditions,
            options,
        }
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    pub fn options(&self) -> MatcherOptions {
        self.options
    }

    fn resolve_one(
        &self,
        file: &SourceFile,
        regions: &ActiveRegions,
        loc: SourceLoc,
    ) -> ResolvedLoc {
        let source = file.source();
        let Some(offset) = loc.offset() else {
            return ResolvedLoc::placeholder();
        };
        if offset > source.len() || !source.is_char_boundary(offset) {
            return ResolvedLoc::placeholder();
        }
        let Some(node) = file.root_node().descendant_for_byte_range(offset, offset) else {
            return ResolvedLoc::placeholder();
        };

        let resolver = Resolver { source, regions };
        match lexical_context(node) {
            Lexical::Comment if self.options.resolve_in_comments => {
                resolver.word(offset, ResolvedLocContext::Comment)
            }
            Lexical::StringLiteral if self.options.resolve_in_strings => {
                resolver.word(offset, ResolvedLocContext::StringLiteral)
            }
            Lexical::Comment | Lexical::StringLiteral => ResolvedLoc::placeholder(),
            Lexical::Code { in_selector } => resolver.code(node, in_selector),
        }
    }
}

impl NameMatchEngine for SwiftNameMatcher {
    type Tree = SourceFile;
    type Error = TreeSitterError;

    fn resolve(
        &self,
        file: &SourceFile,
        locations: &[SourceLoc],
    ) -> Result<Vec<ResolvedLoc>, TreeSitterError> {
        if self.options.reject_syntax_errors {
            let errors = file.error_nodes();
            match errors.as_slice() {
                [] => {}
                [only] => {
                    return Err(TreeSitterError::SyntaxError {
                        byte_start: only.byte_start,
                        byte_end: only.byte_end,
                    })
                }
                many => {
                    return Err(TreeSitterError::MultipleSyntaxErrors { count: many.len() })
                }
            }
        }

        let regions = ActiveRegions::compute(file.source(), &self.conditions);
        tracing::trace!(
            inactive = regions.inactive_ranges().len(),
            "computed conditional compilation regions"
        );

        Ok(locations
            .iter()
            .map(|loc| self.resolve_one(file, &regions, *loc))
            .collect())
    }
}

enum Lexical {
    Comment,
    StringLiteral,
    Code { in_selector: bool },
}

fn lexical_context(node: Node<'_>) -> Lexical {
    let mut in_interpolation = false;
    let mut in_selector = false;

    for ancestor in ancestors(node) {
        let kind = ancestor.kind();
        if COMMENT_KINDS.contains(&kind) {
            return Lexical::Comment;
        }
        if kind == "interpolated_expression" {
            in_interpolation = true;
        }
        if STRING_KINDS.contains(&kind) && !in_interpolation {
            return Lexical::StringLiteral;
        }
        if kind == "selector_expression" {
            in_selector = true;
        }
    }

    Lexical::Code { in_selector }
}

fn ancestors(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    std::iter::successors(Some(node), |n| n.parent())
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node.children(&mut cursor).collect();
    children
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

fn node_range(node: Node<'_>) -> CharSourceRange {
    CharSourceRange::from(node.byte_range())
}

/// The identifier naming `node`: itself, or the rightmost identifier at its
/// end (`a.b.foo` -> `foo`, `.foo` -> `foo`).
fn base_name(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    loop {
        if IDENTIFIER_KINDS.contains(&current.kind()) {
            return current;
        }
        match named_children(current).pop() {
            Some(last) => current = last,
            None => return node,
        }
    }
}

struct Resolver<'a> {
    source: &'a str,
    regions: &'a ActiveRegions,
}

impl Resolver<'_> {
    fn build(
        &self,
        base: CharSourceRange,
        labels: Vec<CharSourceRange>,
        first_trailing_label: Option<usize>,
        label_type: LabelRangeType,
        context: ResolvedLocContext,
    ) -> ResolvedLoc {
        let is_active = base
            .start()
            .offset()
            .map_or(true, |offset| self.regions.is_active(offset));
        ResolvedLoc::new(base, labels, first_trailing_label, label_type, is_active, context)
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "discarding malformed resolution");
                ResolvedLoc::placeholder()
            })
    }

    /// The identifier-like word starting at `offset`, empty if there is none.
    fn word(&self, offset: usize, context: ResolvedLocContext) -> ResolvedLoc {
        let rest = &self.source[offset..];
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(rest.len(), |(i, _)| i);
        self.build(
            CharSourceRange::new(SourceLoc::new(offset), len),
            Vec::new(),
            None,
            LabelRangeType::None,
            context,
        )
    }

    fn code(&self, node: Node<'_>, in_selector: bool) -> ResolvedLoc {
        let default_context = if in_selector {
            ResolvedLocContext::Selector
        } else {
            ResolvedLocContext::Default
        };

        for ancestor in ancestors(node) {
            let kind = ancestor.kind();
            if SCOPE_KINDS.contains(&kind) {
                break;
            }
            if kind == "call_expression" {
                let is_selector = ancestor
                    .parent()
                    .is_some_and(|parent| parent.kind() == "selector_expression");
                return if is_selector {
                    self.reference(ancestor, ResolvedLocContext::Selector)
                } else {
                    self.call(ancestor, default_context)
                };
            }
            if FUNCTION_KINDS.contains(&kind) {
                return self.declaration(ancestor, LabelRangeType::Param, default_context);
            }
            if kind == "subscript_declaration" {
                return self.declaration(
                    ancestor,
                    LabelRangeType::NoncollapsibleParam,
                    default_context,
                );
            }
        }

        if IDENTIFIER_KINDS.contains(&node.kind()) {
            return self.build(
                node_range(node),
                Vec::new(),
                None,
                LabelRangeType::None,
                default_context,
            );
        }

        ResolvedLoc::placeholder()
    }

    fn call(&self, call: Node<'_>, context: ResolvedLocContext) -> ResolvedLoc {
        if is_compound_name(call) {
            return self.reference(call, context);
        }

        let parts = named_children(call);
        let base = parts.first().map_or(call, |callee| base_name(*callee));

        let mut labels = Vec::new();
        let mut first_trailing_label = None;

        if let Some(suffix) = parts.iter().find(|n| n.kind() == "call_suffix") {
            let suffix_parts = children(*suffix);
            let mut pending_label: Option<CharSourceRange> = None;

            for (i, part) in suffix_parts.iter().enumerate() {
                match part.kind() {
                    "value_arguments" => {
                        for argument in named_children(*part) {
                            if argument.kind() == "value_argument" {
                                labels.push(self.call_argument_label(argument));
                            }
                        }
                    }
                    kind if TRAILING_CLOSURE_KINDS.contains(&kind) => {
                        first_trailing_label.get_or_insert(labels.len());
                        let label = pending_label.take().unwrap_or_else(|| {
                            CharSourceRange::empty_at(SourceLoc::new(part.start_byte()))
                        });
                        labels.push(label);
                    }
                    "simple_identifier" => {
                        if let Some(colon) = suffix_parts.get(i + 1).filter(|n| n.kind() == ":") {
                            pending_label = Some(self.call_label(*part, Some(*colon)));
                        }
                    }
                    _ => {}
                }
            }
        }

        self.build(
            node_range(base),
            labels,
            first_trailing_label,
            LabelRangeType::CallArg,
            context,
        )
    }

    fn call_argument_label(&self, argument: Node<'_>) -> CharSourceRange {
        let parts = children(argument);
        match parts.iter().position(|n| n.kind() == "value_argument_label") {
            Some(i) => {
                let colon = parts.get(i + 1).filter(|n| n.kind() == ":").copied();
                self.call_label(parts[i], colon)
            }
            None => CharSourceRange::empty_at(SourceLoc::new(argument.start_byte())),
        }
    }

    /// From the label name through the colon and the whitespace after it.
    fn call_label(&self, label: Node<'_>, colon: Option<Node<'_>>) -> CharSourceRange {
        let end = match colon {
            Some(colon) => {
                let after = &self.source[colon.end_byte()..];
                let trivia = after.len() - after.trim_start_matches([' ', '\t']).len();
                colon.end_byte() + trivia
            }
            None => label.end_byte(),
        };
        CharSourceRange::from_offsets(label.start_byte(), end)
    }

    /// A name referenced by its argument labels, as in `foo(a:b:)` or
    /// `#selector(bar(x:))`. Labels span the label name only.
    fn reference(&self, call: Node<'_>, context: ResolvedLocContext) -> ResolvedLoc {
        let parts = named_children(call);
        let base = parts.first().map_or(call, |callee| base_name(*callee));

        let mut labels = Vec::new();
        for argument in call_arguments(call) {
            let before = labels.len();
            labels.extend(
                named_children(argument)
                    .into_iter()
                    .filter(|n| n.kind() == "value_argument_label")
                    .map(node_range),
            );
            if labels.len() == before {
                labels.push(CharSourceRange::empty_at(SourceLoc::new(
                    argument.start_byte(),
                )));
            }
        }

        self.build(
            node_range(base),
            labels,
            None,
            LabelRangeType::Selector,
            context,
        )
    }

    fn declaration(
        &self,
        decl: Node<'_>,
        label_type: LabelRangeType,
        context: ResolvedLocContext,
    ) -> ResolvedLoc {
        let base = match decl.kind() {
            "subscript_declaration" | "init_declaration" => children(decl)
                .into_iter()
                .find(|n| matches!(n.kind(), "subscript" | "init")),
            _ => decl.child_by_field_name("name"),
        }
        .unwrap_or(decl);

        let mut parameters = Vec::new();
        collect_parameters(decl, &mut parameters);
        let labels = parameters.into_iter().map(parameter_label).collect();

        self.build(node_range(base), labels, None, label_type, context)
    }
}

/// `value_argument` nodes of a call's parenthesized arguments.
fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    named_children(call)
        .into_iter()
        .filter(|n| n.kind() == "call_suffix")
        .flat_map(named_children)
        .filter(|n| n.kind() == "value_arguments")
        .flat_map(named_children)
        .filter(|n| n.kind() == "value_argument")
        .collect()
}

/// Every argument is labels only, with no value: `foo(a:b:)`.
fn is_compound_name(call: Node<'_>) -> bool {
    let arguments = call_arguments(call);
    !arguments.is_empty()
        && arguments.iter().all(|argument| {
            let parts = named_children(*argument);
            !parts.is_empty() && parts.iter().all(|n| n.kind() == "value_argument_label")
        })
}

/// Parameters of a declaration's signature, in source order.
fn collect_parameters<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        if child.kind() == "parameter" {
            out.push(child);
        } else if !SCOPE_KINDS.contains(&child.kind()) {
            collect_parameters(child, out);
        }
    }
}

/// First name through second name, e.g. `a b` in `a b: Int`.
fn parameter_label(parameter: Node<'_>) -> CharSourceRange {
    let names: Vec<Node<'_>> = children(parameter)
        .into_iter()
        .take_while(|n| n.kind() != ":")
        .filter(|n| n.kind() == "simple_identifier")
        .collect();
    match (names.first(), names.last()) {
        (Some(first), Some(last)) => {
            CharSourceRange::from_offsets(first.start_byte(), last.end_byte())
        }
        _ => CharSourceRange::empty_at(SourceLoc::new(parameter.start_byte())),
    }
}
