//! pnpm-workspace.yaml catalog and overrides parser

use std::collections::HashMap;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{RawDependency, SourceField};
use tracing::warn;

/// Parser for pnpm-workspace.yaml files
pub struct PnpmWorkspaceParser;

impl Parser for PnpmWorkspaceParser {
    fn parse(&self, content: &str) -> Result<Vec<RawDependency>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_yaml::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set YAML language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse YAML content");
            ParseError::ParseFailed("Failed to parse YAML".to_string())
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::InvalidSyntax(
                "pnpm-workspace.yaml is not valid YAML".to_string(),
            ));
        }

        let mut anchors = HashMap::new();
        collect_anchors(root, content, &mut anchors);

        let mut results = Vec::new();
        let Some(top_level) = find_mapping(root) else {
            return Ok(results);
        };

        for (key, value) in mapping_pairs(top_level, content) {
            match key.as_str() {
                "catalog" => self.extract_entries(
                    value,
                    content,
                    &anchors,
                    SourceField::PnpmCatalog,
                    &[],
                    &mut results,
                ),
                "catalogs" => {
                    for (catalog_name, catalog) in mapping_pairs(value, content) {
                        self.extract_entries(
                            catalog,
                            content,
                            &anchors,
                            SourceField::PnpmCatalog,
                            &[catalog_name],
                            &mut results,
                        );
                    }
                }
                "overrides" => self.extract_entries(
                    value,
                    content,
                    &anchors,
                    SourceField::PnpmOverrides,
                    &[],
                    &mut results,
                ),
                _ => {}
            }
        }

        Ok(results)
    }
}

/// Value of a mapping entry
enum EntryValue<'tree> {
    /// A scalar, possibly carrying an anchor (`&name`)
    Scalar(tree_sitter::Node<'tree>),
    /// An alias (`*name`) to an anchored scalar elsewhere
    Alias(String),
}

impl PnpmWorkspaceParser {
    fn extract_entries(
        &self,
        mapping: tree_sitter::Node,
        content: &str,
        anchors: &HashMap<String, String>,
        source: SourceField,
        parents: &[String],
        results: &mut Vec<RawDependency>,
    ) {
        for (name, value) in mapping_pairs(mapping, content) {
            let Some(entry) = entry_value(value, content) else {
                continue;
            };

            let dep = match entry {
                EntryValue::Scalar(node) => self.scalar_entry(name, node, content, source, parents),
                // Aliases are rewritten through their anchor, never in place
                EntryValue::Alias(anchor) => {
                    let start_point = value.start_position();
                    anchors.get(&anchor).map(|version| RawDependency {
                        name,
                        current_version: version.clone(),
                        source,
                        parents: parents.to_vec(),
                        update: false,
                        start_offset: value.start_byte(),
                        end_offset: value.end_byte(),
                        line: start_point.row,
                        column: start_point.column,
                    })
                }
            };

            if let Some(dep) = dep {
                results.push(dep);
            }
        }
    }

    /// Parse a single package entry (package_name: version)
    fn scalar_entry(
        &self,
        name: String,
        scalar: tree_sitter::Node,
        content: &str,
        source: SourceField,
        parents: &[String],
    ) -> Option<RawDependency> {
        let raw_text = &content[scalar.byte_range()];
        let has_quotes = matches!(scalar.kind(), "double_quote_scalar" | "single_quote_scalar");
        let version = if has_quotes && raw_text.len() >= 2 {
            &raw_text[1..raw_text.len() - 1]
        } else {
            raw_text
        };

        // Skip empty values
        if version.trim().is_empty() {
            return None;
        }

        let start_offset = scalar.start_byte();
        let end_offset = scalar.end_byte();
        let start_point = scalar.start_position();

        // Adjust offsets for quotes (same approach as package_json.rs)
        let (adjusted_start, adjusted_end, adjusted_column) = if has_quotes {
            (start_offset + 1, end_offset - 1, start_point.column + 1)
        } else {
            (start_offset, end_offset, start_point.column)
        };

        Some(RawDependency {
            name,
            current_version: version.to_string(),
            source,
            parents: parents.to_vec(),
            update: true,
            start_offset: adjusted_start,
            end_offset: adjusted_end,
            line: start_point.row,
            column: adjusted_column,
        })
    }
}

fn is_scalar(kind: &str) -> bool {
    matches!(
        kind,
        "plain_scalar" | "double_quote_scalar" | "single_quote_scalar"
    )
}

/// Find the scalar or alias a mapping value resolves to
fn entry_value<'tree>(node: tree_sitter::Node<'tree>, content: &str) -> Option<EntryValue<'tree>> {
    if node.kind() == "alias" {
        let name = content[node.byte_range()].trim_start_matches('*').trim();
        return Some(EntryValue::Alias(name.to_string()));
    }
    if is_scalar(node.kind()) {
        return Some(EntryValue::Scalar(node));
    }
    // Nested mappings are not version entries
    if node.kind() == "block_mapping" || node.kind() == "flow_mapping" {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| entry_value(child, content))
}

/// Record `&name value` anchors anywhere in the document
fn collect_anchors(node: tree_sitter::Node, content: &str, anchors: &mut HashMap<String, String>) {
    if node.kind() == "anchor"
        && let Some(scalar) = node.next_sibling().filter(|n| is_scalar(n.kind()))
    {
        let name = content[node.byte_range()].trim_start_matches('&').trim();
        let text = get_node_text(scalar, content);
        anchors.insert(name.to_string(), text);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_anchors(child, content, anchors);
    }
}

/// Descend through stream/document/block_node wrappers to a block mapping
fn find_mapping(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if node.kind() == "block_mapping" {
        return Some(node);
    }
    if !matches!(node.kind(), "stream" | "document" | "block_node") {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_mapping)
}

/// Collect `(key, value)` pairs of a block mapping
fn mapping_pairs<'tree>(
    node: tree_sitter::Node<'tree>,
    content: &str,
) -> Vec<(String, tree_sitter::Node<'tree>)> {
    let Some(mapping) = find_mapping(node) else {
        return Vec::new();
    };

    let mut cursor = mapping.walk();
    mapping
        .children(&mut cursor)
        .filter(|child| child.kind() == "block_mapping_pair")
        .filter_map(|pair| {
            let key = pair.child_by_field_name("key")?;
            let value = pair.child_by_field_name("value")?;
            Some((get_node_text(key, content), value))
        })
        .collect()
}

/// Get text content of a node, removing quotes if present
fn get_node_text(node: tree_sitter::Node, content: &str) -> String {
    let text = &content[node.byte_range()];
    text.trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .trim_start_matches('\'')
        .trim_end_matches('\'')
        .to_string()
}
