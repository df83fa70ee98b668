//! package.json parser

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{RawDependency, SourceField};
use tracing::warn;

/// Parser for package.json files
pub struct PackageJsonParser;

impl PackageJsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PackageJsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PackageJsonParser {
    fn parse(&self, content: &str) -> Result<Vec<RawDependency>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_json::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set JSON language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse JSON content");
            ParseError::ParseFailed("Failed to parse JSON".to_string())
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::InvalidSyntax(
                "package.json is not valid JSON".to_string(),
            ));
        }

        let Some(document) = root.child(0).filter(|node| node.kind() == "object") else {
            return Err(ParseError::InvalidSyntax(
                "package.json must contain a top-level object".to_string(),
            ));
        };

        let mut results = Vec::new();
        self.extract_dependencies(document, content, &mut results);
        Ok(results)
    }
}

impl PackageJsonParser {
    /// Extract dependencies from the root object
    fn extract_dependencies(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<RawDependency>,
    ) {
        for (key, value) in object_pairs(object_node, content) {
            match key.as_str() {
                "dependencies" => {
                    extract_flat(value, content, SourceField::Dependencies, &[], results)
                }
                "devDependencies" => {
                    extract_flat(value, content, SourceField::DevDependencies, &[], results)
                }
                "peerDependencies" => {
                    extract_flat(value, content, SourceField::PeerDependencies, &[], results)
                }
                "optionalDependencies" => extract_flat(
                    value,
                    content,
                    SourceField::OptionalDependencies,
                    &[],
                    results,
                ),
                "packageManager" => {
                    if let Some(dep) = self.extract_package_manager(value, content) {
                        results.push(dep);
                    }
                }
                "overrides" => self.extract_overrides(value, content, &mut Vec::new(), results),
                "resolutions" => {
                    extract_flat(value, content, SourceField::Resolutions, &[], results)
                }
                "pnpm" => {
                    for (pnpm_key, pnpm_value) in object_pairs(value, content) {
                        if pnpm_key == "overrides" {
                            extract_flat(
                                pnpm_value,
                                content,
                                SourceField::PnpmOverrides,
                                &[],
                                results,
                            );
                        }
                    }
                }
                "catalog" | "catalogs" | "workspaces" => {
                    self.extract_catalogs(&key, value, content, results)
                }
                _ => {}
            }
        }
    }

    /// Extract bun/yarn catalogs, either top-level or nested in `workspaces`
    fn extract_catalogs(
        &self,
        key: &str,
        value: tree_sitter::Node,
        content: &str,
        results: &mut Vec<RawDependency>,
    ) {
        match key {
            "catalog" => extract_flat(value, content, SourceField::Catalog, &[], results),
            "catalogs" => {
                for (catalog_name, catalog) in object_pairs(value, content) {
                    extract_flat(
                        catalog,
                        content,
                        SourceField::Catalog,
                        &[catalog_name],
                        results,
                    );
                }
            }
            // `workspaces` may also be a plain array of globs
            "workspaces" => {
                for (inner_key, inner_value) in object_pairs(value, content) {
                    if inner_key == "catalog" || inner_key == "catalogs" {
                        self.extract_catalogs(&inner_key, inner_value, content, results);
                    }
                }
            }
            _ => {}
        }
    }

    /// Parse `"packageManager": "pnpm@9.1.0+sha512.abc"`
    ///
    /// The version span runs to the end of the string so a rewrite also
    /// drops the integrity suffix, which no longer matches after a bump.
    fn extract_package_manager(
        &self,
        value_node: tree_sitter::Node,
        content: &str,
    ) -> Option<RawDependency> {
        if value_node.kind() != "string" {
            return None;
        }

        let raw = string_value(value_node, content);
        let at_pos = raw.get(1..)?.find('@')? + 1;
        let name = &raw[..at_pos];
        let version_with_hash = &raw[at_pos + 1..];
        let version = version_with_hash
            .split_once('+')
            .map_or(version_with_hash, |(version, _)| version);

        if version.is_empty() {
            return None;
        }

        let start_point = value_node.start_position();
        let offset_in_string = 1 + at_pos + 1;

        Some(RawDependency {
            name: name.to_string(),
            current_version: version.to_string(),
            source: SourceField::PackageManager,
            parents: Vec::new(),
            update: true,
            start_offset: value_node.start_byte() + offset_in_string,
            end_offset: value_node.end_byte() - 1,
            line: start_point.row,
            column: start_point.column + offset_in_string,
        })
    }

    /// Walk npm `overrides`, recording nesting as parents
    ///
    /// `{"foo": {".": "1.0.0", "bar": "2.0.0"}}` yields `foo` itself at
    /// 1.0.0 and `bar` at 2.0.0 with parents `["foo"]`.
    fn extract_overrides(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        parents: &mut Vec<String>,
        results: &mut Vec<RawDependency>,
    ) {
        for (key, value) in object_pairs(object_node, content) {
            match value.kind() {
                "string" => {
                    let entry = if key == "." {
                        parents
                            .split_last()
                            .map(|(name, outer)| (name.clone(), outer.to_vec()))
                    } else {
                        Some((key, parents.clone()))
                    };

                    let Some((name, entry_parents)) = entry else {
                        continue;
                    };

                    if let Some(mut dep) =
                        string_entry(name, value, content, SourceField::Overrides, entry_parents)
                    {
                        // "$foo" references the version of a direct dependency
                        if dep.current_version.starts_with('$') {
                            dep.update = false;
                        }
                        results.push(dep);
                    }
                }
                "object" => {
                    parents.push(key);
                    self.extract_overrides(value, content, parents, results);
                    parents.pop();
                }
                _ => {}
            }
        }
    }
}

/// Collect `(key, value)` pairs of a JSON object node
fn object_pairs<'tree>(
    object_node: tree_sitter::Node<'tree>,
    content: &str,
) -> Vec<(String, tree_sitter::Node<'tree>)> {
    if object_node.kind() != "object" {
        return Vec::new();
    }

    let mut cursor = object_node.walk();
    object_node
        .children(&mut cursor)
        .filter(|child| child.kind() == "pair")
        .filter_map(|pair| {
            let key = pair.child_by_field_name("key")?;
            let value = pair.child_by_field_name("value")?;
            Some((string_value(key, content), value))
        })
        .collect()
}

/// Extract packages from a dependency object (e.g., "dependencies": { ... })
fn extract_flat(
    object_node: tree_sitter::Node,
    content: &str,
    source: SourceField,
    parents: &[String],
    results: &mut Vec<RawDependency>,
) {
    for (key, value) in object_pairs(object_node, content) {
        if let Some(dep) = string_entry(key, value, content, source, parents.to_vec()) {
            results.push(dep);
        }
    }
}

fn string_entry(
    name: String,
    value_node: tree_sitter::Node,
    content: &str,
    source: SourceField,
    parents: Vec<String>,
) -> Option<RawDependency> {
    if value_node.kind() != "string" {
        return None;
    }

    let start_point = value_node.start_position();

    // Adjust for quotes - the actual version starts after the opening quote
    Some(RawDependency {
        name,
        current_version: string_value(value_node, content),
        source,
        parents,
        update: true,
        start_offset: value_node.start_byte() + 1,
        end_offset: value_node.end_byte() - 1,
        line: start_point.row,
        column: start_point.column + 1,
    })
}

/// Get the string value from a string node (removes quotes)
fn string_value(node: tree_sitter::Node, content: &str) -> String {
    let text = &content[node.byte_range()];
    text.trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .to_string()
}
