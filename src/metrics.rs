//! Static code metrics via tree-sitter.
//!
//! [`analyze`] computes line count, cyclomatic complexity, the import
//! list, and a structural type summary for one file. It is total: parser
//! failures degrade the affected fields and never abort ingestion. The
//! complexity/import pass and the type-summary pass parse independently,
//! so a failure in one leaves the other intact.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::models::CodeMetrics;

/// Languages the structural passes understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            _ => None,
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// Compute metrics for one file. Never fails; unsupported or unparseable
/// files get `complexity = 0` and an empty dependency list, and `sloc` is
/// always computed.
pub fn analyze(content: &str, path: &Path) -> CodeMetrics {
    let sloc = content.split('\n').count();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let (complexity, dependencies) = match Language::from_extension(&ext) {
        Some(lang) => match structural_metrics(content, lang) {
            Ok(result) => result,
            Err(e) => {
                warn!("metrics extraction failed for {}: {e:#}", path.display());
                (0, Vec::new())
            }
        },
        None => (0, Vec::new()),
    };

    let type_info = if ext == "rs" {
        match type_summary(content) {
            Ok(summary) => serde_json::to_string_pretty(&summary).unwrap_or_default(),
            Err(e) => {
                warn!("type summary failed for {}: {e:#}", path.display());
                String::new()
            }
        }
    } else {
        String::new()
    };

    CodeMetrics {
        complexity,
        sloc,
        dependencies,
        type_info,
    }
}

/// Cyclomatic complexity (1 + branch count) and import list.
fn structural_metrics(content: &str, lang: Language) -> Result<(u32, Vec<String>)> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang.grammar())
        .context("Failed to set parser language")?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| anyhow::anyhow!("Parser produced no tree"))?;

    let mut complexity = 1u32;
    let mut dependencies = Vec::new();
    walk_metrics(
        tree.root_node(),
        content,
        lang,
        &mut complexity,
        &mut dependencies,
    );

    Ok((complexity, dependencies))
}

fn walk_metrics(
    node: tree_sitter::Node,
    source: &str,
    lang: Language,
    complexity: &mut u32,
    dependencies: &mut Vec<String>,
) {
    match lang {
        Language::Rust => match node.kind() {
            "if_expression" | "while_expression" | "for_expression" | "loop_expression"
            | "match_arm" | "&&" | "||" => *complexity += 1,
            "use_declaration" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    if let Ok(text) = argument.utf8_text(source.as_bytes()) {
                        dependencies.push(text.to_string());
                    }
                }
            }
            _ => {}
        },
        Language::Python => match node.kind() {
            "if_statement" | "elif_clause" | "for_statement" | "while_statement"
            | "except_clause" | "boolean_operator" | "conditional_expression" => *complexity += 1,
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            if let Ok(text) = child.utf8_text(source.as_bytes()) {
                                dependencies.push(text.to_string());
                            }
                        }
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                if let Ok(text) = name.utf8_text(source.as_bytes()) {
                                    dependencies.push(text.to_string());
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    if let Ok(text) = module.utf8_text(source.as_bytes()) {
                        dependencies.push(text.to_string());
                    }
                }
            }
            _ => {}
        },
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_metrics(child, source, lang, complexity, dependencies);
    }
}

// ============ Type summary ============

/// Structural summary of a typed source file: traits, type aliases,
/// structs, and free functions with their member/parameter type text.
#[derive(Debug, Default, Serialize)]
pub struct TypeSummary {
    pub traits: Vec<DeclInfo>,
    pub aliases: Vec<AliasInfo>,
    pub structs: Vec<DeclInfo>,
    pub functions: Vec<FunctionInfo>,
}

#[derive(Debug, Serialize)]
pub struct DeclInfo {
    pub name: String,
    pub members: Vec<MemberInfo>,
}

#[derive(Debug, Serialize)]
pub struct AliasInfo {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Serialize)]
pub struct MemberInfo {
    pub name: String,
    pub ty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub parameters: Vec<MemberInfo>,
    pub return_type: Option<String>,
}

/// Walk Rust declarations and collect the type summary.
pub fn type_summary(content: &str) -> Result<TypeSummary> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&Language::Rust.grammar())
        .context("Failed to set parser language")?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| anyhow::anyhow!("Parser produced no tree"))?;

    let mut summary = TypeSummary::default();
    walk_types(tree.root_node(), content, &mut summary);
    Ok(summary)
}

fn walk_types(node: tree_sitter::Node, source: &str, summary: &mut TypeSummary) {
    let bytes = source.as_bytes();

    match node.kind() {
        "trait_item" => {
            if let Some(name) = node_field_text(node, "name", bytes) {
                let mut members = Vec::new();
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for item in body.children(&mut cursor) {
                        if matches!(item.kind(), "function_signature_item" | "function_item") {
                            if let Some(member_name) = node_field_text(item, "name", bytes) {
                                members.push(MemberInfo {
                                    name: member_name,
                                    ty: signature_text(item, source),
                                });
                            }
                        }
                    }
                }
                summary.traits.push(DeclInfo { name, members });
            }
        }
        "type_item" => {
            if let (Some(name), Some(ty)) = (
                node_field_text(node, "name", bytes),
                node_field_text(node, "type", bytes),
            ) {
                summary.aliases.push(AliasInfo { name, ty });
            }
        }
        "struct_item" => {
            if let Some(name) = node_field_text(node, "name", bytes) {
                let mut members = Vec::new();
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for field in body.children(&mut cursor) {
                        if field.kind() == "field_declaration" {
                            if let Some(field_name) = node_field_text(field, "name", bytes) {
                                members.push(MemberInfo {
                                    name: field_name,
                                    ty: node_field_text(field, "type", bytes),
                                });
                            }
                        }
                    }
                }
                summary.structs.push(DeclInfo { name, members });
            }
        }
        "function_item" => {
            if let Some(name) = node_field_text(node, "name", bytes) {
                let mut parameters = Vec::new();
                if let Some(params) = node.child_by_field_name("parameters") {
                    let mut cursor = params.walk();
                    for param in params.children(&mut cursor) {
                        if param.kind() == "parameter" {
                            if let Some(pattern) = node_field_text(param, "pattern", bytes) {
                                parameters.push(MemberInfo {
                                    name: pattern,
                                    ty: node_field_text(param, "type", bytes),
                                });
                            }
                        }
                    }
                }
                summary.functions.push(FunctionInfo {
                    name,
                    parameters,
                    return_type: node_field_text(node, "return_type", bytes),
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_types(child, source, summary);
    }
}

fn node_field_text(node: tree_sitter::Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source).ok())
        .map(|t| t.to_string())
}

/// Everything up to the body block, e.g. `fn get(&self, key: &str) -> Option<String>`.
fn signature_text(node: tree_sitter::Node, source: &str) -> Option<String> {
    let mut end = node.end_byte();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "block" {
            end = child.start_byte();
            break;
        }
    }
    Some(source[node.start_byte()..end].trim().trim_end_matches(';').trim().to_string())
}
