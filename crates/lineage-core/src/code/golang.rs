//! Go declarations via tree-sitter.
//!
//! Named types other than interfaces are treated as classes. Methods are
//! reported against their receiver type, which may live in another file.

use tree_sitter::Node;

use super::treesitter::{field_text, node_line, node_text, parse_tree};
use super::Declaration;

pub fn declarations(content: &str) -> Result<Vec<Declaration>, String> {
    let tree = parse_tree(&tree_sitter_go::LANGUAGE.into(), content)?;
    let root = tree.root_node();

    let mut decls = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "type_declaration" => decls.extend(type_specs(&child, content)),
            "function_declaration" => {
                if let Some(name) = field_text(&child, "name", content) {
                    decls.push(Declaration::function(name, node_line(&child)));
                }
            }
            "method_declaration" => {
                let name = field_text(&child, "name", content);
                let receiver = child
                    .child_by_field_name("receiver")
                    .and_then(|r| receiver_type(&r, content));
                if let (Some(name), Some(receiver)) = (name, receiver) {
                    decls.push(Declaration::method(receiver, name, node_line(&child)));
                }
            }
            _ => {}
        }
    }
    Ok(decls)
}

fn type_specs(decl: &Node, content: &str) -> Vec<Declaration> {
    let mut cursor = decl.walk();
    decl.children(&mut cursor)
        .filter(|spec| spec.kind() == "type_spec")
        .filter(|spec| {
            spec.child_by_field_name("type")
                .map(|t| t.kind() != "interface_type")
                .unwrap_or(false)
        })
        .filter_map(|spec| {
            let name = field_text(&spec, "name", content)?;
            Some(Declaration::class(name, node_line(&spec), Vec::new()))
        })
        .collect()
}

/// `(s *Store)`, `(Store)`, `(s *Cache[K, V])` all yield the bare type name.
fn receiver_type(params: &Node, content: &str) -> Option<String> {
    let mut cursor = params.walk();
    let param = params
        .children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = param.child_by_field_name("type")?;
    normalize_receiver(node_text(&ty, content))
}

fn normalize_receiver(raw: &str) -> Option<String> {
    let bare = raw.trim().trim_start_matches('*').trim();
    let bare = bare.split('[').next().unwrap_or(bare).trim();
    (!bare.is_empty()).then(|| bare.to_string())
}
