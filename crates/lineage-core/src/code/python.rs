//! Python declarations via tree-sitter.

use tree_sitter::Node;

use super::treesitter::{field_text, node_line, parse_tree};
use super::Declaration;

pub fn declarations(content: &str) -> Result<Vec<Declaration>, String> {
    let tree = parse_tree(&tree_sitter_python::LANGUAGE.into(), content)?;
    let root = tree.root_node();

    let mut cursor = root.walk();
    let decls = root
        .children(&mut cursor)
        .filter_map(|child| top_level(&child, content))
        .collect();
    Ok(decls)
}

fn top_level(node: &Node, content: &str) -> Option<Declaration> {
    let def = unwrap_decorated(*node);
    match def.kind() {
        "class_definition" => {
            let name = field_text(&def, "name", content)?;
            Some(Declaration::class(name, node_line(&def), class_methods(&def, content)))
        }
        "function_definition" => {
            let name = field_text(&def, "name", content)?;
            Some(Declaration::function(name, node_line(&def)))
        }
        _ => None,
    }
}

/// Functions defined directly in the class body.
fn class_methods(class: &Node, content: &str) -> Vec<Declaration> {
    let Some(body) = class.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut cursor = body.walk();
    body.children(&mut cursor)
        .map(unwrap_decorated)
        .filter(|def| def.kind() == "function_definition")
        .filter_map(|def| {
            let name = field_text(&def, "name", content)?;
            Some(Declaration::function(name, node_line(&def)))
        })
        .collect()
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DeclarationKind;

    const SOURCE: &str = r#"import os

class Repository:
    """Stores things."""

    def __init__(self, client):
        self.client = client

    @staticmethod
    def build():
        def helper():
            pass
        return Repository(None)

    class Meta:
        pass


@cache
def load(path):
    class Local:
        pass
    return path


async def fetch():
    pass
"#;

    #[test]
    fn test_direct_declarations_only() {
        let decls = declarations(SOURCE).unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Repository", "load", "fetch"]);

        let repo = &decls[0];
        assert_eq!(repo.kind, DeclarationKind::Class);
        assert_eq!(repo.line, 3);
        let methods: Vec<_> = repo.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["__init__", "build"]);

        assert_eq!(decls[1].line, 20);
        assert!(decls[1].members.is_empty());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = declarations("def broken(:\n    pass\n").unwrap_err();
        assert!(err.contains("syntax error"));
    }
}
