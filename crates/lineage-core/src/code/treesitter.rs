//! Tree-sitter helpers shared by the language parsers.

use tree_sitter::{Language, Node, Parser, Tree};

/// Parse source code into a tree-sitter tree.
pub fn parse_tree(language: &Language, content: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| format!("Failed to set language: {}", e))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| "Failed to parse content".to_string())?;

    if tree.root_node().has_error() {
        return Err(first_error_position(tree.root_node())
            .map(|line| format!("syntax error near line {}", line))
            .unwrap_or_else(|| "syntax error".to_string()));
    }
    Ok(tree)
}

fn first_error_position(node: Node) -> Option<u32> {
    if node.is_error() || node.is_missing() {
        return Some(node_line(&node));
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error_position)
}

/// Get text for a node from source content.
pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
    &content[node.byte_range()]
}

/// Get line number (1-based) for a node.
pub fn node_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Text of the node's `name` field.
pub fn field_text<'a>(node: &Node, field: &str, content: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| node_text(&n, content))
}
