//! Declaration facts for a code project.
//!
//! - (:Root)-[:DECLARES]->(:Class)
//! - (:Root)-[:DECLARES]->(:Function)
//! - (:Class)-[:DECLARES]->(:Method)
//!
//! Identity keys are `<project>:<Name>` for classes and functions and
//! `<classId>.<method>` for methods. Same-named declarations in different
//! files share a key.

use tracing::debug;

use super::{Declaration, DeclarationKind, SourceUnit};
use crate::fact::{labels, rel_types, EdgeFact, Fact, NodeFact, NodeRef};

/// Builds source-location links from a base URL.
///
/// The base may be a template containing `{path}` and `{line}`; otherwise
/// links take the form `<base>/<path>#<line>`.
#[derive(Debug, Clone)]
pub struct SourceLinks {
    base_url: String,
}

impl SourceLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn link(&self, path: &str, line: u32) -> String {
        if self.base_url.contains("{path}") {
            return self
                .base_url
                .replace("{path}", path)
                .replace("{line}", &line.to_string());
        }
        format!(
            "{}/{}#{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            line
        )
    }
}

/// Traversal context, passed by value to each declaration.
#[derive(Debug, Clone, Default)]
struct VisitState {
    current_class: Option<String>,
}

impl VisitState {
    fn in_class(class_id: String) -> Self {
        Self {
            current_class: Some(class_id),
        }
    }
}

/// Fact producer for one project.
#[derive(Debug, Clone)]
pub struct CodeFacts {
    project: String,
    links: SourceLinks,
}

impl CodeFacts {
    pub fn new(project: impl Into<String>, links: SourceLinks) -> Self {
        Self {
            project: project.into(),
            links,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn root_ref(&self) -> NodeRef {
        NodeRef::new(labels::ROOT, self.project.clone())
    }

    pub fn root_node(&self) -> NodeFact {
        NodeFact::new(labels::ROOT, self.project.clone())
            .with("name", self.project.as_str())
            .with("project", self.project.as_str())
    }

    pub fn class_id(&self, class: &str) -> String {
        format!("{}:{}", self.project, class)
    }

    pub fn function_id(&self, function: &str) -> String {
        format!("{}:{}", self.project, function)
    }

    pub fn method_id(class_id: &str, method: &str) -> String {
        format!("{}.{}", class_id, method)
    }

    /// Facts for every direct declaration of `unit`.
    pub fn extract(&self, unit: &SourceUnit) -> Vec<Fact> {
        let mut facts = Vec::new();
        for decl in &unit.declarations {
            self.visit(unit, decl, VisitState::default(), &mut facts);
        }
        debug!(file = %unit.path, facts = facts.len(), "Extracted declarations");
        facts
    }

    fn visit(&self, unit: &SourceUnit, decl: &Declaration, state: VisitState, out: &mut Vec<Fact>) {
        match (&decl.kind, state.current_class) {
            (DeclarationKind::Class, None) => {
                let class_id = self.class_id(&decl.name);
                let node = self.declared(labels::CLASS, class_id.clone(), unit, decl);
                out.push(EdgeFact::new(rel_types::DECLARES, self.root_ref(), node.node_ref()).into());
                out.push(node.into());

                for member in &decl.members {
                    self.visit(unit, member, VisitState::in_class(class_id.clone()), out);
                }
            }
            (DeclarationKind::Function, None) => {
                let node = self.declared(labels::FUNCTION, self.function_id(&decl.name), unit, decl);
                out.push(EdgeFact::new(rel_types::DECLARES, self.root_ref(), node.node_ref()).into());
                out.push(node.into());
            }
            (DeclarationKind::Function, Some(class_id)) => {
                self.method(unit, decl, class_id, out);
            }
            (DeclarationKind::Method { receiver }, None) => {
                self.method(unit, decl, self.class_id(receiver), out);
            }
            // Declarations nested inside a class body other than methods.
            (_, Some(_)) => {}
        }
    }

    fn method(&self, unit: &SourceUnit, decl: &Declaration, class_id: String, out: &mut Vec<Fact>) {
        let node = self
            .declared(labels::METHOD, Self::method_id(&class_id, &decl.name), unit, decl)
            .with("classId", class_id.as_str());
        let class_ref = NodeRef::new(labels::CLASS, class_id);
        out.push(EdgeFact::new(rel_types::DECLARES, class_ref, node.node_ref()).into());
        out.push(node.into());
    }

    fn declared(&self, label: &str, id: String, unit: &SourceUnit, decl: &Declaration) -> NodeFact {
        NodeFact::new(label, id)
            .with("name", decl.name.as_str())
            .with("project", self.project.as_str())
            .with("file", unit.path.as_str())
            .with("line", decl.line)
            .with("url", self.links.link(&unit.path, decl.line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Language;
    use crate::fact::PropertyValue;

    fn unit(declarations: Vec<Declaration>) -> SourceUnit {
        SourceUnit {
            path: "app/models.py".to_string(),
            language: Language::Python,
            declarations,
        }
    }

    fn nodes(facts: &[Fact]) -> Vec<(&str, &str)> {
        facts
            .iter()
            .filter_map(|f| match f {
                Fact::Node(n) => Some((n.label.as_str(), n.id.as_str())),
                Fact::Edge(_) => None,
            })
            .collect()
    }

    fn edges(facts: &[Fact]) -> Vec<(&str, &str)> {
        facts
            .iter()
            .filter_map(|f| match f {
                Fact::Edge(e) => Some((e.from.id.as_str(), e.to.id.as_str())),
                Fact::Node(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_links() {
        let plain = SourceLinks::new("http://localhost/");
        assert_eq!(plain.link("app/models.py", 12), "http://localhost/app/models.py#12");

        let template = SourceLinks::new("https://git.example.com/blob/main/{path}#L{line}");
        assert_eq!(
            template.link("app/models.py", 12),
            "https://git.example.com/blob/main/app/models.py#L12"
        );
    }

    #[test]
    fn test_class_methods_and_functions() {
        let facts = CodeFacts::new("shop", SourceLinks::new("http://localhost"));
        let out = facts.extract(&unit(vec![
            Declaration::class(
                "Order",
                3,
                vec![Declaration::function("total", 5), Declaration::class("Meta", 9, Vec::new())],
            ),
            Declaration::function("load", 20),
        ]));

        assert_eq!(
            nodes(&out),
            vec![
                ("Class", "shop:Order"),
                ("Method", "shop:Order.total"),
                ("Function", "shop:load"),
            ]
        );
        assert_eq!(
            edges(&out),
            vec![
                ("shop", "shop:Order"),
                ("shop:Order", "shop:Order.total"),
                ("shop", "shop:load"),
            ]
        );

        let method = out
            .iter()
            .find_map(|f| match f {
                Fact::Node(n) if n.label == "Method" => Some(n),
                _ => None,
            })
            .unwrap();
        assert_eq!(method.property("classId"), Some(&PropertyValue::from("shop:Order")));
        assert_eq!(method.property("url"), Some(&PropertyValue::from("http://localhost/app/models.py#5")));
        assert_eq!(method.property("project"), Some(&PropertyValue::from("shop")));
    }

    #[test]
    fn test_receiver_methods_attach_to_named_class() {
        let facts = CodeFacts::new("svc", SourceLinks::new("http://localhost"));
        let out = facts.extract(&unit(vec![Declaration::method("Store", "Get", 17)]));

        assert_eq!(nodes(&out), vec![("Method", "svc:Store.Get")]);
        assert_eq!(edges(&out), vec![("svc:Store", "svc:Store.Get")]);
    }

    #[test]
    fn test_each_declaration_is_visited_independently() {
        let facts = CodeFacts::new("p", SourceLinks::new("http://localhost"));
        let class = Declaration::class("A", 1, vec![Declaration::function("run", 2)]);
        let function = Declaration::function("run", 10);

        // the function after a class must not be treated as one of its methods
        let out = facts.extract(&unit(vec![class, function]));
        assert!(nodes(&out).contains(&("Function", "p:run")));
        assert!(nodes(&out).contains(&("Method", "p:A.run")));
    }
}
