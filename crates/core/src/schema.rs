//! Best-effort entity/attribute extraction from free-text schema proposals,
//! rendered as a Mermaid `erDiagram` block.
//!
//! Parsing never fails. Lines the scanner does not recognise are skipped, so
//! malformed text yields a partial or empty graph.

use serde::Serialize;

pub const ENTITY_MARKER: &str = "Entity:";
pub const DIAGRAM_HEADER: &str = "erDiagram";
pub const PLACEHOLDER_TYPE: &str = "string";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchemaEntity {
    pub name: String,
    pub attributes: Vec<String>,
}

/// Entity name -> ordered attributes, in first-seen entity order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchemaGraph {
    entities: Vec<SchemaEntity>,
}

impl SchemaGraph {
    pub fn entities(&self) -> &[SchemaEntity] {
        &self.entities
    }

    pub fn attributes(&self, entity: &str) -> Option<&[String]> {
        self.entities
            .iter()
            .find(|candidate| candidate.name == entity)
            .map(|candidate| candidate.attributes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Starts (or restarts) an entity and returns its index. A repeated name
    /// keeps its original position and drops previously collected attributes.
    fn begin_entity(&mut self, name: &str) -> usize {
        if let Some(index) = self.entities.iter().position(|entity| entity.name == name) {
            self.entities[index].attributes.clear();
            return index;
        }
        self.entities.push(SchemaEntity { name: name.to_string(), attributes: Vec::new() });
        self.entities.len() - 1
    }
}

pub fn extract_entities(schema_text: &str) -> SchemaGraph {
    let mut graph = SchemaGraph::default();
    let mut current: Option<usize> = None;

    for line in schema_text.lines() {
        if let Some((_, rest)) = line.split_once(ENTITY_MARKER) {
            let name = rest.split(ENTITY_MARKER).next().unwrap_or_default().trim();
            current = if name.is_empty() { None } else { Some(graph.begin_entity(name)) };
            continue;
        }

        let Some(index) = current else {
            continue;
        };
        if !line.contains('-') {
            continue;
        }
        if let Some(attribute) = attribute_name(line) {
            graph.entities[index].attributes.push(attribute);
        }
    }

    graph
}

/// Text before the first `-`. A leading list bullet is not a separator, so
/// `- customer_id` and `customer_id - primary key` both name `customer_id`.
fn attribute_name(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let name = body.split('-').next().unwrap_or_default().trim();
    (!name.is_empty()).then(|| name.to_string())
}

pub fn render_diagram(graph: &SchemaGraph) -> String {
    let mut diagram = format!("{DIAGRAM_HEADER}\n");
    for entity in graph.entities() {
        diagram.push_str(&format!("  {} {{\n", entity.name));
        for attribute in &entity.attributes {
            diagram.push_str(&format!("    {PLACEHOLDER_TYPE} {attribute}\n"));
        }
        diagram.push_str("  }\n");
    }
    diagram
}

#[cfg(test)]
mod tests {
    use super::{extract_entities, render_diagram};

    const REFERENCE: &str = "Entity: Customer\n- customer_id\n- name\nEntity: Account\n- account_id";

    #[test]
    fn extracts_reference_schema() {
        let graph = extract_entities(REFERENCE);

        assert_eq!(graph.len(), 2);
        assert_eq!(
            graph.attributes("Customer"),
            Some(&["customer_id".to_string(), "name".to_string()][..])
        );
        assert_eq!(graph.attributes("Account"), Some(&["account_id".to_string()][..]));
        let names: Vec<_> = graph.entities().iter().map(|entity| entity.name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Account"]);
    }

    #[test]
    fn renders_one_block_per_entity() {
        let diagram = render_diagram(&extract_entities(REFERENCE));

        assert_eq!(
            diagram,
            "erDiagram\n  Customer {\n    string customer_id\n    string name\n  }\n  Account {\n    string account_id\n  }\n"
        );
    }

    #[test]
    fn text_without_marker_yields_empty_graph() {
        let graph = extract_entities("Customer table\n- customer_id\n- name");

        assert!(graph.is_empty());
        assert_eq!(render_diagram(&graph), "erDiagram\n");
    }

    #[test]
    fn attribute_is_text_before_first_dash() {
        let graph = extract_entities(
            "Intro line - ignored\nEntity: Transaction \ntxn_id - primary key\namount\n- posted_at - UTC timestamp\n",
        );

        assert_eq!(
            graph.attributes("Transaction"),
            Some(&["txn_id".to_string(), "posted_at".to_string()][..])
        );
    }

    #[test]
    fn marker_inside_line_uses_trailing_text() {
        let graph = extract_entities("1. **Entity: Branch\n   - branch_code - unique");

        assert_eq!(graph.attributes("**Branch"), None);
        assert_eq!(graph.attributes("Branch"), Some(&["branch_code".to_string()][..]));
    }

    #[test]
    fn repeated_entity_restarts_in_place() {
        let graph =
            extract_entities("Entity: A\n- one\nEntity: B\n- two\nEntity: A\n- three");

        let names: Vec<_> = graph.entities().iter().map(|entity| entity.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(graph.attributes("A"), Some(&["three".to_string()][..]));
    }

    #[test]
    fn empty_entity_name_deactivates_collection() {
        let graph = extract_entities("Entity: A\n- one\nEntity:   \n- orphan");

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.attributes("A"), Some(&["one".to_string()][..]));
    }
}
