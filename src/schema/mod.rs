//! Schema tree construction and the flat column map it freezes into. A
//! `Schema` is built once from an ordered list of root fields and is
//! read-only afterward; the column index assigned during that single
//! depth-first traversal is immutable for the schema's life.

pub mod column_map;
pub mod node;

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result, SchemaError};

pub use column_map::LeafInfo;
pub use node::{GroupLogical, GroupNode, LeafNode, Node, Repetition};

#[derive(Debug, Clone)]
pub struct Schema {
    root: Node,
    columns: Vec<LeafInfo>,
    path_index: HashMap<String, usize>,
}

impl Schema {
    pub fn build(root_fields: Vec<Node>) -> Result<Schema> {
        let root = Node::Group(GroupNode {
            name: "root".to_string(),
            repetition: Repetition::Required,
            logical: GroupLogical::None,
            children: root_fields,
        });

        let mut columns = Vec::new();
        let mut path = Vec::new();
        collect(&root, 0, 0, &mut path, &mut columns)?;

        let path_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.full_path(), i))
            .collect();

        Ok(Schema { root, columns, path_index })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn columns(&self) -> &[LeafInfo] {
        &self.columns
    }

    /// O(path length): the key is the dot-joined path, so hashing cost is
    /// proportional to the path's total length, not the schema's size.
    pub fn lookup(&self, path: &[&str]) -> Result<&LeafInfo> {
        let key = crate::error::join_path(path.iter().copied());
        let idx = self
            .path_index
            .get(&key)
            .ok_or_else(|| Error::Schema(SchemaError::UndefinedColumn(key.clone())))?;
        Ok(&self.columns[*idx])
    }

    /// Two schemas are structurally equal iff their column maps agree on
    /// path, type, and levels in order; encoding/compression/field-id
    /// hints are not part of this.
    pub fn equal_nodes(&self, other: &Schema) -> bool {
        if self.columns.len() != other.columns.len() {
            return false;
        }
        self.columns.iter().zip(other.columns.iter()).all(|(a, b)| {
            a.path == b.path
                && a.max_def == b.max_def
                && a.max_rep == b.max_rep
                && a.leaf_type.equal(&b.leaf_type)
                && a.optional == b.optional
                && a.repeated == b.repeated
        })
    }
}

fn validate_group_shape(g: &GroupNode) -> Result<()> {
    match g.logical {
        GroupLogical::None => Ok(()),
        GroupLogical::List => {
            let ok = g.children.len() == 1
                && matches!(&g.children[0], Node::Group(list)
                    if list.name == "list"
                        && list.repetition.is_repeated()
                        && list.children.len() == 1
                        && list.children[0].name() == "element");
            if ok {
                Ok(())
            } else {
                Err(Error::Schema(SchemaError::InvalidListShape(g.name.clone())))
            }
        }
        GroupLogical::Map => {
            let ok = g.children.len() == 1
                && matches!(&g.children[0], Node::Group(kv)
                    if kv.name == "key_value"
                        && kv.repetition.is_repeated()
                        && kv.children.len() == 2
                        && kv.children[0].name() == "key"
                        && kv.children[0].repetition() == Repetition::Required
                        && kv.children[1].name() == "value");
            if ok {
                Ok(())
            } else {
                Err(Error::Schema(SchemaError::InvalidMapShape(g.name.clone())))
            }
        }
    }
}

fn collect(
    node: &Node,
    parent_def: i16,
    parent_rep: i16,
    path: &mut Vec<String>,
    columns: &mut Vec<LeafInfo>,
) -> Result<()> {
    match node {
        Node::Leaf(l) => {
            let max_def = parent_def + if l.repetition.is_optional() || l.repetition.is_repeated() { 1 } else { 0 };
            let max_rep = parent_rep + if l.repetition.is_repeated() { 1 } else { 0 };
            columns.push(LeafInfo {
                path: path.clone(),
                column_index: columns.len(),
                max_def,
                max_rep,
                leaf_type: l.leaf_type.clone(),
                optional: l.repetition.is_optional(),
                repeated: l.repetition.is_repeated(),
                required: matches!(l.repetition, Repetition::Required),
            });
            Ok(())
        }
        Node::Group(g) => {
            validate_group_shape(g)?;

            let mut seen = HashSet::new();
            for child in &g.children {
                if !seen.insert(child.name().to_string()) {
                    return Err(Error::Schema(SchemaError::DuplicateName {
                        group: g.name.clone(),
                        name: child.name().to_string(),
                    }));
                }
            }

            let child_def = parent_def + if g.repetition.is_optional() || g.repetition.is_repeated() { 1 } else { 0 };
            let child_rep = parent_rep + if g.repetition.is_repeated() { 1 } else { 0 };

            for child in &g.children {
                path.push(child.name().to_string());
                collect(child, child_def, child_rep, path, columns)?;
                path.pop();
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeafType, PhysicalType};

    fn int_leaf(name: &str, rep: Repetition) -> Node {
        Node::leaf(name, rep, LeafType::new(PhysicalType::Int32, None))
    }

    #[test]
    fn column_index_is_assigned_depth_first_left_to_right() {
        let schema = Schema::build(vec![
            int_leaf("a", Repetition::Required),
            Node::group("g", Repetition::Required, vec![int_leaf("b", Repetition::Required), int_leaf("c", Repetition::Required)]),
            int_leaf("d", Repetition::Required),
        ])
        .unwrap();
        let paths: Vec<String> = schema.columns().iter().map(|c| c.full_path()).collect();
        assert_eq!(paths, vec!["a", "g.b", "g.c", "d"]);
        assert_eq!(schema.columns()[2].column_index, 2);
    }

    #[test]
    fn max_def_and_rep_follow_ancestor_chain() {
        let list_schema = Schema::build(vec![Node::list("tags", Repetition::Optional, int_leaf("element", Repetition::Required))]).unwrap();
        let leaf = schema_lookup(&list_schema, &["tags", "list", "element"]);
        // tags optional (+1 def), list repeated (+1 def, +1 rep), element required.
        assert_eq!(leaf.max_def, 2);
        assert_eq!(leaf.max_rep, 1);
    }

    fn schema_lookup<'a>(schema: &'a Schema, path: &[&str]) -> &'a LeafInfo {
        schema.lookup(path).unwrap()
    }

    #[test]
    fn lookup_finds_nested_leaf_in_path_length_steps() {
        let schema = Schema::build(vec![Node::group("g", Repetition::Required, vec![int_leaf("b", Repetition::Required)])]).unwrap();
        let leaf = schema.lookup(&["g", "b"]).unwrap();
        assert_eq!(leaf.column_index, 0);
    }

    #[test]
    fn lookup_of_undefined_column_fails() {
        let schema = Schema::build(vec![int_leaf("a", Repetition::Required)]).unwrap();
        assert!(schema.lookup(&["nope"]).is_err());
    }

    #[test]
    fn duplicate_field_name_in_group_is_rejected() {
        let result = Schema::build(vec![Node::group(
            "g",
            Repetition::Required,
            vec![int_leaf("b", Repetition::Required), int_leaf("b", Repetition::Required)],
        )]);
        assert!(matches!(result, Err(Error::Schema(SchemaError::DuplicateName { .. }))));
    }

    #[test]
    fn malformed_list_shape_is_rejected_at_construction() {
        let malformed = Node::Group(GroupNode {
            name: "tags".to_string(),
            repetition: Repetition::Optional,
            logical: GroupLogical::List,
            children: vec![int_leaf("not_list", Repetition::Required)],
        });
        let result = Schema::build(vec![malformed]);
        assert!(matches!(result, Err(Error::Schema(SchemaError::InvalidListShape(_)))));
    }

    #[test]
    fn equal_nodes_ignores_encoding_hints() {
        let a = Schema::build(vec![int_leaf("a", Repetition::Required).with_encoding("plain")]).unwrap();
        let b = Schema::build(vec![int_leaf("a", Repetition::Required).with_encoding("dict")]).unwrap();
        assert!(a.equal_nodes(&b));
    }
}
