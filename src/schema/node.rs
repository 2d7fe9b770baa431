//! Schema tree nodes: groups, leaves and the List/Map shapes that lower to
//! canonical repeated groups.

use crate::types::LeafType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

impl Repetition {
    pub fn is_optional(self) -> bool {
        matches!(self, Repetition::Optional)
    }

    pub fn is_repeated(self) -> bool {
        matches!(self, Repetition::Repeated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLogical {
    None,
    List,
    Map,
}

#[derive(Debug, Clone)]
pub enum Node {
    Leaf(LeafNode),
    Group(GroupNode),
}

#[derive(Debug, Clone)]
pub struct LeafNode {
    pub name: String,
    pub repetition: Repetition,
    pub leaf_type: LeafType,
    pub encoding: Option<String>,
    pub compression: Option<String>,
    pub field_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct GroupNode {
    pub name: String,
    pub repetition: Repetition,
    pub logical: GroupLogical,
    pub children: Vec<Node>,
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Leaf(l) => &l.name,
            Node::Group(g) => &g.name,
        }
    }

    pub fn repetition(&self) -> Repetition {
        match self {
            Node::Leaf(l) => l.repetition,
            Node::Group(g) => g.repetition,
        }
    }

    pub fn leaf(name: impl Into<String>, repetition: Repetition, leaf_type: LeafType) -> Node {
        Node::Leaf(LeafNode {
            name: name.into(),
            repetition,
            leaf_type,
            encoding: None,
            compression: None,
            field_id: None,
        })
    }

    pub fn with_encoding(self, encoding: impl Into<String>) -> Node {
        match self {
            Node::Leaf(mut l) => {
                l.encoding = Some(encoding.into());
                Node::Leaf(l)
            }
            other => other,
        }
    }

    pub fn with_compression(self, compression: impl Into<String>) -> Node {
        match self {
            Node::Leaf(mut l) => {
                l.compression = Some(compression.into());
                Node::Leaf(l)
            }
            other => other,
        }
    }

    pub fn with_field_id(self, id: i32) -> Node {
        match self {
            Node::Leaf(mut l) => {
                l.field_id = Some(id);
                Node::Leaf(l)
            }
            Node::Group(mut g) => {
                // field ids are per-leaf in this core; groups just pass through unchanged.
                let _ = id;
                Node::Group(g)
            }
        }
    }

    pub fn group(name: impl Into<String>, repetition: Repetition, children: Vec<Node>) -> Node {
        Node::Group(GroupNode { name: name.into(), repetition, logical: GroupLogical::None, children })
    }

    /// `List(element)` lowers to `Group { list: repeated Group { element: T } }`.
    pub fn list(name: impl Into<String>, repetition: Repetition, element: Node) -> Node {
        let element = rename(element, "element");
        let list_group = Node::Group(GroupNode {
            name: "list".to_string(),
            repetition: Repetition::Repeated,
            logical: GroupLogical::None,
            children: vec![element],
        });
        Node::Group(GroupNode {
            name: name.into(),
            repetition,
            logical: GroupLogical::List,
            children: vec![list_group],
        })
    }

    /// `Map(key, value)` lowers to `Group { key_value: repeated Group { key:
    /// K (required), value: V } }`.
    pub fn map(name: impl Into<String>, repetition: Repetition, key: Node, value: Node) -> Node {
        let key = rename_required(key, "key");
        let value = rename(value, "value");
        let kv_group = Node::Group(GroupNode {
            name: "key_value".to_string(),
            repetition: Repetition::Repeated,
            logical: GroupLogical::None,
            children: vec![key, value],
        });
        Node::Group(GroupNode {
            name: name.into(),
            repetition,
            logical: GroupLogical::Map,
            children: vec![kv_group],
        })
    }
}

fn rename(node: Node, new_name: &str) -> Node {
    match node {
        Node::Leaf(mut l) => {
            l.name = new_name.to_string();
            Node::Leaf(l)
        }
        Node::Group(mut g) => {
            g.name = new_name.to_string();
            Node::Group(g)
        }
    }
}

fn rename_required(node: Node, new_name: &str) -> Node {
    match rename(node, new_name) {
        Node::Leaf(mut l) => {
            l.repetition = Repetition::Required;
            Node::Leaf(l)
        }
        Node::Group(mut g) => {
            g.repetition = Repetition::Required;
            Node::Group(g)
        }
    }
}
