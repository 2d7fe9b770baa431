//! The flat, per-leaf column map produced by freezing a schema:
//! `columns: Vec<LeafInfo>`.

use crate::types::LeafType;

#[derive(Debug, Clone)]
pub struct LeafInfo {
    pub path: Vec<String>,
    pub column_index: usize,
    pub max_def: i16,
    pub max_rep: i16,
    pub leaf_type: LeafType,
    pub optional: bool,
    pub repeated: bool,
    pub required: bool,
}

impl LeafInfo {
    pub fn full_path(&self) -> String {
        crate::error::join_path(self.path.iter().map(|s| s.as_str()))
    }
}
