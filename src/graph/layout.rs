use super::node::{Node, NodeKind, Position};
use serde::{Deserialize, Serialize};

/// Column placement used when a graph is built without saved positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub source_x: f64,
    pub transform_x: f64,
    pub target_x: f64,
    pub top: f64,
    pub row_pitch: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            source_x: 100.0,
            transform_x: 400.0,
            target_x: 700.0,
            top: 100.0,
            row_pitch: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Source,
    Transform,
    Target,
}

impl Column {
    pub fn of(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Source(_) => Column::Source,
            NodeKind::Target(_) => Column::Target,
            _ => Column::Transform,
        }
    }
}

impl LayoutOptions {
    pub fn position(&self, column: Column, row: usize) -> Position {
        let x = match column {
            Column::Source => self.source_x,
            Column::Transform => self.transform_x,
            Column::Target => self.target_x,
        };
        Position::new(x, self.top + row as f64 * self.row_pitch)
    }

    /// Places nodes by column, rows in list order within each column.
    pub fn arrange(&self, nodes: &mut [Node]) {
        let mut rows = [0usize; 3];
        for node in nodes {
            let column = Column::of(&node.kind);
            let row = &mut rows[column as usize];
            node.position = self.position(column, *row);
            *row += 1;
        }
    }
}
