//! Reporter-facing snapshots of the tracker tree.
//!
//! A snapshot is an owned copy with no ids or back-references, safe to hand
//! to reporters after the run is torn down, and serializable as an artifact.

use serde::{Deserialize, Serialize};

use crate::context::TrackerContext;
use crate::part::{PartId, PartKind};
use crate::state::PartState;

/// Owned copy of one part and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSnapshot {
    pub name: String,
    pub state: PartState,
    /// Current generator index; absent for sections and for generators that
    /// never advanced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Generator size; absent for sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    pub children: Vec<PartSnapshot>,
}

impl PartSnapshot {
    /// Capture the subtree rooted at `id`.
    pub fn capture(ctx: &TrackerContext, id: PartId) -> Self {
        let part = ctx.part(id);
        let (index, size) = match part.kind() {
            PartKind::Index { size, index } => (index, Some(size)),
            PartKind::Section => (None, None),
        };
        Self {
            name: part.name().to_string(),
            state: part.state(),
            index,
            size,
            children: part
                .children()
                .iter()
                .map(|child| Self::capture(ctx, *child))
                .collect(),
        }
    }

    /// Indented one-line-per-part outline for debugging and reports.
    pub fn outline(&self) -> String {
        let mut lines = Vec::new();
        self.outline_inner(0, &mut lines);
        lines.join("\n")
    }

    fn outline_inner(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let mut line = format!("{indent}- {} ({:?})", self.name, self.state);
        if let Some(size) = self.size {
            match self.index {
                Some(index) => line.push_str(&format!(" [{}/{size}]", index + 1)),
                None => line.push_str(&format!(" [-/{size}]")),
            }
        }
        lines.push(line);
        for child in &self.children {
            child.outline_inner(depth + 1, lines);
        }
    }

    /// Slash-joined paths, starting at this part's name, of every part in
    /// the subtree that ended `Failed`.
    pub fn failed_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_failed(None, &mut out);
        out
    }

    fn collect_failed(&self, prefix: Option<&str>, out: &mut Vec<String>) {
        let path = match prefix {
            Some(prefix) => format!("{prefix}/{}", self.name),
            None => self.name.clone(),
        };
        if self.state == PartState::Failed {
            out.push(path.clone());
        }
        for child in &self.children {
            child.collect_failed(Some(&path), out);
        }
    }
}
