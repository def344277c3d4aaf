//! Test-only helpers for driving scripted test-case bodies.
//!
//! A [`Shape`] declares the static nesting of sections and generators a body
//! would contain; [`ScriptedBody`] replays it against a context the way a
//! macro-expanded body would, recording which leaf path each cycle entered.

use crate::context::TrackerContext;
use crate::error::TrackerError;

/// Declarative shape of a test-case body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Named section containing nested shapes.
    Section { name: String, children: Vec<Shape> },
    /// Named generator over `size` values containing nested shapes.
    Index {
        name: String,
        size: usize,
        children: Vec<Shape>,
    },
}

/// Build a section shape.
pub fn section(name: &str, children: Vec<Shape>) -> Shape {
    Shape::Section {
        name: name.to_string(),
        children,
    }
}

/// Build a generator shape.
pub fn index(name: &str, size: usize, children: Vec<Shape>) -> Shape {
    Shape::Index {
        name: name.to_string(),
        size,
        children,
    }
}

/// Replays a fixed [`Shape`] forest as a deterministic test body.
#[derive(Debug, Clone)]
pub struct ScriptedBody {
    shapes: Vec<Shape>,
    /// Name path (no generator indices) of a leaf to fail when entered.
    fail_at: Option<String>,
}

impl ScriptedBody {
    pub fn new(shapes: Vec<Shape>) -> Self {
        Self {
            shapes,
            fail_at: None,
        }
    }

    /// Fail the leaf at `path` ("a/b/c", generator indices omitted) the
    /// first time it opens. A failed part never reopens, so the failure
    /// fires at most once per generator iteration of its ancestors.
    pub fn failing_at(shapes: Vec<Shape>, path: &str) -> Self {
        Self {
            shapes,
            fail_at: Some(path.to_string()),
        }
    }

    /// Execute one cycle of the body, appending the leaf paths entered this
    /// cycle (at most one for a deterministic shape) to `visited`. Generator
    /// levels contribute `name#index` segments.
    pub fn run_cycle(
        &self,
        ctx: &mut TrackerContext,
        visited: &mut Vec<String>,
    ) -> Result<(), TrackerError> {
        self.run_level(ctx, &self.shapes, "", "", visited)
    }

    fn run_level(
        &self,
        ctx: &mut TrackerContext,
        shapes: &[Shape],
        name_prefix: &str,
        visit_prefix: &str,
        visited: &mut Vec<String>,
    ) -> Result<(), TrackerError> {
        for shape in shapes {
            match shape {
                Shape::Section { name, children } => {
                    let id = ctx.acquire_section(name)?;
                    if !ctx.part(id).is_open() {
                        continue;
                    }
                    let name_path = join(name_prefix, name);
                    let visit_path = join(visit_prefix, name);
                    if self.fail_at.as_deref() == Some(name_path.as_str()) {
                        visited.push(visit_path);
                        ctx.fail(id)?;
                        // No close after fail: the body unwinds out of a
                        // failed region without touching it again.
                        continue;
                    }
                    if children.is_empty() {
                        visited.push(visit_path);
                    } else {
                        self.run_level(ctx, children, &name_path, &visit_path, visited)?;
                    }
                    ctx.close(id)?;
                }
                Shape::Index {
                    name,
                    size,
                    children,
                } => {
                    let id = ctx.acquire_index(name, *size)?;
                    if !ctx.part(id).is_open() {
                        continue;
                    }
                    let name_path = join(name_prefix, name);
                    let visit_path = match ctx.part(id).index() {
                        Some(i) => format!("{}#{i}", join(visit_prefix, name)),
                        None => join(visit_prefix, name),
                    };
                    if children.is_empty() {
                        visited.push(visit_path);
                    } else {
                        self.run_level(ctx, children, &name_path, &visit_path, visited)?;
                    }
                    ctx.close(id)?;
                }
            }
        }
        Ok(())
    }
}

/// All leaf paths a shape forest yields when fully explored, in visit order.
/// Generator levels expand to one segment per index.
pub fn leaf_paths(shapes: &[Shape]) -> Vec<String> {
    let mut out = Vec::new();
    collect_leaf_paths(shapes, "", &mut out);
    out
}

fn collect_leaf_paths(shapes: &[Shape], prefix: &str, out: &mut Vec<String>) {
    for shape in shapes {
        match shape {
            Shape::Section { name, children } => {
                let path = join(prefix, name);
                if children.is_empty() {
                    out.push(path);
                } else {
                    collect_leaf_paths(children, &path, out);
                }
            }
            Shape::Index {
                name,
                size,
                children,
            } => {
                for i in 0..*size {
                    let path = format!("{}#{i}", join(prefix, name));
                    if children.is_empty() {
                        out.push(path);
                    } else {
                        collect_leaf_paths(children, &path, out);
                    }
                }
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
