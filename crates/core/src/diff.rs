//! Structural diff between document states
//!
//! [`diff`] produces a JSON Patch (add/remove/replace only) turning one JSON
//! value into another. Objects are compared member by member; arrays are
//! aligned on their longest common subsequence so that an insertion in the
//! middle of a list yields one `add` instead of a cascade of replacements.
//!
//! [`DiffEngine`] wraps that for the write path: it sanitizes the submitted
//! state once, diffs it against the stored state and drops every operation
//! on an excluded bookkeeping path.

use crate::changeset::{FieldOp, Op};
use crate::document::sanitize;
use crate::error::{Error, Result};
use crate::pointer::{format_pointer, parse_pointer};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Paths whose changes never produce audit entries
pub const EXCLUDED_PATHS: [&str; 3] = ["/created", "/lastUpload", "/lastUpdate"];

/// A single JSON Patch operation with its typed value
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Insert a member or array element
    Add {
        /// Target pointer
        path: String,
        /// Inserted value
        value: Value,
    },
    /// Remove a member or array element
    Remove {
        /// Target pointer
        path: String,
    },
    /// Replace the value at a location
    Replace {
        /// Target pointer
        path: String,
        /// New value
        value: Value,
    },
}

impl PatchOp {
    /// Target pointer
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }

    /// Operation kind
    pub fn op(&self) -> Op {
        match self {
            PatchOp::Add { .. } => Op::Add,
            PatchOp::Remove { .. } => Op::Remove,
            PatchOp::Replace { .. } => Op::Replace,
        }
    }

    /// Convert to the stored changeset form
    pub fn to_field_op(&self) -> FieldOp {
        match self {
            PatchOp::Add { path, value } => FieldOp::new(Op::Add, path.clone(), Some(value)),
            PatchOp::Remove { path } => FieldOp::new(Op::Remove, path.clone(), None),
            PatchOp::Replace { path, value } => {
                FieldOp::new(Op::Replace, path.clone(), Some(value))
            }
        }
    }
}

// ============================================================================
// Diff
// ============================================================================

/// Generate the patch that transforms `src` into `dst`
///
/// Deterministic and side-effect free; equal inputs yield an empty patch.
pub fn diff(src: &Value, dst: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    let mut path = Vec::new();
    diff_at(&mut ops, &mut path, src, dst);
    ops
}

fn diff_at(ops: &mut Vec<PatchOp>, path: &mut Vec<String>, src: &Value, dst: &Value) {
    if src == dst {
        return;
    }
    match (src, dst) {
        (Value::Object(s), Value::Object(d)) => diff_obj(ops, path, s, d),
        (Value::Array(s), Value::Array(d)) => diff_arr(ops, path, s, d),
        _ => ops.push(PatchOp::Replace {
            path: format_pointer(path),
            value: dst.clone(),
        }),
    }
}

fn diff_obj(
    ops: &mut Vec<PatchOp>,
    path: &mut Vec<String>,
    src: &Map<String, Value>,
    dst: &Map<String, Value>,
) {
    for key in src.keys() {
        if !dst.contains_key(key) {
            path.push(key.clone());
            ops.push(PatchOp::Remove {
                path: format_pointer(path),
            });
            path.pop();
        }
    }
    for (key, dst_val) in dst {
        path.push(key.clone());
        match src.get(key) {
            None => ops.push(PatchOp::Add {
                path: format_pointer(path),
                value: dst_val.clone(),
            }),
            Some(src_val) => diff_at(ops, path, src_val, dst_val),
        }
        path.pop();
    }
}

fn diff_arr(ops: &mut Vec<PatchOp>, path: &mut Vec<String>, src: &[Value], dst: &[Value]) {
    // `pos` is the index in the array as already patched; after each gap the
    // prefix [..pos] equals the matching prefix of `dst`.
    let anchors = common_subsequence(src, dst);
    let mut pos = 0usize;
    let (mut i, mut j) = (0usize, 0usize);

    for (ai, aj) in anchors
        .into_iter()
        .chain(std::iter::once((src.len(), dst.len())))
    {
        let removed = ai - i;
        let added = aj - j;
        let paired = removed.min(added);

        for k in 0..paired {
            path.push(pos.to_string());
            diff_at(ops, path, &src[i + k], &dst[j + k]);
            path.pop();
            pos += 1;
        }
        for _ in paired..removed {
            path.push(pos.to_string());
            ops.push(PatchOp::Remove {
                path: format_pointer(path),
            });
            path.pop();
        }
        for k in paired..added {
            path.push(pos.to_string());
            ops.push(PatchOp::Add {
                path: format_pointer(path),
                value: dst[j + k].clone(),
            });
            path.pop();
            pos += 1;
        }

        // Step over the anchor itself
        pos += 1;
        i = ai + 1;
        j = aj + 1;
    }
}

/// Largest LCS table built for the unmatched middle of two arrays
///
/// Above this the middle is paired by position instead, which still yields a
/// correct patch, only a longer one.
const MAX_LCS_CELLS: usize = 1 << 22;

/// Index pairs of a common subsequence, in increasing order
///
/// Equal leading and trailing elements are matched directly; the table-based
/// LCS only runs on what is left in between.
fn common_subsequence(src: &[Value], dst: &[Value]) -> Vec<(usize, usize)> {
    let prefix = src.iter().zip(dst).take_while(|(a, b)| a == b).count();
    let suffix = src[prefix..]
        .iter()
        .rev()
        .zip(dst[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let src_mid = &src[prefix..src.len() - suffix];
    let dst_mid = &dst[prefix..dst.len() - suffix];

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|k| (k, k)).collect();
    if src_mid.len().saturating_mul(dst_mid.len()) <= MAX_LCS_CELLS {
        pairs.extend(
            lcs_pairs(src_mid, dst_mid)
                .into_iter()
                .map(|(i, j)| (i + prefix, j + prefix)),
        );
    }
    let (src_tail, dst_tail) = (src.len() - suffix, dst.len() - suffix);
    pairs.extend((0..suffix).map(|k| (src_tail + k, dst_tail + k)));
    pairs
}

/// Index pairs of a longest common subsequence
fn lcs_pairs(src: &[Value], dst: &[Value]) -> Vec<(usize, usize)> {
    let (n, m) = (src.len(), dst.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }

    // lengths[i][j] = LCS length of src[i..] and dst[j..]
    let width = m + 1;
    let mut lengths = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if src[i] == dst[j] {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(lengths[0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if src[i] == dst[j] {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

// ============================================================================
// Apply
// ============================================================================

/// Apply a patch in place
///
/// Used to replay history and to check diff output; stops at the first
/// operation that does not fit the document.
pub fn apply_patch(doc: &mut Value, ops: &[PatchOp]) -> Result<()> {
    for op in ops {
        apply_op(doc, op)?;
    }
    Ok(())
}

fn apply_op(doc: &mut Value, op: &PatchOp) -> Result<()> {
    let mut components = parse_pointer(op.path())?;
    let last = match components.pop() {
        Some(last) => last,
        None => {
            return match op {
                PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                    *doc = value.clone();
                    Ok(())
                }
                PatchOp::Remove { .. } => Err(Error::Patch("cannot remove the root".to_string())),
            };
        }
    };

    let mut parent = &mut *doc;
    for component in &components {
        parent = match parent {
            Value::Object(map) => map.get_mut(component.as_str()),
            Value::Array(items) => array_index(component, items.len())
                .ok()
                .and_then(move |idx| items.get_mut(idx)),
            _ => None,
        }
        .ok_or_else(|| Error::Patch(format!("path '{}' does not exist", op.path())))?;
    }

    match (parent, op) {
        (Value::Object(map), PatchOp::Add { value, .. }) => {
            map.insert(last, value.clone());
        }
        (Value::Object(map), PatchOp::Replace { value, .. }) => match map.get_mut(&last) {
            Some(slot) => *slot = value.clone(),
            None => return Err(missing(op)),
        },
        (Value::Object(map), PatchOp::Remove { .. }) => {
            if map.remove(&last).is_none() {
                return Err(missing(op));
            }
        }
        (Value::Array(items), PatchOp::Add { value, .. }) => {
            let idx = if last == "-" {
                items.len()
            } else {
                array_index(&last, items.len() + 1)?
            };
            items.insert(idx, value.clone());
        }
        (Value::Array(items), PatchOp::Replace { value, .. }) => {
            let idx = array_index(&last, items.len())?;
            items[idx] = value.clone();
        }
        (Value::Array(items), PatchOp::Remove { .. }) => {
            let idx = array_index(&last, items.len())?;
            items.remove(idx);
        }
        _ => {
            return Err(Error::Patch(format!(
                "parent of '{}' is not a container",
                op.path()
            )))
        }
    }
    Ok(())
}

fn array_index(component: &str, bound: usize) -> Result<usize> {
    match component.parse::<usize>() {
        Ok(idx) if idx < bound => Ok(idx),
        _ => Err(Error::Patch(format!(
            "invalid array index '{}' (bound {})",
            component, bound
        ))),
    }
}

fn missing(op: &PatchOp) -> Error {
    Error::Patch(format!("path '{}' does not exist", op.path()))
}

// ============================================================================
// DiffEngine
// ============================================================================

/// Result of diffing a submission against the stored state
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentDiff {
    /// Sanitized submitted state, ready to be stored
    pub state: Value,
    /// Field operations with excluded paths removed
    pub fields: Vec<FieldOp>,
}

impl DocumentDiff {
    /// True when nothing but excluded fields changed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Noise-filtered differ used by the write path
#[derive(Debug, Clone)]
pub struct DiffEngine {
    excluded: HashSet<String>,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::with_excluded(EXCLUDED_PATHS)
    }
}

impl DiffEngine {
    /// Engine excluding the bookkeeping paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a custom excluded-path set
    pub fn with_excluded<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DiffEngine {
            excluded: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether operations on `path` are dropped
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.contains(path)
    }

    /// Diff a submitted state against the previous one
    ///
    /// An absent previous state is treated as the empty object. The
    /// submission is sanitized exactly once, before diffing.
    pub fn compute(&self, previous: Option<&Value>, submitted: Value) -> DocumentDiff {
        let mut state = submitted;
        sanitize(&mut state);

        let empty = Value::Object(Map::new());
        let fields = diff(previous.unwrap_or(&empty), &state)
            .iter()
            .filter(|op| !self.is_excluded(op.path()))
            .map(PatchOp::to_field_op)
            .collect();

        DocumentDiff { state, fields }
    }
}
