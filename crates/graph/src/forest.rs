//! Span forest construction.
//!
//! A file's spans are turned into a containment forest with a single sorted
//! sweep: spans are ordered by body start ascending and body end descending
//! (outer spans before the spans they enclose), then walked with a stack of
//! open nodes.

use context_symbol_index::{RelativeLocation, SourceSpan};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One span and the spans it directly encloses, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanTreeNode {
    pub span: SourceSpan,
    pub children: Vec<SpanTreeNode>,
}

/// file URI → root nodes of that file
pub type SpanForest = BTreeMap<String, Vec<SpanTreeNode>>;

impl SpanTreeNode {
    pub const fn leaf(span: SourceSpan) -> Self {
        Self {
            span,
            children: Vec::new(),
        }
    }

    /// Pre-order walk over this node and all its descendants
    pub fn iter(&self) -> SpanTreeIter<'_> {
        SpanTreeIter { stack: vec![self] }
    }

    /// Number of spans in this subtree
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

pub struct SpanTreeIter<'a> {
    stack: Vec<&'a SpanTreeNode>,
}

impl<'a> Iterator for SpanTreeIter<'a> {
    type Item = &'a SourceSpan;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(&node.span)
    }
}

/// Every span of a file's forest, pre-order
pub fn forest_spans(roots: &[SpanTreeNode]) -> impl Iterator<Item = &SourceSpan> {
    roots.iter().flat_map(SpanTreeNode::iter)
}

/// Proper lexical nesting of `inner` inside `outer`.
///
/// Identical bodies never nest. A single-line `outer` only holds bare names
/// and variables; anything else on that line is a sibling, not a child.
#[must_use]
pub fn within(inner: &SourceSpan, outer: &SourceSpan) -> bool {
    location_within(&inner.body_location, &outer.body_location, inner.is_bare_name())
}

/// Coordinate form of [`within`]; `inner_is_bare` marks a bare name or
/// variable, the only things a single-line range may hold.
#[must_use]
pub fn location_within(inner: &RelativeLocation, outer: &RelativeLocation, inner_is_bare: bool) -> bool {
    if inner == outer {
        return false;
    }
    if outer.is_single_line() && !inner_is_bare {
        return false;
    }
    outer.encloses(inner)
}

/// Build the forest of one file, assigning every span's `parent_id`.
///
/// Deterministic for a given set of spans: the input is ordered by id
/// before the (stable) geometric sort, so iteration order of the caller
/// never leaks into the tree shape.
pub fn build_file_forest(spans: impl IntoIterator<Item = SourceSpan>) -> Vec<SpanTreeNode> {
    let mut spans: Vec<SourceSpan> = spans.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    spans.sort_by(|a, b| {
        let (a, b) = (&a.body_location, &b.body_location);
        a.start().cmp(&b.start()).then_with(|| b.end().cmp(&a.end()))
    });

    let mut parents: Vec<Option<usize>> = vec![None; spans.len()];
    let mut stack: Vec<usize> = Vec::new();
    for current in 0..spans.len() {
        while let Some(&top) = stack.last() {
            if within(&spans[current], &spans[top]) {
                break;
            }
            stack.pop();
        }
        parents[current] = stack.last().copied();
        stack.push(current);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(idx),
            None => roots.push(idx),
        }
    }

    for (idx, parent) in parents.iter().enumerate() {
        spans[idx].parent_id = parent.map(|p| spans[p].id.clone());
    }

    let mut slots: Vec<Option<SourceSpan>> = spans.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|root| assemble(root, &children, &mut slots))
        .collect()
}

fn assemble(
    idx: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<SourceSpan>],
) -> Option<SpanTreeNode> {
    let span = slots.get_mut(idx)?.take()?;
    let kids = children[idx]
        .iter()
        .filter_map(|&child| assemble(child, children, slots))
        .collect();
    Some(SpanTreeNode {
        span,
        children: kids,
    })
}

/// Build forests for every file of a span table
pub fn build_span_forest(source_spans: &BTreeMap<String, BTreeSet<SourceSpan>>) -> SpanForest {
    let forest: SpanForest = source_spans
        .iter()
        .map(|(file, spans)| (file.clone(), build_file_forest(spans.iter().cloned())))
        .collect();

    log::info!(
        "Built span forest: {} files, {} spans",
        forest.len(),
        forest.values().flat_map(|roots| roots.iter()).map(SpanTreeNode::len).sum::<usize>()
    );
    forest
}

/// Innermost span of a file forest that properly contains `target`.
///
/// Ties on extent go to the deeper node, then to the smaller id, so the
/// answer does not depend on input order.
#[must_use]
pub fn find_innermost_container<'a>(
    roots: &'a [SpanTreeNode],
    target: &SourceSpan,
) -> Option<&'a SourceSpan> {
    innermost_container_where(roots, target, |_| true)
}

/// [`find_innermost_container`] restricted to candidates accepted by `accept`
pub fn innermost_container_where<'a>(
    roots: &'a [SpanTreeNode],
    target: &SourceSpan,
    accept: impl Fn(&SourceSpan) -> bool,
) -> Option<&'a SourceSpan> {
    let mut best: Option<(&SourceSpan, usize)> = None;
    let mut stack: Vec<(&SpanTreeNode, usize)> = roots.iter().map(|root| (root, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        let candidate = &node.span;
        if candidate.id == target.id || !accept(candidate) || !within(target, candidate) {
            continue;
        }
        let better = best.map_or(true, |(current, current_depth)| {
            candidate
                .body_location
                .extent()
                .cmp(&current.body_location.extent())
                .then_with(|| current_depth.cmp(&depth))
                .then_with(|| candidate.id.cmp(&current.id))
                .is_lt()
        });
        if better {
            best = Some((candidate, depth));
        }
    }
    best.map(|(span, _)| span)
}
