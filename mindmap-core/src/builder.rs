//! Mind-map construction and layout.
//!
//! `build` is a pure function of `(ExtractionState, ExpansionState)`: the
//! node/edge graph is always recomputed from scratch, never patched. What
//! makes incremental rendering work is id stability — `root`,
//! `context-{label}` and `point-{index}` are the same across rebuilds, so
//! the rendering surface can diff and the expansion state stays meaningful
//! as new snapshots arrive.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::extraction::ExtractionState;

/// Fixed id of the root node.
pub const ROOT_ID: &str = "root";

/// Horizontal distance between depth columns.
pub const COLUMN_WIDTH: f64 = 200.0;
/// Vertical distance between emitted rows.
pub const ROW_HEIGHT: f64 = 100.0;

/// A node in the logical mind-map tree (depth exactly 3 when non-empty:
/// root, context groups, leaves).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first lookup by id.
    pub fn find(&self, id: &str) -> Option<&MindMapNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// A node placed by the layout pass. Collapsed nodes still appear (with
/// `has_children` set so the surface can draw an affordance); their hidden
/// descendants do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Directed parent-to-child edge, id `{parent}-{child}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// The positioned output handed to the rendering surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MindMapGraph {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<MindMapEdge>,
}

impl MindMapGraph {
    /// Empty means "show the empty-state placeholder", never an error.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Per-node open/closed flags.
///
/// Stored as the set of *collapsed* ids: every id starts expanded, only an
/// explicit toggle closes it, and ids first appearing in a later cumulative
/// snapshot come up expanded with no extra bookkeeping. A collapsed id that
/// vanishes from the tree (new upload) is simply never consulted again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    collapsed: HashSet<String>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        !self.collapsed.contains(node_id)
    }

    /// Flip exactly one node's flag, leaving descendants' own flags alone.
    /// Self-inverse: toggling twice returns the original state.
    pub fn toggle(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        if !next.collapsed.remove(node_id) {
            next.collapsed.insert(node_id.to_string());
        }
        next
    }
}

/// Assemble the logical tree from an extraction state.
///
/// Returns `None` for an extraction with zero key points. Group nodes are
/// created in first-seen order and deduplicated by context label; a key
/// point with no content still yields a leaf so that `point-{index}` ids
/// stay aligned with the underlying sequence.
pub fn assemble(state: &ExtractionState) -> Option<MindMapNode> {
    if state.is_empty() {
        return None;
    }

    let mut root = MindMapNode::new(ROOT_ID, state.root_label());
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for (index, kp) in state.snapshot.key_points.iter().enumerate() {
        let context = kp.context_label();
        let slot = match group_index.get(context) {
            Some(&slot) => slot,
            None => {
                root.children
                    .push(MindMapNode::new(format!("context-{context}"), context));
                let slot = root.children.len() - 1;
                group_index.insert(context.to_string(), slot);
                slot
            }
        };
        root.children[slot].children.push(MindMapNode::new(
            format!("point-{index}"),
            state.point_label(kp),
        ));
    }

    Some(root)
}

/// Position the visible part of a tree.
///
/// x is a function of depth alone; y is a monotonically increasing row
/// counter advanced once per emitted node, so collapsing a group both hides
/// its subtree and compacts the rows of everything below it.
pub fn layout(tree: &MindMapNode, expansion: &ExpansionState) -> MindMapGraph {
    let mut graph = MindMapGraph::default();
    let mut row = 0usize;
    place(tree, None, 0, &mut row, expansion, &mut graph);
    graph
}

fn place(
    node: &MindMapNode,
    parent_id: Option<&str>,
    depth: usize,
    row: &mut usize,
    expansion: &ExpansionState,
    graph: &mut MindMapGraph,
) {
    let expanded = expansion.is_expanded(&node.id);
    graph.nodes.push(PositionedNode {
        id: node.id.clone(),
        label: node.label.clone(),
        x: depth as f64 * COLUMN_WIDTH,
        y: *row as f64 * ROW_HEIGHT,
        depth,
        has_children: node.has_children(),
        expanded,
    });
    *row += 1;

    if let Some(parent_id) = parent_id {
        graph.edges.push(MindMapEdge {
            id: format!("{parent_id}-{}", node.id),
            source: parent_id.to_string(),
            target: node.id.clone(),
        });
    }

    if expanded {
        for child in &node.children {
            place(child, Some(&node.id), depth + 1, row, expansion, graph);
        }
    }
}

/// Derive the positioned graph straight from an extraction state.
pub fn build(state: &ExtractionState, expansion: &ExpansionState) -> MindMapGraph {
    match assemble(state) {
        Some(tree) => layout(&tree, expansion),
        None => MindMapGraph::default(),
    }
}

/// What a click produced: the clicked node's data for the side panel, plus
/// the (possibly unchanged) expansion state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickOutcome {
    pub selected: MindMapNode,
    pub expansion: ExpansionState,
}

/// Click contract: every click reports the node's data upward; only nodes
/// with children additionally toggle. Unknown ids are ignored.
pub fn dispatch_click(
    tree: &MindMapNode,
    expansion: &ExpansionState,
    node_id: &str,
) -> Option<ClickOutcome> {
    let node = tree.find(node_id)?;
    let next = if node.has_children() {
        expansion.toggle(node_id)
    } else {
        expansion.clone()
    };
    Some(ClickOutcome {
        selected: node.clone(),
        expansion: next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ExtractionSnapshot, ExtractionState, KeyPoint, LOADING_LABEL};

    fn report_state() -> ExtractionState {
        ExtractionState::complete(ExtractionSnapshot {
            title: Some("Report".into()),
            key_points: vec![
                KeyPoint::with_context("A", "Intro"),
                KeyPoint::with_context("B", "Intro"),
                KeyPoint::new("C"),
            ],
        })
    }

    fn ids(graph: &MindMapGraph) -> Vec<&str> {
        graph.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn scenario_a_grouping_and_ids() {
        let tree = assemble(&report_state()).unwrap();
        assert_eq!(tree.id, ROOT_ID);
        assert_eq!(tree.label, "Report");
        assert_eq!(tree.children.len(), 2);

        let intro = &tree.children[0];
        assert_eq!(intro.id, "context-Intro");
        assert_eq!(
            intro.children.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            ["point-0", "point-1"]
        );

        let general = &tree.children[1];
        assert_eq!(general.id, "context-General");
        assert_eq!(general.children[0].id, "point-2");
        assert_eq!(general.children[0].label, "C");

        let graph = layout(&tree, &ExpansionState::new());
        let edge_ids: Vec<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            edge_ids,
            [
                "root-context-Intro",
                "context-Intro-point-0",
                "context-Intro-point-1",
                "root-context-General",
                "context-General-point-2",
            ]
        );
    }

    #[test]
    fn scenario_b_empty_extraction_builds_empty_graph() {
        let state = ExtractionState::streaming(ExtractionSnapshot {
            title: Some("Doc".into()),
            key_points: vec![],
        });
        assert!(assemble(&state).is_none());
        assert!(build(&state, &ExpansionState::new()).is_empty());
    }

    #[test]
    fn scenario_c_collapse_hides_subtree_and_compacts_rows() {
        let state = report_state();
        let expansion = ExpansionState::new().toggle("context-Intro");
        let graph = build(&state, &expansion);

        assert_eq!(
            ids(&graph),
            ["root", "context-Intro", "context-General", "point-2"]
        );

        let intro = graph.nodes.iter().find(|n| n.id == "context-Intro").unwrap();
        assert!(intro.has_children);
        assert!(!intro.expanded);

        // point-2 moved up into the rows freed by the hidden leaves
        let point2 = graph.nodes.iter().find(|n| n.id == "point-2").unwrap();
        assert_eq!(point2.y, 3.0 * ROW_HEIGHT);
        assert_eq!(point2.x, 2.0 * COLUMN_WIDTH);

        // no edges into the hidden subtree
        assert!(graph.edges.iter().all(|e| e.target != "point-0"));
    }

    #[test]
    fn scenario_d_partial_snapshot_uses_loading_placeholders() {
        let state = ExtractionState::streaming(ExtractionSnapshot {
            title: None,
            key_points: vec![KeyPoint::new("A")],
        });
        let graph = build(&state, &ExpansionState::new());
        assert_eq!(graph.nodes[0].label, LOADING_LABEL);
        assert_eq!(graph.nodes[1].id, "context-General");
        assert_eq!(graph.nodes[2].label, "A");
    }

    #[test]
    fn node_count_formula_holds() {
        // 3 points over 2 distinct contexts (Intro + implicit General)
        let state = report_state();
        let expanded = build(&state, &ExpansionState::new());
        assert_eq!(expanded.nodes.len(), 1 + 2 + 3);
        assert_eq!(expanded.edges.len(), 2 + 3);

        let all_groups_collapsed = ExpansionState::new()
            .toggle("context-Intro")
            .toggle("context-General");
        let collapsed = build(&state, &all_groups_collapsed);
        assert_eq!(collapsed.nodes.len(), 1 + 2);
    }

    #[test]
    fn leaf_ids_follow_sequence_order_across_contexts() {
        let state = ExtractionState::complete(ExtractionSnapshot {
            title: Some("Doc".into()),
            key_points: vec![
                KeyPoint::with_context("A", "X"),
                KeyPoint::with_context("B", "Y"),
                KeyPoint::with_context("C", "X"),
            ],
        });
        let tree = assemble(&state).unwrap();
        let x = tree.find("context-X").unwrap();
        assert_eq!(
            x.children.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            ["point-0", "point-2"]
        );
        assert_eq!(tree.find("context-Y").unwrap().children[0].id, "point-1");
    }

    #[test]
    fn contentless_point_still_occupies_its_index() {
        let state = ExtractionState::streaming(ExtractionSnapshot {
            title: Some("Doc".into()),
            key_points: vec![KeyPoint::new("A"), KeyPoint::default(), KeyPoint::new("C")],
        });
        let tree = assemble(&state).unwrap();
        let general = tree.find("context-General").unwrap();
        assert_eq!(general.children.len(), 3);
        assert_eq!(general.children[1].id, "point-1");
        assert_eq!(general.children[1].label, LOADING_LABEL);
        assert_eq!(general.children[2].id, "point-2");
    }

    #[test]
    fn toggle_is_self_inverse() {
        let expansion = ExpansionState::new().toggle("context-Intro");
        let back = expansion.toggle("context-Intro").toggle("context-Intro");
        assert_eq!(expansion, back);
        assert_eq!(
            ExpansionState::new(),
            ExpansionState::new().toggle("x").toggle("x")
        );
    }

    #[test]
    fn build_is_idempotent() {
        let state = report_state();
        let expansion = ExpansionState::new().toggle("context-Intro");
        assert_eq!(build(&state, &expansion), build(&state, &expansion));
    }

    #[test]
    fn collapsed_descendant_state_survives_parent_collapse() {
        let state = report_state();
        // collapse a group, then the root, then reopen the root
        let expansion = ExpansionState::new().toggle("context-Intro");
        let expansion = expansion.toggle(ROOT_ID);

        let hidden = build(&state, &expansion);
        assert_eq!(ids(&hidden), ["root"]);

        let expansion = expansion.toggle(ROOT_ID);
        let graph = build(&state, &expansion);
        // Intro resumes its own collapsed state rather than being forced open
        assert_eq!(
            ids(&graph),
            ["root", "context-Intro", "context-General", "point-2"]
        );
    }

    #[test]
    fn click_on_group_selects_and_toggles() {
        let tree = assemble(&report_state()).unwrap();
        let expansion = ExpansionState::new();
        let outcome = dispatch_click(&tree, &expansion, "context-Intro").unwrap();
        assert_eq!(outcome.selected.label, "Intro");
        assert!(!outcome.expansion.is_expanded("context-Intro"));
    }

    #[test]
    fn click_on_leaf_selects_without_toggling() {
        let tree = assemble(&report_state()).unwrap();
        let expansion = ExpansionState::new();
        let outcome = dispatch_click(&tree, &expansion, "point-0").unwrap();
        assert_eq!(outcome.selected.label, "A");
        assert_eq!(outcome.expansion, expansion);
    }

    #[test]
    fn click_on_unknown_id_is_ignored() {
        let tree = assemble(&report_state()).unwrap();
        assert!(dispatch_click(&tree, &ExpansionState::new(), "nope").is_none());
    }
}
