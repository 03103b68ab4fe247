//! Joining curves whose ends meet into chains and loops.
//!
//! End points closer than the tolerance are merged into graph nodes (a
//! spatial hash finds candidate pairs, union-find merges them) and every
//! curve becomes an edge between its start and end node. Components are
//! walked greedily: at a node with several unused edges the curve with the
//! smallest input index is taken.

use std::collections::HashMap;

use curvekit_core::{KernelError, Result};
use curvekit_geometry::{AnyCurve, Curve, PolyCurve};
use curvekit_math::Point3;
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

new_key_type! {
    pub struct NodeId;
    pub struct EdgeId;
}

#[derive(Debug, Clone)]
pub struct Node {
    pub position: Point3,
    pub edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Index of the curve in the input slice.
    pub curve: usize,
    pub start: NodeId,
    pub end: NodeId,
}

/// End-point connectivity of a set of curves.
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    pub nodes: SlotMap<NodeId, Node>,
    pub edges: SlotMap<EdgeId, Edge>,
    /// Edge of each input curve, by input index.
    pub curve_edges: Vec<EdgeId>,
}

/// One output of [`join_curves`].
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCurve {
    pub curve: AnyCurve,
    /// Input index of each piece in chain order, and whether it was reversed.
    pub sources: Vec<(usize, bool)>,
    pub closed: bool,
}

impl JoinGraph {
    /// Build the graph, merging end points within `tolerance`.
    pub fn build(curves: &[AnyCurve], tolerance: f64) -> Self {
        let ends: Vec<Point3> = curves
            .iter()
            .flat_map(|c| [c.start_point(), c.end_point()])
            .collect();

        let mut sets = DisjointSets::new(ends.len());
        // Cells no finer than the coordinate resolution keep keys in range.
        let scale = ends.iter().fold(0.0f64, |m, p| m.max(p.abs().max_element()));
        let cell = tolerance.max(scale * 4.0 * f64::EPSILON).max(f64::MIN_POSITIVE);
        let key = |p: Point3| {
            (
                (p.x / cell).floor() as i64,
                (p.y / cell).floor() as i64,
                (p.z / cell).floor() as i64,
            )
        };
        let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
        for (i, &p) in ends.iter().enumerate() {
            let (x, y, z) = key(p);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let neighbour = (x.saturating_add(dx), y.saturating_add(dy), z.saturating_add(dz));
                        let Some(bucket) = grid.get(&neighbour) else {
                            continue;
                        };
                        for &j in bucket {
                            if (ends[j] - p).length() <= tolerance {
                                sets.union(i, j);
                            }
                        }
                    }
                }
            }
            grid.entry((x, y, z)).or_default().push(i);
        }

        let mut graph = Self::default();
        let mut node_of_root: HashMap<usize, NodeId> = HashMap::new();
        let mut node_for = |graph: &mut Self, sets: &mut DisjointSets, i: usize| {
            let root = sets.find(i);
            *node_of_root.entry(root).or_insert_with(|| {
                graph.nodes.insert(Node {
                    position: ends[root],
                    edges: Vec::new(),
                })
            })
        };
        for curve in 0..curves.len() {
            let start = node_for(&mut graph, &mut sets, 2 * curve);
            let end = node_for(&mut graph, &mut sets, 2 * curve + 1);
            let edge = graph.edges.insert(Edge { curve, start, end });
            graph.nodes[start].edges.push(edge);
            if end != start {
                graph.nodes[end].edges.push(edge);
            }
            graph.curve_edges.push(edge);
        }
        graph
    }

    /// Unused edge with the smallest curve index that continues a walk
    /// through `node`. Returns the edge and whether it runs backward.
    fn next_edge(
        &self,
        node: NodeId,
        used: &[bool],
        leaving: bool,
        preserve_direction: bool,
    ) -> Option<(EdgeId, bool)> {
        self.nodes[node]
            .edges
            .iter()
            .filter(|&&e| !used[self.edges[e].curve])
            .filter_map(|&e| {
                let edge = self.edges[e];
                let (natural, flipped) = if leaving {
                    (edge.start, edge.end)
                } else {
                    (edge.end, edge.start)
                };
                if natural == node {
                    Some((e, false))
                } else if !preserve_direction && flipped == node {
                    Some((e, true))
                } else {
                    None
                }
            })
            .min_by_key(|&(e, _)| self.edges[e].curve)
    }
}

/// Join `curves` into as few chains as their end points allow.
///
/// Each output lists the input pieces it was built from. Pieces are reversed
/// to chain only when `preserve_direction` is false. A chain of one input
/// returns that curve unchanged.
pub fn join_curves(
    curves: &[AnyCurve],
    tolerance: f64,
    preserve_direction: bool,
) -> Result<Vec<JoinedCurve>> {
    if !(tolerance >= 0.0 && tolerance.is_finite()) {
        return Err(KernelError::InvalidOperation(format!(
            "join tolerance {tolerance} must be non-negative"
        )));
    }
    let graph = JoinGraph::build(curves, tolerance);
    let mut used = vec![false; curves.len()];
    let mut joined = Vec::new();

    for first in 0..curves.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let edge = graph.edges[graph.curve_edges[first]];
        let mut chain: Vec<(usize, bool)> = vec![(first, false)];
        let (head, mut tail) = (edge.start, edge.end);
        let mut closed = head == tail;

        while !closed {
            let Some((e, reversed)) = graph.next_edge(tail, &used, true, preserve_direction) else {
                break;
            };
            let edge = graph.edges[e];
            used[edge.curve] = true;
            chain.push((edge.curve, reversed));
            tail = if reversed { edge.start } else { edge.end };
            closed = tail == head;
        }

        let mut head = head;
        while !closed {
            let Some((e, reversed)) = graph.next_edge(head, &used, false, preserve_direction) else {
                break;
            };
            let edge = graph.edges[e];
            used[edge.curve] = true;
            chain.insert(0, (edge.curve, reversed));
            head = if reversed { edge.end } else { edge.start };
            closed = head == tail;
        }

        joined.push(assemble(curves, chain, closed)?);
    }
    debug!(inputs = curves.len(), outputs = joined.len(), "joined curves");
    Ok(joined)
}

fn assemble(curves: &[AnyCurve], sources: Vec<(usize, bool)>, closed: bool) -> Result<JoinedCurve> {
    let piece = |&(index, reversed): &(usize, bool)| {
        let mut c = curves[index].clone();
        if reversed {
            c.reverse();
        }
        c
    };

    if let [only] = sources.as_slice() {
        return Ok(JoinedCurve {
            curve: piece(only),
            sources,
            closed,
        });
    }

    let mut poly = PolyCurve::new(piece(&sources[0]));
    for source in &sources[1..] {
        poly.append_and_match(piece(source))?;
    }
    if closed {
        let start = poly.start_point();
        poly.set_end_point(start);
    }
    Ok(JoinedCurve {
        curve: poly.into(),
        sources,
        closed,
    })
}

/// Union-find with path halving.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merge two sets; the smaller root survives.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_geometry::NurbsCurve;
    use curvekit_math::{DVec3, Plane};

    fn line(a: [f64; 2], b: [f64; 2]) -> AnyCurve {
        NurbsCurve::line(DVec3::new(a[0], a[1], 0.0), DVec3::new(b[0], b[1], 0.0)).into()
    }

    #[test]
    fn test_graph_merges_close_ends() {
        let curves = vec![line([0.0, 0.0], [1.0, 0.0]), line([1.0 + 1e-9, 0.0], [2.0, 0.0])];
        let graph = JoinGraph::build(&curves, 1e-6);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        let e0 = graph.edges[graph.curve_edges[0]];
        let e1 = graph.edges[graph.curve_edges[1]];
        assert_eq!(e0.end, e1.start);
    }

    #[test]
    fn test_join_square_out_of_order() {
        let curves = vec![
            line([0.0, 0.0], [1.0, 0.0]),
            line([1.0, 1.0], [0.0, 1.0]),
            line([1.0, 0.0], [1.0, 1.0]),
            line([0.0, 0.0], [0.0, 1.0]),
        ];
        let joined = join_curves(&curves, 1e-6, false).unwrap();
        assert_eq!(joined.len(), 1);
        let square = &joined[0];
        assert!(square.closed);
        assert!(square.curve.is_closed());
        assert_eq!(square.sources, vec![(0, false), (2, false), (1, false), (3, true)]);
    }

    #[test]
    fn test_preserve_direction_splits_chain() {
        let curves = vec![line([0.0, 0.0], [1.0, 0.0]), line([2.0, 0.0], [1.0, 0.0])];
        assert_eq!(join_curves(&curves, 1e-6, true).unwrap().len(), 2);
        let joined = join_curves(&curves, 1e-6, false).unwrap();
        assert_eq!(joined.len(), 1);
        assert!((joined[0].curve.end_point() - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_backward_walk_extends_head() {
        let curves = vec![line([1.0, 0.0], [2.0, 0.0]), line([0.0, 0.0], [1.0, 0.0])];
        let joined = join_curves(&curves, 1e-6, true).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].sources, vec![(1, false), (0, false)]);
        assert!((joined[0].curve.start_point() - DVec3::ZERO).length() < 1e-12);
    }

    #[test]
    fn test_branch_takes_smallest_index() {
        // Three curves leave the node at (1, 0).
        let curves = vec![
            line([0.0, 0.0], [1.0, 0.0]),
            line([1.0, 0.0], [1.0, 5.0]),
            line([1.0, 0.0], [2.0, 0.0]),
        ];
        let joined = join_curves(&curves, 1e-6, true).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].sources, vec![(0, false), (1, false)]);
        assert_eq!(joined[1].sources, vec![(2, false)]);
    }

    #[test]
    fn test_single_closed_curve_is_unchanged() {
        let circle: AnyCurve = NurbsCurve::circle(&Plane::xy(), 1.0).unwrap().into();
        let joined = join_curves(std::slice::from_ref(&circle), 1e-6, false).unwrap();
        assert_eq!(joined.len(), 1);
        assert!(joined[0].closed);
        assert_eq!(joined[0].curve, circle);
    }

    #[test]
    fn test_zero_tolerance_and_far_coordinates() {
        let near = [line([0.0, 0.0], [1.0, 0.0]), line([1.0, 0.0], [2.0, 0.0])];
        let joined = join_curves(&near, 0.0, false).unwrap();
        assert_eq!(joined.iter().map(|j| j.sources.len()).sum::<usize>(), 2);

        let far = [
            line([2e7, 0.0], [2e7 + 1.0, 0.0]),
            line([2e7 + 1.0, 0.0], [2e7 + 1.0, 1.0]),
        ];
        let tight = join_curves(&far, 1e-12, false).unwrap();
        assert_eq!(tight.iter().map(|j| j.sources.len()).sum::<usize>(), 2);
        let loose = join_curves(&far, 1e-6, false).unwrap();
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].sources, vec![(0, false), (1, false)]);
    }

    #[test]
    fn test_empty_and_bad_tolerance() {
        assert!(join_curves(&[], 1e-6, false).unwrap().is_empty());
        assert!(join_curves(&[], f64::NAN, false).is_err());
    }
}
