//! Node storage and ray traversal shared by the BVH and the k-d tree.

use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::id_arena::{Id, IdArena};
use crate::interaction::Intersection;
use crate::primitive::Primitive;
use crate::Float;
use crate::math::INFINITY;
use smallvec::SmallVec;

pub type NodeId = Id<AccelNode>;

/// The primitives a node refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePrims {
    /// `[start, start + len)` into the tree's (reordered) primitive array.
    Range { start: u32, len: u32 },
    /// Explicit indices into the tree's primitive array. A primitive may appear in several leaves.
    Indices(SmallVec<[u32; 4]>),
}

impl NodePrims {
    pub fn len(&self) -> usize {
        match self {
            NodePrims::Range { len, .. } => *len as usize,
            NodePrims::Indices(idx) => idx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<usize> {
        match self {
            NodePrims::Range { start, len } => (*start as usize..(*start + *len) as usize).collect(),
            NodePrims::Indices(idx) => idx.iter().map(|&i| i as usize).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Interior {
        left: NodeId,
        right: NodeId,
        axis: u8,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccelNode {
    pub bounds: Bounds3f,
    pub prims: NodePrims,
    pub kind: NodeKind,
}

impl AccelNode {
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Leaf => None,
            NodeKind::Interior { left, right, .. } => Some((left, right)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    /// Primitive references stored in leaves, duplicates included.
    pub leaf_prims: usize,
    pub max_depth: usize,
}

impl BuildStats {
    pub fn from_tree(nodes: &IdArena<AccelNode>, root: NodeId) -> Self {
        let mut stats = BuildStats::default();
        let mut stack = vec![(root, 0)];

        while let Some((id, depth)) = stack.pop() {
            let node = &nodes[id];
            stats.total_nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            match node.kind {
                NodeKind::Leaf => {
                    stats.leaf_nodes += 1;
                    stats.leaf_prims += node.prims.len();
                }
                NodeKind::Interior { left, right, .. } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }

        stats
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub prim_tests: usize,
}

struct Query<'q, 'a> {
    /// `None` for any-hit queries.
    isect: Option<&'q mut Intersection<'a>>,
    found: bool,
    stats: TraversalStats,
}

/// A built tree: the node arena, the primitives its leaves index into, and the query logic.
pub(crate) struct AccelTree<'p> {
    pub nodes: IdArena<AccelNode>,
    pub root: NodeId,
    pub prims: Vec<&'p dyn Primitive>,
    pub stats: BuildStats,

    /// Skip the farther child once the current hit lies strictly inside the nearer one.
    pub inside_early_exit: bool,
}

impl<'p> AccelTree<'p> {
    pub fn new(
        nodes: IdArena<AccelNode>,
        root: NodeId,
        prims: Vec<&'p dyn Primitive>,
        inside_early_exit: bool,
    ) -> Self {
        let stats = BuildStats::from_tree(&nodes, root);
        Self { nodes, root, prims, stats, inside_early_exit }
    }

    pub fn world_bound(&self) -> Bounds3f {
        self.nodes[self.root].bounds
    }

    pub fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        self.intersect_with_stats(ray, isect).0
    }

    pub fn intersect_with_stats<'a>(
        &'a self,
        ray: &mut Ray,
        isect: &mut Intersection<'a>,
    ) -> (bool, TraversalStats) {
        let mut query = Query { isect: Some(isect), found: false, stats: TraversalStats::default() };
        self.visit(self.root, ray, &mut query);
        (query.found, query.stats)
    }

    pub fn intersect_test(&self, ray: &Ray) -> bool {
        self.intersect_test_with_stats(ray).0
    }

    pub fn intersect_test_with_stats(&self, ray: &Ray) -> (bool, TraversalStats) {
        let mut ray = *ray;
        let mut query = Query { isect: None, found: false, stats: TraversalStats::default() };
        self.visit(self.root, &mut ray, &mut query);
        (query.found, query.stats)
    }

    fn entry_time(&self, id: NodeId, ray: &Ray) -> Float {
        self.nodes[id].bounds.intersect_p(ray).map_or(INFINITY, |(t0, _)| t0)
    }

    fn visit<'a>(&'a self, id: NodeId, ray: &mut Ray, q: &mut Query<'_, 'a>) {
        q.stats.nodes_visited += 1;
        let node = &self.nodes[id];

        let t_enter = match node.bounds.intersect_p(ray) {
            Some((t0, _)) => t0,
            None => return,
        };
        if let Some(ref isect) = q.isect {
            if isect.t < t_enter {
                return;
            }
        }

        match node.kind {
            NodeKind::Leaf => self.visit_leaf(node, ray, q),
            NodeKind::Interior { left, right, .. } => {
                let (near, far) = if self.entry_time(left, ray) < self.entry_time(right, ray) {
                    (left, right)
                } else {
                    (right, left)
                };

                self.visit(near, ray, q);
                if q.found && q.isect.is_none() {
                    return;
                }

                if self.inside_early_exit {
                    if let Some(ref isect) = q.isect {
                        if isect.is_hit() && self.nodes[near].bounds.inside_exclusive(isect.p) {
                            return;
                        }
                    }
                }

                self.visit(far, ray, q);
            }
        }
    }

    fn visit_leaf<'a>(&'a self, node: &AccelNode, ray: &mut Ray, q: &mut Query<'_, 'a>) {
        match node.prims {
            NodePrims::Range { start, len } => {
                for i in start as usize..(start + len) as usize {
                    if self.test_prim(i, ray, q) {
                        return;
                    }
                }
            }
            NodePrims::Indices(ref idx) => {
                for &i in idx {
                    if self.test_prim(i as usize, ray, q) {
                        return;
                    }
                }
            }
        }
    }

    /// Returns true when the traversal can stop.
    fn test_prim<'a>(&'a self, i: usize, ray: &mut Ray, q: &mut Query<'_, 'a>) -> bool {
        q.stats.prim_tests += 1;
        let prim: &'a dyn Primitive = self.prims[i];
        match q.isect.as_deref_mut() {
            Some(isect) => {
                if prim.intersect(ray, isect) {
                    q.found = true;
                }
                false
            }
            // any-hit: stop at the first one
            None => {
                q.found = prim.intersect_test(ray);
                q.found
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::sphere::Sphere;
    use crate::primitive::MaterialId;

    /// Root with two single-sphere leaves: the far sphere on the left, the near one on the right.
    fn two_leaf_tree<'p>(near: &'p Sphere, far: &'p Sphere, early_exit: bool) -> AccelTree<'p> {
        let mut nodes = IdArena::new();
        let left = nodes.insert(AccelNode {
            bounds: far.world_bound(),
            prims: NodePrims::Range { start: 0, len: 1 },
            kind: NodeKind::Leaf,
        });
        let right = nodes.insert(AccelNode {
            bounds: near.world_bound(),
            prims: NodePrims::Indices(smallvec::smallvec![1]),
            kind: NodeKind::Leaf,
        });
        let root = nodes.insert(AccelNode {
            bounds: far.world_bound().join(&near.world_bound()),
            prims: NodePrims::Range { start: 0, len: 2 },
            kind: NodeKind::Interior { left, right, axis: 2 },
        });
        AccelTree::new(nodes, root, vec![far, near], early_exit)
    }

    #[test]
    fn test_visits_near_child_first() {
        let near = Sphere::new(point3f!(0, 0, 0), 1.0, Some(MaterialId(0)));
        let far = Sphere::new(point3f!(0, 0, -5), 1.0, Some(MaterialId(1)));
        let tree = two_leaf_tree(&near, &far, false);

        let mut ray = Ray::new(point3f!(0, 0, 5), vec3f!(0, 0, -1));
        let mut isect = Intersection::new();
        let (hit, stats) = tree.intersect_with_stats(&mut ray, &mut isect);

        assert!(hit);
        assert_eq!(isect.material, Some(MaterialId(0)));
        // the far leaf is reached but its box starts past the shrunk t_max
        assert_eq!(stats, TraversalStats { nodes_visited: 3, prim_tests: 1 });
    }

    #[test]
    fn test_inside_early_exit_skips_far_child() {
        let near = Sphere::new(point3f!(0, 0, 0), 1.0, None);
        let far = Sphere::new(point3f!(0, 0, -5), 1.0, None);
        let tree = two_leaf_tree(&near, &far, true);

        let mut ray = Ray::new(point3f!(0, 0.5, 5), vec3f!(0, 0, -1));
        let mut isect = Intersection::new();
        let (hit, stats) = tree.intersect_with_stats(&mut ray, &mut isect);

        assert!(hit);
        assert_eq!(stats.nodes_visited, 2);
    }

    #[test]
    fn test_any_hit_stops_early() {
        let near = Sphere::new(point3f!(0, 0, 0), 1.0, None);
        let far = Sphere::new(point3f!(0, 0, -5), 1.0, None);
        let tree = two_leaf_tree(&near, &far, false);

        let (hit, stats) = tree.intersect_test_with_stats(&Ray::new(point3f!(0, 0, 5), vec3f!(0, 0, -1)));
        assert!(hit);
        assert_eq!(stats, TraversalStats { nodes_visited: 2, prim_tests: 1 });

        assert!(!tree.intersect_test(&Ray::new(point3f!(0, 4, 5), vec3f!(0, 0, -1))));
    }

    #[test]
    fn test_build_stats() {
        let near = Sphere::new(point3f!(0, 0, 0), 1.0, None);
        let far = Sphere::new(point3f!(0, 0, -5), 1.0, None);
        let tree = two_leaf_tree(&near, &far, false);

        assert_eq!(tree.stats, BuildStats { total_nodes: 3, leaf_nodes: 2, leaf_prims: 2, max_depth: 1 });
        assert_eq!(tree.world_bound(), bounds3f!((-1, -1, -6), (1, 1, 1)));
    }
}
