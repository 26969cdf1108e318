use crate::aggregate::{AccelNode, AccelTree, BuildStats, NodeId, NodeKind, NodePrims, TraversalStats};
use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::id_arena::IdArena;
use crate::interaction::Intersection;
use crate::primitive::Primitive;
use crate::{Float, Point3f};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// A split that leaves at least this fraction of the parent's primitives on one side is not worth
/// making.
const BAD_SPLIT_FRACTION: Float = 0.9;

#[derive(Copy, Clone, Debug)]
pub struct KdTreeOptions {
    /// Sets with at most this many primitives become leaves. Clamped to at least 1.
    pub max_leaf_size: usize,
    /// Depth past which every node becomes a leaf. Defaults to `8 + 1.3 ln(n)`.
    pub max_depth: Option<usize>,
}

impl Default for KdTreeOptions {
    fn default() -> Self {
        Self { max_leaf_size: 4, max_depth: None }
    }
}

pub fn default_max_depth(n_prims: usize) -> usize {
    (8.0 + 1.3 * (n_prims.max(1) as Float).ln()).floor() as usize
}

/// Spatial k-d tree over borrowed primitives.
///
/// Primitives straddling a split plane are referenced from both sides, so leaves store explicit
/// index sets into the caller's primitive order. Node boxes are the bounds of their primitives
/// clipped to the node's region.
pub struct KdTree<'p> {
    tree: AccelTree<'p>,
}

impl<'p> KdTree<'p> {
    pub fn build(prims: Vec<&'p dyn Primitive>) -> Self {
        Self::build_with(prims, KdTreeOptions::default())
    }

    pub fn build_with(prims: Vec<&'p dyn Primitive>, opts: KdTreeOptions) -> Self {
        let start = std::time::Instant::now();

        let span = tracing::debug_span!("kdtree_build", n_prims = prims.len());
        let _enter = span.enter();

        let bounds: Vec<Bounds3f> = prims.iter().map(|p| p.world_bound()).collect();
        let mut builder = KdBuilder {
            centroids: bounds.iter().map(|b| b.centroid()).collect(),
            bounds: &bounds,
            max_leaf_size: opts.max_leaf_size.max(1),
            max_depth: opts.max_depth.unwrap_or_else(|| default_max_depth(prims.len())),
            nodes: IdArena::new(),
        };

        let all: Vec<u32> = (0..prims.len() as u32).collect();
        let world = bounds.iter().fold(Bounds3f::empty(), |b, pb| b.join(pb));
        let root = builder.build_node(all, world, 0);
        let nodes = builder.nodes;

        let tree = AccelTree::new(nodes, root, prims, true);

        let elapsed = start.elapsed().as_millis();
        tracing::debug!(
            "Built k-d tree with {} nodes ({} leaves, {} prim refs, max depth {}) in {} ms",
            tree.stats.total_nodes, tree.stats.leaf_nodes, tree.stats.leaf_prims, tree.stats.max_depth, elapsed
        );

        Self { tree }
    }

    pub fn root(&self) -> NodeId {
        self.tree.root
    }

    pub fn node(&self, id: NodeId) -> &AccelNode {
        &self.tree.nodes[id]
    }

    pub fn nodes(&self) -> &IdArena<AccelNode> {
        &self.tree.nodes
    }

    /// Primitives in the order they were passed in. Leaf index sets point into this slice.
    pub fn primitives(&self) -> &[&'p dyn Primitive] {
        &self.tree.prims
    }

    pub fn build_stats(&self) -> BuildStats {
        self.tree.stats
    }

    pub fn intersect_with_stats<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> (bool, TraversalStats) {
        self.tree.intersect_with_stats(ray, isect)
    }

    pub fn intersect_test_with_stats(&self, ray: &Ray) -> (bool, TraversalStats) {
        self.tree.intersect_test_with_stats(ray)
    }
}

impl<'p> Primitive for KdTree<'p> {
    fn world_bound(&self) -> Bounds3f {
        self.tree.world_bound()
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        self.tree.intersect(ray, isect)
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.tree.intersect_test(ray)
    }
}

struct KdBuilder<'b> {
    bounds: &'b [Bounds3f],
    centroids: Vec<Point3f>,
    max_leaf_size: usize,
    max_depth: usize,
    nodes: IdArena<AccelNode>,
}

impl<'b> KdBuilder<'b> {
    fn build_node(&mut self, indices: Vec<u32>, region: Bounds3f, depth: usize) -> NodeId {
        let node_bounds = indices.iter()
            .fold(Bounds3f::empty(), |b, &i| b.join(&self.bounds[i as usize]))
            .intersection(&region);

        if indices.len() <= self.max_leaf_size || depth > self.max_depth {
            return self.make_leaf(indices, node_bounds);
        }

        let centroid_bounds = indices.iter()
            .fold(Bounds3f::empty(), |b, &i| b.join_point(self.centroids[i as usize]));
        let axis = centroid_bounds.maximum_extent();
        let split = self.median_centroid(&indices, axis);

        let mut left = Vec::with_capacity(indices.len());
        let mut right = Vec::with_capacity(indices.len());
        for &i in &indices {
            let b = &self.bounds[i as usize];
            if b.max[axis] <= split {
                left.push(i);
            } else if b.min[axis] >= split {
                right.push(i);
            } else {
                left.push(i);
                right.push(i);
            }
        }

        let limit = BAD_SPLIT_FRACTION * indices.len() as Float;
        if left.len() as Float >= limit || right.len() as Float >= limit {
            tracing::trace!(
                "Bad split at depth {}: {} / {} of {} prims, making a leaf",
                depth, left.len(), right.len(), indices.len()
            );
            return self.make_leaf(indices, node_bounds);
        }

        let mut left_region = node_bounds;
        left_region.max[axis] = split;
        let mut right_region = node_bounds;
        right_region.min[axis] = split;

        let left = self.build_node(left, left_region, depth + 1);
        let right = self.build_node(right, right_region, depth + 1);

        self.nodes.insert(AccelNode {
            bounds: node_bounds,
            prims: NodePrims::Indices(SmallVec::new()),
            kind: NodeKind::Interior { left, right, axis: axis as u8 },
        })
    }

    fn make_leaf(&mut self, indices: Vec<u32>, bounds: Bounds3f) -> NodeId {
        self.nodes.insert(AccelNode {
            bounds,
            prims: NodePrims::Indices(SmallVec::from_vec(indices)),
            kind: NodeKind::Leaf,
        })
    }

    /// Exact median of the centroids along `axis`; the mean of the two middle values for an even
    /// count.
    fn median_centroid(&self, indices: &[u32], axis: usize) -> Float {
        let mut cs: Vec<Float> = indices.iter().map(|&i| self.centroids[i as usize][axis]).collect();
        cs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let m = cs.len();
        if m % 2 == 0 {
            0.5 * (cs[m / 2 - 1] + cs[m / 2])
        } else {
            cs[m / 2]
        }
    }
}
