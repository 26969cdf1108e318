use crate::aggregate::{AccelNode, AccelTree, BuildStats, NodeId, NodeKind, NodePrims, TraversalStats};
use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::id_arena::IdArena;
use crate::interaction::Intersection;
use crate::math::INFINITY;
use crate::primitive::Primitive;
use crate::{Float, Point3f};
use bumpalo::Bump;
use partition::partition;
use std::cmp::Ordering;

const N_BUCKETS: usize = 12;
const TRAVERSAL_COST: Float = 0.125;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplitMethod {
    /// Partition at the midpoint of the centroid bounds.
    Middle,
    /// Partition at the median centroid.
    EqualCounts,
    /// Bucketed surface area heuristic.
    SAH
}

impl Default for SplitMethod {
    fn default() -> Self {
        SplitMethod::SAH
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BvhOptions {
    /// Ranges with at most this many primitives become leaves. Clamped to at least 1.
    pub max_leaf_size: usize,
    pub split_method: SplitMethod,
}

impl Default for BvhOptions {
    fn default() -> Self {
        Self { max_leaf_size: 4, split_method: SplitMethod::SAH }
    }
}

/// Bounding volume hierarchy over borrowed primitives.
///
/// Every node covers a contiguous range of the primitive array, which is reordered during the
/// build so that each leaf's primitives are adjacent.
pub struct BVH<'p> {
    tree: AccelTree<'p>,
}

impl<'p> BVH<'p> {
    pub fn build(prims: Vec<&'p dyn Primitive>) -> Self {
        Self::build_with(prims, BvhOptions::default())
    }

    pub fn build_with(mut prims: Vec<&'p dyn Primitive>, opts: BvhOptions) -> Self {
        let start = std::time::Instant::now();

        let span = tracing::debug_span!("bvh_build", n_prims = prims.len(), split_method = ?opts.split_method);
        let _enter = span.enter();

        let max_leaf_size = opts.max_leaf_size.max(1);

        let mut prim_info: Vec<BVHPrimInfo> = prims.iter().enumerate().map(|(i, p)| {
            BVHPrimInfo::new(i, p.world_bound())
        }).collect();

        let arena = Bump::new();
        let mut prim_ordering: Vec<isize> = Vec::with_capacity(prims.len());

        let root = Self::recursive_build(
            &arena,
            &mut prim_info,
            &mut prim_ordering,
            opts.split_method,
            max_leaf_size,
        );

        assert_eq!(prim_ordering.len(), prims.len(), "BVH build lost or duplicated primitives");
        assert_eq!(root.n_prims(), prims.len());

        apply_permutation(&mut prims, &mut prim_ordering);

        let mut nodes = IdArena::new();
        let root_id = flatten(root, &mut nodes);
        let tree = AccelTree::new(nodes, root_id, prims, false);

        let elapsed = start.elapsed().as_millis();
        tracing::debug!(
            "Built BVH with {} nodes ({} leaves, max depth {}) in {} ms",
            tree.stats.total_nodes, tree.stats.leaf_nodes, tree.stats.max_depth, elapsed
        );

        Self { tree }
    }

    fn recursive_build<'a>(
        arena: &'a Bump,
        prim_info: &mut [BVHPrimInfo],
        prim_ordering: &mut Vec<isize>,
        split_method: SplitMethod,
        max_leaf_size: usize,
    ) -> &'a BVHBuildNode<'a> {

        // Find the union of the bounding boxes of all primitives in this node,
        // and the bounding box of all centroids
        let (node_bounds, centroid_bounds) = prim_info.iter()
            .fold((Bounds3f::empty(), Bounds3f::empty()), |(node_bb, centr_bb), prim| {
                (node_bb.join(&prim.bounds), centr_bb.join_point(prim.centroid))
            });

        let n_prims = prim_info.len();
        let first_prim_idx = prim_ordering.len();

        if n_prims <= max_leaf_size {
            for prim in prim_info.iter() {
                prim_ordering.push(prim.prim_id as isize)
            }
            return arena.alloc(BVHBuildNode::new_leaf(first_prim_idx, n_prims, node_bounds));
        }

        let ax = centroid_bounds.maximum_extent();

        let mid = match split_method {
            SplitMethod::Middle => {
                let midpoint = (centroid_bounds.min[ax] + centroid_bounds.max[ax]) / 2.0;
                let (part1, _) = partition(prim_info, |prim| prim.centroid[ax] < midpoint);
                part1.len()
            }
            SplitMethod::EqualCounts => 0,
            SplitMethod::SAH => {
                sah_partition(prim_info, &node_bounds, &centroid_bounds, ax).unwrap_or(0)
            }
        };

        // An empty side means the split made no progress; the median split always does.
        let mid = if mid == 0 || mid == n_prims {
            median_partition(prim_info, ax)
        } else {
            mid
        };

        let (part1, part2) = prim_info.split_at_mut(mid);
        let child1 = Self::recursive_build(arena, part1, prim_ordering, split_method, max_leaf_size);
        let child2 = Self::recursive_build(arena, part2, prim_ordering, split_method, max_leaf_size);

        arena.alloc(BVHBuildNode::new_interior([child1, child2], ax))
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

    /// Primitives in build order. Leaf ranges index into this slice.
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

impl<'p> Primitive for BVH<'p> {
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

#[derive(Copy, Clone, Default)]
struct BucketInfo {
    count: usize,
    bounds: Bounds3f,
}

/// Partitions `prim_info` at the cheapest of the bucket boundaries along `ax`, returning the size
/// of the first half. `None` if no split beats making a leaf.
fn sah_partition(
    prim_info: &mut [BVHPrimInfo],
    node_bounds: &Bounds3f,
    centroid_bounds: &Bounds3f,
    ax: usize,
) -> Option<usize> {
    let c_min = centroid_bounds.min[ax];
    let extent = centroid_bounds.max[ax] - c_min;
    let bucket_of = |prim: &BVHPrimInfo| -> usize {
        if extent > 0.0 {
            let b = (N_BUCKETS as Float * ((prim.centroid[ax] - c_min) / extent)) as usize;
            b.min(N_BUCKETS - 1)
        } else {
            0
        }
    };

    let mut buckets = [BucketInfo::default(); N_BUCKETS];
    for prim in prim_info.iter() {
        let b = bucket_of(prim);
        buckets[b].count += 1;
        buckets[b].bounds.expand(&prim.bounds);
    }

    let total_area = node_bounds.surface_area();
    let sum = |bs: &[BucketInfo]| {
        bs.iter().fold((0, Bounds3f::empty()), |(n, b), bucket| (n + bucket.count, b.join(&bucket.bounds)))
    };

    let (best_split, best_cost) = (0..N_BUCKETS - 1)
        .map(|i| {
            let (left, right) = buckets.split_at(i + 1);
            let (n_left, b_left) = sum(left);
            let (n_right, b_right) = sum(right);
            let cost = TRAVERSAL_COST
                + (n_left as Float * b_left.surface_area() + n_right as Float * b_right.surface_area()) / total_area;
            (i, cost)
        })
        .fold((0, INFINITY), |best, split| if split.1 < best.1 { split } else { best });

    if !(best_cost < prim_info.len() as Float) {
        return None;
    }

    let (part1, _) = partition(prim_info, |prim| bucket_of(prim) <= best_split);
    Some(part1.len())
}

fn median_partition(prim_info: &mut [BVHPrimInfo], ax: usize) -> usize {
    let mid = prim_info.len() / 2;
    prim_info.select_nth_unstable_by(mid, |a, b| {
        a.centroid[ax].partial_cmp(&b.centroid[ax]).unwrap_or(Ordering::Equal)
    });
    mid
}

fn flatten(node: &BVHBuildNode<'_>, nodes: &mut IdArena<AccelNode>) -> NodeId {
    let prims = NodePrims::Range { start: node.first_prim_idx() as u32, len: node.n_prims() as u32 };
    match *node {
        BVHBuildNode::Leaf { bounds, .. } => nodes.insert(AccelNode { bounds, prims, kind: NodeKind::Leaf }),
        BVHBuildNode::Interior { bounds, children: [c1, c2], split_axis } => {
            let left = flatten(c1, nodes);
            let right = flatten(c2, nodes);
            nodes.insert(AccelNode {
                bounds,
                prims,
                kind: NodeKind::Interior { left, right, axis: split_axis as u8 },
            })
        }
    }
}

struct BVHPrimInfo {
    prim_id: usize,
    bounds: Bounds3f,
    centroid: Point3f
}

impl BVHPrimInfo {
    fn new(prim_id: usize, bounds: Bounds3f) -> Self {
        Self { prim_id, bounds, centroid: bounds.centroid() }
    }
}

enum BVHBuildNode<'a> {
    Leaf {
        bounds: Bounds3f,
        first_prim_idx: usize,
        n_prims: usize,
    },

    Interior {
        bounds: Bounds3f,
        children: [&'a BVHBuildNode<'a>; 2],
        split_axis: usize
    }
}

impl<'a> BVHBuildNode<'a> {
    fn new_leaf(first_prim_idx: usize, n_prims: usize, bounds: Bounds3f) -> Self {
        BVHBuildNode::Leaf {
            first_prim_idx, n_prims, bounds
        }
    }

    fn new_interior(children: [&'a BVHBuildNode<'a>; 2], split_axis: usize) -> Self {
        let bounds = children[0].bounds().join(&children[1].bounds());
        BVHBuildNode::Interior {
            children,
            bounds,
            split_axis
        }
    }

    fn bounds(&self) -> Bounds3f {
        match self {
            BVHBuildNode::Leaf {bounds, ..} => *bounds,
            BVHBuildNode::Interior {bounds, ..} => *bounds
        }
    }

    fn first_prim_idx(&self) -> usize {
        match self {
            BVHBuildNode::Leaf {first_prim_idx, ..} => *first_prim_idx,
            BVHBuildNode::Interior {children, ..} => children[0].first_prim_idx(),
        }
    }

    fn n_prims(&self) -> usize {
        match self {
            BVHBuildNode::Leaf {n_prims, ..} => *n_prims,
            BVHBuildNode::Interior {children, ..} => children[0].n_prims() + children[1].n_prims(),
        }
    }
}

/// Reorders `items` so that `items[i]` becomes the old `items[indices[i]]`.
/// `indices` is used as scratch space and is left negated.
fn apply_permutation<T>(items: &mut [T], indices: &mut [isize]) {
    assert_eq!(items.len(), indices.len());

    for i in 0..items.len() {
        if indices[i] < 0 {
            continue;
        }

        let mut pos = i;

        while indices[pos] != i as isize {
            let target = indices[pos] as usize;
            items.swap(pos, target);
            indices[pos] = -1 - indices[pos];

            pos = target;
        }

        indices[pos] = -1 - indices[pos];
    }
}
