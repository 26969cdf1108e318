use crate::aggregate::{AccelNode, BuildStats, NodeId, TraversalStats};
use crate::bvh::{BvhOptions, SplitMethod, BVH};
use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::interaction::Intersection;
use crate::kdtree::{KdTree, KdTreeOptions};
use crate::params::{ParamError, ParamSet};
use crate::primitive::Primitive;

/// Either of the two spatial indexes, chosen at runtime.
pub enum Accelerator<'p> {
    BVH(BVH<'p>),
    KdTree(KdTree<'p>),
}

impl<'p> Accelerator<'p> {
    pub fn name(&self) -> &'static str {
        match self {
            Accelerator::BVH(_) => "bvh",
            Accelerator::KdTree(_) => "kdtree",
        }
    }

    pub fn root(&self) -> NodeId {
        match self {
            Accelerator::BVH(bvh) => bvh.root(),
            Accelerator::KdTree(kd) => kd.root(),
        }
    }

    pub fn node(&self, id: NodeId) -> &AccelNode {
        match self {
            Accelerator::BVH(bvh) => bvh.node(id),
            Accelerator::KdTree(kd) => kd.node(id),
        }
    }

    pub fn build_stats(&self) -> BuildStats {
        match self {
            Accelerator::BVH(bvh) => bvh.build_stats(),
            Accelerator::KdTree(kd) => kd.build_stats(),
        }
    }

    pub fn intersect_with_stats<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> (bool, TraversalStats) {
        match self {
            Accelerator::BVH(bvh) => bvh.intersect_with_stats(ray, isect),
            Accelerator::KdTree(kd) => kd.intersect_with_stats(ray, isect),
        }
    }

    pub fn intersect_test_with_stats(&self, ray: &Ray) -> (bool, TraversalStats) {
        match self {
            Accelerator::BVH(bvh) => bvh.intersect_test_with_stats(ray),
            Accelerator::KdTree(kd) => kd.intersect_test_with_stats(ray),
        }
    }
}

impl<'p> Primitive for Accelerator<'p> {
    fn world_bound(&self) -> Bounds3f {
        match self {
            Accelerator::BVH(bvh) => bvh.world_bound(),
            Accelerator::KdTree(kd) => kd.world_bound(),
        }
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, isect: &mut Intersection<'a>) -> bool {
        match self {
            Accelerator::BVH(bvh) => bvh.intersect(ray, isect),
            Accelerator::KdTree(kd) => kd.intersect(ray, isect),
        }
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        match self {
            Accelerator::BVH(bvh) => bvh.intersect_test(ray),
            Accelerator::KdTree(kd) => kd.intersect_test(ray),
        }
    }
}

impl<'p> From<BVH<'p>> for Accelerator<'p> {
    fn from(bvh: BVH<'p>) -> Self {
        Accelerator::BVH(bvh)
    }
}

impl<'p> From<KdTree<'p>> for Accelerator<'p> {
    fn from(kd: KdTree<'p>) -> Self {
        Accelerator::KdTree(kd)
    }
}

fn positive_int(params: &mut ParamSet, name: &'static str, default: usize) -> Result<usize, ParamError> {
    match params.get_optional::<i32>(name)? {
        None => Ok(default),
        Some(n) if n > 0 => Ok(n as usize),
        Some(n) => Err(ParamError::InvalidValue { name, value: n.to_string() }),
    }
}

pub fn bvh_options(params: &mut ParamSet) -> Result<BvhOptions, ParamError> {
    let max_leaf_size = positive_int(params, "maxnodeprims", 4)?;
    let split_method = match params.get_optional::<String>("splitmethod")?.as_deref() {
        None | Some("sah") => SplitMethod::SAH,
        Some("middle") => SplitMethod::Middle,
        Some("equal") => SplitMethod::EqualCounts,
        Some(other) => {
            return Err(ParamError::InvalidValue { name: "splitmethod", value: format!("\"{}\"", other) })
        }
    };

    Ok(BvhOptions { max_leaf_size, split_method })
}

pub fn kdtree_options(params: &mut ParamSet) -> Result<KdTreeOptions, ParamError> {
    let max_leaf_size = positive_int(params, "maxprims", 4)?;
    let max_depth = match params.get_optional::<i32>("maxdepth")? {
        None => None,
        Some(d) if d >= 0 => Some(d as usize),
        Some(d) => return Err(ParamError::InvalidValue { name: "maxdepth", value: d.to_string() }),
    };

    Ok(KdTreeOptions { max_leaf_size, max_depth })
}

/// Builds the accelerator called `name` ("bvh" or "kdtree") over `prims`, configured from
/// `params`. Parameters that were not consumed are logged as warnings.
pub fn make_accelerator<'p>(
    name: &str,
    prims: Vec<&'p dyn Primitive>,
    params: &mut ParamSet,
) -> anyhow::Result<Accelerator<'p>> {
    let accel = match name {
        "bvh" => Accelerator::BVH(BVH::build_with(prims, bvh_options(params)?)),
        "kdtree" => Accelerator::KdTree(KdTree::build_with(prims, kdtree_options(params)?)),
        _ => return Err(ParamError::UnknownAccelerator(name.to_string()).into()),
    };

    params.warn_unused(name);

    Ok(accel)
}
