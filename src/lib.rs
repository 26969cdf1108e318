#[macro_use] pub mod macros; // must stay at the top
pub mod math;
pub mod geometry;
pub mod interaction;
pub mod primitive;
pub mod shapes;
pub mod id_arena;
pub mod aggregate;
pub mod bvh;
pub mod kdtree;
pub mod params;
pub mod accelerator;
pub mod scene;

pub use geometry::*;
pub use interaction::Intersection;
pub use primitive::{MaterialId, Primitive, PrimitiveList};
pub use accelerator::{make_accelerator, Accelerator};

use cgmath::{Point2, Point3, Vector3};

pub type Float = f32;

pub type Point2f = Point2<Float>;
pub type Point3f = Point3<Float>;
pub type Vec3f = Vector3<Float>;
