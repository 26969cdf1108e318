pub mod sphere;
pub mod triangle;

pub use sphere::Sphere;
pub use triangle::{Triangle, TriangleHit, TriangleMesh};
