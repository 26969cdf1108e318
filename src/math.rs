use crate::Float;

pub const INFINITY: Float = std::f32::INFINITY;
pub const NEG_INFINITY: Float = std::f32::NEG_INFINITY;

pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Conservative bound on the relative error accumulated by `n` floating point operations.
pub const fn gamma(n: i32) -> Float {
    let n = n as Float;
    (n * MACHINE_EPSILON) / (1.0 - n * MACHINE_EPSILON)
}

/// Solves `a*t^2 + b*t + c = 0`, returning the roots in ascending order.
///
/// The discriminant is evaluated in double precision and the roots are computed with the
/// cancellation-free form.
pub fn quadratic(a: Float, b: Float, c: Float) -> Option<(Float, Float)> {
    if a == 0.0 {
        return None;
    }

    let discrim: f64 = b as f64 * b as f64 - 4.0 * a as f64 * c as f64;
    if discrim < 0.0 {
        return None;
    }

    let root_discrim = discrim.sqrt();

    let q = if b < 0.0 {
        -0.5 * (b as f64 - root_discrim)
    } else {
        -0.5 * (b as f64 + root_discrim)
    };

    let t0 = (q / a as f64) as Float;
    // q is only zero when both b and c are, in which case the double root is at 0
    let t1 = if q == 0.0 { t0 } else { (c as f64 / q) as Float };

    if t0 > t1 { Some((t1, t0)) } else { Some((t0, t1)) }
}
