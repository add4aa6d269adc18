/// Represents intervals on the real-number axis. Any `Interval`s covers at least 1 point.
/// There is no difference between open/closed intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

/// Computes the linear interpolation between `a` and `b`: (0, 1) -> (a, b).
///
/// This function also works if `a` and `b` are not "Scalable" by themselves - as long as `a-b` can
/// be scaled by a `f32`, and the difference can be added to either `a` or `b` to get back `T` then
/// `lerp` can be used.
/// - Although `Point3` can't be scaled, but the difference type `Vec3` can, and point + vector is
///   a point, so `lerp` can be used on 2 points.
/// - `lerp` can be used on `Vec3`s as well - easier to understand.
pub fn lerp<T, U>(a: T, b: T, t: f32) -> T
where
    T: Copy + std::ops::Sub<T, Output = U>,
    U: Copy + std::ops::Mul<f32, Output = U> + std::ops::Add<T, Output = T>,
{
    (b - a) * t + a
}

/// Interpolates the value at `x` between two samples `(x0, y0)` and `(x1, y1)`.
///
/// The interpolation is linear in log-log space when both values are strictly positive (power-law
/// behaviour between the samples), and plain linear otherwise.
/// ```
/// use math::float::loglog_lerp;
/// // y = x^2 is a straight line in log-log space.
/// let y = loglog_lerp((1.0, 1.0), (100.0, 10000.0), 10.0);
/// assert!((y - 100.0).abs() < 1e-2);
/// // A zero end falls back to linear interpolation.
/// assert_eq!(loglog_lerp((0.0, 0.0), (2.0, 4.0), 1.0), 2.0);
/// ```
pub fn loglog_lerp(p0: (f32, f32), p1: (f32, f32), x: f32) -> f32 {
    let ((x0, y0), (x1, y1)) = (p0, p1);
    if x1 == x0 {
        return y0;
    }
    if x0 > 0.0 && x > 0.0 && y0 > 0.0 && y1 > 0.0 {
        let t = (x / x0).ln() / (x1 / x0).ln();
        (y0.ln() + t * (y1 / y0).ln()).exp()
    } else {
        let t = (x - x0) / (x1 - x0);
        y0 + t * (y1 - y0)
    }
}

/// Divides the given `interval` evenly into `count` pieces and returns the midpoint of each piece
/// together with the spacing between adjacent midpoints.
pub fn linspace(interval: (f32, f32), count: i32) -> (Vec<f32>, f32) {
    let (a, b) = interval;
    (
        (0..count)
            .map(|i| (i as f32 + 0.5) / count as f32 * (b - a) + a)
            .collect::<Vec<_>>(),
        (b - a) / count as f32,
    )
}

impl Interval {
    /// Constructs an `Interval` with `a` and `b` being the endpoint.
    /// A comparison is made to determine which one is lesser / greater.
    pub fn new(a: f32, b: f32) -> Self {
        assert!(!a.is_nan());
        assert!(!b.is_nan());
        let (a, b) = min_max(a, b);
        Interval { min: a, max: b }
    }

    pub fn length(&self) -> f32 {
        self.max - self.min
    }

    pub fn contains(&self, x: f32) -> bool {
        x >= self.min && x <= self.max
    }
}

pub fn min_max(a: f32, b: f32) -> (f32, f32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[macro_export]
macro_rules! assert_le {
    ($left:expr, $right:expr) => {
        if $left > $right {
            panic!(
                "Assertion failed: {} <= {} (values: {} vs. {})",
                stringify!($left),
                stringify!($right),
                $left,
                $right
            )
        }
    };
}

#[macro_export]
macro_rules! assert_lt {
    ($left:expr, $right:expr) => {
        if $left >= $right {
            panic!(
                "Assertion failed: {} < {} (values: {} vs. {})",
                stringify!($left),
                stringify!($right),
                $left,
                $right
            )
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loglog_matches_power_law() {
        // mu(E) = 3 * E^-1.5 is linear in log-log space.
        let f = |e: f32| 3.0 * e.powf(-1.5);
        let (xs, _) = linspace((10.0, 1000.0), 17);
        for x in xs {
            let y = loglog_lerp((10.0, f(10.0)), (1000.0, f(1000.0)), x);
            assert!(
                (y - f(x)).abs() / f(x) < 1e-3,
                "x = {}, interpolated = {}, exact = {}",
                x,
                y,
                f(x)
            );
        }
    }

    #[test]
    fn loglog_hits_sample_points() {
        let (p0, p1) = ((20.0, 0.5), (40.0, 0.125));
        assert!((loglog_lerp(p0, p1, 20.0) - 0.5).abs() < 1e-6);
        assert!((loglog_lerp(p0, p1, 40.0) - 0.125).abs() < 1e-6);
    }
}
