//! The elevation query consumed by mesh generation.

/// A pure elevation query over the body's surface.
///
/// Implementations must be deterministic: the same `(lat, lon)` always yields
/// the same elevation. Absent data is reported as `0.0`, never as an error.
pub trait Heightfield: Send + Sync {
    /// Elevation in metres above the reference radius at the given latitude and
    /// longitude (radians). Y is the polar axis.
    fn sample(&self, lat: f64, lon: f64) -> f64;

    /// Upper bound on `|sample(lat, lon)|` over the whole surface.
    ///
    /// Used as the additive margin in patch bounding radii, so it must never
    /// underestimate.
    fn max_displacement(&self) -> f64;
}

/// A heightfield that is zero everywhere: a perfect sphere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlatHeightfield;

impl Heightfield for FlatHeightfield {
    fn sample(&self, _lat: f64, _lon: f64) -> f64 {
        0.0
    }

    fn max_displacement(&self) -> f64 {
        0.0
    }
}

/// A procedural heightfield: a sampling function plus the caller's bound on
/// its absolute elevation.
#[derive(Clone, Copy, Debug)]
pub struct FnHeightfield<F> {
    f: F,
    max_displacement: f64,
}

impl<F> FnHeightfield<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    pub fn new(f: F, max_displacement: f64) -> Self {
        Self {
            f,
            max_displacement: max_displacement.abs(),
        }
    }
}

impl<F> Heightfield for FnHeightfield<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn sample(&self, lat: f64, lon: f64) -> f64 {
        (self.f)(lat, lon)
    }

    fn max_displacement(&self) -> f64 {
        self.max_displacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_is_zero_everywhere() {
        let flat = FlatHeightfield;
        assert_eq!(flat.sample(0.0, 0.0), 0.0);
        assert_eq!(flat.sample(1.2, -3.0), 0.0);
        assert_eq!(flat.max_displacement(), 0.0);
    }

    #[test]
    fn test_fn_heightfield_samples_and_carries_bound() {
        let ridge = FnHeightfield::new(|lat: f64, _lon: f64| lat * 100.0, 160.0);
        assert_eq!(ridge.sample(0.5, 2.0), 50.0);
        assert_eq!(ridge.max_displacement(), 160.0);
        let boxed: Box<dyn Heightfield> = Box::new(ridge);
        assert_eq!(boxed.sample(-0.25, 0.0), -25.0);
    }

    #[test]
    fn test_fn_heightfield_bound_is_absolute() {
        let trench = FnHeightfield::new(|_lat: f64, _lon: f64| -40.0, -40.0);
        assert_eq!(trench.max_displacement(), 40.0);
    }
}
