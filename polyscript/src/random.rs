use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_os_rng());
}

/// What the next `rand` block should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandMode {
    Min,
    Max,
    #[default]
    Random,
}

/// Reseeds the generator of the current thread.
pub fn seed(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed));
}

/// Uniform value in `[0, 1)`.
pub fn unit() -> f64 {
    RNG.with(|rng| rng.borrow_mut().random::<f64>())
}

/// Integer in `[ceil(min), floor(max))`, or `min` when the range is empty.
pub fn int(min: f64, max: f64) -> f64 {
    let min = min.ceil();
    let max = max.floor();
    (unit() * (max - min)).floor() + min
}

/// Real in `[min, max)`.
pub fn real(min: f64, max: f64) -> f64 {
    unit() * (max - min) + min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_reproducible() {
        seed(7);
        let a: Vec<f64> = (0..4).map(|_| unit()).collect();
        seed(7);
        let b: Vec<f64> = (0..4).map(|_| unit()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_int_stays_in_range() {
        seed(1);
        for _ in 0..200 {
            let x = int(-3.0, 4.0);
            assert!((-3.0..4.0).contains(&x));
            assert_eq!(x.fract(), 0.0);
        }
        assert_eq!(int(5.0, 5.0), 5.0);
    }
}
