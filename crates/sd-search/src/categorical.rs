use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Draw one index from a categorical distribution over `probs`.
///
/// Consumes exactly one draw from `rng`. Returns `None` when the weights
/// carry no usable mass (empty, all zero, or non-finite), in which case
/// nothing is drawn.
pub fn draw<R: Rng + ?Sized>(probs: &[f32], rng: &mut R) -> Option<usize> {
    let dist = WeightedIndex::new(probs).ok()?;
    Some(dist.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_one_hot_always_draws_the_hot_index() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(draw(&[0.0, 0.0, 1.0, 0.0], &mut rng), Some(2));
        }
    }

    #[test]
    fn test_draw_is_reproducible() {
        let probs = [0.25, 0.25, 0.25, 0.25];
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let xs: Vec<_> = (0..32).map(|_| draw(&probs, &mut a)).collect();
        let ys: Vec<_> = (0..32).map(|_| draw(&probs, &mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_draw_roughly_follows_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let probs = [0.9, 0.1];
        let hits = (0..2000)
            .filter(|_| draw(&probs, &mut rng) == Some(0))
            .count();
        assert!(hits > 1650 && hits < 1950, "hits = {}", hits);
    }

    #[test]
    fn test_zero_mass_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(draw(&[0.0, 0.0], &mut rng), None);
        assert_eq!(draw(&[f32::NAN, 1.0], &mut rng), None);
        assert_eq!(draw(&[], &mut rng), None);
    }
}
