/// Source of uniform randomness for shuffles, tie-breaks and scoring jitter.
///
/// Everything that needs randomness takes `&mut impl RandomSource`, so tests can
/// substitute a fixed source and assert on exact scores.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f32;
        (min + (self.next_f32() * span).floor() as i32).min(max)
    }

    fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.pick_index(items.len()))
    }

    /// Fisher-Yates, back to front.
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for idx in (1..items.len()).rev() {
            let swap_with = self.pick_index(idx + 1);
            items.swap(idx, swap_with);
        }
    }

    /// Symmetric noise in `[-span / 2, span / 2)`.
    fn jitter(&mut self, span: f32) -> f32 {
        (self.next_f32() - 0.5) * span
    }
}

#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl RandomSource for Rng {
    fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        // top 24 bits keep the result exactly representable and strictly below 1.0
        (out >> 8) as f32 / 16_777_216.0
    }
}

/// Always returns the same draw; 0.5 zeroes every symmetric jitter.
#[cfg(test)]
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixedRandom(pub f32);

#[cfg(test)]
impl RandomSource for FixedRandom {
    fn next_f32(&mut self) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn next_f32_stays_in_unit_interval() {
        let mut rng = Rng::new(7);
        for _ in 0..10_000 {
            let value = rng.next_f32();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn int_never_exceeds_inclusive_bounds() {
        let mut rng = Rng::new(3);
        for _ in 0..5_000 {
            let value = rng.int(-2, 4);
            assert!((-2..=4).contains(&value));
        }
        assert_eq!(rng.int(5, 5), 5);
        assert_eq!(rng.int(5, 1), 5);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        for seed in 1..=200u32 {
            let mut rng = Rng::new(seed);
            let mut items: Vec<u32> = (0..9).collect();
            rng.shuffle(&mut items);
            let mut sorted = items.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..9).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_reaches_every_position() {
        let mut seen_first = [false; 5];
        for seed in 1..=500u32 {
            let mut rng = Rng::new(seed);
            let mut items = [0usize, 1, 2, 3, 4];
            rng.shuffle(&mut items);
            seen_first[items[0]] = true;
        }
        assert!(seen_first.iter().all(|seen| *seen));
    }

    #[test]
    fn jitter_is_bounded_by_half_span() {
        let mut rng = Rng::new(11);
        for _ in 0..5_000 {
            let value = rng.jitter(25.0);
            assert!((-12.5..12.5).contains(&value));
        }
    }

    #[test]
    fn pick_returns_none_for_empty_slice() {
        let mut rng = Rng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.pick(&[9u8]), Some(&9));
    }
}
