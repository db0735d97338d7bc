use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::corpus::queue::Queue;

/// Which queue entry to fuzz next.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedDecision {
    pub index: usize,
    pub weight_used: f64,
}

/// Seed selection policy: picks the next queue entry to mutate.
pub trait SeedSelector {
    /// Select an entry. Returns `None` only for an empty queue.
    fn choose_next(&mut self, queue: &Queue) -> Option<SeedDecision>;

    /// Name of this selector (for tracing).
    fn name(&self) -> &str;
}

/// Weight-proportional selection, the default.
///
/// Draws a uniform value in `[0, total_weight)` and walks the entries
/// accumulating weight until the draw is covered. When no entry carries
/// positive weight, falls back to a uniform pick.
pub struct WeightedSelector {
    rng: ChaCha8Rng,
}

impl WeightedSelector {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }
}

impl SeedSelector for WeightedSelector {
    fn choose_next(&mut self, queue: &Queue) -> Option<SeedDecision> {
        let entries = queue.entries();
        if entries.is_empty() {
            return None;
        }

        let total: f64 = entries.iter().map(|e| e.weight.max(0.0)).sum();
        if total <= 0.0 {
            let index = self.rng.gen_range(0..entries.len());
            return Some(SeedDecision {
                index,
                weight_used: 0.0,
            });
        }

        let roll: f64 = self.rng.gen::<f64>() * total;
        let mut covered = 0.0;
        let mut last_positive = 0;
        for (index, entry) in entries.iter().enumerate() {
            let weight = entry.weight.max(0.0);
            if weight <= 0.0 {
                continue;
            }
            covered += weight;
            last_positive = index;
            if roll < covered {
                return Some(SeedDecision {
                    index,
                    weight_used: weight,
                });
            }
        }

        // Float rounding can leave roll == total; take the last positive entry.
        Some(SeedDecision {
            index: last_positive,
            weight_used: entries[last_positive].weight,
        })
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::stream_rng;
    use crate::sequence::CommandSequence;

    fn queue_of(weights: &[f64]) -> Queue {
        let mut queue = Queue::new();
        for (i, &w) in weights.iter().enumerate() {
            queue.append(CommandSequence::new(vec![i as u8]).unwrap(), w);
        }
        queue
    }

    #[test]
    fn test_weighted_draw_matches_proportions() {
        let queue = queue_of(&[3.0, 1.0]);
        let mut selector = WeightedSelector::new(stream_rng(42, 1));

        let trials = 20_000;
        let hits_a = (0..trials)
            .filter(|_| selector.choose_next(&queue).unwrap().index == 0)
            .count();
        let p = hits_a as f64 / trials as f64;
        assert!((p - 0.75).abs() < 0.02, "P(A) = {p}");
    }

    #[test]
    fn test_zero_weight_entries_never_drawn() {
        let queue = queue_of(&[0.0, 2.0, 0.0]);
        let mut selector = WeightedSelector::new(stream_rng(1, 1));
        for _ in 0..1_000 {
            let decision = selector.choose_next(&queue).unwrap();
            assert_eq!(decision.index, 1);
            assert_eq!(decision.weight_used, 2.0);
        }
    }

    #[test]
    fn test_all_zero_falls_back_to_uniform() {
        let queue = queue_of(&[0.0, 0.0, 0.0]);
        let mut selector = WeightedSelector::new(stream_rng(7, 1));
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[selector.choose_next(&queue).unwrap().index] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn test_empty_queue_yields_none() {
        let mut selector = WeightedSelector::new(stream_rng(7, 1));
        assert!(selector.choose_next(&Queue::new()).is_none());
    }
}
