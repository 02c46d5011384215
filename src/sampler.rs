//! Next-token selection from model logits.

use crate::error::{Error, Result};
use rand::prelude::*;
use rand_pcg::Pcg64;

/// ProbIndex struct used for sorting probabilities during top-p sampling.
#[derive(Debug, Clone, Copy)]
struct ProbIndex {
    prob: f32,
    index: usize,
}

/// Token sampler for controlling text generation.
///
/// Greedy when temperature is 0, otherwise multinomial over the softmaxed
/// logits, restricted to the nucleus when `0 < top_p < 1`.
#[derive(Debug)]
pub struct Sampler {
    /// Temperature for controlling randomness (0.0 = greedy)
    temperature: f32,
    /// Top-p (nucleus) sampling threshold
    top_p: f32,
    rng: Pcg64,
    /// Reused across calls
    probindex: Vec<ProbIndex>,
}

impl Sampler {
    /// Create a new sampler.
    ///
    /// # Arguments
    /// * `temperature` - Sampling temperature (0.0 = greedy, higher = more random)
    /// * `top_p` - Top-p threshold (values outside (0, 1) disable it)
    /// * `seed` - Random seed for reproducible results
    pub fn new(temperature: f32, top_p: f32, seed: u64) -> Self {
        Self {
            temperature,
            top_p,
            rng: Pcg64::seed_from_u64(seed),
            probindex: Vec::new(),
        }
    }

    /// Greedy sampler.
    pub fn greedy() -> Self {
        Self::new(0.0, 0.0, 0)
    }

    /// Sample a token id from the given logits (modified in place).
    pub fn sample(&mut self, logits: &mut [f32]) -> Result<u32> {
        if logits.is_empty() {
            return Err(Error::Inference("cannot sample from empty logits".to_string()));
        }

        let index = if self.temperature == 0.0 {
            Self::argmax(logits)
        } else {
            for logit in logits.iter_mut() {
                *logit /= self.temperature;
            }
            softmax(logits);

            let coin: f32 = self.rng.gen();
            if self.top_p <= 0.0 || self.top_p >= 1.0 {
                Self::multinomial_sample(logits, coin)
            } else {
                self.top_p_sample(logits, coin)
            }
        };

        u32::try_from(index)
            .map_err(|_| Error::Inference(format!("token index {} out of range", index)))
    }

    fn argmax(logits: &[f32]) -> usize {
        logits
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                if v > best.1 {
                    (i, v)
                } else {
                    best
                }
            })
            .0
    }

    fn multinomial_sample(probabilities: &[f32], coin: f32) -> usize {
        let mut cdf = 0.0;
        for (i, &prob) in probabilities.iter().enumerate() {
            cdf += prob;
            if coin < cdf {
                return i;
            }
        }
        // Rounding can leave the cdf just under 1
        probabilities.len() - 1
    }

    /// Samples from the smallest set of tokens whose cumulative probability
    /// exceeds `top_p`.
    fn top_p_sample(&mut self, probabilities: &[f32], coin: f32) -> usize {
        let n = probabilities.len();
        // Tokens below this can never make it into the nucleus
        let cutoff = if n > 1 { (1.0 - self.top_p) / (n - 1) as f32 } else { 0.0 };

        self.probindex.clear();
        self.probindex.extend(
            probabilities
                .iter()
                .enumerate()
                .filter(|(_, &prob)| prob >= cutoff)
                .map(|(index, &prob)| ProbIndex { prob, index }),
        );
        if self.probindex.is_empty() {
            return Self::argmax(probabilities);
        }

        self.probindex
            .sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap_or(std::cmp::Ordering::Equal));

        let mut cumulative_prob = 0.0;
        let mut last_idx = self.probindex.len() - 1;
        for (i, entry) in self.probindex.iter().enumerate() {
            cumulative_prob += entry.prob;
            if cumulative_prob > self.top_p {
                last_idx = i;
                break;
            }
        }

        let r = coin * cumulative_prob;
        let mut cdf = 0.0;
        for entry in &self.probindex[..=last_idx] {
            cdf += entry.prob;
            if r < cdf {
                return entry.index;
            }
        }

        self.probindex[last_idx].index
    }
}

/// In-place softmax computation.
fn softmax(x: &mut [f32]) {
    let max_val = x.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

    let mut sum = 0.0;
    for val in x.iter_mut() {
        *val = (*val - max_val).exp();
        sum += *val;
    }

    let sum_recip = sum.recip();
    for val in x.iter_mut() {
        *val *= sum_recip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_sampling() {
        let mut sampler = Sampler::greedy();
        let mut logits = [0.1, 0.9, 0.0, -3.0, 0.0];

        let token = sampler.sample(&mut logits).unwrap();
        assert_eq!(token, 1); // Index of highest logit
    }

    #[test]
    fn test_greedy_leaves_logits_untouched() {
        let mut sampler = Sampler::greedy();
        let mut logits = [2.0, 1.0];

        sampler.sample(&mut logits).unwrap();
        assert_eq!(logits, [2.0, 1.0]);
    }

    #[test]
    fn test_softmax() {
        let mut x = [1.0, 2.0, 3.0];

        softmax(&mut x);

        let sum: f32 = x.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(x[0] < x[1] && x[1] < x[2]);
    }

    #[test]
    fn test_multinomial_sampling() {
        let mut sampler = Sampler::new(1.0, 0.0, 42); // top_p = 0 disables the nucleus

        let mut counts = [0; 3];
        for _ in 0..1000 {
            let mut logits = [0.0, 0.0, 0.0];
            let token = sampler.sample(&mut logits).unwrap();
            counts[token as usize] += 1;
        }

        for &count in counts.iter() {
            assert!(count > 200 && count < 500);
        }
    }

    #[test]
    fn test_top_p_excludes_tail() {
        let mut sampler = Sampler::new(1.0, 0.5, 7);

        let mut counts = [0; 4];
        for _ in 0..1000 {
            // One dominant token carries more than half of the mass
            let mut logits = [5.0, 1.0, 0.0, -2.0];
            let token = sampler.sample(&mut logits).unwrap();
            counts[token as usize] += 1;
        }

        assert_eq!(counts[0], 1000);
    }

    #[test]
    fn test_same_seed_same_tokens() {
        let draw = |seed| {
            let mut sampler = Sampler::new(0.8, 0.9, seed);
            (0..20)
                .map(|_| {
                    let mut logits = [0.3, 0.1, 0.5, 0.2, 0.4];
                    sampler.sample(&mut logits).unwrap()
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(draw(11), draw(11));
    }

    #[test]
    fn test_empty_logits() {
        let mut sampler = Sampler::greedy();
        assert!(sampler.sample(&mut []).is_err());
    }
}
