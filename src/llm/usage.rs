use serde::Deserialize;
use std::ops::{Add, AddAssign};
use std::sync::{Arc, Mutex};

/// Token counters exactly as the Messages API reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

/// Dollar prices per 1K tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

impl Pricing {
    pub const HAIKU_4_5: Pricing = Pricing {
        input: 0.001,
        output: 0.005,
        cache_write: 0.00125,
        cache_read: 0.0001,
    };

    pub const SONNET_4_5: Pricing = Pricing {
        input: 0.003,
        output: 0.015,
        cache_write: 0.00375,
        cache_read: 0.0003,
    };

    /// Prices for a model id as echoed by the API. Unknown models are free.
    pub fn for_model(model_id: &str) -> Pricing {
        if model_id.starts_with("claude-haiku-4-5") {
            Self::HAIKU_4_5
        } else if model_id.starts_with("claude-sonnet-4-5") {
            Self::SONNET_4_5
        } else {
            Pricing::default()
        }
    }
}

/// Accumulated usage across model calls.
///
/// `input_tokens` includes tokens written to the prompt cache; `cached_tokens`
/// counts tokens read back from it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub dollar_cost: f64,
}

impl TokenUsage {
    pub fn from_api(usage: &ApiUsage, pricing: Pricing) -> Self {
        let cache_write = usage.cache_creation_input_tokens.unwrap_or(0);
        let cache_read = usage.cache_read_input_tokens.unwrap_or(0);
        let per_k = |tokens: u64, price: f64| tokens as f64 / 1000.0 * price;

        Self {
            input_tokens: usage.input_tokens + cache_write,
            output_tokens: usage.output_tokens,
            cached_tokens: cache_read,
            dollar_cost: per_k(usage.input_tokens, pricing.input)
                + per_k(usage.output_tokens, pricing.output)
                + per_k(cache_write, pricing.cache_write)
                + per_k(cache_read, pricing.cache_read),
        }
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            cached_tokens: self.cached_tokens + other.cached_tokens,
            dollar_cost: self.dollar_cost + other.dollar_cost,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: TokenUsage) {
        *self = *self + other;
    }
}

/// Process-wide usage accumulator. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    inner: Arc<Mutex<TokenUsage>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, usage: TokenUsage) {
        let mut total = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *total += usage;
    }

    pub fn snapshot(&self) -> TokenUsage {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_haiku_cost() {
        let usage = ApiUsage {
            input_tokens: 2000,
            output_tokens: 1000,
            cache_creation_input_tokens: Some(1000),
            cache_read_input_tokens: Some(10_000),
        };
        let tokens = TokenUsage::from_api(&usage, Pricing::for_model("claude-haiku-4-5-20251001"));

        assert_eq!(tokens.input_tokens, 3000);
        assert_eq!(tokens.output_tokens, 1000);
        assert_eq!(tokens.cached_tokens, 10_000);
        // 2 * 0.001 + 1 * 0.005 + 1 * 0.00125 + 10 * 0.0001
        assert!(approx(tokens.dollar_cost, 0.00925));
    }

    #[test]
    fn test_unknown_model_is_free() {
        let usage = ApiUsage {
            input_tokens: 5000,
            output_tokens: 5000,
            ..Default::default()
        };
        let tokens = TokenUsage::from_api(&usage, Pricing::for_model("some-other-model"));
        assert_eq!(tokens.input_tokens, 5000);
        assert!(approx(tokens.dollar_cost, 0.0));
    }

    #[test]
    fn test_tracker_accumulates_across_threads() {
        let tracker = UsageTracker::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    tracker.add(TokenUsage {
                        input_tokens: 10,
                        output_tokens: 1,
                        cached_tokens: 0,
                        dollar_cost: 0.5,
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = tracker.snapshot();
        assert_eq!(total.input_tokens, 80);
        assert_eq!(total.output_tokens, 8);
        assert!(approx(total.dollar_cost, 4.0));
    }
}
