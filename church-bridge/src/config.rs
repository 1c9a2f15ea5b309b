// Evaluation budgets.
//
// Every machine transition costs one step and every pending continuation
// frame counts toward the depth. Natives that re-enter the machine count
// toward the nesting. Each limit turns a runaway program into a `Divergence`
// error instead of a hang or a blown stack.

use crate::error::ConfigError;
use std::str::FromStr;

pub const MAX_STEPS_ENV: &str = "CHURCH_MAX_STEPS";
pub const MAX_DEPTH_ENV: &str = "CHURCH_MAX_DEPTH";
pub const MAX_NESTING_ENV: &str = "CHURCH_MAX_NESTING";

pub const DEFAULT_MAX_STEPS: u64 = 100_000_000;
pub const DEFAULT_MAX_DEPTH: usize = 1_000_000;
/// Each nested run costs real Rust stack, so this stays small.
pub const DEFAULT_MAX_NESTING: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_steps: u64,
    pub max_depth: usize,
    pub max_nesting: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: DEFAULT_MAX_STEPS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl Limits {
    /// Defaults overridden by `CHURCH_MAX_STEPS`, `CHURCH_MAX_DEPTH` and
    /// `CHURCH_MAX_NESTING`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut limits = Limits::default();
        if let Some(raw) = lookup(MAX_STEPS_ENV) {
            limits.max_steps = parse_var(MAX_STEPS_ENV, raw)?;
        }
        if let Some(raw) = lookup(MAX_DEPTH_ENV) {
            limits.max_depth = parse_var(MAX_DEPTH_ENV, raw)?;
        }
        if let Some(raw) = lookup(MAX_NESTING_ENV) {
            limits.max_nesting = parse_var(MAX_NESTING_ENV, raw)?;
        }
        Ok(limits)
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }
}

fn parse_var<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}
