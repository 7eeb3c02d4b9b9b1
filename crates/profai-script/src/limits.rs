//! Execution budgets for untrusted scripts
//!
//! Budgets are cooperative: the interpreter charges a step for every
//! statement, loop iteration and call, and checks the wall clock every
//! [`CLOCK_CHECK_INTERVAL`] steps.

use std::time::Duration;

/// How many steps pass between wall-clock checks
pub const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Resource budget applied to one evaluation or one function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum interpreter steps
    pub max_steps: Option<u64>,
    /// Maximum wall-clock time
    pub timeout: Option<Duration>,
    /// Maximum nested calls before `RangeError: Maximum call stack size exceeded`
    pub max_call_depth: usize,
    /// Maximum console lines kept by the log sink
    pub max_log_lines: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::permissive()
    }
}

impl ExecutionLimits {
    /// Tight budget for grading many submissions back to back
    ///
    /// Call depth matches what browsers allow; the step and time budgets
    /// stop runaway code.
    pub fn restrictive() -> Self {
        Self {
            max_steps: Some(1_000_000),
            timeout: Some(Duration::from_secs(2)),
            max_call_depth: 10_000,
            max_log_lines: 200,
        }
    }

    /// Generous budget for interactive use
    pub fn permissive() -> Self {
        Self {
            max_steps: Some(50_000_000),
            timeout: Some(Duration::from_secs(10)),
            max_call_depth: 10_000,
            max_log_lines: 1_000,
        }
    }

    /// No step or time budget. An infinite loop will hang the caller.
    pub fn unlimited() -> Self {
        Self {
            max_steps: None,
            timeout: None,
            max_call_depth: 10_000,
            max_log_lines: usize::MAX,
        }
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_log_lines(mut self, lines: usize) -> Self {
        self.max_log_lines = lines;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let restrictive = ExecutionLimits::restrictive();
        let permissive = ExecutionLimits::permissive();
        assert!(restrictive.max_steps < permissive.max_steps);
        assert!(restrictive.timeout < permissive.timeout);
        assert_eq!(restrictive.max_call_depth, 10_000);
        assert_eq!(ExecutionLimits::unlimited().max_steps, None);
        assert_eq!(ExecutionLimits::default(), permissive);
    }
}
