/*!
 * Convergence detection for conversations that never say "done".
 *
 * The model sometimes keeps answering "continue" with the same near-complete
 * output, for instance when it miscounts and believes it already finished.
 * The tracker accepts the result once the block count has been stalled at or
 * above the threshold for enough consecutive observations.
 */

/// Default completion percentage at which stalls start counting
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 99.0;

/// Default number of consecutive stalled observations required
pub const DEFAULT_REQUIRED_STREAK: u32 = 2;

/// Tracks consecutive unchanged, near-complete block counts for one job
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    threshold_percent: f64,
    required_streak: u32,
    streak: u32,
    last_count: usize,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_PERCENT, DEFAULT_REQUIRED_STREAK)
    }
}

impl CompletionTracker {
    /// Create a tracker with a custom threshold and streak length
    pub fn new(threshold_percent: f64, required_streak: u32) -> Self {
        Self {
            threshold_percent,
            required_streak,
            streak: 0,
            last_count: 0,
        }
    }

    /// Record an observation; returns true when the engine should stop asking
    pub fn observe(&mut self, current: usize, total: usize) -> bool {
        let percentage = if total == 0 {
            100.0
        } else {
            current as f64 * 100.0 / total as f64
        };

        if percentage >= self.threshold_percent {
            if current == self.last_count {
                self.streak += 1;
            } else {
                self.streak = 1;
            }
        } else {
            self.streak = 0;
        }

        self.last_count = current;
        self.streak >= self.required_streak
    }

    /// Current near-completion streak
    pub fn streak(&self) -> u32 {
        self.streak
    }
}
