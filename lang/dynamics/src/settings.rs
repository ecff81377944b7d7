use std::time::Duration;

/// What starting an already running script does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadSafety {
    /// stop the running process and start over
    #[default]
    Restart,
    /// leave the running process alone
    KeepRunning,
}

/// Engine knobs for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// how long a warping process may run before it must yield anyway
    pub atomic_timeout: Duration,
    /// wall-clock budget of one fast-track step
    pub fast_track_budget: Duration,
    pub clone_limit: usize,
    pub thread_safety: ThreadSafety,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            atomic_timeout: Duration::from_millis(500),
            fast_track_budget: Duration::from_millis(100),
            clone_limit: 300,
            thread_safety: ThreadSafety::default(),
        }
    }
}
