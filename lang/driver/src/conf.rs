use blox_dynamics::prelude::{Settings, ThreadSafety};
use sculptor::{AppAuthor, FileIO, ProjectInfo, impl_serde_str_toml};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The user configuration, kept as `blox.toml` in the config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
    /// how long a warping process may run before yielding, in milliseconds
    pub atomic_timeout_ms: u64,
    /// wall-clock budget of one fast-track step, in milliseconds
    pub fast_track_budget_ms: u64,
    pub clone_limit: usize,
    /// keep running scripts running when they are started again
    pub thread_safe: bool,
    /// ticks a run may take before giving up
    pub max_ticks: usize,
}

impl Default for Conf {
    fn default() -> Self {
        let settings = Settings::default();
        Conf {
            atomic_timeout_ms: settings.atomic_timeout.as_millis() as u64,
            fast_track_budget_ms: settings.fast_track_budget.as_millis() as u64,
            clone_limit: settings.clone_limit,
            thread_safe: settings.thread_safety == ThreadSafety::KeepRunning,
            max_ticks: 100_000,
        }
    }
}

impl_serde_str_toml!(Conf);

impl AppAuthor for Conf {
    fn app_name() -> &'static str {
        "Blox"
    }

    fn author() -> &'static str {
        "Blox"
    }
}

impl Conf {
    /// Reads the user configuration. A missing or broken file is replaced
    /// by the default.
    pub fn load() -> Self {
        let path = Conf::config_dir().join("blox.toml");
        let file_conf = FileIO::new(path.clone());
        file_conf.load().unwrap_or_else(|_| {
            log::warn!("Using default configuration; expected to find one at `{}`.", path.display());
            let conf = Conf::default();
            if let Err(err) = file_conf.save(&conf) {
                log::warn!("could not write `{}`: {}", path.display(), err);
            }
            conf
        })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            atomic_timeout: Duration::from_millis(self.atomic_timeout_ms),
            fast_track_budget: Duration::from_millis(self.fast_track_budget_ms),
            clone_limit: self.clone_limit,
            thread_safety: thread_safety(self.thread_safe),
        }
    }
}

pub(crate) fn thread_safety(thread_safe: bool) -> ThreadSafety {
    if thread_safe { ThreadSafety::KeepRunning } else { ThreadSafety::Restart }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_engine() {
        assert_eq!(Conf::default().settings(), Settings::default());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let conf: Conf = toml::from_str("clone_limit = 3\nthread_safe = true").unwrap();
        let settings = conf.settings();
        assert_eq!(settings.clone_limit, 3);
        assert_eq!(settings.thread_safety, ThreadSafety::KeepRunning);
        assert_eq!(conf.max_ticks, Conf::default().max_ticks);
    }
}
