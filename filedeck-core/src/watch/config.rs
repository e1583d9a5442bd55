use serde::{Deserialize, Serialize};

fn default_channel_capacity() -> usize {
    256
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    /// Number of change events buffered per subscriber. Subscribers that fall
    /// further behind lose the oldest events instead of stalling the watcher.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Drop events for paths with a hidden component (e.g. `.git/`) below the
    /// watched root.
    #[serde(default)]
    pub ignore_hidden: bool,
}

impl Watch {
    pub const NAMESPACE: &str = "watch";
}

impl Default for Watch {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            ignore_hidden: false,
        }
    }
}
