use serde::{Deserialize, Serialize};

/// Where the host resolver configuration lives and how often it is polled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default = "default_resolv_conf_path")]
    pub resolv_conf_path: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            resolv_conf_path: default_resolv_conf_path(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_resolv_conf_path() -> String {
    "/etc/resolv.conf".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}
