use mapscout_core::BrowserConfig;
use rand::Rng;

/// Common desktop user agents
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Browser identity applied once at launch and shared by every tab.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub hide_automation: bool,
}

impl FingerprintConfig {
    /// Identity from configuration: fixed viewport, configured user agent
    /// or a random desktop one.
    pub fn from_config(config: &BrowserConfig) -> Self {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
            USER_AGENTS[idx].to_string()
        });

        Self {
            user_agent,
            viewport_width: config.window_width,
            viewport_height: config.window_height,
            hide_automation: config.disable_automation_flag,
        }
    }

    /// Chromium command-line switches carrying this identity.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![format!("--user-agent={}", self.user_agent)];
        if self.hide_automation {
            args.push("--disable-blink-features=AutomationControlled".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_picks_known_agent() {
        let fp = FingerprintConfig::from_config(&BrowserConfig::default());
        assert!(USER_AGENTS.contains(&fp.user_agent.as_str()));
        assert!(fp.viewport_width > 0);
        assert!(fp.viewport_height > 0);
    }

    #[test]
    fn test_fingerprint_variation() {
        // Probabilistic, but twenty identical picks out of three agents is very unlikely
        let configs: Vec<_> = (0..20)
            .map(|_| FingerprintConfig::from_config(&BrowserConfig::default()))
            .collect();

        let first_ua = &configs[0].user_agent;
        let all_same = configs.iter().all(|c| &c.user_agent == first_ua);
        assert!(!all_same, "Expected variation in user agents");
    }

    #[test]
    fn test_from_config_uses_fixed_agent() {
        let browser = BrowserConfig {
            user_agent: Some("TestAgent/1.0".to_string()),
            window_width: 1280,
            window_height: 720,
            ..BrowserConfig::default()
        };
        let fp = FingerprintConfig::from_config(&browser);
        assert_eq!(fp.user_agent, "TestAgent/1.0");
        assert_eq!((fp.viewport_width, fp.viewport_height), (1280, 720));
    }

    #[test]
    fn test_launch_args() {
        let mut fp = FingerprintConfig::from_config(&BrowserConfig::default());
        fp.user_agent = "UA".to_string();
        let args = fp.launch_args();
        assert_eq!(args[0], "--user-agent=UA");
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));

        fp.hide_automation = false;
        assert_eq!(fp.launch_args().len(), 1);
    }
}
