//! Configuration completeness gate.
//!
//! Pages other than the settings page ask the server once, at load, whether
//! the plugin is configured enough to send notifications. An incomplete
//! verdict puts up a persistent banner listing what is missing and disables
//! the actions that would fail anyway. A transport failure leaves the gate
//! open: a flaky network must not lock the user out of a working setup.

use switchboard_client::wire::ConfigFinding;

/// One missing or invalid configuration item, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateFinding {
    pub label: String,
    pub message: String,
}

/// Data for the persistent incomplete-configuration banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBanner {
    pub message: String,
    pub findings: Vec<GateFinding>,
    /// Where to send the user to finish setup, when known.
    pub settings_url: Option<String>,
}

/// Gate state over the page's lifetime.
///
/// Transitions:
///
///   Unchecked -> Complete     (verdict says configuration is done)
///   Unchecked -> Incomplete   (verdict lists missing items)
///   Unchecked -> Unchecked    (transport failure; gate stays open)
///
/// The check runs once per page load; there is no re-check.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    Unchecked,
    Complete,
    Incomplete(ConfigBanner),
}

#[derive(Debug)]
pub struct ConfigurationGate {
    state: GateState,
    settings_url: Option<String>,
}

impl ConfigurationGate {
    pub fn new(settings_url: Option<String>) -> Self {
        Self {
            state: GateState::Unchecked,
            settings_url,
        }
    }

    /// Record a complete-configuration verdict.
    pub fn record_complete(&mut self) {
        self.state = GateState::Complete;
    }

    /// Record an incomplete verdict and build the banner from the server's
    /// per-item findings. Items the server marked valid are left out.
    pub fn record_incomplete<'a>(
        &mut self,
        findings: impl IntoIterator<Item = (&'a String, &'a ConfigFinding)>,
    ) -> ConfigBanner {
        let findings: Vec<GateFinding> = findings
            .into_iter()
            .filter(|(_, finding)| !finding.valid)
            .map(|(key, finding)| GateFinding {
                label: if finding.label.is_empty() {
                    key.clone()
                } else {
                    finding.label.clone()
                },
                message: finding.message.clone(),
            })
            .collect();
        let banner = ConfigBanner {
            message: "The WhatsApp connection is not fully configured, so notifications \
                      cannot be sent yet."
                .to_owned(),
            findings,
            settings_url: self.settings_url.clone(),
        };
        self.state = GateState::Incomplete(banner.clone());
        banner
    }

    /// Why send-type actions are blocked, if they are.
    ///
    /// `None` while unchecked or complete; the unchecked case is the fail-open
    /// path after a transport failure.
    pub fn blocked_reason(&self) -> Option<&'static str> {
        match self.state {
            GateState::Incomplete(_) => {
                Some("Finish the WhatsApp configuration before using this.")
            }
            GateState::Unchecked | GateState::Complete => None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.blocked_reason().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn finding(label: &str, valid: bool, message: &str) -> ConfigFinding {
        ConfigFinding {
            label: label.to_owned(),
            valid,
            message: message.to_owned(),
        }
    }

    #[test]
    fn unchecked_gate_blocks_nothing() {
        let gate = ConfigurationGate::new(None);
        assert!(!gate.is_blocking());
        assert!(gate.blocked_reason().is_none());
    }

    #[test]
    fn complete_verdict_keeps_the_gate_open() {
        let mut gate = ConfigurationGate::new(None);
        gate.record_complete();
        assert!(!gate.is_blocking());
    }

    #[test]
    fn incomplete_verdict_lists_only_failing_items() {
        let mut gate = ConfigurationGate::new(Some("/admin/settings".to_owned()));
        let mut results = BTreeMap::new();
        results.insert(
            "api_url".to_owned(),
            finding("API URL", false, "No endpoint configured."),
        );
        results.insert("access_token".to_owned(), finding("Access Token", true, ""));

        let banner = gate.record_incomplete(&results);
        assert_eq!(banner.findings.len(), 1);
        assert_eq!(banner.findings[0].label, "API URL");
        assert_eq!(banner.settings_url.as_deref(), Some("/admin/settings"));
        assert!(gate.is_blocking());
        assert!(gate.blocked_reason().is_some());
    }

    #[test]
    fn missing_label_falls_back_to_the_item_key() {
        let mut gate = ConfigurationGate::new(None);
        let mut results = BTreeMap::new();
        results.insert("access_token".to_owned(), finding("", false, "Token unset."));

        let banner = gate.record_incomplete(&results);
        assert_eq!(banner.findings[0].label, "access_token");
    }

    #[test]
    fn verdict_without_findings_still_blocks() {
        let mut gate = ConfigurationGate::new(None);
        let results: BTreeMap<String, ConfigFinding> = BTreeMap::new();

        let banner = gate.record_incomplete(&results);
        assert!(banner.findings.is_empty());
        assert!(banner.message.contains("not fully configured"));
        assert!(gate.is_blocking());
    }
}
