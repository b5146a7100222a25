// src/exam/proctor.rs

use serde::{Deserialize, Serialize};

/// Environment signal reported by the exam client. The engine treats the
/// browser as an abstract event source; these are the raw observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentSignal {
    VisibilityHidden,
    VisibilityVisible,
    FullscreenEntered,
    FullscreenExited,
    ContextMenu,
    Copy,
    Paste,
}

/// Classified departure from required exam conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    VisibilityLoss,
    FullscreenExit,
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

/// Tracks the environment state of one attempt and turns raw signals into
/// violations.
///
/// Only visible→hidden and fullscreen→windowed *transitions* produce
/// violations; repeated reports of the same state are collapsed. Restricted
/// actions (context menu, copy, paste) are suppressed client-side and only
/// logged here: frequently accidental, they never count against the student.
pub struct ProctorMonitor {
    visible: bool,
    fullscreen: bool,
}

impl ProctorMonitor {
    pub fn new() -> Self {
        Self {
            visible: true,
            fullscreen: false,
        }
    }

    pub fn in_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Feeds one signal through the monitor, returning the violation it
    /// amounts to, if any.
    pub fn observe(&mut self, signal: EnvironmentSignal) -> Option<Violation> {
        match signal {
            EnvironmentSignal::VisibilityHidden => {
                if self.visible {
                    self.visible = false;
                    return Some(Violation {
                        kind: ViolationKind::VisibilityLoss,
                        message: "Tab switch or window minimize detected".to_string(),
                    });
                }
                None
            }
            EnvironmentSignal::VisibilityVisible => {
                self.visible = true;
                None
            }
            EnvironmentSignal::FullscreenEntered => {
                self.fullscreen = true;
                None
            }
            EnvironmentSignal::FullscreenExited => {
                if self.fullscreen {
                    self.fullscreen = false;
                    return Some(Violation {
                        kind: ViolationKind::FullscreenExit,
                        message: "Fullscreen mode exited".to_string(),
                    });
                }
                None
            }
            EnvironmentSignal::ContextMenu | EnvironmentSignal::Copy | EnvironmentSignal::Paste => {
                tracing::debug!("Restricted action suppressed: {:?}", signal);
                None
            }
        }
    }
}

impl Default for ProctorMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_hide_transition_is_one_violation() {
        let mut monitor = ProctorMonitor::new();

        let first = monitor.observe(EnvironmentSignal::VisibilityHidden);
        assert_eq!(first.unwrap().kind, ViolationKind::VisibilityLoss);

        // Duplicate report without becoming visible in between: collapsed.
        assert!(monitor.observe(EnvironmentSignal::VisibilityHidden).is_none());

        monitor.observe(EnvironmentSignal::VisibilityVisible);
        let second = monitor.observe(EnvironmentSignal::VisibilityHidden);
        assert_eq!(second.unwrap().kind, ViolationKind::VisibilityLoss);
    }

    #[test]
    fn fullscreen_exit_only_counts_from_fullscreen() {
        let mut monitor = ProctorMonitor::new();
        assert!(monitor.observe(EnvironmentSignal::FullscreenExited).is_none());

        monitor.observe(EnvironmentSignal::FullscreenEntered);
        assert!(monitor.in_fullscreen());

        let v = monitor.observe(EnvironmentSignal::FullscreenExited).unwrap();
        assert_eq!(v.kind, ViolationKind::FullscreenExit);
        assert!(!monitor.in_fullscreen());
    }

    #[test]
    fn restricted_actions_are_not_violations() {
        let mut monitor = ProctorMonitor::new();
        assert!(monitor.observe(EnvironmentSignal::ContextMenu).is_none());
        assert!(monitor.observe(EnvironmentSignal::Copy).is_none());
        assert!(monitor.observe(EnvironmentSignal::Paste).is_none());
    }
}
