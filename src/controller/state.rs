//! Controller lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a controller is in its install/activate lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    /// Built, install not started
    Parsed,
    Installing,
    /// Provisioned, waiting to be activated
    Installed,
    Activating,
    /// Serving requests
    Activated,
    /// Rejected or replaced; never serves again
    Redundant,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }

    /// Whether fetches may be routed to a controller in this state
    pub fn can_serve(&self) -> bool {
        matches!(self, Self::Installed | Self::Activated)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
