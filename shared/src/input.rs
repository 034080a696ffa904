use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Control state sampled from a player's input device.
/// Missing fields deserialize as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(default)]
pub struct InputSnapshot {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
}

impl InputSnapshot {
    /// -1 for left, +1 for right, 0 otherwise. Left wins when both are held.
    pub fn steer(&self) -> f64 {
        if self.left {
            -1.0
        } else if self.right {
            1.0
        } else {
            0.0
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Where a vehicle's controls come from on this peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    LocalKeyboard,
    /// Last input relayed from the other peer
    RemoteRelay(InputSnapshot),
}

impl ControlSource {
    pub fn resolve(&self, local: &InputSnapshot) -> InputSnapshot {
        match self {
            ControlSource::LocalKeyboard => *local,
            ControlSource::RemoteRelay(last) => *last,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ControlSource::LocalKeyboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_released() {
        let input: InputSnapshot = serde_json::from_str(r#"{"forward":true}"#).unwrap();
        assert!(input.forward);
        assert!(!input.brake);
    }

    #[test]
    fn steer_prefers_left() {
        let both = InputSnapshot {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(both.steer(), -1.0);
    }

    #[test]
    fn remote_source_ignores_local_keys() {
        let remote = InputSnapshot {
            back: true,
            ..Default::default()
        };
        let local = InputSnapshot {
            forward: true,
            ..Default::default()
        };
        assert_eq!(ControlSource::RemoteRelay(remote).resolve(&local), remote);
        assert_eq!(ControlSource::LocalKeyboard.resolve(&local), local);
    }
}
