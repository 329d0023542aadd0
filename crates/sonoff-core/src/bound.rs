//! Bound on/off commands sent by a detached device
//!
//! With detach mode on, the wall switch no longer drives the relay. The device
//! instead sends a `toggle` to its bound on/off client, which the driver turns
//! into a button press.

use crate::cluster::OnOffCommand;
use std::sync::atomic::{AtomicU64, Ordering};
use zcl_protocol::ZclFrame;

/// Result of routing a bound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundDisposition {
    /// A toggle was received; `count` is the number of presses seen so far
    ButtonPressed { count: u64 },
    /// Not interpreted
    Unhandled { command: u8 },
}

/// Turns bound `toggle` commands into button presses
#[derive(Debug, Default)]
pub struct BoundCommandRouter {
    presses: AtomicU64,
}

impl BoundCommandRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a cluster-specific on/off command
    pub fn route(&self, frame: &ZclFrame) -> BoundDisposition {
        match OnOffCommand::from_u8(frame.command_id()) {
            Some(OnOffCommand::Toggle) => {
                let count = self.presses.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!("Bound toggle received, button press #{}", count);
                BoundDisposition::ButtonPressed { count }
            }
            Some(cmd) => {
                tracing::warn!("Bound {:?} command received, ignoring", cmd);
                BoundDisposition::Unhandled {
                    command: frame.command_id(),
                }
            }
            None => BoundDisposition::Unhandled {
                command: frame.command_id(),
            },
        }
    }

    /// Button presses seen so far
    #[must_use]
    pub fn presses(&self) -> u64 {
        self.presses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(command_id: u8) -> ZclFrame {
        ZclFrame::cluster_command(None, 0x10, command_id, vec![])
    }

    #[test]
    fn test_toggle_becomes_button_press() {
        let router = BoundCommandRouter::new();
        assert_eq!(
            router.route(&bound(0x02)),
            BoundDisposition::ButtonPressed { count: 1 }
        );
        assert_eq!(
            router.route(&bound(0x02)),
            BoundDisposition::ButtonPressed { count: 2 }
        );
        assert_eq!(router.presses(), 2);
    }

    #[test]
    fn test_on_off_not_interpreted() {
        let router = BoundCommandRouter::new();
        assert_eq!(
            router.route(&bound(0x00)),
            BoundDisposition::Unhandled { command: 0x00 }
        );
        assert_eq!(
            router.route(&bound(0x01)),
            BoundDisposition::Unhandled { command: 0x01 }
        );
        assert_eq!(
            router.route(&bound(0x40)),
            BoundDisposition::Unhandled { command: 0x40 }
        );
        assert_eq!(router.presses(), 0);
    }
}
