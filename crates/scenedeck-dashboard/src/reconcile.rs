//! Local dashboard state and how polled status and pushed events land in it.
//!
//! Polls and pushes race freely. Both go through [`DashboardState::apply_scene`],
//! which only reports a change when the scene actually differs, so the same
//! scene arriving twice (push, then poll) is a no-op. Whichever arrives last wins.

use std::collections::BTreeSet;
use std::sync::Arc;

use scenedeck_core::ObsStatus;
use scenedeck_core::ids::ButtonId;
use scenedeck_core::model::{Button, sort_buttons};
use tokio::sync::watch;

/// The connection indicator shown in the header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionIndicator {
    /// Nothing heard from the server yet.
    #[default]
    Unknown,
    /// Server reports an identified OBS session.
    Connected,
    /// Server reports no OBS session.
    Disconnected,
}

/// What the dashboard currently shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardState {
    indicator: ConnectionIndicator,
    current_scene: Option<String>,
    buttons: Vec<Button>,
    highlighted: BTreeSet<ButtonId>,
    favorites_highlighted: BTreeSet<ButtonId>,
}

impl DashboardState {
    /// State for a known button list, kept in display order.
    pub fn with_buttons(mut buttons: Vec<Button>) -> Self {
        sort_buttons(&mut buttons);
        Self {
            buttons,
            ..Self::default()
        }
    }

    /// Connection indicator.
    pub fn indicator(&self) -> ConnectionIndicator {
        self.indicator
    }

    /// Last known program scene.
    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    /// Buttons highlighted in the main grid.
    pub fn highlighted(&self) -> &BTreeSet<ButtonId> {
        &self.highlighted
    }

    /// Buttons highlighted in the favorites strip.
    pub fn favorites_highlighted(&self) -> &BTreeSet<ButtonId> {
        &self.favorites_highlighted
    }

    /// Loaded buttons in display order.
    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Replace the button list and recompute highlights.
    pub fn set_buttons(&mut self, mut buttons: Vec<Button>) -> bool {
        sort_buttons(&mut buttons);
        if self.buttons == buttons {
            return false;
        }
        self.buttons = buttons;
        self.recompute();
        true
    }

    /// Make `scene` current. Returns `false` when it already was.
    pub fn apply_scene(&mut self, scene: &str) -> bool {
        if self.current_scene.as_deref() == Some(scene) {
            return false;
        }
        self.current_scene = Some(scene.to_string());
        self.recompute();
        true
    }

    /// Apply a polled status. The scene is only taken when connected and
    /// reported; a disconnected status leaves the last scene in place.
    pub fn apply_status(&mut self, status: &ObsStatus) -> bool {
        let indicator = if status.connected {
            ConnectionIndicator::Connected
        } else {
            ConnectionIndicator::Disconnected
        };
        let mut changed = self.indicator != indicator;
        self.indicator = indicator;

        if status.connected {
            if let Some(scene) = &status.current_scene {
                changed |= self.apply_scene(scene);
            }
        }
        changed
    }

    fn recompute(&mut self) {
        self.highlighted.clear();
        self.favorites_highlighted.clear();
        let Some(scene) = self.current_scene.as_deref() else {
            return;
        };
        for button in self.buttons.iter().filter(|b| b.scene == scene) {
            let _ = self.highlighted.insert(button.id);
            if button.favorite {
                let _ = self.favorites_highlighted.insert(button.id);
            }
        }
    }
}

/// [`DashboardState`] shared between the poller and the event listener.
///
/// Watchers are only woken when an update actually changed something.
#[derive(Clone, Debug)]
pub struct SharedState {
    tx: Arc<watch::Sender<DashboardState>>,
}

impl SharedState {
    /// Wrap an initial state.
    pub fn new(initial: DashboardState) -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(initial)),
        }
    }

    /// Receiver woken on every change.
    pub fn watch(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    /// See [`DashboardState::apply_scene`].
    pub fn apply_scene(&self, scene: &str) -> bool {
        self.tx.send_if_modified(|s| s.apply_scene(scene))
    }

    /// See [`DashboardState::apply_status`].
    pub fn apply_status(&self, status: &ObsStatus) -> bool {
        self.tx.send_if_modified(|s| s.apply_status(status))
    }

    /// See [`DashboardState::set_buttons`].
    pub fn set_buttons(&self, buttons: Vec<Button>) -> bool {
        self.tx.send_if_modified(|s| s.set_buttons(buttons))
    }
}
