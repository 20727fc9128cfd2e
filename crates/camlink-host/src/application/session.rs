//! Session state: the user-controlled view settings.
//!
//! There is exactly one session per process.  It holds what the control
//! console can change without touching any endpoint: the layout mode, the
//! mirror flag, which camera the rotate command applies to, and whether the
//! status panel is printed.  Rotations themselves are per endpoint and live
//! in the [`StreamRegistry`](super::registry::StreamRegistry).

use std::sync::{Mutex, MutexGuard, PoisonError};

use camlink_core::LayoutMode;
use serde::Serialize;

/// Number of camera slots the user can select for rotation.
pub const SELECTABLE_SLOTS: usize = 2;

/// Plain copy of the session, taken once per output tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub layout: LayoutMode,
    pub mirror: bool,
    /// Zero-based active-list index the rotate command applies to.
    pub selected: usize,
    pub show_controls: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            layout: LayoutMode::Auto,
            mirror: false,
            selected: 0,
            show_controls: true,
        }
    }
}

/// Mutex-guarded session shared by the console and the output loop.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        *self.lock()
    }

    /// Advances the layout mode and returns the new one.
    pub fn cycle_layout(&self) -> LayoutMode {
        let mut state = self.lock();
        state.layout = state.layout.next();
        state.layout
    }

    /// Flips the mirror flag and returns the new value.
    pub fn toggle_mirror(&self) -> bool {
        let mut state = self.lock();
        state.mirror = !state.mirror;
        state.mirror
    }

    /// Selects the camera slot for subsequent rotate commands.
    ///
    /// Slots beyond [`SELECTABLE_SLOTS`] are ignored; returns the selection
    /// in effect afterwards.
    pub fn select(&self, slot: usize) -> usize {
        let mut state = self.lock();
        if slot < SELECTABLE_SLOTS {
            state.selected = slot;
        }
        state.selected
    }

    /// Flips panel visibility and returns the new value.
    pub fn toggle_controls(&self) -> bool {
        let mut state = self.lock();
        state.show_controls = !state.show_controls;
        state.show_controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let state = Session::new().snapshot();
        assert_eq!(state.layout, LayoutMode::Auto);
        assert!(!state.mirror);
        assert_eq!(state.selected, 0);
        assert!(state.show_controls);
    }

    #[test]
    fn test_cycle_layout_wraps_after_three_steps() {
        let session = Session::new();
        assert_eq!(session.cycle_layout(), LayoutMode::FirstOnly);
        assert_eq!(session.cycle_layout(), LayoutMode::SecondOnly);
        assert_eq!(session.cycle_layout(), LayoutMode::Auto);
    }

    #[test]
    fn test_toggle_mirror_twice_restores_flag() {
        let session = Session::new();
        assert!(session.toggle_mirror());
        assert!(!session.toggle_mirror());
    }

    #[test]
    fn test_select_ignores_out_of_range_slot() {
        // Arrange
        let session = Session::new();
        session.select(1);

        // Act
        let selected = session.select(5);

        // Assert
        assert_eq!(selected, 1);
        assert_eq!(session.snapshot().selected, 1);
    }

    #[test]
    fn test_toggle_controls_hides_panel() {
        let session = Session::new();
        assert!(!session.toggle_controls());
        assert!(!session.snapshot().show_controls);
    }
}
