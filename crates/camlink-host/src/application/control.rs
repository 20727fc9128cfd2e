//! ControlUseCase: applies control-surface commands.
//!
//! Every command is a direct, synchronous mutation of the session or the
//! registry.  The console (or any future control surface) maps user input to
//! a [`ControlCommand`], calls [`ControlUseCase::execute`], and renders the
//! resulting [`ControlStatus`].
//!
//! | Key | Command          | Effect                                     |
//! |-----|------------------|--------------------------------------------|
//! | `l` | `CycleLayout`    | Auto → Cam 1 only → Cam 2 only → Auto      |
//! | `m` | `ToggleMirror`   | Flip the whole canvas horizontally         |
//! | `r` | `RotateSelected` | Rotate the selected camera by 90°          |
//! | `1` | `Select(0)`      | Rotate commands apply to camera 1          |
//! | `2` | `Select(1)`      | Rotate commands apply to camera 2          |
//! | `h` | `ToggleControls` | Show or hide the status panel              |
//! | `s` | `PrintStatus`    | Print the status as JSON                   |
//! | `q` | `Quit`           | Shut the whole process down                |

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::registry::{EndpointStatus, StreamRegistry};
use super::session::Session;

/// A single user command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    CycleLayout,
    ToggleMirror,
    RotateSelected,
    Select(usize),
    ToggleControls,
    PrintStatus,
    Quit,
}

impl ControlCommand {
    /// Maps a key to its command.  Letters are case-insensitive.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'l' => Some(ControlCommand::CycleLayout),
            'm' => Some(ControlCommand::ToggleMirror),
            'r' => Some(ControlCommand::RotateSelected),
            '1' => Some(ControlCommand::Select(0)),
            '2' => Some(ControlCommand::Select(1)),
            'h' => Some(ControlCommand::ToggleControls),
            's' => Some(ControlCommand::PrintStatus),
            'q' => Some(ControlCommand::Quit),
            _ => None,
        }
    }
}

/// What the control surface should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Continue,
    Quit,
}

/// Everything the status panel shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlStatus {
    pub active_count: usize,
    pub layout: &'static str,
    pub mirror: bool,
    /// One-based camera number the rotate command applies to.
    pub selected_camera: usize,
    pub show_controls: bool,
    pub endpoints: Vec<EndpointStatus>,
}

/// Applies commands to the shared session and registry.
#[derive(Debug, Clone)]
pub struct ControlUseCase {
    registry: Arc<StreamRegistry>,
    session: Arc<Session>,
}

impl ControlUseCase {
    pub fn new(registry: Arc<StreamRegistry>, session: Arc<Session>) -> Self {
        Self { registry, session }
    }

    /// Executes one command.
    pub fn execute(&self, command: ControlCommand) -> ControlOutcome {
        match command {
            ControlCommand::CycleLayout => {
                let layout = self.session.cycle_layout();
                info!(%layout, "layout changed");
            }
            ControlCommand::ToggleMirror => {
                let mirror = self.session.toggle_mirror();
                info!(mirror, "mirror toggled");
            }
            ControlCommand::RotateSelected => {
                let slot = self.session.snapshot().selected;
                match self.registry.rotate_active(slot) {
                    Some((endpoint, rotation)) => {
                        info!(endpoint = %endpoint, %rotation, "camera {} rotated", slot + 1);
                    }
                    None => debug!("no active camera {} to rotate", slot + 1),
                }
            }
            ControlCommand::Select(slot) => {
                let selected = self.session.select(slot);
                debug!("camera {} selected", selected + 1);
            }
            ControlCommand::ToggleControls => {
                self.session.toggle_controls();
            }
            ControlCommand::PrintStatus => {}
            ControlCommand::Quit => {
                info!("quit requested from control surface");
                return ControlOutcome::Quit;
            }
        }
        ControlOutcome::Continue
    }

    /// Current panel contents.
    pub fn status(&self) -> ControlStatus {
        let session = self.session.snapshot();
        ControlStatus {
            active_count: self.registry.active_count(),
            layout: session.layout.label(),
            mirror: session.mirror,
            selected_camera: session.selected + 1,
            show_controls: session.show_controls,
            endpoints: self.registry.statuses(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
