//! Per-frame player input
//!
//! Window integration is out of scope; whoever owns the window (or a
//! script, in the headless demo) fills an [`InputState`] each frame and
//! hands it to the frame driver.

use bitflags::bitflags;

use crate::foundation::math::Vec2;

bitflags! {
    /// Actions held down during the current frame
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Actions: u32 {
        /// Move along the view direction
        const FORWARD       = 1 << 0;
        /// Move against the view direction
        const BACKWARD      = 1 << 1;
        /// Strafe left
        const LEFT          = 1 << 2;
        /// Strafe right
        const RIGHT         = 1 << 3;
        /// Jump, or rise in god mode and under water
        const UP            = 1 << 4;
        /// Duck, or sink in god mode and under water
        const DOWN          = 1 << 5;
        /// Sprint
        const SPEED         = 1 << 6;
        /// Weapon trigger
        const FIRE          = 1 << 7;
        /// Drag the teapot to the current target point
        const DRAG          = 1 << 8;
        /// Run the day/night cycle forward quickly
        const TIME_LAPSE    = 1 << 9;
        /// Run the day/night cycle backward quickly
        const TIME_REVERSE  = 1 << 10;
        /// Place or take the torch
        const USE           = 1 << 11;
    }
}

/// Input snapshot for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    /// Held actions
    pub actions: Actions,
    /// Mouse movement since the previous frame, in pixels
    pub mouse_delta: Vec2,
}

impl InputState {
    /// Snapshot with the given actions held and no mouse movement
    pub fn with_actions(actions: Actions) -> Self {
        Self { actions, mouse_delta: Vec2::zeros() }
    }

    /// Whether every action in `actions` is held
    pub fn is_held(&self, actions: Actions) -> bool {
        self.actions.contains(actions)
    }
}
