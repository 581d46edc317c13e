//! # Controllers
//!
//! Interaction controllers translate pointer events into commands. Each is
//! stateless with respect to pointer events (per spec.md §4.9) — they hold
//! only transient drag/linking session state between calls, mirroring the
//! teacher's `interaction.rs` state-machine shape (an enum driving a single
//! `handle_*` dispatch) generalized to the full controller set.

pub mod context_menu;
pub mod drag;
pub mod linking;
pub mod selection;

use glam::DVec2;

/// View-space modifiers accompanying a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

/// A pointer sample in both view (screen) and scene space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub view_pos: DVec2,
    pub scene_pos: DVec2,
}
