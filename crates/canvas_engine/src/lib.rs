//! # canvas_engine
//!
//! A headless, retained-mode orthogonal node-canvas engine. It owns the
//! document model, undo/redo, the lattice-constrained wire router, and the
//! interaction controllers; rendering is handed off to the host as a flat
//! `RenderList` of `DrawCommand`s.
//!
//! ## Core modules
//! - [`document`]: the item store, id index, and debounced auto-port layout.
//! - [`commands`]: invertible command objects and the undo/redo stack.
//! - [`router`]: the A* orthogonal wire router.
//! - [`layout`]: automatic per-side port arrangement.
//! - [`controllers`]: pointer-driven selection, drag, linking, context menu.
//! - [`scene`]: the read-only render projection.
//! - [`persistence`]: JSON schema-1 save/load.
//! - [`design`]: the Canvas ⇄ DesignState bidirectional projection.
//! - [`workspace`]: the host-provided settings/state-document contract.

pub mod commands;
pub mod config;
pub mod controllers;
pub mod design;
pub mod document;
pub mod error;
pub mod fabric;
pub mod geometry;
pub mod ids;
pub mod item;
pub mod layout;
pub mod persistence;
pub mod ports;
pub mod render;
pub mod router;
pub mod scene;
pub mod selection;
pub mod view;
pub mod workspace;

use glam::DVec2;

pub use config::CanvasConfig;
pub use document::Document;
pub use error::{CanvasError, CanvasResult};
pub use render::{DrawCommand, RenderList};
pub use selection::Selection;
pub use view::{Transform, View};

use controllers::context_menu::ContextMenuController;
use controllers::drag::DragController;
use controllers::linking::LinkingController;
use controllers::selection::SelectionController;
use controllers::{Modifiers, PointerSample};
use scene::SceneOverlayState;

/// The engine's single entry point: owns the document, the viewport, and
/// every interaction controller's transient session state. Intended to be
/// instantiated once per open canvas and reused across frames.
pub struct Canvas {
    pub config: CanvasConfig,
    pub document: Document,
    pub view: View,
    pub selection: Selection,
    pub overlay: SceneOverlayState,

    pub selection_ctrl: SelectionController,
    pub drag_ctrl: DragController,
    pub linking_ctrl: LinkingController,
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        let fabric = fabric::Fabric::new(config.grid_step);
        Self {
            document: Document::new(fabric),
            view: View::new(Transform::default(), DVec2::new(800.0, 600.0)),
            selection: Selection::default(),
            overlay: SceneOverlayState::default(),
            selection_ctrl: SelectionController::default(),
            drag_ctrl: DragController::default(),
            linking_ctrl: LinkingController::default(),
            config,
        }
    }

    /// Updates the viewport size (e.g. on window resize).
    pub fn update_viewport_size(&mut self, size: DVec2) {
        self.view.viewport_size = size;
    }

    /// Builds the current frame's display list. Flushes any pending
    /// auto-port layout first so port positions are up to date.
    pub fn draw(&mut self) -> RenderList {
        self.document.flush_auto_port_layout();
        self.overlay.selected_items = self.selection.items().clone();
        self.overlay.hovered_port = self.selection.single_port();
        scene::draw_scene(&mut self.document, &self.view, &self.config, &self.overlay)
    }

    /// Resolves a view-space point to both view and scene coordinates.
    pub fn pointer_sample(&self, view_pos: DVec2) -> PointerSample {
        PointerSample { view_pos, scene_pos: self.view.view_to_scene(view_pos) }
    }

    /// Cancels any in-progress drag or linking session, restoring the
    /// document to its last committed state.
    pub fn cancel_interaction(&mut self) {
        self.drag_ctrl.cancel(&mut self.document);
        self.linking_ctrl.escape();
    }

    pub fn context_menu_target(&mut self, scene_pos: DVec2) -> controllers::context_menu::ContextTarget {
        ContextMenuController::resolve_target(&mut self.document, &self.selection, scene_pos, &self.config)
    }

    pub fn context_menu_actions(&self, target: controllers::context_menu::ContextTarget) -> Vec<controllers::context_menu::ContextAction> {
        ContextMenuController::actions_for(target, &self.document)
    }

    pub fn context_menu_execute(&mut self, target: controllers::context_menu::ContextTarget, action: &controllers::context_menu::ContextAction) -> bool {
        ContextMenuController::execute(&mut self.document, &self.selection, target, action)
    }

    /// Zooms the view about `anchor_view`, clamped to the configured
    /// min/max zoom.
    pub fn zoom_at(&mut self, anchor_view: DVec2, factor: f64) {
        self.view.zoom_at(anchor_view, factor, self.config.zoom_min, self.config.zoom_max);
    }

    pub fn undo(&mut self) -> bool {
        self.document.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.document.redo()
    }

    /// Serializes the current document and view to JSON (schema version 1).
    pub fn save_json(&self, metadata: Option<serde_json::Value>) -> CanvasResult<String> {
        persistence::to_json(&self.document, &self.view.transform, metadata)
    }

    /// Replaces the current document and view with the contents of `json`.
    /// On any parse or validation error the current document is untouched.
    pub fn load_json(&mut self, json: &str) -> CanvasResult<()> {
        persistence::load_document(&mut self.document, &mut self.view.transform, json)
    }

    /// Projects the current document into a `DesignState` snapshot.
    pub fn build_design_state(&mut self, metadata: Option<serde_json::Value>) -> CanvasResult<design::DesignState> {
        design::build_design_state(&mut self.document, Some(&self.view.transform), metadata)
    }

    /// Applies a `DesignState` onto the document, replacing its link layer.
    pub fn apply_design_state(&mut self, state: &design::DesignState) -> CanvasResult<()> {
        design::apply_design_state(state, &mut self.document, &mut self.view.transform, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn fresh_canvas_draws_an_empty_scene_without_panicking() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        let list = canvas.draw();
        assert!(!list.is_empty()); // at least the background rect
    }

    #[test]
    fn save_then_load_round_trips_a_block() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        canvas.document.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let json = canvas.save_json(None).unwrap();

        let mut loaded = Canvas::new(CanvasConfig::default());
        loaded.load_json(&json).unwrap();
        assert_eq!(loaded.document.items().len(), 1);
    }

    #[test]
    fn modifiers_default_to_no_modifiers() {
        assert_eq!(Modifiers::default(), Modifiers { ctrl: false, shift: false });
    }
}
