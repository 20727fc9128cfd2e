//! ComposeOutputUseCase: one output tick's worth of compositing.
//!
//! Takes a consistent snapshot of the registry and the session, releases
//! both locks, and only then runs the (CPU-heavy) compositor.  The frames in
//! the snapshot are `Arc`s, so a receiver publishing a newer frame while we
//! compose simply replaces the registry's pointer; the canvas being built
//! still sees the frame it started with.

use std::sync::Arc;

use camlink_core::{Compositor, SourceView};
use image::RgbImage;

use super::registry::StreamRegistry;
use super::session::Session;

/// Builds output canvases from the shared registry and session.
#[derive(Debug, Clone)]
pub struct ComposeOutputUseCase {
    registry: Arc<StreamRegistry>,
    session: Arc<Session>,
    compositor: Compositor,
}

impl ComposeOutputUseCase {
    pub fn new(
        registry: Arc<StreamRegistry>,
        session: Arc<Session>,
        compositor: Compositor,
    ) -> Self {
        Self {
            registry,
            session,
            compositor,
        }
    }

    /// Output resolution as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.compositor.width(), self.compositor.height())
    }

    /// Composes the canvas for the current tick.
    ///
    /// Always returns an image of exactly the configured resolution.
    pub fn compose_tick(&self) -> RgbImage {
        let sources = self.registry.snapshot();
        let session = self.session.snapshot();

        let views: Vec<SourceView<'_>> = sources
            .iter()
            .map(|s| SourceView::new(s.frame.as_deref(), s.rotation))
            .collect();

        self.compositor.compose(&views, session.layout, session.mirror)
    }
}
