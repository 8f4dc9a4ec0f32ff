//! Surfaces warmed up ahead of use.
//!
//! The pool is an ordinary owned value: whoever composes the page creates
//! it, hands surfaces to sessions with [`PreloadPool::take`], and dropping it
//! releases whatever was never taken.

use std::collections::HashMap;

use crate::engine::Surface;

pub struct PreloadPool<S: Surface> {
    surfaces: HashMap<String, S>,
}

impl<S: Surface> Default for PreloadPool<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Surface> PreloadPool<S> {
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
        }
    }

    /// Bind `uri` to `surface` and keep it until taken. A surface already
    /// pooled for `uri` is released and replaced.
    pub fn preload(&mut self, uri: impl Into<String>, mut surface: S) {
        let uri = uri.into();
        surface.bind_source(&uri);
        tracing::debug!(%uri, "Preloaded surface");
        if let Some(mut previous) = self.surfaces.insert(uri, surface) {
            previous.clear_source();
        }
    }

    /// Remove the surface preloaded for `uri`, still bound to it.
    pub fn take(&mut self, uri: &str) -> Option<S> {
        self.surfaces.remove(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.surfaces.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Release every pooled surface.
    pub fn clear(&mut self) {
        for (_, mut surface) in self.surfaces.drain() {
            surface.clear_source();
        }
    }
}

impl<S: Surface> Drop for PreloadPool<S> {
    fn drop(&mut self) {
        self.clear();
    }
}
