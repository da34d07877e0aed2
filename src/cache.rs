//! Translation cache: the translation an entity currently exposes.
//!
//! The cache is a plain slot on `Entity`. It is overwritten freely while a
//! traversal switches languages; callers that switch it temporarily use
//! [`Entity::with_cached_translation`], which restores the previous value.

use crate::record::{Entity, Translation};

impl Entity {
    /// The translation currently active for field access.
    pub fn cached_translation(&self) -> Option<&Translation> {
        self.cached.as_ref()
    }

    pub(crate) fn cached_translation_mut(&mut self) -> Option<&mut Translation> {
        self.cached.as_mut()
    }

    /// Replace the active translation, returning the previous one so the
    /// caller can put it back.
    pub fn set_cached_translation(&mut self, translation: Option<Translation>) -> Option<Translation> {
        std::mem::replace(&mut self.cached, translation)
    }

    pub fn clear_cached_translation(&mut self) -> Option<Translation> {
        self.cached.take()
    }

    /// Run `f` with `translation` active, then restore the previous one.
    pub fn with_cached_translation<R>(
        &mut self,
        translation: Option<Translation>,
        f: impl FnOnce(&mut Entity) -> R,
    ) -> R {
        let stashed = self.set_cached_translation(translation);
        let result = f(self);
        self.cached = stashed;
        result
    }
}
