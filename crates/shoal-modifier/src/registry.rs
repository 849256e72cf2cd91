//! Explicit, ordered modifier registry.

use indexmap::IndexMap;
use shoal_core::ModifierId;

use crate::model::{Modifier, Phase};

/// Registered modifiers in registration order.
///
/// Iteration order is stable across frames: removal uses
/// `shift_remove`, so the survivors keep their relative order. Any
/// change touching a static modifier bumps [`static_revision`], which
/// tiles compare against to decide when to rebake.
///
/// [`static_revision`]: ModifierRegistry::static_revision
#[derive(Debug, Default)]
pub struct ModifierRegistry {
    entries: IndexMap<ModifierId, Modifier>,
    next_id: u64,
    static_revision: u64,
}

impl ModifierRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier.
    pub fn register(&mut self, modifier: Modifier) -> ModifierId {
        let id = ModifierId(self.next_id);
        self.next_id += 1;
        if modifier.is_static() {
            self.static_revision += 1;
        }
        self.entries.insert(id, modifier);
        id
    }

    /// Deregister a modifier, returning it.
    pub fn deregister(&mut self, id: ModifierId) -> Option<Modifier> {
        let removed = self.entries.shift_remove(&id)?;
        if removed.is_static() {
            self.static_revision += 1;
        }
        Some(removed)
    }

    /// Look up a modifier.
    pub fn get(&self, id: ModifierId) -> Option<&Modifier> {
        self.entries.get(&id)
    }

    /// Mutable access. Conservatively bumps the static revision, since
    /// the caller may turn a dynamic modifier static or vice versa.
    pub fn get_mut(&mut self, id: ModifierId) -> Option<&mut Modifier> {
        let m = self.entries.get_mut(&id)?;
        self.static_revision += 1;
        Some(m)
    }

    /// Revision counter for the static set.
    pub fn static_revision(&self) -> u64 {
        self.static_revision
    }

    /// All modifiers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ModifierId, &Modifier)> {
        self.entries.iter().map(|(id, m)| (*id, m))
    }

    /// Modifiers applied in `phase`, in registration order.
    pub fn in_phase(&self, phase: Phase) -> impl Iterator<Item = (ModifierId, &Modifier)> {
        self.iter().filter(move |(_, m)| m.phase() == Some(phase))
    }

    /// Stationary additive sources, in registration order.
    pub fn statics(&self) -> impl Iterator<Item = (ModifierId, &Modifier)> {
        self.iter().filter(|(_, m)| m.is_static())
    }

    /// Number of registered modifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlendMode;
    use glam::Vec2;

    fn m(strength: f32) -> Modifier {
        Modifier::source(Vec2::ZERO, Vec2::ONE, strength)
    }

    #[test]
    fn order_survives_removal() {
        let mut r = ModifierRegistry::new();
        let a = r.register(m(1.0));
        let b = r.register(m(2.0));
        let c = r.register(m(3.0));
        r.deregister(b);
        let order: Vec<_> = r.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, c]);
        assert!(r.deregister(b).is_none());
    }

    #[test]
    fn static_revision_tracks_static_set() {
        let mut r = ModifierRegistry::new();
        r.register(m(1.0));
        assert_eq!(r.static_revision(), 0);
        let s = r.register(m(1.0).stationary());
        assert_eq!(r.static_revision(), 1);
        r.deregister(s);
        assert_eq!(r.static_revision(), 2);
    }

    #[test]
    fn phase_filter() {
        let mut r = ModifierRegistry::new();
        r.register(m(1.0));
        r.register(m(1.0).with_blend(BlendMode::Set));
        r.register(m(1.0).stationary());
        assert_eq!(r.in_phase(Phase::Pre).count(), 1);
        assert_eq!(r.in_phase(Phase::Post).count(), 1);
        assert_eq!(r.statics().count(), 1);
    }
}
