//! Kernel name interning.
//!
//! Kernels are looked up by name exactly once, when a world starts; the
//! hot path only carries the resulting [`KernelId`]. External solvers
//! intern their own pass names into the same table.

use indexmap::IndexSet;
use std::fmt;

/// Numeric handle for an interned kernel name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(pub u32);

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// Insertion-ordered name → [`KernelId`] table.
#[derive(Clone, Debug, Default)]
pub struct KernelTable {
    names: IndexSet<String>,
}

impl KernelTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, interning it on first use.
    pub fn intern(&mut self, name: &str) -> KernelId {
        if let Some(idx) = self.names.get_index_of(name) {
            return KernelId(idx as u32);
        }
        let (idx, _) = self.names.insert_full(name.to_owned());
        KernelId(idx as u32)
    }

    /// Look up an already-interned name.
    pub fn get(&self, name: &str) -> Option<KernelId> {
        self.names.get_index_of(name).map(|i| KernelId(i as u32))
    }

    /// Name of an interned id.
    pub fn name(&self, id: KernelId) -> Option<&str> {
        self.names.get_index(id.0 as usize).map(String::as_str)
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Ids of the kernels the core itself dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kernels {
    /// Uniform/mask height reset.
    pub reset: KernelId,
    /// Terrain texture bake into the terrain buffer.
    pub terrain_bake: KernelId,
    /// One obstacle draw into the obstacle buffer.
    pub obstacle_draw: KernelId,
    /// Boundary store pass (interior strip → side scratch).
    pub store_strip: KernelId,
    /// Boundary apply pass (scratch → ghost ring).
    pub apply_strip: KernelId,
    /// Modifier injection before integration.
    pub inject_pre: KernelId,
    /// Modifier injection after integration.
    pub inject_post: KernelId,
    /// Static source bake into the static input buffer.
    pub static_bake: KernelId,
    /// Static input buffer accumulation.
    pub static_apply: KernelId,
    /// Composite render field packing.
    pub pack_composite: KernelId,
    /// Normal field derivation.
    pub normals: KernelId,
    /// Jump-flood seed pass.
    pub jump_flood_seed: KernelId,
    /// One jump-flood propagation pass.
    pub jump_flood_step: KernelId,
}

impl Kernels {
    /// Intern every core kernel name into `table`.
    pub fn resolve(table: &mut KernelTable) -> Self {
        Self {
            reset: table.intern("shoal.reset"),
            terrain_bake: table.intern("shoal.terrain_bake"),
            obstacle_draw: table.intern("shoal.obstacle_draw"),
            store_strip: table.intern("shoal.boundary_store"),
            apply_strip: table.intern("shoal.boundary_apply"),
            inject_pre: table.intern("shoal.inject_pre"),
            inject_post: table.intern("shoal.inject_post"),
            static_bake: table.intern("shoal.static_bake"),
            static_apply: table.intern("shoal.static_apply"),
            pack_composite: table.intern("shoal.pack_composite"),
            normals: table.intern("shoal.normals"),
            jump_flood_seed: table.intern("shoal.jfa_seed"),
            jump_flood_step: table.intern("shoal.jfa_step"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut t = KernelTable::new();
        let a = t.intern("flux");
        let b = t.intern("advect");
        assert_ne!(a, b);
        assert_eq!(t.intern("flux"), a);
        assert_eq!(t.len(), 2);
        assert_eq!(t.name(b), Some("advect"));
        assert_eq!(t.get("missing"), None);
    }

    #[test]
    fn core_kernels_are_distinct() {
        let mut t = KernelTable::new();
        let k = Kernels::resolve(&mut t);
        assert_eq!(t.len(), 13);
        assert_ne!(k.store_strip, k.apply_strip);
        // Resolving twice yields the same ids.
        assert_eq!(Kernels::resolve(&mut t), k);
    }
}
