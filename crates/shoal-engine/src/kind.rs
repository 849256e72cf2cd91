//! Solver variants as a parameter table.

use serde::{Deserialize, Serialize};
use shoal_compute::{KernelId, KernelTable};

/// Which family of solver passes a world runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationKind {
    /// Shallow-water flux with full advection.
    #[default]
    ShallowWater,
    /// Thick, slow fluid: reduced advection and velocity.
    Viscous,
    /// Height waves only; velocity is not advected.
    Wave,
}

/// Per-kind constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KindParams {
    /// Kernel name of the flux pass.
    pub flux_pass: &'static str,
    /// Kernel name of the integration pass.
    pub integrate_pass: &'static str,
    /// Multiplier on velocity advection.
    pub advection_scale: f32,
    /// Multiplier on velocity written back after integration.
    pub velocity_scale: f32,
}

const PARAMS: [KindParams; 3] = [
    KindParams {
        flux_pass: "shoal.swe.flux",
        integrate_pass: "shoal.swe.integrate",
        advection_scale: 1.0,
        velocity_scale: 1.0,
    },
    KindParams {
        flux_pass: "shoal.viscous.flux",
        integrate_pass: "shoal.viscous.integrate",
        advection_scale: 0.35,
        velocity_scale: 0.5,
    },
    KindParams {
        flux_pass: "shoal.wave.flux",
        integrate_pass: "shoal.wave.integrate",
        advection_scale: 0.0,
        velocity_scale: 1.0,
    },
];

/// Interned pass ids for one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverPasses {
    /// Flux pass.
    pub flux: KernelId,
    /// Integration pass.
    pub integrate: KernelId,
}

impl SimulationKind {
    /// Every kind.
    pub const ALL: [SimulationKind; 3] = [Self::ShallowWater, Self::Viscous, Self::Wave];

    /// The kind's constants.
    pub fn params(self) -> &'static KindParams {
        &PARAMS[self as usize]
    }

    /// Intern this kind's pass names.
    pub fn resolve_passes(self, table: &mut KernelTable) -> SolverPasses {
        let p = self.params();
        SolverPasses {
            flux: table.intern(p.flux_pass),
            integrate: table.intern(p.integrate_pass),
        }
    }
}
