use super::config::ProbeRelaxation;
use super::error::EngineError;
use super::ionic_minimizer::IonicRelaxer;
use super::lattice_state::LatticeState;
use super::state::{SimulationState, UpdateMode};
use super::strain_basis::StrainBasis;
use tracing::{debug, info};

/// Fourth-order central difference of `f` at zero:
/// `(f(-2h) - 8 f(-h) + 8 f(h) - f(2h)) / 12h`.
pub fn central_difference<E>(
    h: f64,
    mut f: impl FnMut(f64) -> Result<f64, E>,
) -> Result<f64, E> {
    let e_m2 = f(-2.0 * h)?;
    let e_m1 = f(-h)?;
    let e_p1 = f(h)?;
    let e_p2 = f(2.0 * h)?;
    Ok((e_m2 - 8.0 * e_m1 + 8.0 * e_p1 - e_p2) / (12.0 * h))
}

/// Derivative of the free energy along every basis direction at the current strain.
///
/// Costs four probe evaluations per basis vector, each one a propagate that
/// skips the electronic term plus, unless probes are frozen, a nested ionic
/// relaxation. The electronic term is constant across probes and drops out of
/// the difference. Every probe
/// starts from the ionic positions at the unperturbed strain and those
/// positions are put back afterwards. The lattice-dependent state is left at
/// the last probe cell; callers re-propagate at the current strain.
pub fn evaluate_stress(
    state: &mut SimulationState,
    relaxer: &mut dyn IonicRelaxer,
    lattice: &LatticeState,
    basis: &StrainBasis,
    h: f64,
    relaxation: ProbeRelaxation,
) -> Result<Vec<f64>, EngineError> {
    let n_probes = 4 * basis.dimension();
    match relaxation {
        ProbeRelaxation::Relaxed => info!(
            "Computing stress along {} strain directions ({n_probes} nested ionic relaxations).",
            basis.dimension()
        ),
        ProbeRelaxation::Frozen => info!(
            "Computing clamped-ion stress along {} strain directions ({n_probes} energy evaluations).",
            basis.dimension()
        ),
    }

    let snapshot = state.ions().positions().to_vec();
    let mut stress = Vec::with_capacity(basis.dimension());
    for (k, direction) in basis.vectors().iter().enumerate() {
        let component = central_difference::<EngineError>(h, |t| {
            let strain = lattice.strain() + direction * t;
            state.ions_mut().set_positions(&snapshot);
            state.propagate(&lattice.cell_at(&strain), UpdateMode::SkipElectronic)?;
            if relaxation == ProbeRelaxation::Relaxed {
                relaxer.relax(state)?;
            }
            Ok(state.free_energy())
        })?;
        debug!(direction = k, stress = component, "Stress component evaluated.");
        stress.push(component);
    }
    state.ions_mut().set_positions(&snapshot);
    Ok(stress)
}
