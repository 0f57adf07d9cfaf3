use cellrelax::core::forcefield::coulomb::CoulombParams;
use cellrelax::engine::config::ProbeRelaxation;
use cellrelax::engine::minimize::MinimizeParams;

pub struct DefaultsConfig {
    pub move_scale: [f64; 3],
    pub max_allowed_strain: f64,
    pub fd_step: f64,
    pub probe_relaxation: ProbeRelaxation,
    pub lattice_minimize: MinimizeParams,
    pub ionic_minimize: MinimizeParams,
    pub coulomb: CoulombParams,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            move_scale: [1.0, 1.0, 1.0],
            max_allowed_strain: 0.5,
            fd_step: 1e-5,
            probe_relaxation: ProbeRelaxation::Relaxed,
            lattice_minimize: MinimizeParams {
                n_iterations: 50,
                label: "LatticeMinimize".to_string(),
                ..MinimizeParams::default()
            },
            ionic_minimize: MinimizeParams {
                n_iterations: 100,
                alpha_t_start: 1e-3,
                label: "IonicMinimize".to_string(),
                ..MinimizeParams::default()
            },
            coulomb: CoulombParams::default(),
        }
    }
}
