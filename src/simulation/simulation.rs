use std::fmt::Display;
use std::sync::Mutex;

use num_traits::Float;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    boundary::DomainBounds,
    concurrency::par_iter_mut1,
    floating_type_mod::FT,
    neighborhood_search::NeighborhoodCache,
    particle::Particle,
    simulation_parameters::{ConfigError, SimulationParams},
    vec2f, V2,
};

/// Below this center distance two particles count as coincident and the
/// separation correction is skipped, since the push direction is undefined.
const DEGENERATE_DELTA: FT = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDomain {
    pub width: FT,
    pub height: FT,
}

/// One rectangular grid of particles. Every row is shifted horizontally by an
/// own uniform sample scaled with `row_jitter` so columns do not start out
/// perfectly aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFluidBlock {
    pub origin: [FT; 2],
    pub rows: usize,
    pub columns: usize,
    pub spacing: FT,
    pub row_jitter: FT,
}

impl SceneFluidBlock {
    fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub domain: SceneDomain,
    pub blocks: Vec<SceneFluidBlock>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            domain: SceneDomain {
                width: 1920.,
                height: 980.,
            },
            blocks: vec![SceneFluidBlock {
                origin: [90., 0.],
                rows: 32,
                columns: 17,
                spacing: 30.,
                row_jitter: 1.,
            }],
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.domain.width.is_finite() || self.domain.width <= 0. {
            return Err(ConfigError::InvalidScene(format!(
                "domain width must be positive and finite, got {}",
                self.domain.width
            )));
        }
        if !self.domain.height.is_finite() || self.domain.height <= 0. {
            return Err(ConfigError::InvalidScene(format!(
                "domain height must be positive and finite, got {}",
                self.domain.height
            )));
        }

        for (block_idx, block) in self.blocks.iter().enumerate() {
            if block.is_empty() {
                continue;
            }
            if !block.spacing.is_finite() || block.spacing <= 0. {
                return Err(ConfigError::InvalidScene(format!(
                    "block {}: spacing must be positive and finite, got {}",
                    block_idx, block.spacing
                )));
            }
            for v in [block.origin[0], block.origin[1], block.row_jitter] {
                if !v.is_finite() {
                    return Err(ConfigError::InvalidScene(format!(
                        "block {}: origin and row_jitter must be finite",
                        block_idx
                    )));
                }
            }
        }

        Ok(())
    }
}

fn add_fluid_block(block: &SceneFluidBlock, rng: &mut StdRng, particles: &mut Vec<Particle>) {
    for row in 0..block.rows {
        // one jitter sample per row, drawn from the shared stream
        let row_offset = rng.gen::<FT>() * block.row_jitter;
        for column in 0..block.columns {
            particles.push(Particle::at_rest(vec2f(
                block.origin[0] + column as FT * block.spacing + row_offset,
                block.origin[1] + row as FT * block.spacing,
            )));
        }
    }
}

pub struct FluidSimulation {
    pub particles: Vec<Particle>,
    pub neighs: NeighborhoodCache,
    pub bounds: DomainBounds,
    pub params: SimulationParams,

    /// Simulated time, advanced by `dt` per step.
    pub time: FT,

    rng: Mutex<StdRng>,

    step_number: usize,
}

impl FluidSimulation {
    pub fn new(params: SimulationParams, scene_config: &SceneConfig) -> Result<Self, ConfigError> {
        params.validate()?;
        scene_config.validate()?;

        let mut rng: StdRng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut particles = Vec::new();
        for block in &scene_config.blocks {
            add_fluid_block(block, &mut rng, &mut particles);
        }

        let num_particles = particles.len();

        Ok(FluidSimulation {
            particles,
            neighs: NeighborhoodCache::new(num_particles),
            bounds: DomainBounds {
                width: scene_config.domain.width,
                height: scene_config.domain.height,
                seabed_gradient: params.seabed_gradient,
                seabed_start_x: params.seabed_start_x,
            },
            params,
            time: 0.,
            rng: Mutex::new(rng),
            step_number: 0,
        })
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn step_number(&self) -> usize {
        self.step_number
    }

    /// Committed particle positions after the last step, for renderers and
    /// exporters. Exposes nothing of velocity, neighbor lists or the solver.
    pub fn positions<'a>(&'a self) -> impl Iterator<Item = V2> + 'a {
        self.particles.iter().map(|p| p.start_position)
    }

    /// Advance the simulation by one step of `dt`.
    ///
    /// Phase order is fixed: integrate, find neighbors, relax separation
    /// constraints, inject heat, clamp to the domain, reconcile velocities.
    pub fn single_step(&mut self) {
        self.integrate();
        self.neighs
            .build_brute_force(&self.particles, self.params.radius_of_interest);
        self.relax_separation_constraints();
        self.apply_heat();
        self.enforce_bounds();
        self.reconcile_velocities();

        self.time += self.params.dt;
        self.step_number += 1;
    }

    /// Gravity and damping on velocities, then predict tentative positions.
    fn integrate(&mut self) {
        let params = self.params;
        par_iter_mut1(&mut self.particles, |_, p| {
            p.velocity += params.gravity * params.dt;
            p.velocity *= params.damping;
            p.end_position = p.start_position + p.velocity * params.dt;
        });
    }

    /// Gauss-Seidel relaxation of pairwise separation violations.
    ///
    /// Deliberately sequential in store index order: the correction for
    /// particle i+1 must see the already-updated position of particle i
    /// within the same pass. Neighbor lists stay frozen across passes.
    fn relax_separation_constraints(&mut self) {
        let target_separation = self.params.target_separation;
        let target_separation_sq = target_separation * target_separation;
        let stiffness = self.params.stiffness;

        let particles = &mut self.particles;
        let neighs = &self.neighs;

        for _pass in 0..self.params.iteration_count {
            for i in 0..particles.len() {
                for j in neighs.iter(i) {
                    let neighbour_pos = particles[j].end_position;
                    let delta = particles[i].end_position - neighbour_pos;
                    let dist_sq = delta.norm_squared();

                    if dist_sq < target_separation_sq {
                        let dist = dist_sq.sqrt();
                        if dist <= DEGENERATE_DELTA {
                            // coincident pair, no defined push direction
                            continue;
                        }
                        let error = target_separation - dist;
                        particles[i].end_position += delta / dist * (error * stiffness);
                    }
                }
            }
        }
    }

    /// Uniform positional jitter from the shared random stream.
    fn apply_heat(&mut self) {
        let heat_constant = self.params.heat_constant;

        // sequential loop, one shared stream: the draw order must stay
        // deterministic; any parallel caller has to go through this mutex
        let mut rng = self.rng.lock().unwrap();
        for p in &mut self.particles {
            p.end_position.x += (rng.gen::<FT>() - 0.5) * heat_constant;
            p.end_position.y += (rng.gen::<FT>() - 0.5) * heat_constant;
        }
    }

    fn enforce_bounds(&mut self) {
        let bounds = self.bounds;
        par_iter_mut1(&mut self.particles, |_, p| {
            bounds.clamp(&mut p.end_position);
        });
    }

    /// Standard PBD velocity-from-displacement reconstruction; commits the
    /// tentative position as the base for the next step.
    fn reconcile_velocities(&mut self) {
        let dt = self.params.dt;
        par_iter_mut1(&mut self.particles, |_, p| {
            p.velocity = (p.end_position - p.start_position) / dt;
            p.start_position = p.end_position;
        });
    }
}

pub fn is_ft_approx_eq<FT: Float>(a: FT, b: FT, tolerance: FT) -> bool {
    assert!(!a.is_nan());
    assert!(!b.is_nan());
    b <= a + tolerance && b >= a - tolerance
}

pub fn assert_ft_approx_eq<FT: Float + Display>(a: FT, b: FT, tolerance: FT, s: impl FnOnce() -> String) {
    if !is_ft_approx_eq(a, b, tolerance) {
        panic!(
            "{} value not equal with a tolerance of {}:\n\ta={}\n\tb={}\n",
            s(),
            tolerance,
            a,
            b
        );
    }
}

// ---------------------------------------------------------------------------
// tests

/// Parameters with gravity, heat and damping neutralized so only the solver
/// moves particles.
#[cfg(test)]
fn quiet_params() -> SimulationParams {
    SimulationParams {
        gravity: vec2f(0., 0.),
        heat_constant: 0.,
        damping: 1.,
        seed: Some(0),
        ..SimulationParams::default()
    }
}

/// Scene with a single row of `columns` particles spaced `spacing` apart,
/// starting at x=100, y=100 (far from every domain boundary).
#[cfg(test)]
fn single_row_scene(columns: usize, spacing: FT) -> SceneConfig {
    SceneConfig {
        blocks: vec![SceneFluidBlock {
            origin: [100., 100.],
            rows: 1,
            columns,
            spacing,
            row_jitter: 0.,
        }],
        ..SceneConfig::default()
    }
}

#[test]
fn step_commits_end_position_as_start_position() {
    let mut sim = FluidSimulation::new(
        SimulationParams {
            seed: Some(7),
            ..SimulationParams::default()
        },
        &SceneConfig::default(),
    )
    .unwrap();

    for _ in 0..3 {
        sim.single_step();
        for p in &sim.particles {
            assert_eq!(p.start_position, p.end_position);
        }
    }
    assert_eq!(sim.step_number(), 3);
    assert_ft_approx_eq(sim.time, 3. * sim.params.dt, 1e-6, || "simulated time".into());
}

#[test]
fn solver_uses_sequentially_updated_positions() {
    // two particles 19 apart with target separation 20, one pass, stiffness
    // 0.5: particle 0 moves to 99.5 first, particle 1 then reacts to the
    // *updated* distance 19.5, ending at 119.25. A simultaneous (Jacobi)
    // update would put particle 1 at 119.5 instead.
    let mut params = quiet_params();
    params.iteration_count = 1;
    params.stiffness = 0.5;

    let mut sim = FluidSimulation::new(params, &single_row_scene(2, 19.)).unwrap();
    sim.single_step();

    assert_ft_approx_eq(sim.particles[0].start_position.x, 99.5, 1e-4, || "p0.x".into());
    assert_ft_approx_eq(sim.particles[1].start_position.x, 119.25, 1e-4, || "p1.x".into());
    assert_ft_approx_eq(sim.particles[0].start_position.y, 100., 1e-4, || "p0.y".into());
    assert_ft_approx_eq(sim.particles[1].start_position.y, 100., 1e-4, || "p1.y".into());
}

#[test]
fn separation_relaxes_monotonically_without_overshoot() {
    let target_separation = SimulationParams::default().target_separation;
    let initial_distance = target_separation - 1.;

    let mut last_distance = initial_distance;
    for stiffness in [0.2, 0.5, 0.8, 1.0] {
        let mut params = quiet_params();
        params.iteration_count = 1;
        params.stiffness = stiffness;

        let mut sim = FluidSimulation::new(params, &single_row_scene(2, initial_distance)).unwrap();
        sim.single_step();

        let distance = (sim.particles[1].start_position - sim.particles[0].start_position).norm();
        assert!(distance > initial_distance);
        assert!(distance >= last_distance);
        assert!(distance <= target_separation + 1e-4);
        last_distance = distance;
    }

    // more passes converge further, still without overshoot
    let mut params = quiet_params();
    params.iteration_count = 8;
    params.stiffness = 1.0;
    let mut sim = FluidSimulation::new(params, &single_row_scene(2, initial_distance)).unwrap();
    sim.single_step();
    let distance = (sim.particles[1].start_position - sim.particles[0].start_position).norm();
    assert_ft_approx_eq(distance, target_separation, 1e-3, || "converged distance".into());
}

#[test]
fn fixed_seed_runs_are_bit_identical() {
    let params = SimulationParams {
        seed: Some(42),
        ..SimulationParams::default()
    };
    let scene = SceneConfig {
        blocks: vec![SceneFluidBlock {
            origin: [90., 0.],
            rows: 6,
            columns: 5,
            spacing: 30.,
            row_jitter: 1.,
        }],
        ..SceneConfig::default()
    };

    let mut sim_a = FluidSimulation::new(params, &scene).unwrap();
    let mut sim_b = FluidSimulation::new(params, &scene).unwrap();

    for _ in 0..25 {
        sim_a.single_step();
        sim_b.single_step();
    }

    for (pa, pb) in sim_a.particles.iter().zip(sim_b.particles.iter()) {
        assert_eq!(pa.start_position, pb.start_position);
        assert_eq!(pa.velocity, pb.velocity);
    }
}

#[test]
fn zero_particle_simulation_steps_without_error() {
    let scene = SceneConfig {
        blocks: vec![],
        ..SceneConfig::default()
    };
    let mut sim = FluidSimulation::new(quiet_params(), &scene).unwrap();
    for _ in 0..3 {
        sim.single_step();
    }
    assert_eq!(sim.num_particles(), 0);
    assert_eq!(sim.positions().count(), 0);
}

#[test]
fn single_particle_falls_and_rests_on_floor() {
    let mut sim = FluidSimulation::new(
        SimulationParams {
            heat_constant: 0.,
            seed: Some(1),
            ..SimulationParams::default()
        },
        &single_row_scene(1, 30.),
    )
    .unwrap();

    for _ in 0..2000 {
        sim.single_step();
    }

    assert_eq!(sim.num_particles(), 1);
    let p = sim.particles[0].start_position;
    assert!(p.x.is_finite() && p.y.is_finite());
    assert_ft_approx_eq(p.y, sim.bounds.floor_y(p.x), 1e-3, || "rest height".into());
}

#[test]
fn coincident_particles_stay_finite() {
    // two 1x1 blocks at the same origin give two exactly coincident
    // particles; the solver must skip the undefined push direction instead
    // of producing NaN
    let block = SceneFluidBlock {
        origin: [200., 200.],
        rows: 1,
        columns: 1,
        spacing: 30.,
        row_jitter: 0.,
    };
    let scene = SceneConfig {
        blocks: vec![block.clone(), block],
        ..SceneConfig::default()
    };

    let mut sim = FluidSimulation::new(quiet_params(), &scene).unwrap();
    for _ in 0..5 {
        sim.single_step();
    }

    for p in &sim.particles {
        assert!(p.start_position.x.is_finite());
        assert!(p.start_position.y.is_finite());
        assert!(p.velocity.x.is_finite());
        assert!(p.velocity.y.is_finite());
    }
}

#[test]
fn block_layout_offsets_whole_rows() {
    let scene = SceneConfig {
        blocks: vec![SceneFluidBlock {
            origin: [90., 10.],
            rows: 3,
            columns: 4,
            spacing: 30.,
            row_jitter: 1.,
        }],
        ..SceneConfig::default()
    };
    let sim = FluidSimulation::new(
        SimulationParams {
            seed: Some(5),
            ..SimulationParams::default()
        },
        &scene,
    )
    .unwrap();

    assert_eq!(sim.num_particles(), 12);

    for row in 0..3 {
        let row_particles = &sim.particles[row * 4..(row + 1) * 4];
        let row_offset = row_particles[0].start_position.x - 90.;
        assert!((0. ..1.).contains(&row_offset));

        for (column, p) in row_particles.iter().enumerate() {
            assert_ft_approx_eq(
                p.start_position.x,
                90. + column as FT * 30. + row_offset,
                1e-4,
                || format!("x of row {} column {}", row, column),
            );
            assert_ft_approx_eq(p.start_position.y, 10. + row as FT * 30., 1e-4, || {
                format!("y of row {}", row)
            });
        }
    }
}

#[test]
fn invalid_scene_is_rejected_at_construction() {
    let mut scene = SceneConfig::default();
    scene.domain.width = 0.;
    assert!(FluidSimulation::new(SimulationParams::default(), &scene).is_err());

    let mut scene = SceneConfig::default();
    scene.blocks[0].spacing = 0.;
    assert!(FluidSimulation::new(SimulationParams::default(), &scene).is_err());

    // spacing of an empty block is never used and not checked
    let mut scene = SceneConfig::default();
    scene.blocks[0].rows = 0;
    scene.blocks[0].spacing = 0.;
    assert!(FluidSimulation::new(SimulationParams::default(), &scene).is_ok());
}

#[test]
fn scene_yaml_roundtrip() {
    let scene = SceneConfig::default();
    let yaml = serde_yaml::to_string(&scene).unwrap();
    let back: SceneConfig = serde_yaml::from_str(&yaml).unwrap();

    assert_eq!(back.domain.width, scene.domain.width);
    assert_eq!(back.domain.height, scene.domain.height);
    assert_eq!(back.blocks.len(), 1);
    assert_eq!(back.blocks[0].rows, 32);
    assert_eq!(back.blocks[0].columns, 17);
    assert_eq!(back.blocks[0].spacing, 30.);
}

#[test]
fn neighbor_lists_reflect_post_integration_positions() {
    // a crowded pair at x=100/119 plus a bystander at x=139.95, just inside
    // the interaction radius of particle 0. The solver pushes particle 0
    // left past the radius, but the lists kept for rendering/debugging must
    // still reflect the distances right after integration
    let scene = SceneConfig {
        blocks: vec![
            SceneFluidBlock {
                origin: [100., 100.],
                rows: 1,
                columns: 2,
                spacing: 19.,
                row_jitter: 0.,
            },
            SceneFluidBlock {
                origin: [139.95, 100.],
                rows: 1,
                columns: 1,
                spacing: 30.,
                row_jitter: 0.,
            },
        ],
        ..SceneConfig::default()
    };

    let mut sim = FluidSimulation::new(quiet_params(), &scene).unwrap();
    sim.single_step();

    // after the step the pair 0/2 is farther apart than the radius
    let final_dist = (sim.particles[2].start_position - sim.particles[0].start_position).norm();
    assert!(final_dist > sim.params.radius_of_interest);

    // yet the frozen lists still pair them up
    assert_eq!(sim.neighs.iter(0).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(sim.neighs.iter(1).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(sim.neighs.iter(2).collect::<Vec<_>>(), vec![0, 1]);
}
