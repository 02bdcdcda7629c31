//! Genetic-algorithm engine.
//!
//! One call to [`Engine::step`] is one generation tick:
//! modifier bookkeeping, optional forced pause, tournament selection with
//! elitism, midpoint crossover, mutation, fitness evaluation and target aging.

use glam::Vec3;
use tracing::{debug, info};

use crate::config::{ConfigError, EngineConfig};
use crate::deps::Dependencies;
use crate::geometry::{place_points_inside, sphere_points, ShellParams};
use crate::genome::{Genome, GenomeUid, Neuron, NeuronId};
use crate::modifiers::{
    FitnessTerms, ModifierId, ModifierSet, ModifierState, MutationParams, ProximityTerm,
};
use crate::prng::Prng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const TOURNAMENT_SIZE: usize = 3;
pub const REWARD_RADIUS: f32 = 100.0;
pub const REWARD_RADIUS_SQ: f32 = REWARD_RADIUS * REWARD_RADIUS;
pub const OVERLAP_RADIUS_SQ: f32 = 20.0 * 20.0;
pub const OVERLAP_PENALTY: f32 = 50.0;
pub const CONNECTION_BONUS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetPoint {
    pub position: Vec3,
    pub age: u64,
}

impl TargetPoint {
    pub fn new(position: Vec3) -> Self {
        Self { position, age: 0 }
    }
}

/// Everything fitness depends on besides the genome itself.
#[derive(Clone, Copy)]
pub struct FitnessContext<'a> {
    pub targets: &'a [TargetPoint],
    pub modifiers: &'a ModifierSet,
    pub state: &'a ModifierState,
}

/// Score one genome. `noise` is the genome's draw from the engine stream.
///
/// Order of application: per-(neuron, target) proximity multipliers in
/// ascending modifier id, then term adjustments in ascending id, then total
/// adjustments in ascending id.
pub fn evaluate_fitness(genome: &Genome, ctx: &FitnessContext, noise: f32) -> f32 {
    evaluate_terms(genome, ctx, noise)
        .map(|terms| ctx.modifiers.adjust_total(terms.total()))
        .unwrap_or(0.0)
}

/// Fitness terms after term adjustments; `None` for an empty genome.
pub fn evaluate_terms(genome: &Genome, ctx: &FitnessContext, noise: f32) -> Option<FitnessTerms> {
    if genome.neurons.is_empty() {
        return None;
    }

    let has_hooks = ctx.modifiers.has_proximity_hooks();
    let mut proximity = 0.0f32;
    for neuron in &genome.neurons {
        for (ti, target) in ctx.targets.iter().enumerate() {
            let d2 = neuron.position.distance_squared(target.position);
            if d2 >= REWARD_RADIUS_SQ {
                continue;
            }
            let distance = d2.sqrt();
            let mut reward = REWARD_RADIUS - distance;
            if has_hooks {
                reward *= ctx.modifiers.proximity_factor(&ProximityTerm {
                    neuron,
                    target_index: ti,
                    target_age: target.age,
                    distance,
                    noise,
                    attention: ctx.state.sustained_attention,
                });
            }
            proximity += reward;
        }
    }

    let mut overlaps = 0usize;
    for (i, a) in genome.neurons.iter().enumerate() {
        for b in &genome.neurons[i + 1..] {
            if a.position.distance_squared(b.position) < OVERLAP_RADIUS_SQ {
                overlaps += 1;
            }
        }
    }

    let mut terms = FitnessTerms {
        proximity,
        connectivity: CONNECTION_BONUS * genome.connections.len() as f32,
        overlap_penalty: OVERLAP_PENALTY * overlaps as f32,
    };
    ctx.modifiers.adjust_terms(&mut terms);
    Some(terms)
}

/// Midpoint crossover.
///
/// Neurons `[0, mid)` come from `a`, the rest from `b` (`mid = a.len() / 2`);
/// ids are renumbered `0..N`. Connection slots are coin-flipped between the
/// parents and any connection pointing outside `0..N` is dropped.
pub fn crossover(a: &Genome, b: &Genome, uid: GenomeUid, rng: &mut Prng) -> Genome {
    let mid = a.neurons.len() / 2;
    let mut neurons: Vec<Neuron> = Vec::with_capacity(mid + b.neurons.len().saturating_sub(mid));
    neurons.extend(a.neurons.iter().take(mid).cloned());
    neurons.extend(b.neurons.iter().skip(mid).cloned());
    for (i, n) in neurons.iter_mut().enumerate() {
        n.id = i as NeuronId;
    }

    let n = neurons.len() as NeuronId;
    let slots = a.connections.len().max(b.connections.len());
    let mut connections = Vec::with_capacity(slots);
    for i in 0..slots {
        let pick = if rng.coin() {
            a.connections.get(i)
        } else {
            b.connections.get(i)
        };
        if let Some(c) = pick {
            if c.from < n && c.to < n {
                connections.push(*c);
            }
        }
    }

    let mut child = Genome::new(uid, neurons, connections);
    child.generation = a.generation.max(b.generation) + 1;
    child.parent = Some(a.uid);
    child
}

/// Perturb positions and topology in place. Returns how many neurons moved.
pub fn mutate(genome: &mut Genome, params: &MutationParams, position_step: f32, rng: &mut Prng) -> usize {
    let step = position_step * params.position_scale;
    let mut moved = 0;
    for (i, neuron) in genome.neurons.iter_mut().enumerate() {
        if params.is_locked(i) || !rng.chance(params.rate) {
            continue;
        }
        let offset = Vec3::new(
            rng.gen_range_f32(-step, step),
            rng.gen_range_f32(-step, step),
            rng.gen_range_f32(-step, step),
        );
        if offset != Vec3::ZERO {
            neuron.position += offset;
            moved += 1;
        }
    }

    let roll = rng.next_f32_01();
    if roll < params.add_connection_prob {
        genome.add_random_connection(rng);
    } else if roll < params.add_connection_prob + params.remove_connection_prob {
        genome.remove_random_connection(rng);
    }
    moved
}

/// Draw `k` indices with replacement; keep the fittest (first wins ties).
pub fn tournament_select(population: &[Genome], k: usize, rng: &mut Prng) -> usize {
    let mut best = rng.gen_range_usize(0, population.len());
    for _ in 1..k.max(1) {
        let i = rng.gen_range_usize(0, population.len());
        if population[i].fitness > population[best].fitness {
            best = i;
        }
    }
    best
}

fn best_index(population: &[Genome]) -> usize {
    let mut best = 0;
    for (i, g) in population.iter().enumerate().skip(1) {
        if g.fitness > population[best].fitness {
            best = i;
        }
    }
    best
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepReport {
    pub tick: u64,
    pub generation: u64,
    pub paused: bool,
    pub best_fitness: f32,
    pub mean_fitness: f32,
    pub targets_regenerated: bool,
}

pub struct Engine {
    cfg: EngineConfig,
    deps: Dependencies,
    rng: Prng,

    population: Vec<Genome>,
    best: Genome,
    evaluated: bool,
    generation: u64,
    next_uid: GenomeUid,

    targets: Vec<TargetPoint>,
    modifiers: ModifierSet,
    modifier_state: ModifierState,

    last_report: Option<StepReport>,
    history: Vec<f32>,
}

impl Engine {
    pub fn new(cfg: EngineConfig, deps: Dependencies) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let mut rng = Prng::new(cfg.seed.unwrap_or(1));

        let mut next_uid: GenomeUid = 1;
        let mut population = Vec::with_capacity(cfg.population_size);
        for _ in 0..cfg.population_size {
            let positions = spawn_positions(&cfg, &deps, &mut rng);
            population.push(Genome::random(next_uid, &positions, cfg.initial_connections, &mut rng));
            next_uid += 1;
        }
        let targets = random_targets(&cfg, &mut rng);
        let best = population[0].clone();

        info!(
            "engine: population {} × {} neurons, {} targets",
            cfg.population_size,
            cfg.neurons_per_genome,
            targets.len()
        );

        Ok(Self {
            cfg,
            deps,
            rng,
            population,
            best,
            evaluated: false,
            generation: 0,
            next_uid,
            targets,
            modifiers: ModifierSet::new(),
            modifier_state: ModifierState::default(),
            last_report: None,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn best(&self) -> &Genome {
        &self.best
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tick(&self) -> u64 {
        self.modifier_state.tick
    }

    pub fn targets(&self) -> &[TargetPoint] {
        &self.targets
    }

    pub fn modifiers(&self) -> &ModifierSet {
        &self.modifiers
    }

    pub fn modifier_state(&self) -> &ModifierState {
        &self.modifier_state
    }

    pub fn sustained_attention(&self) -> f32 {
        self.modifier_state.sustained_attention
    }

    pub fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// Best fitness after each completed generation.
    pub fn history(&self) -> &[f32] {
        &self.history
    }

    /// Queue a modifier change; it takes effect at the start of the next tick.
    pub fn set_modifier(&mut self, id: ModifierId, active: bool) -> bool {
        self.modifiers.request(id, active)
    }

    /// Replace the target set (ages start at zero).
    pub fn set_targets(&mut self, positions: &[Vec3]) {
        self.targets = positions.iter().copied().map(TargetPoint::new).collect();
        self.evaluated = false;
    }

    pub fn regenerate_targets(&mut self) {
        self.targets = random_targets(&self.cfg, &mut self.rng);
        self.modifiers.on_targets_regenerated(&mut self.modifier_state);
        self.evaluated = false;
    }

    /// Base mutation parameters after active modifiers.
    pub fn mutation_params(&self) -> MutationParams {
        self.modifiers.adjust_mutation(MutationParams {
            rate: self.cfg.base_mutation_rate,
            position_scale: 1.0,
            add_connection_prob: self.cfg.add_connection_prob,
            remove_connection_prob: self.cfg.remove_connection_prob,
            lock_stride: None,
        })
    }

    fn fitness_context(&self) -> FitnessContext<'_> {
        FitnessContext {
            targets: &self.targets,
            modifiers: &self.modifiers,
            state: &self.modifier_state,
        }
    }

    fn evaluate_population(&mut self) {
        // Noise is drawn up front so evaluation order cannot change results.
        let noise: Vec<f32> = (0..self.population.len())
            .map(|_| self.rng.next_f32_01())
            .collect();
        let ctx = FitnessContext {
            targets: &self.targets,
            modifiers: &self.modifiers,
            state: &self.modifier_state,
        };

        #[cfg(feature = "parallel")]
        self.population
            .par_iter_mut()
            .zip(noise.par_iter())
            .for_each(|(g, n)| g.fitness = evaluate_fitness(g, &ctx, *n));

        #[cfg(not(feature = "parallel"))]
        for (g, n) in self.population.iter_mut().zip(noise.iter()) {
            g.fitness = evaluate_fitness(g, &ctx, *n);
        }

        self.best = self.population[best_index(&self.population)].clone();
        self.evaluated = true;
    }

    /// Fitness of `genome` under the current targets and modifiers.
    pub fn score(&self, genome: &Genome, noise: f32) -> f32 {
        evaluate_fitness(genome, &self.fitness_context(), noise)
    }

    /// Apply queued modifier changes without advancing a tick.
    ///
    /// Past scores are left as they are; the new set is used from the next
    /// evaluation on.
    pub fn commit_modifiers(&mut self) -> usize {
        self.modifiers.commit()
    }

    /// Advance one generation tick and return the best genome.
    pub fn step(&mut self) -> &Genome {
        self.commit_modifiers();
        self.modifiers.advance_state(&mut self.modifier_state);
        let tick = self.modifier_state.tick;

        if self.modifier_state.is_paused() {
            self.modifier_state.consume_pause();
            for t in &mut self.targets {
                t.age += 1;
            }
            self.last_report = Some(StepReport {
                tick,
                generation: self.generation,
                paused: true,
                best_fitness: self.best.fitness,
                mean_fitness: mean_fitness(&self.population),
                targets_regenerated: false,
            });
            return &self.best;
        }

        if !self.evaluated {
            self.evaluate_population();
        }

        let params = self.mutation_params();
        let size = self.population.len();
        let mut next = Vec::with_capacity(size);

        let mut elite = self.best.clone();
        elite.generation = self.generation + 1;
        next.push(elite);

        while next.len() < size {
            let a = tournament_select(&self.population, TOURNAMENT_SIZE, &mut self.rng);
            let b = tournament_select(&self.population, TOURNAMENT_SIZE, &mut self.rng);
            let uid = self.next_uid;
            self.next_uid += 1;
            let mut child = crossover(&self.population[a], &self.population[b], uid, &mut self.rng);
            mutate(&mut child, &params, self.cfg.position_step, &mut self.rng);
            child.generation = self.generation + 1;
            next.push(child);
        }

        self.population = next;
        self.generation += 1;
        self.evaluate_population();

        for t in &mut self.targets {
            t.age += 1;
        }

        let regenerated = std::mem::take(&mut self.modifier_state.regenerate_targets);
        if regenerated {
            self.regenerate_targets();
        }

        let report = StepReport {
            tick,
            generation: self.generation,
            paused: false,
            best_fitness: self.best.fitness,
            mean_fitness: mean_fitness(&self.population),
            targets_regenerated: regenerated,
        };
        debug!(
            "generation {}: best {:.1} mean {:.1} ({} connections)",
            report.generation,
            report.best_fitness,
            report.mean_fitness,
            self.best.connections.len()
        );
        self.history.push(report.best_fitness);
        self.last_report = Some(report);
        &self.best
    }
}

fn mean_fitness(population: &[Genome]) -> f32 {
    if population.is_empty() {
        return 0.0;
    }
    population.iter().map(|g| g.fitness).sum::<f32>() / population.len() as f32
}

fn spawn_positions(cfg: &EngineConfig, deps: &Dependencies, rng: &mut Prng) -> Vec<Vec3> {
    match deps.silhouette() {
        Some(s) => {
            let params = ShellParams {
                max_radius: cfg.world_radius,
                ..ShellParams::default()
            };
            place_points_inside(&**s, cfg.neurons_per_genome, cfg.world_radius * 0.5, &params, rng).points
        }
        None => sphere_points(cfg.neurons_per_genome, cfg.world_radius, rng),
    }
}

fn random_targets(cfg: &EngineConfig, rng: &mut Prng) -> Vec<TargetPoint> {
    sphere_points(cfg.target_count, cfg.world_radius * 0.8, rng)
        .into_iter()
        .map(TargetPoint::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{Connection, NeuronKind, Region};
    use crate::modifiers::{ATTENTION_DECAY, BREAK_WINDOW, CROWDING_TOLERANCE, HIPPOCAMPAL_BOOST};

    fn genome_at(uid: GenomeUid, positions: &[Vec3]) -> Genome {
        let neurons = positions
            .iter()
            .enumerate()
            .map(|(i, p)| Neuron::new(i as NeuronId, *p, NeuronKind::Soma, Region::Cortex))
            .collect();
        Genome::new(uid, neurons, Vec::new())
    }

    fn ctx<'a>(targets: &'a [TargetPoint], mods: &'a ModifierSet, state: &'a ModifierState) -> FitnessContext<'a> {
        FitnessContext {
            targets,
            modifiers: mods,
            state,
        }
    }

    fn engine(seed: u64) -> Engine {
        let cfg = EngineConfig::default().with_population(10, 12).with_seed(seed);
        Engine::new(cfg, Dependencies::default()).expect("valid config")
    }

    #[test]
    fn empty_genome_scores_zero() {
        let targets = [TargetPoint::new(Vec3::ZERO)];
        let mods = ModifierSet::new();
        let state = ModifierState::default();
        assert_eq!(evaluate_fitness(&Genome::empty(1), &ctx(&targets, &mods, &state), 0.5), 0.0);
    }

    #[test]
    fn proximity_reward_and_overlap_penalty() {
        let targets = [TargetPoint::new(Vec3::ZERO)];
        let mods = ModifierSet::new();
        let state = ModifierState::default();

        // One neuron 30 units from the target: reward 70.
        let single = genome_at(1, &[Vec3::new(30.0, 0.0, 0.0)]);
        assert!((evaluate_fitness(&single, &ctx(&targets, &mods, &state), 0.0) - 70.0).abs() < 1e-4);

        // Two neurons 10 apart, both rewarded, one overlapping pair.
        let pair = genome_at(2, &[Vec3::new(30.0, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0)]);
        let f = evaluate_fitness(&pair, &ctx(&targets, &mods, &state), 0.0);
        assert!((f - (70.0 + 60.0 - OVERLAP_PENALTY)).abs() < 1e-4);

        // Out of range: nothing.
        let far = genome_at(3, &[Vec3::new(150.0, 0.0, 0.0)]);
        assert_eq!(evaluate_fitness(&far, &ctx(&targets, &mods, &state), 0.0), 0.0);
    }

    #[test]
    fn connections_add_bonus() {
        let targets: [TargetPoint; 0] = [];
        let mods = ModifierSet::new();
        let state = ModifierState::default();
        let mut g = genome_at(1, &[Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0)]);
        g.connections.push(Connection { from: 0, to: 1, weight: 0.3 });
        assert_eq!(evaluate_fitness(&g, &ctx(&targets, &mods, &state), 0.0), CONNECTION_BONUS);
    }

    #[test]
    fn crowding_tolerance_halves_penalty() {
        let targets: [TargetPoint; 0] = [];
        let mut mods = ModifierSet::new();
        mods.request(CROWDING_TOLERANCE, true);
        mods.commit();
        let state = ModifierState::default();
        let g = genome_at(1, &[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        assert_eq!(evaluate_fitness(&g, &ctx(&targets, &mods, &state), 0.0), -OVERLAP_PENALTY * 0.5);
    }

    #[test]
    fn missing_region_contributes_nothing() {
        let targets = [TargetPoint::new(Vec3::ZERO)];
        let plain = ModifierSet::new();
        let mut boosted = ModifierSet::new();
        boosted.request(HIPPOCAMPAL_BOOST, true);
        boosted.commit();
        let state = ModifierState::default();
        // All neurons are cortex; the hippocampal rule has nothing to act on.
        let g = genome_at(1, &[Vec3::new(10.0, 0.0, 0.0)]);
        assert!(!g.has_region(Region::Hippocampus));
        assert_eq!(
            evaluate_fitness(&g, &ctx(&targets, &plain, &state), 0.0),
            evaluate_fitness(&g, &ctx(&targets, &boosted, &state), 0.0)
        );
    }

    #[test]
    fn crossover_keeps_length_and_renumbers() {
        let mut rng = Prng::new(9);
        let pa: Vec<Vec3> = (0..10).map(|i| Vec3::splat(i as f32)).collect();
        let pb: Vec<Vec3> = (0..10).map(|i| Vec3::splat(100.0 + i as f32)).collect();
        let a = Genome::random(1, &pa, 12, &mut rng);
        let b = Genome::random(2, &pb, 8, &mut rng);
        let child = crossover(&a, &b, 3, &mut rng);

        assert_eq!(child.neurons.len(), a.neurons.len());
        for (i, n) in child.neurons.iter().enumerate() {
            assert_eq!(n.id as usize, i);
        }
        assert_eq!(child.neurons[0].position, a.neurons[0].position);
        assert_eq!(child.neurons[9].position, b.neurons[9].position);
        assert!(child.connections.len() <= 12);
        assert_eq!(child.parent, Some(1));
    }

    #[test]
    fn crossover_drops_out_of_range_connections() {
        let mut rng = Prng::new(2);
        let a = genome_at(1, &[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        let mut b = genome_at(2, &(0..8).map(|i| Vec3::splat(i as f32)).collect::<Vec<_>>());
        b.connections = (0..20)
            .map(|_| Connection { from: 6, to: 7, weight: 1.0 })
            .collect();
        // a has 4 neurons; child gets a[0..2] + b[2..8] = 8 neurons, so 6→7 is valid.
        let child = crossover(&a, &b, 3, &mut rng);
        assert_eq!(child.neurons.len(), 8);
        assert!(child.connections.iter().all(|c| c.from < 8 && c.to < 8));

        // Reversed: b first → 4 + 0 neurons, 6→7 now dangles.
        let child = crossover(&b, &a, 4, &mut rng);
        assert_eq!(child.neurons.len(), 4);
        assert!(child.connections.is_empty());
    }

    #[test]
    fn full_rate_mutation_moves_neurons() {
        let params = MutationParams {
            rate: 1.0,
            position_scale: 1.0,
            add_connection_prob: 0.0,
            remove_connection_prob: 0.0,
            lock_stride: None,
        };
        let mut rng = Prng::new(31);
        let mut changed = 0;
        for trial in 0..100 {
            let mut g = genome_at(trial, &[Vec3::ZERO, Vec3::X * 50.0, Vec3::Y * 50.0]);
            let before = g.clone();
            mutate(&mut g, &params, 10.0, &mut rng);
            if g.neurons.iter().zip(before.neurons.iter()).any(|(a, b)| a.position != b.position) {
                changed += 1;
            }
        }
        assert!(changed > 95);
    }

    #[test]
    fn locked_neurons_do_not_move() {
        let params = MutationParams {
            rate: 1.0,
            position_scale: 1.0,
            add_connection_prob: 0.0,
            remove_connection_prob: 0.0,
            lock_stride: Some(1),
        };
        let mut rng = Prng::new(5);
        let mut g = genome_at(1, &[Vec3::ZERO, Vec3::X]);
        let before = g.clone();
        assert_eq!(mutate(&mut g, &params, 10.0, &mut rng), 0);
        assert_eq!(g, before);
    }

    #[test]
    fn tournament_prefers_fitter() {
        let mut pop: Vec<Genome> = (0..5).map(Genome::empty).collect();
        pop[3].fitness = 100.0;
        let mut rng = Prng::new(12);
        let wins = (0..300)
            .filter(|_| tournament_select(&pop, TOURNAMENT_SIZE, &mut rng) == 3)
            .count();
        // P(3 in a 3-draw tournament) = 1 - (4/5)^3 ≈ 0.49
        assert!(wins > 100, "wins = {wins}");
    }

    #[test]
    fn elitism_keeps_best_fitness_non_decreasing() {
        let mut e = engine(42);
        e.set_targets(&[Vec3::new(50.0, 0.0, 0.0), Vec3::new(-60.0, 20.0, 0.0), Vec3::new(0.0, 0.0, 80.0)]);
        let mut last = f32::NEG_INFINITY;
        for _ in 0..20 {
            let f = e.step().fitness;
            assert!(f >= last);
            last = f;
        }
        assert_eq!(e.generation(), 20);
        assert_eq!(e.population().len(), 10);
    }

    #[test]
    fn modifier_change_waits_for_next_tick() {
        let mut e = engine(3);
        e.set_modifier(ATTENTION_DECAY, true);
        assert!(!e.modifiers().is_active(ATTENTION_DECAY));
        e.step();
        assert!(e.modifiers().is_active(ATTENTION_DECAY));
        assert!(e.sustained_attention() < 1.0);
    }

    #[test]
    fn break_window_returns_previous_best() {
        let mut e = engine(8);
        e.set_modifier(BREAK_WINDOW, true);
        for _ in 0..19 {
            e.step();
        }
        let gen_before = e.generation();
        let uid_before = e.best().uid;
        // Tick 20 opens the break: this and the next two ticks are no-ops.
        for _ in 0..3 {
            let best = e.step().uid;
            assert_eq!(best, uid_before);
            assert!(e.last_report().map(|r| r.paused).unwrap_or(false));
        }
        assert_eq!(e.generation(), gen_before);
        e.step();
        assert_eq!(e.generation(), gen_before + 1);
    }

    #[test]
    fn same_seed_same_fitness() {
        let mut a = engine(77);
        let mut b = engine(77);
        for _ in 0..5 {
            assert_eq!(a.step().fitness, b.step().fitness);
        }
    }

    #[test]
    fn targets_age_each_tick() {
        let mut e = engine(1);
        e.step();
        e.step();
        assert!(e.targets().iter().all(|t| t.age == 2));
        e.regenerate_targets();
        assert!(e.targets().iter().all(|t| t.age == 0));
    }
}
