//! Modifier registry.
//!
//! Every modifier is a numeric id mapped to a [`ModifierRule`]: a name plus a
//! handful of optional pure hooks. Active rules are always applied in
//! ascending id order (see [`ModifierSet::active_rules`]); floating-point
//! products are therefore reproducible across runs and hosts.

use std::collections::BTreeSet;

use tracing::debug;

use crate::genome::{Neuron, Region};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type ModifierId = u16;

pub const HYPERPLASTICITY: ModifierId = 1;
pub const RIGIDITY: ModifierId = 2;
pub const FLUIDITY: ModifierId = 3;
pub const LOW_ENERGY: ModifierId = 4;
pub const BREAK_WINDOW: ModifierId = 5;
pub const TASK_SWITCH_LATENCY: ModifierId = 6;
pub const ATTENTION_DECAY: ModifierId = 7;
pub const INTERFERENCE: ModifierId = 8;
pub const NOVELTY_BONUS: ModifierId = 9;
pub const DELAY_DISCOUNTING: ModifierId = 10;
pub const TARGET_DRIFT: ModifierId = 11;
pub const EPIGENETIC_LOCK: ModifierId = 12;
pub const CONNECTIVITY_SEEKING: ModifierId = 13;
pub const PRUNING: ModifierId = 14;
pub const SPROUTING: ModifierId = 15;
pub const CORTICAL_FOCUS: ModifierId = 16;
pub const HIPPOCAMPAL_BOOST: ModifierId = 17;
pub const CROWDING_TOLERANCE: ModifierId = 18;
pub const HYPERFOCUS: ModifierId = 19;
pub const REWARD_SENSITIVITY: ModifierId = 20;
pub const GLOW: ModifierId = 21;
pub const DESATURATE: ModifierId = 22;
pub const FLICKER: ModifierId = 23;
pub const SPARKS: ModifierId = 24;

pub const ATTENTION_FLOOR: f32 = 0.3;
pub const ATTENTION_DECAY_RATE: f32 = 0.005;
pub const BREAK_PERIOD: u64 = 20;
pub const BREAK_LENGTH: u32 = 3;
pub const TASK_SWITCH_TICKS: u32 = 2;
pub const TARGET_DRIFT_PERIOD: u64 = 60;
pub const EPIGENETIC_LOCK_STRIDE: usize = 4;

/// Per-simulation modifier state advanced once per tick.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModifierState {
    pub tick: u64,
    pub sustained_attention: f32,
    pub break_remaining: u32,
    pub task_switch_remaining: u32,
    // Set by tick hooks; consumed by the engine.
    pub regenerate_targets: bool,
}

impl Default for ModifierState {
    fn default() -> Self {
        Self {
            tick: 0,
            sustained_attention: 1.0,
            break_remaining: 0,
            task_switch_remaining: 0,
            regenerate_targets: false,
        }
    }
}

impl ModifierState {
    /// True if a counter forces this tick to be a no-op.
    pub fn is_paused(&self) -> bool {
        self.break_remaining > 0 || self.task_switch_remaining > 0
    }

    /// Decrement every non-zero pause counter.
    pub fn consume_pause(&mut self) {
        self.break_remaining = self.break_remaining.saturating_sub(1);
        self.task_switch_remaining = self.task_switch_remaining.saturating_sub(1);
    }
}

/// Inputs to a per-(neuron, target) proximity multiplier.
#[derive(Debug, Clone, Copy)]
pub struct ProximityTerm<'a> {
    pub neuron: &'a Neuron,
    pub target_index: usize,
    pub target_age: u64,
    pub distance: f32,
    // Per-genome noise in [0,1), drawn before evaluation.
    pub noise: f32,
    pub attention: f32,
}

/// The additive parts of a fitness score before totals are adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitnessTerms {
    pub proximity: f32,
    pub connectivity: f32,
    pub overlap_penalty: f32,
}

impl FitnessTerms {
    pub fn total(&self) -> f32 {
        self.proximity + self.connectivity - self.overlap_penalty
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    pub rate: f32,
    pub position_scale: f32,
    pub add_connection_prob: f32,
    pub remove_connection_prob: f32,
    // Every `n`-th neuron (by index) is exempt from position mutation.
    pub lock_stride: Option<usize>,
}

impl MutationParams {
    pub fn is_locked(&self, index: usize) -> bool {
        matches!(self.lock_stride, Some(n) if n > 0 && index % n == 0)
    }

    /// Clamp probabilities to [0,1] and scales to be non-negative.
    pub fn normalized(mut self) -> Self {
        let p = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        self.rate = p(self.rate);
        self.add_connection_prob = p(self.add_connection_prob);
        self.remove_connection_prob = p(self.remove_connection_prob);
        self.position_scale = if self.position_scale.is_finite() {
            self.position_scale.max(0.0)
        } else {
            0.0
        };
        self
    }
}

/// Visual parameters modifiers may tweak.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderStyle {
    pub glow: f32,
    pub saturation: f32,
    pub neuron_alpha: f32,
    pub connection_alpha: f32,
    pub pulses: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            glow: 1.0,
            saturation: 1.0,
            neuron_alpha: 1.0,
            connection_alpha: 0.85,
            pulses: false,
        }
    }
}

pub struct ModifierRule {
    pub id: ModifierId,
    pub name: &'static str,
    pub tick: Option<fn(&mut ModifierState)>,
    pub targets_regenerated: Option<fn(&mut ModifierState)>,
    pub proximity: Option<fn(&ProximityTerm) -> f32>,
    pub terms: Option<fn(&mut FitnessTerms)>,
    pub total: Option<fn(f32) -> f32>,
    pub mutation: Option<fn(&mut MutationParams)>,
    pub render: Option<fn(&mut RenderStyle, u64)>,
}

impl core::fmt::Debug for ModifierRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModifierRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

const fn rule(id: ModifierId, name: &'static str) -> ModifierRule {
    ModifierRule {
        id,
        name,
        tick: None,
        targets_regenerated: None,
        proximity: None,
        terms: None,
        total: None,
        mutation: None,
        render: None,
    }
}

fn region_boost(term: &ProximityTerm, region: Region) -> f32 {
    if term.neuron.region == region {
        1.5
    } else {
        1.0
    }
}

// Sorted by id; `rule_for` relies on it.
static REGISTRY: [ModifierRule; 24] = [
    ModifierRule {
        mutation: Some(|m| m.rate *= 2.5),
        ..rule(HYPERPLASTICITY, "hyperplasticity")
    },
    ModifierRule {
        mutation: Some(|m| m.rate *= 0.5),
        ..rule(RIGIDITY, "rigidity")
    },
    ModifierRule {
        mutation: Some(|m| m.position_scale *= 1.8),
        ..rule(FLUIDITY, "fluidity")
    },
    ModifierRule {
        mutation: Some(|m| {
            m.position_scale *= 0.5;
            m.rate *= 0.8;
        }),
        ..rule(LOW_ENERGY, "low energy")
    },
    ModifierRule {
        tick: Some(|s| {
            if s.tick > 0 && s.tick % BREAK_PERIOD == 0 {
                s.break_remaining = BREAK_LENGTH;
            }
        }),
        ..rule(BREAK_WINDOW, "break window")
    },
    ModifierRule {
        targets_regenerated: Some(|s| s.task_switch_remaining = TASK_SWITCH_TICKS),
        ..rule(TASK_SWITCH_LATENCY, "task-switch latency")
    },
    ModifierRule {
        tick: Some(|s| {
            s.sustained_attention = ATTENTION_FLOOR
                + (s.sustained_attention - ATTENTION_FLOOR) * (1.0 - ATTENTION_DECAY_RATE);
        }),
        proximity: Some(|t| t.attention),
        ..rule(ATTENTION_DECAY, "attention decay")
    },
    ModifierRule {
        proximity: Some(|t| 1.0 - 0.25 * t.noise),
        ..rule(INTERFERENCE, "interference")
    },
    ModifierRule {
        proximity: Some(|t| 1.0 + 0.5 / (1.0 + t.target_age as f32 / 10.0)),
        ..rule(NOVELTY_BONUS, "novelty bonus")
    },
    ModifierRule {
        proximity: Some(|t| 1.0 / (1.0 + 0.01 * t.target_age as f32)),
        ..rule(DELAY_DISCOUNTING, "delay discounting")
    },
    ModifierRule {
        tick: Some(|s| {
            if s.tick > 0 && s.tick % TARGET_DRIFT_PERIOD == 0 {
                s.regenerate_targets = true;
            }
        }),
        ..rule(TARGET_DRIFT, "target drift")
    },
    ModifierRule {
        mutation: Some(|m| m.lock_stride = Some(EPIGENETIC_LOCK_STRIDE)),
        ..rule(EPIGENETIC_LOCK, "epigenetic lock")
    },
    ModifierRule {
        terms: Some(|t| t.connectivity *= 2.0),
        ..rule(CONNECTIVITY_SEEKING, "connectivity seeking")
    },
    ModifierRule {
        mutation: Some(|m| {
            m.add_connection_prob *= 0.5;
            m.remove_connection_prob *= 2.0;
        }),
        ..rule(PRUNING, "pruning")
    },
    ModifierRule {
        mutation: Some(|m| m.add_connection_prob *= 2.0),
        ..rule(SPROUTING, "sprouting")
    },
    ModifierRule {
        proximity: Some(|t| region_boost(t, Region::Cortex)),
        ..rule(CORTICAL_FOCUS, "cortical focus")
    },
    ModifierRule {
        proximity: Some(|t| region_boost(t, Region::Hippocampus)),
        ..rule(HIPPOCAMPAL_BOOST, "hippocampal boost")
    },
    ModifierRule {
        terms: Some(|t| t.overlap_penalty *= 0.5),
        ..rule(CROWDING_TOLERANCE, "crowding tolerance")
    },
    ModifierRule {
        proximity: Some(|t| if t.target_index == 0 { 2.0 } else { 0.0 }),
        ..rule(HYPERFOCUS, "hyperfocus")
    },
    ModifierRule {
        total: Some(|v| if v > 0.0 { v * 1.25 } else { v }),
        ..rule(REWARD_SENSITIVITY, "reward sensitivity")
    },
    ModifierRule {
        render: Some(|r, _| r.glow *= 1.8),
        ..rule(GLOW, "glow")
    },
    ModifierRule {
        render: Some(|r, _| r.saturation *= 0.35),
        ..rule(DESATURATE, "desaturate")
    },
    ModifierRule {
        render: Some(|r, frame| {
            let phase = (frame as f32 * 0.35).sin().abs();
            r.neuron_alpha *= 0.65 + 0.35 * phase;
        }),
        ..rule(FLICKER, "flicker")
    },
    ModifierRule {
        render: Some(|r, _| r.pulses = true),
        ..rule(SPARKS, "sparks")
    },
];

/// All registered rules, ascending by id.
pub fn registry() -> &'static [ModifierRule] {
    &REGISTRY
}

pub fn rule_for(id: ModifierId) -> Option<&'static ModifierRule> {
    REGISTRY
        .binary_search_by_key(&id, |r| r.id)
        .ok()
        .map(|i| &REGISTRY[i])
}

/// Active modifier ids plus changes waiting for the next boundary.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModifierSet {
    active: BTreeSet<ModifierId>,
    pending: Vec<(ModifierId, bool)>,
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a membership change. Returns false for unknown ids.
    pub fn request(&mut self, id: ModifierId, active: bool) -> bool {
        if rule_for(id).is_none() {
            debug!("ignoring unknown modifier id {}", id);
            return false;
        }
        self.pending.push((id, active));
        true
    }

    /// Apply queued changes in arrival order. Returns how many changed membership.
    pub fn commit(&mut self) -> usize {
        let mut changed = 0;
        for (id, on) in self.pending.drain(..) {
            let did = if on {
                self.active.insert(id)
            } else {
                self.active.remove(&id)
            };
            if did {
                changed += 1;
            }
        }
        changed
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_active(&self, id: ModifierId) -> bool {
        self.active.contains(&id)
    }

    pub fn active_ids(&self) -> impl Iterator<Item = ModifierId> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &'static ModifierRule> + '_ {
        self.active.iter().filter_map(|id| rule_for(*id))
    }

    pub fn advance_state(&self, state: &mut ModifierState) {
        state.tick += 1;
        for r in self.active_rules() {
            if let Some(f) = r.tick {
                f(state);
            }
        }
    }

    pub fn on_targets_regenerated(&self, state: &mut ModifierState) {
        for r in self.active_rules() {
            if let Some(f) = r.targets_regenerated {
                f(state);
            }
        }
    }

    /// Product of active proximity multipliers.
    pub fn proximity_factor(&self, term: &ProximityTerm) -> f32 {
        let mut k = 1.0;
        for r in self.active_rules() {
            if let Some(f) = r.proximity {
                k *= f(term);
            }
        }
        k
    }

    pub fn has_proximity_hooks(&self) -> bool {
        self.active_rules().any(|r| r.proximity.is_some())
    }

    pub fn adjust_terms(&self, terms: &mut FitnessTerms) {
        for r in self.active_rules() {
            if let Some(f) = r.terms {
                f(terms);
            }
        }
    }

    pub fn adjust_total(&self, mut total: f32) -> f32 {
        for r in self.active_rules() {
            if let Some(f) = r.total {
                total = f(total);
            }
        }
        total
    }

    pub fn adjust_mutation(&self, mut params: MutationParams) -> MutationParams {
        for r in self.active_rules() {
            if let Some(f) = r.mutation {
                f(&mut params);
            }
        }
        params.normalized()
    }

    pub fn adjust_render(&self, mut style: RenderStyle, frame: u64) -> RenderStyle {
        for r in self.active_rules() {
            if let Some(f) = r.render {
                f(&mut style, frame);
            }
        }
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::NeuronKind;
    use glam::Vec3;

    fn base_params() -> MutationParams {
        MutationParams {
            rate: 0.2,
            position_scale: 1.0,
            add_connection_prob: 0.1,
            remove_connection_prob: 0.1,
            lock_stride: None,
        }
    }

    #[test]
    fn registry_is_sorted_and_unique() {
        let ids: Vec<_> = registry().iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert!(rule_for(ATTENTION_DECAY).is_some());
        assert!(rule_for(999).is_none());
    }

    #[test]
    fn changes_wait_for_commit() {
        let mut set = ModifierSet::new();
        assert!(set.request(HYPERPLASTICITY, true));
        assert!(!set.is_active(HYPERPLASTICITY));
        assert_eq!(set.commit(), 1);
        assert!(set.is_active(HYPERPLASTICITY));
        assert!(!set.request(500, true));
    }

    #[test]
    fn active_rules_iterate_ascending() {
        let mut set = ModifierSet::new();
        for id in [SPARKS, RIGIDITY, ATTENTION_DECAY] {
            set.request(id, true);
        }
        set.commit();
        let ids: Vec<_> = set.active_rules().map(|r| r.id).collect();
        assert_eq!(ids, vec![RIGIDITY, ATTENTION_DECAY, SPARKS]);
    }

    #[test]
    fn mutation_multipliers_compose_and_clamp() {
        let mut set = ModifierSet::new();
        set.request(HYPERPLASTICITY, true);
        set.commit();
        let p = set.adjust_mutation(base_params());
        assert!((p.rate - 0.5).abs() < 1e-6);

        set.request(RIGIDITY, true);
        set.commit();
        let p = set.adjust_mutation(base_params());
        assert!((p.rate - 0.25).abs() < 1e-6);

        let p = set.adjust_mutation(MutationParams {
            rate: 0.9,
            ..base_params()
        });
        assert!(p.rate <= 1.0);
    }

    #[test]
    fn attention_decays_toward_floor() {
        let mut set = ModifierSet::new();
        set.request(ATTENTION_DECAY, true);
        set.commit();
        let mut state = ModifierState::default();
        let mut last = state.sustained_attention;
        for _ in 0..200 {
            set.advance_state(&mut state);
            assert!(state.sustained_attention < last);
            assert!(state.sustained_attention > ATTENTION_FLOOR);
            last = state.sustained_attention;
        }
    }

    #[test]
    fn break_window_opens_periodically() {
        let mut set = ModifierSet::new();
        set.request(BREAK_WINDOW, true);
        set.commit();
        let mut state = ModifierState::default();
        for _ in 0..(BREAK_PERIOD - 1) {
            set.advance_state(&mut state);
            assert!(!state.is_paused());
        }
        set.advance_state(&mut state);
        assert_eq!(state.break_remaining, BREAK_LENGTH);
    }

    #[test]
    fn region_boost_only_hits_matching_neurons() {
        let mut set = ModifierSet::new();
        set.request(CORTICAL_FOCUS, true);
        set.commit();
        let cortex = Neuron::new(0, Vec3::ZERO, NeuronKind::Soma, Region::Cortex);
        let other = Neuron::new(1, Vec3::ZERO, NeuronKind::Soma, Region::Brainstem);
        fn term(n: &Neuron) -> ProximityTerm<'_> {
            ProximityTerm {
                neuron: n,
                target_index: 0,
                target_age: 0,
                distance: 10.0,
                noise: 0.0,
                attention: 1.0,
            }
        }
        assert_eq!(set.proximity_factor(&term(&cortex)), 1.5);
        assert_eq!(set.proximity_factor(&term(&other)), 1.0);
    }

    #[test]
    fn render_hooks_adjust_style() {
        let mut set = ModifierSet::new();
        set.request(SPARKS, true);
        set.request(DESATURATE, true);
        set.commit();
        let style = set.adjust_render(RenderStyle::default(), 0);
        assert!(style.pulses);
        assert!(style.saturation < 1.0);
    }

    #[test]
    fn lock_stride_locks_every_nth() {
        let p = MutationParams {
            lock_stride: Some(4),
            ..base_params()
        };
        assert!(p.is_locked(0));
        assert!(!p.is_locked(1));
        assert!(p.is_locked(8));
    }
}
