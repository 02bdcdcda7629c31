use glam::Vec3;
use hashbrown::HashSet;

use crate::prng::Prng;
use crate::surface::Rgba;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type NeuronId = u32;
pub type GenomeUid = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeuronKind {
    Soma,
    Dendrite,
    Axon,
    Interneuron,
}

impl NeuronKind {
    pub const ALL: [NeuronKind; 4] = [
        NeuronKind::Soma,
        NeuronKind::Dendrite,
        NeuronKind::Axon,
        NeuronKind::Interneuron,
    ];

    pub fn radius(self) -> f32 {
        match self {
            NeuronKind::Soma => 7.0,
            NeuronKind::Dendrite => 4.0,
            NeuronKind::Axon => 4.5,
            NeuronKind::Interneuron => 5.5,
        }
    }

    pub fn base_color(self) -> Rgba {
        match self {
            NeuronKind::Soma => Rgba::rgb(251, 191, 36),
            NeuronKind::Dendrite => Rgba::rgb(122, 162, 255),
            NeuronKind::Axon => Rgba::rgb(74, 222, 128),
            NeuronKind::Interneuron => Rgba::rgb(192, 132, 252),
        }
    }
}

/// Anatomical label. Only used to route region-specific modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Region {
    Cortex,
    Hippocampus,
    Thalamus,
    Cerebellum,
    Brainstem,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Cortex,
        Region::Hippocampus,
        Region::Thalamus,
        Region::Cerebellum,
        Region::Brainstem,
    ];
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    pub id: NeuronId,
    pub position: Vec3,
    pub kind: NeuronKind,
    pub region: Region,

    // Render attributes, derived once from `kind`.
    pub radius: f32,
    pub color: Rgba,
}

impl Neuron {
    pub fn new(id: NeuronId, position: Vec3, kind: NeuronKind, region: Region) -> Self {
        Self {
            id,
            position,
            kind,
            region,
            radius: kind.radius(),
            color: kind.base_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Connection {
    pub from: NeuronId,
    pub to: NeuronId,
    // Sign encodes excitatory (+) / inhibitory (-).
    pub weight: f32,
}

impl Connection {
    pub fn is_excitatory(&self) -> bool {
        self.weight >= 0.0
    }

    pub fn key(&self) -> (NeuronId, NeuronId) {
        (self.from, self.to)
    }
}

/// A candidate topology.
///
/// Neurons and connections live in flat vectors and refer to each other by
/// id only; cloning a genome is a plain value copy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Genome {
    pub uid: GenomeUid,
    pub neurons: Vec<Neuron>,
    pub connections: Vec<Connection>,
    pub fitness: f32,
    pub generation: u64,
    pub parent: Option<GenomeUid>,
}

impl Genome {
    pub fn new(uid: GenomeUid, neurons: Vec<Neuron>, connections: Vec<Connection>) -> Self {
        let mut g = Self {
            uid,
            neurons,
            connections,
            fitness: 0.0,
            generation: 0,
            parent: None,
        };
        g.retain_valid_connections();
        g
    }

    pub fn empty(uid: GenomeUid) -> Self {
        Self::new(uid, Vec::new(), Vec::new())
    }

    /// Random genome: neurons at the given positions, `connection_count`
    /// random edges between distinct neurons.
    pub fn random(uid: GenomeUid, positions: &[Vec3], connection_count: usize, rng: &mut Prng) -> Self {
        let neurons: Vec<Neuron> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = NeuronKind::ALL[rng.gen_range_usize(0, NeuronKind::ALL.len())];
                let region = Region::ALL[rng.gen_range_usize(0, Region::ALL.len())];
                Neuron::new(i as NeuronId, *p, kind, region)
            })
            .collect();

        let mut g = Self::new(uid, neurons, Vec::new());
        for _ in 0..connection_count {
            g.add_random_connection(rng);
        }
        g
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        // Ids are normally the index; fall back to a scan otherwise.
        match self.neurons.get(id as usize) {
            Some(n) if n.id == id => Some(n),
            _ => self.neurons.iter().find(|n| n.id == id),
        }
    }

    pub fn contains(&self, id: NeuronId) -> bool {
        self.neuron(id).is_some()
    }

    /// Drop connections whose endpoints are missing or identical.
    pub fn retain_valid_connections(&mut self) -> usize {
        let ids: HashSet<NeuronId> = self.neurons.iter().map(|n| n.id).collect();
        let before = self.connections.len();
        self.connections
            .retain(|c| c.from != c.to && ids.contains(&c.from) && ids.contains(&c.to));
        before - self.connections.len()
    }

    /// Adds one edge between two distinct random neurons. Returns false if the
    /// genome has fewer than two neurons.
    pub fn add_random_connection(&mut self, rng: &mut Prng) -> bool {
        let n = self.neurons.len();
        if n < 2 {
            return false;
        }
        let a = rng.gen_range_usize(0, n);
        let mut b = rng.gen_range_usize(0, n - 1);
        if b >= a {
            b += 1;
        }
        let weight = rng.gen_range_f32(-1.0, 1.0);
        self.connections.push(Connection {
            from: self.neurons[a].id,
            to: self.neurons[b].id,
            weight,
        });
        true
    }

    pub fn remove_random_connection(&mut self, rng: &mut Prng) -> Option<Connection> {
        if self.connections.is_empty() {
            return None;
        }
        let i = rng.gen_range_usize(0, self.connections.len());
        Some(self.connections.remove(i))
    }

    pub fn endpoints(&self, c: &Connection) -> Option<(Vec3, Vec3)> {
        Some((self.neuron(c.from)?.position, self.neuron(c.to)?.position))
    }

    pub fn has_region(&self, region: Region) -> bool {
        self.neurons.iter().any(|n| n.region == region)
    }
}
