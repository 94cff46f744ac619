//! Bounded particle container with FIFO eviction.

use super::particle::{Particle, ParticleId};
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug)]
pub struct ParticlePool {
    /// Oldest particle at the front.
    particles: VecDeque<Particle>,
    capacity: usize,
    next_id: ParticleId,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            particles: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Appends a particle, evicting the oldest one when the pool is full.
    ///
    /// Returns the id assigned to the new particle and the evicted particle, if any.
    pub fn push(&mut self, mut particle: Particle) -> (ParticleId, Option<Particle>) {
        let evicted = if self.particles.len() >= self.capacity {
            self.particles.pop_front()
        } else {
            None
        };

        let id = self.next_id;
        self.next_id += 1;
        particle.id = id;
        self.particles.push_back(particle);
        (id, evicted)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, dropping the oldest particles that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if capacity == self.capacity {
            return;
        }
        log::debug!(
            "ParticlePool::set_capacity: {} -> {} (len {})",
            self.capacity,
            capacity,
            self.particles.len()
        );
        while self.particles.len() > capacity {
            self.particles.pop_front();
        }
        self.capacity = capacity;
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.particles.iter_mut()
    }

    /// Keeps only the particles for which `f` returns true, preserving order.
    pub fn retain_mut<F: FnMut(&mut Particle) -> bool>(&mut self, f: F) {
        self.particles.retain_mut(f);
    }
}
