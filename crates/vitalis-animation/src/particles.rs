//! Fixed-capacity particle pools flowing along paths.
//!
//! Pools allocate their storage once at construction. Spawning into a full pool fails
//! instead of growing it, and expired particles are recycled in place.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::spline::PathSpline;

/// One particle record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowParticle {
    pub path: usize,
    /// Normalised arc length along the path.
    pub arc: f32,
    /// World units per second.
    pub speed: f32,
    pub age: f32,
    pub lifetime: f32,
    pub active: bool,
}

/// Particle storage with a hard capacity.
#[derive(Clone, Debug)]
pub struct ParticlePool {
    particles: Vec<FlowParticle>,
    free: Vec<usize>,
    active: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: vec![FlowParticle::default(); capacity],
            free: (0..capacity).rev().collect(),
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Activate a particle. Returns `false` when the pool is full.
    pub fn spawn(&mut self, path: usize, speed: f32, lifetime: f32) -> bool {
        let Some(slot) = self.free.pop() else {
            return false;
        };
        self.particles[slot] = FlowParticle {
            path,
            arc: 0.0,
            speed,
            age: 0.0,
            lifetime,
            active: true,
        };
        self.active += 1;
        true
    }

    fn release(&mut self, slot: usize) {
        if self.particles[slot].active {
            self.particles[slot].active = false;
            self.free.push(slot);
            self.active -= 1;
        }
    }

    /// Deactivate the oldest particles until at most `limit` remain.
    pub fn trim_to(&mut self, limit: usize) {
        if self.active <= limit {
            return;
        }
        let mut live: Vec<usize> = (0..self.particles.len())
            .filter(|&i| self.particles[i].active)
            .collect();
        live.sort_by(|&a, &b| self.particles[b].age.total_cmp(&self.particles[a].age));
        let excess = self.active - limit;
        for slot in live.into_iter().take(excess) {
            self.release(slot);
        }
    }

    pub fn clear(&mut self) {
        for slot in 0..self.particles.len() {
            self.release(slot);
        }
    }

    /// Move every active particle along its path. `speed_factor` scales each particle's
    /// speed given its current position. Particles past the path end or their lifetime
    /// are recycled.
    pub fn advance(
        &mut self,
        dt: f32,
        paths: &[PathSpline],
        mut speed_factor: impl FnMut(Vec3) -> f32,
    ) {
        for slot in 0..self.particles.len() {
            let particle = self.particles[slot];
            if !particle.active {
                continue;
            }
            let Some(path) = paths.get(particle.path) else {
                self.release(slot);
                continue;
            };
            let factor = speed_factor(path.sample(particle.arc)).max(0.0);
            let distance = particle.speed * factor * dt;
            let p = &mut self.particles[slot];
            p.arc += distance / path.length();
            p.age += dt;
            if p.arc >= 1.0 || p.age >= p.lifetime {
                self.release(slot);
            }
        }
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &FlowParticle> {
        self.particles.iter().filter(|p| p.active)
    }

    /// World positions of every active particle.
    pub fn positions<'a>(&'a self, paths: &'a [PathSpline]) -> impl Iterator<Item = Vec3> + 'a {
        self.iter_active()
            .filter_map(|p| paths.get(p.path).map(|path| path.sample(p.arc)))
    }
}

/// Tuning for a particle stream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// World units per second.
    pub base_speed: f32,
    /// Particles spawned per second at full quality.
    pub spawn_rate: f32,
    /// Pool capacity; the active limit at full quality.
    pub max_particles: usize,
    pub lifetime_seconds: f32,
    /// Random speed spread, as a fraction of `base_speed`.
    pub speed_jitter: f32,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            base_speed: 0.3,
            spawn_rate: 60.0,
            max_particles: 400,
            lifetime_seconds: 10.0,
            speed_jitter: 0.1,
        }
    }
}

/// A pool fed at a steady rate across a set of paths.
#[derive(Clone, Debug)]
pub struct ParticleStream {
    settings: FlowSettings,
    paths: Vec<PathSpline>,
    pool: ParticlePool,
    spawn_accumulator: f32,
    next_path: usize,
    rng: ChaCha8Rng,
}

impl ParticleStream {
    pub fn new(settings: FlowSettings, paths: Vec<PathSpline>, seed: u64) -> Self {
        Self {
            pool: ParticlePool::new(settings.max_particles),
            settings,
            paths,
            spawn_accumulator: 0.0,
            next_path: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn paths(&self) -> &[PathSpline] {
        &self.paths
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Active particle limit at a quality multiplier.
    pub fn active_limit(&self, quality_multiplier: f32) -> usize {
        ((self.settings.max_particles as f32 * quality_multiplier.clamp(0.0, 1.0)).round() as usize)
            .min(self.pool.capacity())
    }

    /// Spawn, move and expire particles. `speed_scale` applies to the whole stream and
    /// `local_factor` to each particle by position.
    pub fn update(
        &mut self,
        dt: f32,
        quality_multiplier: f32,
        speed_scale: f32,
        mut local_factor: impl FnMut(Vec3) -> f32,
    ) {
        let limit = self.active_limit(quality_multiplier);
        self.pool.trim_to(limit);
        if self.paths.is_empty() || dt <= 0.0 {
            return;
        }

        self.spawn_accumulator +=
            self.settings.spawn_rate * quality_multiplier.clamp(0.0, 1.0) * dt;
        while self.spawn_accumulator >= 1.0 {
            self.spawn_accumulator -= 1.0;
            if self.pool.active_count() >= limit {
                self.spawn_accumulator = 0.0;
                break;
            }
            let jitter = if self.settings.speed_jitter > 0.0 {
                self.rng
                    .random_range(-self.settings.speed_jitter..=self.settings.speed_jitter)
            } else {
                0.0
            };
            let path = self.next_path % self.paths.len();
            self.next_path = self.next_path.wrapping_add(1);
            self.pool.spawn(
                path,
                self.settings.base_speed * (1.0 + jitter),
                self.settings.lifetime_seconds,
            );
        }

        let scale = speed_scale.max(0.0);
        self.pool
            .advance(dt, &self.paths, |position| scale * local_factor(position));
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.pool.positions(&self.paths)
    }

    pub fn clear(&mut self) {
        self.pool.clear();
        self.spawn_accumulator = 0.0;
    }
}
