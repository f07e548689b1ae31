//! Built-in placements for the static instanced anatomy.
//!
//! Coordinates match the default animation rig: an adult standing at the origin, Y up,
//! metres.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Quat, Vec3};

const SPINE_BOTTOM: f32 = 0.95;
const SPINE_TOP: f32 = 1.55;
const SPINE_DEPTH: f32 = -0.09;
const VERTEBRA_COUNT: usize = 24;
const RIB_PAIRS: usize = 12;
const ALVEOLI_PER_LUNG: usize = 600;

/// Cervical, thoracic and lumbar vertebrae stacked along the spine, largest at the bottom.
pub fn vertebrae() -> Vec<Mat4> {
    (0..VERTEBRA_COUNT)
        .map(|i| {
            let t = i as f32 / (VERTEBRA_COUNT - 1) as f32;
            let y = SPINE_BOTTOM + t * (SPINE_TOP - SPINE_BOTTOM);
            // Gentle thoracic curve.
            let z = SPINE_DEPTH - 0.015 * (PI * t).sin();
            let scale = 1.25 - 0.5 * t;
            Mat4::from_scale_rotation_translation(Vec3::splat(scale), Quat::IDENTITY, Vec3::new(0.0, y, z))
        })
        .collect()
}

/// Twelve rib pairs hanging off the thoracic vertebrae, tilted downward at the front.
pub fn ribs() -> Vec<Mat4> {
    let mut ribs = Vec::with_capacity(RIB_PAIRS * 2);
    for pair in 0..RIB_PAIRS {
        let t = pair as f32 / (RIB_PAIRS - 1) as f32;
        let y = 1.42 - t * 0.28;
        // Middle ribs are the widest.
        let width = 0.75 + 0.35 * (PI * t).sin();
        for side in [-1.0f32, 1.0] {
            let rotation = Quat::from_rotation_x(PI * 0.5 + 0.35) * Quat::from_rotation_z(side * 0.1);
            let translation = Vec3::new(side * 0.02, y, -0.03);
            ribs.push(Mat4::from_scale_rotation_translation(
                Vec3::new(width, width * 0.75, 1.0),
                rotation,
                translation,
            ));
        }
    }
    ribs
}

/// Alveoli spread through both lungs on a Fibonacci lattice inside an ellipsoid each.
pub fn alveoli() -> Vec<Mat4> {
    let golden = PI * (3.0 - 5f32.sqrt());
    let half_extent = Vec3::new(0.06, 0.11, 0.07);
    let mut alveoli = Vec::with_capacity(ALVEOLI_PER_LUNG * 2);
    for center in [Vec3::new(-0.08, 1.32, 0.0), Vec3::new(0.08, 1.32, 0.0)] {
        for i in 0..ALVEOLI_PER_LUNG {
            let f = (i as f32 + 0.5) / ALVEOLI_PER_LUNG as f32;
            // Cube root spreads points evenly through the volume.
            let r = f.cbrt();
            let y = 1.0 - 2.0 * ((i * 7919) % ALVEOLI_PER_LUNG) as f32 / ALVEOLI_PER_LUNG as f32;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden * i as f32;
            let dir = Vec3::new(ring * theta.cos(), y, ring * theta.sin());
            let position = center + dir * r * half_extent;
            let spin = Quat::from_rotation_y((i as f32 * golden) % TAU);
            alveoli.push(Mat4::from_rotation_translation(spin, position));
        }
    }
    alveoli
}
