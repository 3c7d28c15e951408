use glam::{Mat4, Quat, Vec3};
use kiosk_core::ports::ParticlePort;

use super::mesh::MeshInstance;

const BURST_COUNT: usize = 24;
const BURST_SPEED: f32 = 3.2;
const GRAVITY: f32 = -7.5;
const LIFETIME: f32 = 0.9;
const PARTICLE_SCALE: f32 = 0.09;
const MAX_PARTICLES: usize = 512;
const GOLDEN_ANGLE: f32 = 2.399_963;
const PALETTE: [[f32; 3]; 4] = [
    [1.0, 0.82, 0.25],
    [0.98, 0.45, 0.32],
    [0.45, 0.85, 0.55],
    [0.95, 0.95, 0.9],
];

#[derive(Debug, Clone, Copy)]
struct Particle {
    position: Vec3,
    velocity: Vec3,
    age: f32,
    color: [f32; 3],
}

/// Confetti for purchases: cube sparks thrown up and outward, pulled down
/// by gravity and shrinking out over their lifetime.
#[derive(Debug, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        for particle in &mut self.particles {
            particle.velocity.y += GRAVITY * dt;
            particle.position += particle.velocity * dt;
            particle.age += dt;
        }
        self.particles.retain(|particle| particle.age < LIFETIME);
    }

    pub fn instances(&self) -> Vec<MeshInstance> {
        self.particles
            .iter()
            .map(|particle| {
                let life = 1.0 - particle.age / LIFETIME;
                let spin = Quat::from_rotation_y(particle.age * 9.0) * Quat::from_rotation_x(particle.age * 5.0);
                let model = Mat4::from_scale_rotation_translation(
                    Vec3::splat(PARTICLE_SCALE * life.max(0.05)),
                    spin,
                    particle.position,
                );
                let [r, g, b] = particle.color;
                MeshInstance {
                    model: model.to_cols_array_2d(),
                    color: [r, g, b, life.clamp(0.0, 1.0)],
                }
            })
            .collect()
    }
}

impl ParticlePort for ParticleField {
    fn spawn_burst(&mut self, origin: Vec3) {
        for i in 0..BURST_COUNT {
            // Spread directions over the upper hemisphere on a golden-angle spiral.
            let t = (i as f32 + 0.5) / BURST_COUNT as f32;
            let elevation = (1.0 - t * 0.8).clamp(0.0, 1.0);
            let radius = (1.0 - elevation * elevation).sqrt();
            let azimuth = i as f32 * GOLDEN_ANGLE;
            let direction = Vec3::new(radius * azimuth.cos(), elevation, radius * azimuth.sin());
            self.particles.push(Particle {
                position: origin,
                velocity: direction * BURST_SPEED * (0.75 + 0.5 * t),
                age: 0.0,
                color: PALETTE[i % PALETTE.len()],
            });
        }
        if self.particles.len() > MAX_PARTICLES {
            let excess = self.particles.len() - MAX_PARTICLES;
            self.particles.drain(..excess);
        }
    }
}
