//! Seeded rolling terrain used as the ground oracle for demo walks.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strider_core::{GroundHit, GroundQuery, Vec3, UP};

const NORMAL_SAMPLE: f32 = 0.05;

#[derive(Clone, Copy, Debug)]
struct Hill {
    x: f32,
    z: f32,
    amplitude: f32,
    radius: f32,
}

/// Height field built from a deterministic set of Gaussian hills and hollows.
#[derive(Clone, Debug)]
pub(crate) struct Terrain {
    hills: Vec<Hill>,
}

impl Terrain {
    /// Scatters `count` hills over a square of half-width `extent` using `seed`.
    pub(crate) fn generate(seed: u64, extent: f32, count: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let extent = extent.abs().max(1.0);
        let hills = (0..count)
            .map(|_| Hill {
                x: rng.gen_range(-extent..extent),
                z: rng.gen_range(-extent..extent),
                amplitude: rng.gen_range(-0.35..0.45),
                radius: rng.gen_range(0.8..3.0),
            })
            .collect();
        Self { hills }
    }

    /// Surface height directly above or below the planar point `(x, z)`.
    pub(crate) fn height_at(&self, x: f32, z: f32) -> f32 {
        self.hills
            .iter()
            .map(|hill| {
                let dx = x - hill.x;
                let dz = z - hill.z;
                let falloff = (dx * dx + dz * dz) / (hill.radius * hill.radius);
                hill.amplitude * (-falloff).exp()
            })
            .sum()
    }

    fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let slope_x = (self.height_at(x + NORMAL_SAMPLE, z) - self.height_at(x - NORMAL_SAMPLE, z))
            / (2.0 * NORMAL_SAMPLE);
        let slope_z = (self.height_at(x, z + NORMAL_SAMPLE) - self.height_at(x, z - NORMAL_SAMPLE))
            / (2.0 * NORMAL_SAMPLE);
        Vec3::new(-slope_x, 1.0, -slope_z).normalize_or_zero()
    }
}

impl GroundQuery for Terrain {
    fn query_ground(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        let height = self.height_at(origin.x, origin.z);
        let drop = origin.dot(UP) - height;
        if !(0.0..=max_distance).contains(&drop) {
            return None;
        }

        Some(GroundHit {
            point: Vec3::new(origin.x, height, origin.z),
            normal: self.normal_at(origin.x, origin.z),
        })
    }
}
