use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::handle::EntityId;
use crate::owner::Aim;
use crate::services::{SpatialQuery, TraceHit};

/// How far behind the muzzle the wall probe starts.
pub const MUZZLE_PROBE_LENGTH: f32 = 1.5;
/// A penetrating shot spawns this far before the impact point.
pub const PENETRATION_BACKOFF: f32 = 0.1;
/// Length of the camera trace used to aim projectiles.
pub const PROJECTILE_AIM_RANGE: f32 = 100.0;

/// Uniform direction inside a cone around `aim`. The same seed always
/// produces the same direction, which is what lets observers replay shots.
pub fn cone_direction(seed: u32, aim: Vec3, half_angle: f32) -> Vec3 {
    let axis = aim.normalize_or_zero();
    if axis == Vec3::ZERO || half_angle <= 0.0 {
        return axis;
    }

    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    let cos_max = half_angle.min(std::f32::consts::PI).cos();
    let cos_theta: f32 = rng.gen_range(cos_max..=1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let (u, v) = axis.any_orthonormal_pair();

    (axis * cos_theta + (u * phi.cos() + v * phi.sin()) * sin_theta).normalize()
}

/// A camera hit that lies behind the muzzle, or steeply off-axis with a wall
/// right at the muzzle, means the barrel is poking through geometry.
pub fn is_penetrating(shoot_dir: Vec3, adjusted_dir: Vec3, muzzle_blocked: impl FnOnce() -> bool) -> bool {
    let dot = adjusted_dir.dot(shoot_dir);
    if dot < 0.0 {
        true
    } else if dot < 0.5 {
        muzzle_blocked()
    } else {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedShot {
    pub origin: Vec3,
    pub direction: Vec3,
    pub penetrating: bool,
}

/// Re-aims a shot from the muzzle toward what the camera trace hit.
pub fn adjust_shot(
    muzzle: Aim,
    shoot_dir: Vec3,
    impact: &TraceHit,
    world: &dyn SpatialQuery,
    ignore: Option<EntityId>,
) -> AdjustedShot {
    let unchanged = AdjustedShot {
        origin: muzzle.origin,
        direction: shoot_dir,
        penetrating: false,
    };
    if !impact.blocking {
        return unchanged;
    }

    let adjusted_dir = (impact.point - muzzle.origin).normalize_or_zero();
    if adjusted_dir == Vec3::ZERO {
        return unchanged;
    }

    let penetrating = is_penetrating(shoot_dir, adjusted_dir, || {
        let probe_start = muzzle.origin - muzzle.direction * MUZZLE_PROBE_LENGTH;
        world.trace_ray(probe_start, muzzle.origin, ignore).blocking
    });

    if penetrating {
        AdjustedShot {
            origin: impact.point - shoot_dir * PENETRATION_BACKOFF,
            direction: shoot_dir,
            penetrating: true,
        }
    } else {
        AdjustedShot {
            origin: muzzle.origin,
            direction: adjusted_dir,
            penetrating: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_direction() {
        let aim = Vec3::new(0.3, 0.1, -1.0);
        let a = cone_direction(42, aim, 0.1);
        let b = cone_direction(42, aim, 0.1);
        assert_eq!(a, b);
        assert_ne!(a, cone_direction(43, aim, 0.1));
    }

    #[test]
    fn test_cone_stays_within_half_angle() {
        let aim = Vec3::NEG_Z;
        let half_angle = 5.0_f32.to_radians();
        for seed in 0..500 {
            let dir = cone_direction(seed, aim, half_angle);
            assert!((dir.length() - 1.0).abs() < 1e-4);
            assert!(dir.dot(aim) >= half_angle.cos() - 1e-5);
        }
    }

    #[test]
    fn test_zero_spread_is_straight() {
        assert_eq!(cone_direction(7, Vec3::X * 2.0, 0.0), Vec3::X);
    }

    #[test]
    fn test_backward_hit_is_penetration_without_probe() {
        let shoot = Vec3::X;
        let adjusted = Vec3::new(-0.2, 0.98, 0.0).normalize();
        assert!(adjusted.dot(shoot) < 0.0);
        assert!(is_penetrating(shoot, adjusted, || panic!("probe not needed")));
    }

    #[test]
    fn test_shallow_angle_defers_to_probe() {
        let shoot = Vec3::X;
        let adjusted = Vec3::new(0.3, 0.95, 0.0).normalize();
        assert!(is_penetrating(shoot, adjusted, || true));
        assert!(!is_penetrating(shoot, adjusted, || false));
        assert!(!is_penetrating(shoot, Vec3::X, || true));
    }
}
