//! Damage bookkeeping and projectile hit resolution.

pub mod health;
pub mod projectile;

pub use health::{DamageOutcome, DeathPolicy, Health, ReactorHealth};
pub use projectile::{aim_direction, resolve_hit, DamageTarget, Projectile, Resolution, Shooter};
