use crate::spatial::{Hit, Layer, LayerMask, Owner};
use shared::{ClientId, EntityId, Role, Vec2};

/// Layers a projectile flies straight through.
pub const PASS_THROUGH: [Layer; 4] = [Layer::PlaceArea, Layer::Ui, Layer::Cover, Layer::Projectile];

/// Layers a projectile sweep considers at all.
pub const SWEEP_MASK: LayerMask = LayerMask::ALL
    .without(Layer::PlaceArea)
    .without(Layer::Ui)
    .without(Layer::Cover)
    .without(Layer::Projectile);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shooter {
    Player(ClientId),
    Bot(EntityId),
    Trap(EntityId),
}

impl Shooter {
    pub fn owns(&self, owner: Owner) -> bool {
        match (*self, owner) {
            (Shooter::Player(a), Owner::Player(b)) => a == b,
            (Shooter::Bot(a), Owner::Bot(b)) => a == b,
            (Shooter::Trap(a), Owner::Trap(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: i32,
    pub shooter: Shooter,
    /// Captured at spawn, later role changes do not apply.
    pub shooter_role: Role,
    pub age: f32,
    pub lifetime: f32,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntityId,
        origin: Vec2,
        aim: Vec2,
        speed: f32,
        damage: i32,
        lifetime: f32,
        shooter: Shooter,
        shooter_role: Role,
    ) -> Self {
        Self {
            id,
            position: origin,
            direction: aim_direction(aim),
            speed,
            damage,
            shooter,
            shooter_role,
            age: 0.0,
            lifetime: shared::CombatSettings::min_lifetime(lifetime),
        }
    }

    /// Ages the projectile, returns false once its lifetime is spent.
    pub fn age_by(&mut self, dt: f32) -> bool {
        self.age += dt;
        self.age < self.lifetime
    }
}

/// Normalised aim, falling back to facing right for degenerate input.
pub fn aim_direction(aim: Vec2) -> Vec2 {
    if !(aim.x.is_finite() && aim.y.is_finite()) || aim.length_squared() < 0.001 {
        Vec2::RIGHT
    } else {
        aim.normalize_or(Vec2::RIGHT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageTarget {
    Reactor(EntityId),
    Player(ClientId),
    Bot(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep sweeping past this collider.
    PassThrough,
    /// Projectile is spent; `damage` names who takes it, if anyone.
    Consumed { damage: Option<DamageTarget> },
}

/// Decides what a single contact does. `role_of` reports the role of a
/// health-bearing owner and `None` for anything without health.
pub fn resolve_hit<F>(projectile: &Projectile, hit: &Hit, role_of: F) -> Resolution
where
    F: Fn(Owner) -> Option<Role>,
{
    if PASS_THROUGH.contains(&hit.layer) {
        return Resolution::PassThrough;
    }
    if projectile.shooter.owns(hit.owner) {
        return Resolution::PassThrough;
    }

    if let Owner::Reactor(id) = hit.owner {
        let damage = (projectile.shooter_role == Role::Attacker).then_some(DamageTarget::Reactor(id));
        return Resolution::Consumed { damage };
    }

    let target = match hit.owner {
        Owner::Player(id) => Some(DamageTarget::Player(id)),
        Owner::Bot(id) => Some(DamageTarget::Bot(id)),
        _ => None,
    };
    match (target, role_of(hit.owner)) {
        (Some(target), Some(role)) => Resolution::Consumed {
            damage: (role != projectile.shooter_role).then_some(target),
        },
        _ => Resolution::Consumed { damage: None },
    }
}
