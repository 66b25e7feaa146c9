/// What happens to an entity once its health reaches zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeathPolicy {
    /// Players come back at their respawn point after the delay.
    Respawn { delay: f32 },
    /// Bots are removed after the delay.
    Destroy { delay: f32 },
}

impl DeathPolicy {
    pub fn delay(&self) -> f32 {
        match self {
            DeathPolicy::Respawn { delay } | DeathPolicy::Destroy { delay } => *delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Non-positive amount or target already down.
    Ignored,
    Damaged,
    Killed,
}

impl DamageOutcome {
    pub fn changed(self) -> bool {
        self != DamageOutcome::Ignored
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    current: i32,
    max: i32,
    dead: bool,
    policy: DeathPolicy,
}

impl Health {
    pub fn new(max: i32, policy: DeathPolicy) -> Self {
        Self {
            current: max,
            max,
            dead: false,
            policy,
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn policy(&self) -> DeathPolicy {
        self.policy
    }

    /// Restores full health against a freshly computed maximum.
    pub fn reset(&mut self, max: i32) {
        self.max = max;
        self.current = max;
        self.dead = false;
    }

    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if amount <= 0 || self.dead {
            return DamageOutcome::Ignored;
        }
        self.current = (self.current - amount).max(0);
        if self.current == 0 {
            self.dead = true;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged
        }
    }
}

/// Reactor hit points. Destruction is one-way for the match.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactorHealth {
    current: i32,
    max: i32,
    destroyed: bool,
}

impl ReactorHealth {
    pub fn new(max: i32) -> Self {
        Self {
            current: max,
            max,
            destroyed: false,
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if amount <= 0 || self.destroyed {
            return DamageOutcome::Ignored;
        }
        self.current = (self.current - amount).max(0);
        if self.current == 0 {
            self.destroyed = true;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged
        }
    }
}
