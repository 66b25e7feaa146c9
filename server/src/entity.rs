use shared::EntityId;

/// Hands out network ids for rooms, traps, reactors, bots and projectiles.
/// Ids are never reused within a match.
#[derive(Debug, Default)]
pub struct EntityIds {
    last: EntityId,
}

impl EntityIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> EntityId {
        self.last += 1;
        self.last
    }
}
