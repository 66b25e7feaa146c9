use log::info;
use shared::Role;
use std::collections::HashMap;

/// Assigns roles for one match. The first participant builds, everyone after
/// attacks. A returning participant that presents its session token gets its
/// old role back.
#[derive(Debug, Default)]
pub struct RoleAssigner {
    builder_assigned: bool,
    sessions: HashMap<u64, Role>,
}

impl RoleAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the role and the session token to hand back. `fresh_token` is
    /// used when the presented token is unknown or absent.
    pub fn assign(&mut self, presented: Option<u64>, fresh_token: u64) -> (Role, u64) {
        if let Some(token) = presented {
            if let Some(role) = self.sessions.get(&token) {
                info!("Session resumed as {}", role);
                return (*role, token);
            }
        }

        let role = if self.builder_assigned {
            Role::Attacker
        } else {
            self.builder_assigned = true;
            Role::Builder
        };
        self.sessions.insert(fresh_token, role);
        (role, fresh_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_joiner_builds_rest_attack() {
        let mut roles = RoleAssigner::new();
        let assigned: Vec<Role> = (0..5).map(|i| roles.assign(None, i).0).collect();
        assert_eq!(assigned[0], Role::Builder);
        assert!(assigned[1..].iter().all(|role| *role == Role::Attacker));
    }

    #[test]
    fn test_session_token_restores_role() {
        let mut roles = RoleAssigner::new();
        let (builder, token) = roles.assign(None, 77);
        roles.assign(None, 78);

        assert_eq!(roles.assign(Some(token), 79), (builder, 77));
        assert_eq!(roles.assign(Some(12345), 80), (Role::Attacker, 80));
    }
}
