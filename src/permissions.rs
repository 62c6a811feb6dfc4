use std::collections::BTreeSet;

/// Closed set of staff roles. Role assignments live in the `user_roles`
/// table as strings; unknown strings are ignored rather than granting
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Admin,
    Organizer,
    GateStaff,
    Reviewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ScanTickets,
    ManageEvents,
    ReviewSubmissions,
    ValidateLocations,
}

pub const ALL_ROLES: [Role; 4] = [Role::Admin, Role::Organizer, Role::GateStaff, Role::Reviewer];

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "organizer" => Some(Role::Organizer),
            "gate_staff" => Some(Role::GateStaff),
            "reviewer" => Some(Role::Reviewer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::GateStaff => "gate_staff",
            Role::Reviewer => "reviewer",
        }
    }

    /// Roles this role directly depends on. Holding a role implies holding
    /// everything in its dependency closure.
    pub fn requires(&self) -> &'static [Role] {
        match self {
            Role::Admin => &[Role::Organizer],
            Role::Organizer => &[Role::GateStaff],
            Role::GateStaff | Role::Reviewer => &[],
        }
    }

    pub fn grants(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[Permission::ReviewSubmissions],
            Role::Organizer => &[Permission::ManageEvents],
            Role::GateStaff => &[Permission::ScanTickets, Permission::ValidateLocations],
            Role::Reviewer => &[Permission::ReviewSubmissions],
        }
    }

    /// Transitive dependency closure, including the role itself.
    pub fn required_closure(&self) -> BTreeSet<Role> {
        let mut closure = BTreeSet::new();
        let mut stack = vec![*self];
        while let Some(role) = stack.pop() {
            if closure.insert(role) {
                stack.extend(role.requires().iter().copied());
            }
        }
        closure
    }

    /// Inverse closure: every role whose dependency closure contains `role`.
    pub fn dependents_of(role: Role) -> BTreeSet<Role> {
        ALL_ROLES
            .iter()
            .copied()
            .filter(|candidate| candidate.required_closure().contains(&role))
            .collect()
    }
}

pub fn parse_roles(raw: &[String]) -> Vec<Role> {
    raw.iter().filter_map(|value| Role::parse(value)).collect()
}

/// The roles a user effectively holds: the union of the closures of every
/// assigned role.
pub fn effective_roles(assigned: &[Role]) -> BTreeSet<Role> {
    assigned
        .iter()
        .flat_map(|role| role.required_closure())
        .collect()
}

pub fn permits(assigned: &[Role], permission: Permission) -> bool {
    effective_roles(assigned)
        .iter()
        .any(|role| role.grants().contains(&permission))
}

pub fn is_elevated(assigned: &[Role]) -> bool {
    effective_roles(assigned)
        .iter()
        .any(|role| matches!(role, Role::Admin | Role::Organizer))
}

/// Gate rule for ticket scanning: a role-derived scan permission or an
/// elevated role. Explicit per-event scanner grants are checked separately
/// against the database.
pub fn may_scan(assigned: &[Role]) -> bool {
    permits(assigned, Permission::ScanTickets) || is_elevated(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_transitive() {
        let closure = Role::Admin.required_closure();
        assert!(closure.contains(&Role::Admin));
        assert!(closure.contains(&Role::Organizer));
        assert!(closure.contains(&Role::GateStaff));
        assert!(!closure.contains(&Role::Reviewer));
    }

    #[test]
    fn leaf_roles_close_over_themselves() {
        assert_eq!(
            Role::Reviewer.required_closure(),
            BTreeSet::from([Role::Reviewer])
        );
        assert_eq!(
            Role::GateStaff.required_closure(),
            BTreeSet::from([Role::GateStaff])
        );
    }

    #[test]
    fn dependents_are_the_inverse_of_closure() {
        assert_eq!(
            Role::dependents_of(Role::GateStaff),
            BTreeSet::from([Role::Admin, Role::Organizer, Role::GateStaff])
        );
        assert_eq!(
            Role::dependents_of(Role::Admin),
            BTreeSet::from([Role::Admin])
        );
        for role in ALL_ROLES {
            for dependent in Role::dependents_of(role) {
                assert!(dependent.required_closure().contains(&role));
            }
        }
    }

    #[test]
    fn permissions_flow_through_the_closure() {
        assert!(permits(&[Role::Admin], Permission::ScanTickets));
        assert!(permits(&[Role::Organizer], Permission::ValidateLocations));
        assert!(permits(&[Role::Reviewer], Permission::ReviewSubmissions));
        assert!(!permits(&[Role::Reviewer], Permission::ScanTickets));
        assert!(!permits(&[Role::GateStaff], Permission::ReviewSubmissions));
    }

    #[test]
    fn gate_fails_closed_without_roles() {
        assert!(!may_scan(&[]));
        assert!(!permits(&[], Permission::ReviewSubmissions));
        assert!(!is_elevated(&[]));
    }

    #[test]
    fn unknown_role_strings_grant_nothing() {
        let raw = vec![
            "superuser".to_string(),
            "gate_staff".to_string(),
            "".to_string(),
        ];
        assert_eq!(parse_roles(&raw), vec![Role::GateStaff]);
    }

    #[test]
    fn role_names_round_trip() {
        for role in ALL_ROLES {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse(" ADMIN "), Some(Role::Admin));
    }
}
