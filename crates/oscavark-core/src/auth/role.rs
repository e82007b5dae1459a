use serde::{Deserialize, Serialize};

/// Which of the two applications a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    SeniorAffairs,
    Learning,
}

/// Application role stored on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Osca,
    Basca,
    Senior,
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Osca, Role::Basca, Role::Senior, Role::Teacher, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Osca => "osca",
            Role::Basca => "basca",
            Role::Senior => "senior",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let lower = input.trim().to_lowercase();
        Role::ALL.into_iter().find(|r| r.as_str() == lower)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Osca => "OSCA Administrator",
            Role::Basca => "BASCA Officer",
            Role::Senior => "Senior Citizen",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }

    pub fn portal(&self) -> Portal {
        match self {
            Role::Osca | Role::Basca | Role::Senior => Portal::SeniorAffairs,
            Role::Teacher | Role::Student => Portal::Learning,
        }
    }

    /// BASCA officers and seniors are attached to one barangay.
    pub fn requires_barangay(&self) -> bool {
        matches!(self, Role::Basca | Role::Senior)
    }

    /// Next role in the login portal picker (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Role::Osca => Role::Basca,
            Role::Basca => Role::Senior,
            Role::Senior => Role::Teacher,
            Role::Teacher => Role::Student,
            Role::Student => Role::Osca,
        }
    }

    /// Previous role in the login portal picker (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Role::Osca => Role::Student,
            Role::Basca => Role::Osca,
            Role::Senior => Role::Basca,
            Role::Teacher => Role::Senior,
            Role::Student => Role::Teacher,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_serde() {
        assert_eq!(Role::parse(" OSCA "), Some(Role::Osca));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(serde_json::to_string(&Role::Basca).unwrap(), "\"basca\"");
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_cycle_wraps() {
        let mut role = Role::Osca;
        for _ in 0..Role::ALL.len() {
            role = role.next();
        }
        assert_eq!(role, Role::Osca);
        assert_eq!(Role::Osca.prev(), Role::Student);
        for r in Role::ALL {
            assert_eq!(r.next().prev(), r);
        }
    }

    #[test]
    fn test_portals() {
        assert_eq!(Role::Basca.portal(), Portal::SeniorAffairs);
        assert_eq!(Role::Student.portal(), Portal::Learning);
        assert!(Role::Senior.requires_barangay());
        assert!(!Role::Osca.requires_barangay());
    }
}
