//! Who is using the tracker. Roles are whatever the store says they are; the client never
//! promotes anyone on its own.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Unknown or missing role names get the least privilege.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if name.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(Role::from_name(Some("admin")), Role::Admin);
        assert_eq!(Role::from_name(Some(" Admin ")), Role::Admin);
        assert_eq!(Role::from_name(Some("user")), Role::User);
        assert_eq!(Role::from_name(Some("superuser")), Role::User);
        assert_eq!(Role::from_name(None), Role::User);
    }
}
