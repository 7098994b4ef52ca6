use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The single role a principal acts under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Role {
    Admin,
    Supervisor,
    Registrar,
    Inspector,
    Officer,
}

bitflags! {
    /// Allow-list of roles, used by the lifecycle rule tables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleSet: u8 {
        const ADMIN = 1 << 0;
        const SUPERVISOR = 1 << 1;
        const REGISTRAR = 1 << 2;
        const INSPECTOR = 1 << 3;
        const OFFICER = 1 << 4;

        const MANAGEMENT = Self::ADMIN.bits() | Self::SUPERVISOR.bits();
        const OFFICE = Self::MANAGEMENT.bits() | Self::REGISTRAR.bits();
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        Self::flag(role)
    }
}

impl RoleSet {
    #[must_use]
    pub const fn flag(role: Role) -> Self {
        match role {
            Role::Admin => Self::ADMIN,
            Role::Supervisor => Self::SUPERVISOR,
            Role::Registrar => Self::REGISTRAR,
            Role::Inspector => Self::INSPECTOR,
            Role::Officer => Self::OFFICER,
        }
    }

    /// Builds a set in const context, for static rule tables.
    #[must_use]
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= Self::flag(roles[i]).bits();
            i += 1;
        }
        Self::from_bits_truncate(bits)
    }

    #[must_use]
    pub fn allows(self, role: Role) -> bool {
        self.contains(role.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn office_covers_management_and_registrar() {
        assert!(RoleSet::OFFICE.allows(Role::Admin));
        assert!(RoleSet::OFFICE.allows(Role::Supervisor));
        assert!(RoleSet::OFFICE.allows(Role::Registrar));
        assert!(!RoleSet::OFFICE.allows(Role::Inspector));
        assert!(!RoleSet::OFFICE.allows(Role::Officer));
    }

    #[test]
    fn const_builder_matches_union() {
        const TABLE: RoleSet = RoleSet::of(&[Role::Registrar, Role::Admin, Role::Supervisor]);
        assert_eq!(TABLE, RoleSet::OFFICE);
        assert_eq!(RoleSet::of(&[]), RoleSet::empty());
    }

    #[test]
    fn every_role_maps_to_a_distinct_flag() {
        let all = Role::iter().fold(RoleSet::empty(), |acc, role| acc | role.into());
        assert_eq!(all.bits().count_ones(), 5);
    }

    #[test]
    fn roles_parse_from_their_display_name() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(&role.to_string()).ok(), Some(role));
        }
    }
}
