use std::fmt::{Display, Formatter, Result as FmtResult};

/// Role of one of the four access policies scoped to a single space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopedRole {
    Admin,
    Trustee,
    User,
    Supplier,
}

impl ScopedRole {
    pub const ALL: [ScopedRole; 4] = [
        ScopedRole::Admin,
        ScopedRole::Trustee,
        ScopedRole::User,
        ScopedRole::Supplier,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScopedRole::Admin => "admin",
            ScopedRole::Trustee => "trustee",
            ScopedRole::User => "user",
            ScopedRole::Supplier => "supplier",
        }
    }
}

impl Display for ScopedRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
