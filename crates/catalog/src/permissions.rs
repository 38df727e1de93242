//! Who is calling, and what they are allowed to do.

use crate::users::User;

/// Read access to movies.
pub const MOVIES_READ: &str = "movies:read";

/// Create, update and delete access to movies.
pub const MOVIES_WRITE: &str = "movies:write";

/// Permission codes granted to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(Vec<String>);

impl Permissions {
    /// Wraps a list of permission codes.
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    /// Whether `code` was granted.
    pub fn includes(&self, code: &str) -> bool {
        self.0.iter().any(|granted| granted == code)
    }
}

/// The caller a request was authenticated as, stored in the request extensions.
#[derive(Debug, Clone)]
pub enum Principal {
    /// No `Authorization` header was sent.
    Anonymous,
    /// A valid bearer token resolved to this user.
    User(Box<User>),
}

impl Principal {
    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }
}
