//! Client-side role state and the page visibility gate.
//!
//! The gate is advisory: it decides which pages a client renders. The server
//! enforces its own policy on every protected route.

use crate::models::UserRole;
use crate::navigation::page;

/// Pages belonging to the technician section all start with this prefix.
pub const TECHNICIAN_SECTION: &str = "Technician";

/// Who the current session renders pages for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// No role assigned. This is the default before anyone signs in.
    Manager,
    Farmer,
    Technician,
    /// A role string this client does not understand. Sees nothing.
    Unrecognized,
}

impl Viewer {
    pub fn from_role(role: Option<&str>) -> Self {
        match role {
            None => Self::Manager,
            Some(role) => match UserRole::parse(role) {
                Some(UserRole::Farmer) => Self::Farmer,
                Some(UserRole::Technician) => Self::Technician,
                None => Self::Unrecognized,
            },
        }
    }

    pub fn can_see(&self, page_name: &str) -> bool {
        match self {
            Self::Manager => page_name != page::ACCOUNT,
            Self::Farmer => page_name != page::MANAGE_USERS && page_name != page::SENSORS,
            Self::Technician => page_name.starts_with(TECHNICIAN_SECTION),
            Self::Unrecognized => false,
        }
    }
}

/// Session state passed explicitly to whatever renders navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    role: Option<String>,
    user_id: Option<String>,
    token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful user login. The role string is kept verbatim so an
    /// unexpected value fails closed in the gate.
    pub fn sign_in(&mut self, role: impl Into<String>, user_id: Option<String>, token: Option<String>) {
        self.role = Some(role.into());
        self.user_id = user_id;
        self.token = token;
    }

    /// Record a verified manager PIN: role stays unset, the token is attached.
    pub fn elevate_manager(&mut self, token: String) {
        self.role = None;
        self.user_id = None;
        self.token = Some(token);
    }

    pub fn logout(&mut self) {
        *self = Self::default();
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn viewer(&self) -> Viewer {
        Viewer::from_role(self.role())
    }

    pub fn is_page_visible(&self, page_name: &str) -> bool {
        self.viewer().can_see(page_name)
    }
}
