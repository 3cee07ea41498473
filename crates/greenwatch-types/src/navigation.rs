//! Sidebar and tab-bar composition, filtered through the session gate.

use crate::session::{Session, Viewer};

pub mod page {
    pub const HOME: &str = "Home";
    pub const GREENHOUSES: &str = "Greenhouses";
    pub const PLANTS: &str = "Plants";
    pub const SENSORS: &str = "Sensors";
    pub const WEATHER: &str = "Weather";
    pub const MANAGE_USERS: &str = "ManageUsers";
    pub const ACCOUNT: &str = "Account";
    pub const TECHNICIAN_HOME: &str = "TechnicianHome";
    pub const TECHNICIAN_SENSORS: &str = "TechnicianSensors";
    pub const TECHNICIAN_ACCOUNT: &str = "TechnicianAccount";
}

pub const KNOWN_PAGES: &[&str] = &[
    page::HOME,
    page::GREENHOUSES,
    page::PLANTS,
    page::SENSORS,
    page::WEATHER,
    page::MANAGE_USERS,
    page::ACCOUNT,
    page::TECHNICIAN_HOME,
    page::TECHNICIAN_SENSORS,
    page::TECHNICIAN_ACCOUNT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub page: &'static str,
    pub label: &'static str,
}

const fn entry(page: &'static str, label: &'static str) -> NavEntry {
    NavEntry { page, label }
}

pub const SIDEBAR: &[NavEntry] = &[
    entry(page::HOME, "Home"),
    entry(page::GREENHOUSES, "Greenhouses"),
    entry(page::PLANTS, "Plants"),
    entry(page::SENSORS, "Sensors"),
    entry(page::WEATHER, "Weather"),
    entry(page::MANAGE_USERS, "Manage Users"),
    entry(page::ACCOUNT, "Account"),
    entry(page::TECHNICIAN_HOME, "Technician Home"),
    entry(page::TECHNICIAN_SENSORS, "Sensor Boards"),
    entry(page::TECHNICIAN_ACCOUNT, "My Account"),
];

pub const TABS: &[NavEntry] = &[
    entry(page::HOME, "Home"),
    entry(page::GREENHOUSES, "Greenhouses"),
    entry(page::PLANTS, "Plants"),
    entry(page::SENSORS, "Sensors"),
    entry(page::ACCOUNT, "Account"),
    entry(page::TECHNICIAN_HOME, "Home"),
    entry(page::TECHNICIAN_SENSORS, "Sensors"),
];

pub fn visible_sidebar(session: &Session) -> Vec<&'static NavEntry> {
    filter(SIDEBAR, session)
}

pub fn visible_tabs(session: &Session) -> Vec<&'static NavEntry> {
    filter(TABS, session)
}

fn filter(entries: &'static [NavEntry], session: &Session) -> Vec<&'static NavEntry> {
    entries.iter().filter(|e| session.is_page_visible(e.page)).collect()
}

/// Whether a route may be mounted: the page must exist and pass the gate.
pub fn can_navigate(session: &Session, page_name: &str) -> bool {
    KNOWN_PAGES.iter().any(|p| *p == page_name) && session.is_page_visible(page_name)
}

/// The page a session lands on after login or reset.
pub fn landing_page(session: &Session) -> Option<&'static str> {
    match session.viewer() {
        Viewer::Manager | Viewer::Farmer => Some(page::HOME),
        Viewer::Technician => Some(page::TECHNICIAN_HOME),
        Viewer::Unrecognized => None,
    }
}
