//! Administrative console for certificates and user accounts.
//!
//! Session handling, role-gated navigation and paginated, filterable lists
//! on top of the certificate backend's REST API.

pub mod config;
pub mod debounce;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub mod api {
    pub mod client;
}

pub mod models {
    pub mod certificate;
    pub mod filter;
    pub mod page;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod token;
}

pub mod services {
    pub mod auth;
    pub mod certificates;
    pub mod users;
}

pub mod controllers {
    pub mod auth;
    pub mod list;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod pages {
    pub mod certificates;
    pub mod filter_panel;
    pub mod list_page;
    pub mod users;
}

pub mod views {
    pub mod table;
}

pub mod validation {
    pub mod auth;
    pub mod forms;
}

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
