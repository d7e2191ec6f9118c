use crate::middleware_layer::auth::{GuardDecision, require_auth};
use crate::models::session::{Session, SessionPhase};
use crate::models::user::Role;

pub const LOGIN_PATH: &str = "/login";
pub const ROOT_PATH: &str = "/";
/// Where signed-in users land by default.
pub const DEFAULT_AUTHENTICATED_PATH: &str = "/certificates";
pub const USERS_MANAGEMENT_PATH: &str = "/admin/usersManagement";

/// Every screen of the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Root,
    Certificates,
    UsersManagement,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            LOGIN_PATH => Route::Login,
            "" | ROOT_PATH => Route::Root,
            DEFAULT_AUTHENTICATED_PATH => Route::Certificates,
            USERS_MANAGEMENT_PATH => Route::UsersManagement,
            other => Route::NotFound(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Root => ROOT_PATH,
            Route::Certificates => DEFAULT_AUTHENTICATED_PATH,
            Route::UsersManagement => USERS_MANAGEMENT_PATH,
            Route::NotFound(path) => path,
        }
    }

    /// Roles allowed on a protected route, `None` for public ones.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Certificates => Some(&Role::ALL),
            Route::UsersManagement => Some(&Role::ADMINISTRATORS),
            Route::Login | Route::Root | Route::NotFound(_) => None,
        }
    }
}

/// Outcome of visiting a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The session is still being verified.
    Loading,
    Render(Route),
    /// Go elsewhere. `from` is kept so login can return there.
    Redirect { to: String, from: Option<String> },
}

fn redirect(to: &str) -> Navigation {
    Navigation::Redirect {
        to: to.to_string(),
        from: None,
    }
}

/// Decides what visiting `path` shows.
///
/// # Arguments
///
/// * `session` - The current session.
/// * `path` - The location being visited.
/// * `from` - Location preserved by an earlier redirect to login.
pub fn navigate(session: &Session, path: &str, from: Option<&str>) -> Navigation {
    if session.phase() == SessionPhase::Loading {
        return Navigation::Loading;
    }
    let authenticated = session.phase() == SessionPhase::Authenticated;

    let route = Route::parse(path);
    match &route {
        Route::Login if authenticated => {
            redirect(from.filter(|f| *f != LOGIN_PATH).unwrap_or(DEFAULT_AUTHENTICATED_PATH))
        }
        Route::Login => Navigation::Render(Route::Login),
        Route::Root | Route::NotFound(_) if authenticated => redirect(DEFAULT_AUTHENTICATED_PATH),
        Route::Root | Route::NotFound(_) => redirect(LOGIN_PATH),
        Route::Certificates | Route::UsersManagement => {
            match require_auth(session, route.allowed_roles(), route.path()) {
                GuardDecision::Loading => Navigation::Loading,
                GuardDecision::Allow => Navigation::Render(route.clone()),
                GuardDecision::RedirectToLogin { from } => Navigation::Redirect {
                    to: LOGIN_PATH.to_string(),
                    from: Some(from),
                },
                GuardDecision::RedirectToDefault => redirect(DEFAULT_AUTHENTICATED_PATH),
            }
        }
    }
}

/// Follows redirects from `path` until something renders.
///
/// # Returns
///
/// The final navigation (a `Render` or `Loading`) and the preserved `from`
/// location, if a redirect to login carried one.
pub fn resolve(session: &Session, path: &str) -> (Navigation, Option<String>) {
    let mut current = path.to_string();
    let mut from: Option<String> = None;
    // Every chain ends within a few hops; the bound guards against a loop.
    for _ in 0..4 {
        match navigate(session, &current, from.as_deref()) {
            Navigation::Redirect { to, from: kept } => {
                tracing::debug!("Redirecting {} → {}", current, to);
                if kept.is_some() {
                    from = kept;
                }
                current = to;
            }
            done => return (done, from),
        }
    }
    (Navigation::Render(Route::parse(&current)), from)
}

/// An entry of the navigation menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
}

/// The navigation menu for the signed-in user. User management only shows
/// up for administrators.
pub fn menu(session: &Session) -> Vec<MenuItem> {
    let mut items = vec![
        MenuItem {
            label: "Dashboard",
            path: ROOT_PATH,
        },
        MenuItem {
            label: "Certificates",
            path: DEFAULT_AUTHENTICATED_PATH,
        },
    ];
    if session.role().is_some_and(|role| role.is_administrator()) {
        items.push(MenuItem {
            label: "User Management",
            path: USERS_MANAGEMENT_PATH,
        });
    }
    items
}
