use crate::models::session::{Session, SessionPhase};
use crate::models::user::Role;

/// What the guard decided for a protected location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still being verified; show a loading state.
    Loading,
    /// Render the protected content.
    Allow,
    /// Not signed in. `from` is the location to return to after login.
    RedirectToLogin { from: String },
    /// Signed in, but the role is not allowed here.
    RedirectToDefault,
}

/// Gates a protected location on the session and, optionally, the role.
///
/// # Arguments
///
/// * `session` - The current session.
/// * `allowed_roles` - Roles allowed in; `None` lets any signed-in user in.
/// * `location` - The location being visited.
///
/// # Returns
///
/// A `GuardDecision`. Never a redirect while the session is loading.
pub fn require_auth(session: &Session, allowed_roles: Option<&[Role]>, location: &str) -> GuardDecision {
    tracing::debug!("🔐 Checking access to {}", location);

    match session.phase() {
        SessionPhase::Loading => GuardDecision::Loading,
        SessionPhase::Unauthenticated => {
            tracing::debug!("❌ Not signed in, sending {} to login", location);
            GuardDecision::RedirectToLogin {
                from: location.to_string(),
            }
        }
        SessionPhase::Authenticated => match (allowed_roles, session.role()) {
            (None, _) => GuardDecision::Allow,
            (Some(roles), Some(role)) if roles.contains(&role) => GuardDecision::Allow,
            (Some(_), role) => {
                tracing::warn!("❌ Role {:?} may not open {}", role, location);
                GuardDecision::RedirectToDefault
            }
        },
    }
}
