//! Role-based access decision for protected screens.

use tracing::debug;

use crate::gateway::Gateway;
use crate::models::{AuthUser, Role};
use crate::services::auth;

pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Login,
    /// Signed in with another role; sent to that role's home.
    Home(Role),
}

impl Decision {
    /// Redirect target, `None` when access is allowed.
    pub fn route(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Login => Some(LOGIN_ROUTE),
            Self::Home(role) => Some(role.home_route()),
        }
    }
}

/// Decides whether `user` may enter a screen reserved for `required`.
///
/// Users without a recognizable role go to the login route; users with the
/// other role go to their own home route.
pub fn authorize(user: Option<&AuthUser>, required: Role) -> Decision {
    let Some(user) = user else {
        return Decision::Login;
    };
    match user.role() {
        None => Decision::Login,
        Some(role) if role == required => Decision::Allow,
        Some(role) => Decision::Home(role),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Authorized,
    RedirectLogin,
    RedirectHome(Role),
}

impl GuardState {
    pub fn route(self) -> Option<&'static str> {
        match self {
            Self::Loading => None,
            Self::Authorized => Decision::Allow.route(),
            Self::RedirectLogin => Decision::Login.route(),
            Self::RedirectHome(role) => Decision::Home(role).route(),
        }
    }
}

impl From<Decision> for GuardState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow => Self::Authorized,
            Decision::Login => Self::RedirectLogin,
            Decision::Home(role) => Self::RedirectHome(role),
        }
    }
}

/// Resolves the session once and settles into a final state.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    required: Role,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(required: Role) -> Self {
        Self {
            required,
            state: GuardState::Loading,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Looks up the session and records the outcome. Later calls return the
    /// settled state without another lookup.
    pub async fn resolve(&mut self, gateway: &Gateway) -> GuardState {
        if self.state != GuardState::Loading {
            return self.state;
        }

        let user = auth::current_user(gateway).await;
        self.state = authorize(user.as_ref(), self.required).into();
        debug!(required = %self.required, state = ?self.state, "route guard resolved");
        self.state
    }
}
