//! Role-based routing.
//!
//! Every protected page belongs to exactly one role. `resolve` decides
//! whether the current profile may see a route or where it should be sent
//! instead: anonymous visitors go to the login page, signed-in users who
//! wander into another role's area (or back to login) go to their own home.

use super::role::Role;
use crate::models::Profile;

/// A page within a role's area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Seniors,
    Modules,
    Classes,
}

impl View {
    pub fn slug(&self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Seniors => "seniors",
            View::Modules => "modules",
            View::Classes => "classes",
        }
    }

    fn from_slug(slug: &str) -> Option<Self> {
        [View::Dashboard, View::Seniors, View::Modules, View::Classes]
            .into_iter()
            .find(|v| v.slug() == slug)
    }

    /// Tab title as shown to the given role.
    pub fn title(&self, role: Role) -> &'static str {
        match (self, role) {
            (View::Dashboard, Role::Senior) => "My Record",
            (View::Dashboard, _) => "Dashboard",
            (View::Seniors, _) => "Senior Citizens",
            (View::Modules, _) => "Modules",
            (View::Classes, _) => "Classes",
        }
    }
}

impl Role {
    /// Pages available to this role, in tab order. The first is home.
    pub fn views(&self) -> &'static [View] {
        match self {
            Role::Osca | Role::Basca => &[View::Dashboard, View::Seniors],
            Role::Senior => &[View::Dashboard],
            Role::Teacher => &[View::Dashboard, View::Modules, View::Classes],
            Role::Student => &[View::Dashboard, View::Modules],
        }
    }

    pub fn home(&self) -> Route {
        Route::Page {
            role: *self,
            view: View::Dashboard,
        }
    }

    pub fn home_path(&self) -> String {
        self.home().path()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Register,
    Page { role: Role, view: View },
    NotFound,
}

impl Route {
    /// Parse a path such as `/teacher/modules`. `/osca` means the OSCA home.
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Route::Landing,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            [role] => match Role::parse(role) {
                Some(role) => role.home(),
                None => Route::NotFound,
            },
            [role, view] => match (Role::parse(role), View::from_slug(view)) {
                (Some(role), Some(view)) if role.views().contains(&view) => {
                    Route::Page { role, view }
                }
                _ => Route::NotFound,
            },
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Page { role, view } => format!("/{}/{}", role.as_str(), view.slug()),
            Route::NotFound => "/404".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
}

/// Decide what the current profile may see at `route`.
/// A profile without a recognised role is treated as signed out.
pub fn resolve(route: &Route, profile: Option<&Profile>) -> Decision {
    let role = profile.and_then(|p| p.role);

    match (route, role) {
        (Route::Login | Route::Register, None) => Decision::Allow,
        (Route::Page { role: owner, .. }, Some(current)) if *owner == current => Decision::Allow,
        (_, None) => Decision::Redirect(Route::Login),
        (_, Some(current)) => Decision::Redirect(current.home()),
    }
}

/// Follow `resolve` to the route that will actually be shown.
pub fn landing_route(route: &Route, profile: Option<&Profile>) -> Route {
    match resolve(route, profile) {
        Decision::Allow => *route,
        Decision::Redirect(target) => target,
    }
}
