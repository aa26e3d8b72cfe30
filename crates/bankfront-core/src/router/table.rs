use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

/// Path of the login entry point
const ENTRY_PATH: &str = "/";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("Duplicate route name: {0}")]
    DuplicateName(String),

    #[error("Route table needs exactly one route at '/', found {0}")]
    EntryCount(usize),

    #[error("No route named '{0}'")]
    UnknownRoute(String),

    #[error("No route at path '{0}'")]
    UnknownPath(String),
}

/// The views of the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Signup,
    Home,
    Profile,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Login => "Login",
            View::Signup => "Sign up",
            View::Home => "Home",
            View::Profile => "Profile",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub path: String,
    pub view: View,
}

impl Route {
    pub fn new(name: impl Into<String>, path: impl Into<String>, view: View) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            view,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    entry: usize,
}

impl RouteTable {
    /// Build a table, enforcing unique names and a single `/` route
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.name.as_str()) {
                return Err(RouteError::DuplicateName(route.name.clone()));
            }
        }

        let entries: Vec<usize> = routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.path == ENTRY_PATH)
            .map(|(i, _)| i)
            .collect();
        match entries.as_slice() {
            [entry] => Ok(Self {
                entry: *entry,
                routes,
            }),
            other => Err(RouteError::EntryCount(other.len())),
        }
    }

    /// The bank front-end's routes
    pub fn standard() -> Self {
        Self {
            routes: vec![
                Route::new("home", "/home", View::Home),
                Route::new("signup", "/signup", View::Signup),
                Route::new("login", ENTRY_PATH, View::Login),
                Route::new("profile", "/profile", View::Profile),
            ],
            entry: 2,
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn by_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// The route at `/`
    pub fn entry(&self) -> &Route {
        &self.routes[self.entry]
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_valid() {
        let standard = RouteTable::standard();
        let rebuilt = RouteTable::new(standard.routes().to_vec()).unwrap();
        assert_eq!(rebuilt.entry(), standard.entry());
        assert_eq!(standard.entry().name, "login");
        assert_eq!(standard.by_name("profile").unwrap().path, "/profile");
        assert_eq!(standard.by_path("/signup").unwrap().view, View::Signup);
        assert!(standard.by_name("transfers").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = RouteTable::new(vec![
            Route::new("login", "/", View::Login),
            Route::new("home", "/home", View::Home),
            Route::new("home", "/dashboard", View::Home),
        ]);
        assert_eq!(result.unwrap_err(), RouteError::DuplicateName("home".to_string()));
    }

    #[test]
    fn test_exactly_one_entry_route() {
        let none = RouteTable::new(vec![Route::new("home", "/home", View::Home)]);
        assert_eq!(none.unwrap_err(), RouteError::EntryCount(0));

        let two = RouteTable::new(vec![
            Route::new("login", "/", View::Login),
            Route::new("signin", "/", View::Login),
        ]);
        assert_eq!(two.unwrap_err(), RouteError::EntryCount(2));
    }
}
