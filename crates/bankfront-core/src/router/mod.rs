//! Client-side route table and navigation.
//!
//! Routes are defined once at startup and never change. The route with path
//! `/` is the login entry point; the session layer navigates to it by name
//! when a request comes back 401.

pub mod table;

pub use table::{Route, RouteError, RouteTable, View};

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::debug;

/// Name of the route shown when there is no session
pub const LOGIN_ROUTE: &str = "login";

/// Navigation capability handed to whatever needs to move the UI.
pub trait Navigator: Send + Sync {
    fn navigate(&self, name: &str) -> Result<(), RouteError>;
}

/// Tracks the current view and notifies subscribers when it changes.
pub struct Router {
    table: RouteTable,
    current: watch::Sender<Route>,
    navigations: AtomicUsize,
}

impl Router {
    /// Router positioned on the table's entry route
    pub fn new(table: RouteTable) -> Self {
        let (current, _) = watch::channel(table.entry().clone());
        Self {
            table,
            current,
            navigations: AtomicUsize::new(0),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn current(&self) -> Route {
        self.current.borrow().clone()
    }

    /// Number of successful `navigate` calls so far
    pub fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Receiver that observes every route change
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }

    /// Navigate by URL path instead of name
    pub fn navigate_path(&self, path: &str) -> Result<(), RouteError> {
        let name = self
            .table
            .by_path(path)
            .map(|route| route.name.clone())
            .ok_or_else(|| RouteError::UnknownPath(path.to_string()))?;
        self.navigate(&name)
    }
}

impl Navigator for Router {
    fn navigate(&self, name: &str) -> Result<(), RouteError> {
        let route = self
            .table
            .by_name(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?
            .clone();
        debug!(route = %route.name, path = %route.path, "Navigating");
        self.current.send_replace(route);
        self.navigations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
