//! Route classification.
//!
//! # Design Decisions
//! - Exact path match; `/login/` and `/login` are different routes
//! - Everything not listed is protected
//! - Table is built once from config and never changes

use std::collections::HashSet;

/// Static partition of URL paths into public and protected.
#[derive(Debug, Clone)]
pub struct RouteTable {
    public: HashSet<String>,
}

impl RouteTable {
    pub fn new<I, S>(public_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            public: public_paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.contains(path)
    }
}
