//! Page access rules by session state

/// Outcome of checking one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send the browser to this location instead
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    /// Path prefixes that need a session
    protected: Vec<&'static str>,
    /// Paths only shown to visitors without a session
    auth_only: Vec<&'static str>,
    sign_in_path: &'static str,
    home_path: &'static str,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            protected: vec!["/dashboard", "/settings"],
            auth_only: vec!["/signin", "/signup"],
            sign_in_path: "/signin",
            home_path: "/dashboard",
        }
    }
}

impl RouteGuard {
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|prefix| path.starts_with(prefix))
    }

    pub fn is_auth_only(&self, path: &str) -> bool {
        self.auth_only.contains(&path)
    }

    pub fn check(&self, path: &str, authenticated: bool) -> GuardDecision {
        if !authenticated && self.is_protected(path) {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("redirect", path)
                .finish();
            return GuardDecision::Redirect(format!("{}?{}", self.sign_in_path, query));
        }
        if authenticated && self.is_auth_only(path) {
            return GuardDecision::Redirect(self.home_path.to_string());
        }
        GuardDecision::Allow
    }
}
