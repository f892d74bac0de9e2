//! Fixtures shared by the benches.

/// A raw request read by the decoder bench.
#[derive(Debug, Copy, Clone)]
pub struct RequestFile {
    name: &'static str,
    content: &'static str,
}

impl RequestFile {
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }
}

/// A route table and the paths looked up against it.
#[derive(Debug, Copy, Clone)]
pub struct RouteTable {
    name: &'static str,
    patterns: &'static [&'static str],
    paths: &'static [&'static str],
}

impl RouteTable {
    pub const fn new(name: &'static str, patterns: &'static [&'static str], paths: &'static [&'static str]) -> Self {
        Self { name, patterns, paths }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn patterns(&self) -> &'static [&'static str] {
        self.patterns
    }

    pub fn paths(&self) -> &'static [&'static str] {
        self.paths
    }
}

/// Literal routes only.
pub static STATIC_ROUTES: RouteTable = RouteTable::new(
    "static",
    &[
        "/",
        "/about",
        "/contact",
        "/docs",
        "/docs/install",
        "/docs/getting-started",
        "/docs/reference",
        "/blog",
        "/pricing",
        "/status",
    ],
    &["/", "/docs/install", "/docs/reference", "/status", "/missing"],
);

/// A REST style table mixing literals, wildcards and a catch-all.
pub static API_ROUTES: RouteTable = RouteTable::new(
    "api",
    &[
        "/users",
        "/users/:user",
        "/users/:user/repos",
        "/users/:user/repos/:repo",
        "/users/:user/repos/:repo/issues",
        "/users/:user/repos/:repo/issues/:number",
        "/users/:user/followers",
        "/orgs/:org",
        "/orgs/:org/members",
        "/orgs/:org/teams/:team",
        "/search/code",
        "/search/issues",
        "/static/*path",
    ],
    &[
        "/users",
        "/users/ferris/repos/stagemux/issues/42",
        "/orgs/rust-lang/teams/compiler",
        "/search/issues",
        "/static/css/site/main.css",
        "/users/ferris/unknown",
    ],
);
