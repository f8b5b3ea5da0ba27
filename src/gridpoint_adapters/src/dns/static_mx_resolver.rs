use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use gridpoint_core::{MxLookup, MxResolver};

/// `MxResolver` with a fixed answer set, for environments without DNS and
/// for tests.
///
/// `unavailable()` models a runtime with no resolver at all: every lookup
/// answers `Unavailable` and e-mail validation degrades to syntax-only.
/// `with_domains(..)` answers `Found` for the listed domains and
/// `NotFound` for everything else.
#[derive(Debug, Clone)]
pub struct StaticMxResolver {
    known: Option<Arc<HashSet<String>>>,
}

impl StaticMxResolver {
    pub fn unavailable() -> Self {
        Self { known: None }
    }

    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(Arc::new(
                domains.into_iter().map(Into::into).collect(),
            )),
        }
    }
}

#[async_trait]
impl MxResolver for StaticMxResolver {
    async fn lookup(&self, domain: &str) -> MxLookup {
        match &self.known {
            None => MxLookup::Unavailable,
            Some(known) if known.contains(domain) => MxLookup::Found,
            Some(_) => MxLookup::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_resolver_never_answers() {
        let resolver = StaticMxResolver::unavailable();
        assert_eq!(resolver.lookup("example.com").await, MxLookup::Unavailable);
    }

    #[tokio::test]
    async fn known_domain_is_found() {
        let resolver = StaticMxResolver::with_domains(["x.cz"]);
        assert_eq!(resolver.lookup("x.cz").await, MxLookup::Found);
        assert_eq!(resolver.lookup("no-mail.test").await, MxLookup::NotFound);
    }
}
