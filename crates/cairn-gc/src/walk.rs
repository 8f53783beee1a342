//! Descendant traversal over the block graph.
//!
//! [`descendants`] populates a [`KeySet`] with a list of roots and everything
//! transitively reachable from them. The per-node link lookup comes from a
//! caller-supplied [`FetchLinks`], which owns the failure-tolerance policy
//! for the pass; the walker itself only propagates fetcher errors, aborting
//! the whole walk on the first one.
//!
//! Termination holds on any finite graph, including cycles and diamonds
//! introduced by malformed data: a child is queued for expansion only when
//! [`KeySet::visit`] reports its first insertion, and membership is
//! monotonic, so no identifier is expanded twice.

use async_trait::async_trait;
use cairn_core::{ContentId, KeySet, Link};

use crate::error::Result;

/// Per-pass link lookup supplied to [`descendants`].
///
/// Implementations decide which underlying failures surface as errors (and
/// therefore abort the walk) and which are absorbed into an empty link list.
#[async_trait]
pub trait FetchLinks: Send {
    /// Returns the outgoing links of `cid`.
    ///
    /// # Errors
    ///
    /// Any error returned here aborts the entire walk immediately.
    async fn fetch(&mut self, cid: &ContentId) -> Result<Vec<Link>>;
}

/// Adds every root and every node transitively reachable from it to `set`.
///
/// Roots are processed in the order given, for reproducible runs. Each root
/// is added to the set before its links are fetched, so a root survives even
/// when its own resolution fails. Children are expanded at most once across
/// the whole walk.
///
/// # Errors
///
/// Propagates the first fetcher error, stopping all further traversal.
pub async fn descendants<F, K>(fetcher: &mut F, set: &mut K, roots: &[ContentId]) -> Result<()>
where
    F: FetchLinks + ?Sized,
    K: KeySet + Send + ?Sized,
{
    for root in roots {
        set.add(*root);

        let mut pending = vec![*root];
        while let Some(cid) = pending.pop() {
            let links = fetcher.fetch(&cid).await?;
            for link in links {
                if set.visit(&link.target) {
                    pending.push(link.target);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use cairn_core::MemoryKeySet;

    use crate::error::GcError;

    /// Map-backed fetcher that counts lookups per identifier.
    #[derive(Default)]
    struct CountingFetcher {
        graph: HashMap<ContentId, Vec<Link>>,
        fetches: HashMap<ContentId, usize>,
        fail_on: Option<ContentId>,
    }

    impl CountingFetcher {
        fn edge(&mut self, from: ContentId, to: ContentId) {
            self.graph.entry(from).or_default().push(Link::to(to));
            self.graph.entry(to).or_default();
        }

        fn node(&mut self, cid: ContentId) {
            self.graph.entry(cid).or_default();
        }

        fn count(&self, cid: &ContentId) -> usize {
            self.fetches.get(cid).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl FetchLinks for CountingFetcher {
        async fn fetch(&mut self, cid: &ContentId) -> Result<Vec<Link>> {
            if self.fail_on.as_ref() == Some(cid) {
                return Err(GcError::FetchLinks {
                    cid: *cid,
                    source: cairn_core::Error::storage("simulated fault"),
                });
            }
            *self.fetches.entry(*cid).or_insert(0) += 1;
            Ok(self.graph.get(cid).cloned().unwrap_or_default())
        }
    }

    fn id(tag: &str) -> ContentId {
        ContentId::from_data(tag.as_bytes())
    }

    #[tokio::test]
    async fn test_walks_chain() {
        let (a, b, c) = (id("a"), id("b"), id("c"));
        let mut fetcher = CountingFetcher::default();
        fetcher.edge(a, b);
        fetcher.edge(b, c);

        let mut set = MemoryKeySet::new();
        descendants(&mut fetcher, &mut set, &[a]).await.expect("walk");

        assert_eq!(set.len(), 3);
        for node in [a, b, c] {
            assert!(set.contains(&node));
        }
    }

    #[tokio::test]
    async fn test_diamond_expanded_once() {
        // a -> {b, c}, b -> d, c -> d
        let (a, b, c, d) = (id("a"), id("b"), id("c"), id("d"));
        let mut fetcher = CountingFetcher::default();
        fetcher.edge(a, b);
        fetcher.edge(a, c);
        fetcher.edge(b, d);
        fetcher.edge(c, d);

        let mut set = MemoryKeySet::new();
        descendants(&mut fetcher, &mut set, &[a]).await.expect("walk");

        assert_eq!(set.len(), 4);
        for node in [a, b, c, d] {
            assert_eq!(fetcher.count(&node), 1, "{node} expanded more than once");
        }
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        // a -> b -> c -> a
        let (a, b, c) = (id("a"), id("b"), id("c"));
        let mut fetcher = CountingFetcher::default();
        fetcher.edge(a, b);
        fetcher.edge(b, c);
        fetcher.edge(c, a);

        let mut set = MemoryKeySet::new();
        descendants(&mut fetcher, &mut set, &[a]).await.expect("walk");

        assert_eq!(set.len(), 3);
        assert_eq!(fetcher.count(&a), 1);
    }

    #[tokio::test]
    async fn test_multiple_roots_shared_subgraph() {
        // a -> c, b -> c
        let (a, b, c) = (id("a"), id("b"), id("c"));
        let mut fetcher = CountingFetcher::default();
        fetcher.edge(a, c);
        fetcher.edge(b, c);

        let mut set = MemoryKeySet::new();
        descendants(&mut fetcher, &mut set, &[a, b]).await.expect("walk");

        assert_eq!(set.len(), 3);
        assert_eq!(fetcher.count(&c), 1);
    }

    #[tokio::test]
    async fn test_fetcher_error_aborts_walk() {
        let (a, b) = (id("a"), id("b"));
        let mut fetcher = CountingFetcher::default();
        fetcher.edge(a, b);
        fetcher.node(b);
        fetcher.fail_on = Some(a);

        let mut set = MemoryKeySet::new();
        let err = descendants(&mut fetcher, &mut set, &[a, b])
            .await
            .expect_err("must abort");
        assert!(matches!(err, GcError::FetchLinks { .. }));

        // The failing root was still added; the later root was never reached.
        assert!(set.contains(&a));
        assert!(!set.contains(&b));
    }
}
