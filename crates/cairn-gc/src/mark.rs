//! Colored-set construction: the mark phase.
//!
//! [`colored_set`] builds the set of identifiers a collection run must
//! retain. Four passes share one [`MemoryKeySet`]:
//!
//! 1. **Recursive**: the pinner's recursive roots and everything reachable
//!    from them; any fetch failure flags the build incomplete
//! 2. **Best-effort**: caller-supplied roots whose data may legitimately be
//!    missing; a "block not found" failure is tolerated silently and stops
//!    that branch, any other failure behaves as in pass 1
//! 3. **Direct**: the pinner's direct roots, added without traversal
//! 4. **Internal**: the pinner's bookkeeping roots, traversed like pass 1
//!
//! A failing fetch never aborts a pass: the failing block contributes an
//! empty link list so sibling traversal continues, and a
//! [`GcError::FetchLinks`] warning goes out on the side channel immediately.
//! The trade-off is deliberate and must not be tightened into fail-fast:
//! continuing discovers as much of the reachable set as possible, and the
//! `complete` flag tells the caller the result may under-protect.

use async_trait::async_trait;
use cairn_core::{ContentId, KeySet, Link, LinkResolver, MemoryKeySet, PinSource};
use tokio::sync::mpsc;

use crate::cancel::CancelToken;
use crate::error::{GcError, Result};
use crate::walk::{descendants, FetchLinks};

/// Result of the mark phase.
#[derive(Debug)]
pub struct MarkOutcome {
    /// The identifiers to retain.
    pub set: MemoryKeySet,
    /// False if any fetch failed; the set may then be missing reachable
    /// blocks and the caller must not treat it as exhaustive.
    pub complete: bool,
}

/// Link lookup that applies one pass's failure-tolerance policy.
struct PolicyFetcher<'a, L: ?Sized> {
    links: &'a L,
    warnings: &'a mpsc::Sender<GcError>,
    cancel: &'a CancelToken,
    /// Swallow "block not found" instead of flagging it (best-effort pass).
    tolerate_missing: bool,
    failed: bool,
}

#[async_trait]
impl<L: LinkResolver + ?Sized> FetchLinks for PolicyFetcher<'_, L> {
    async fn fetch(&mut self, cid: &ContentId) -> Result<Vec<Link>> {
        if self.cancel.is_cancelled() {
            return Err(GcError::Cancelled);
        }

        let fetched = tokio::select! {
            fetched = self.links.links(cid) => fetched,
            () = self.cancel.cancelled() => return Err(GcError::Cancelled),
        };

        match fetched {
            Ok(links) => Ok(links),
            Err(source) if self.tolerate_missing && source.is_not_found() => Ok(Vec::new()),
            Err(source) => {
                self.failed = true;
                let warning = GcError::FetchLinks { cid: *cid, source };
                tokio::select! {
                    sent = self.warnings.send(warning) => {
                        // A gone consumer ends the run like a cancellation.
                        if sent.is_err() {
                            return Err(GcError::Cancelled);
                        }
                    }
                    () = self.cancel.cancelled() => return Err(GcError::Cancelled),
                }
                Ok(Vec::new())
            }
        }
    }
}

/// Builds the marked set for one collection run.
///
/// Warnings stream out on `warnings` as they occur, so a consumer can surface
/// them before the build finishes.
///
/// # Errors
///
/// Returns [`GcError::PinRoots`] if the pinner cannot supply a root list
/// (fatal, nothing swept), or [`GcError::Cancelled`] if the run was
/// cancelled mid-build. Individual fetch failures are not errors here; they
/// surface as warnings plus `complete == false` in the outcome.
pub async fn colored_set<L, P>(
    links: &L,
    pins: &P,
    best_effort_roots: &[ContentId],
    warnings: &mpsc::Sender<GcError>,
    cancel: &CancelToken,
) -> Result<MarkOutcome>
where
    L: LinkResolver + ?Sized,
    P: PinSource + ?Sized,
{
    let mut set = MemoryKeySet::new();
    let mut complete = true;

    let recursive = pins
        .recursive_pins()
        .await
        .map_err(|source| GcError::PinRoots { source })?;
    {
        let mut fetcher = PolicyFetcher {
            links,
            warnings,
            cancel,
            tolerate_missing: false,
            failed: false,
        };
        descendants(&mut fetcher, &mut set, &recursive).await?;
        complete &= !fetcher.failed;
    }

    {
        let mut fetcher = PolicyFetcher {
            links,
            warnings,
            cancel,
            tolerate_missing: true,
            failed: false,
        };
        descendants(&mut fetcher, &mut set, best_effort_roots).await?;
        complete &= !fetcher.failed;
    }

    for cid in pins
        .direct_pins()
        .await
        .map_err(|source| GcError::PinRoots { source })?
    {
        set.add(cid);
    }

    let internal = pins
        .internal_pins()
        .await
        .map_err(|source| GcError::PinRoots { source })?;
    {
        let mut fetcher = PolicyFetcher {
            links,
            warnings,
            cancel,
            tolerate_missing: false,
            failed: false,
        };
        descendants(&mut fetcher, &mut set, &internal).await?;
        complete &= !fetcher.failed;
    }

    Ok(MarkOutcome { set, complete })
}
