//! Race-tolerant creation of remote objects
//!
//! The remote service has no atomic upsert. A create that loses a race (or
//! targets an object our lookup missed) comes back as a conflict, and the
//! object is then read back by listing and matching. Both paths end in the
//! same terminal state.

use std::future::Future;

use mailsync_domain::{MailsyncError, Result};
use tracing::{debug, warn};

/// How a remote object was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Created(T),
    Found(T),
}

impl<T> Resolution<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Created(value) | Self::Found(value) => value,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Attempt `create`; on a conflict, run `find` instead.
///
/// Only `MailsyncError::Conflict` triggers the fallback. A conflict whose
/// fallback finds nothing is returned as a conflict.
pub async fn create_or_find<T, C, F, FFut>(what: &str, create: C, find: F) -> Result<Resolution<T>>
where
    C: Future<Output = Result<T>>,
    F: FnOnce() -> FFut,
    FFut: Future<Output = Result<Option<T>>>,
{
    match create.await {
        Ok(created) => Ok(Resolution::Created(created)),
        Err(MailsyncError::Conflict(detail)) => {
            warn!(object = what, detail = %detail, "Create conflicted, reading existing object");
            find().await?.map(Resolution::Found).ok_or_else(|| {
                MailsyncError::Conflict(format!(
                    "{what} reported as existing but not found on read-back: {detail}"
                ))
            })
        }
        Err(err) => Err(err),
    }
}

/// List-and-match first, then [`create_or_find`] when nothing matches.
pub async fn find_or_create<T, L, LFut, P, C, CFut>(
    what: &str,
    list: L,
    matches: P,
    create: C,
) -> Result<Resolution<T>>
where
    L: Fn() -> LFut,
    LFut: Future<Output = Result<Vec<T>>>,
    P: Fn(&T) -> bool,
    C: FnOnce() -> CFut,
    CFut: Future<Output = Result<T>>,
{
    if let Some(existing) = list().await?.into_iter().find(|item| matches(item)) {
        debug!(object = what, "Matched existing remote object");
        return Ok(Resolution::Found(existing));
    }

    let list = &list;
    let matches = &matches;
    create_or_find(what, create(), move || async move {
        Ok::<_, MailsyncError>(list().await?.into_iter().find(|item| matches(item)))
    })
    .await
}
