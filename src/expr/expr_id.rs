use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use once_cell::sync::Lazy;
use uuid::Uuid;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);
static SESSION: Lazy<Uuid> = Lazy::new(Uuid::new_v4);

/// Identity of an attribute, independent of its display name.
///
/// Ids are handed out from a process-wide counter and tagged with the id of
/// the process session that minted them, so ids created by different
/// processes never collide once plans are compared side by side.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId {
    id: u64,
    session: Uuid,
}

impl ExprId {
    /// Mint a fresh, never before seen id.
    pub fn next() -> Self {
        Self { id: NEXT_ID.fetch_add(1, Ordering::Relaxed), session: *SESSION }
    }

    /// Positional id used by canonical plans; never collides with minted ids.
    pub fn canonical(ordinal: usize) -> Self {
        Self { id: ordinal as u64, session: Uuid::nil() }
    }

    /// An id standing for `self` re-derived under `tag`. The same pair
    /// always yields the same id, so re-deriving a node keeps its output ids.
    ///
    /// The session is a name-based uuid of the base session and the tag. It is
    /// never nil and never the random session of minted ids.
    pub fn derived(&self, tag: &str) -> Self {
        Self { id: self.id, session: Uuid::new_v5(&self.session, tag.as_bytes()) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_canonical(&self) -> bool {
        self.session.is_nil()
    }

    pub fn is_derived(&self) -> bool {
        self.session.get_version_num() == 5
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_canonical() {
            write!(f, "#c{}", self.id)
        } else if self.is_derived() {
            let session = self.session.simple().to_string();
            write!(f, "#{}.{}", self.id, &session[..8])
        } else {
            write!(f, "#{}", self.id)
        }
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_unique() {
        let a = ExprId::next();
        let b = ExprId::next();
        assert_ne!(a, b);
        assert!(!a.is_canonical());
    }

    #[test]
    fn canonical_ids_never_equal_minted_ids() {
        let minted = ExprId::next();
        assert_ne!(ExprId::canonical(minted.id() as usize), minted);
        assert_eq!(ExprId::canonical(3), ExprId::canonical(3));
    }

    #[test]
    fn derived_ids_are_stable_per_tag() {
        let base = ExprId::next();
        let long = base.derived("bigint");
        assert_ne!(long, base);
        assert_eq!(base.derived("bigint"), long);
        assert_ne!(base.derived("double"), long);
        assert_ne!(long.derived("bigint"), long);
    }

    #[test]
    fn derived_ids_stay_apart_from_other_ids() {
        let (a, b) = (ExprId::next(), ExprId::next());
        let from_a = a.derived("union:bigint");
        assert_ne!(from_a, b.derived("union:bigint"));
        assert!(from_a.is_derived() && !from_a.is_canonical());
        assert_ne!(format!("{from_a:?}"), format!("{a:?}"));
        assert_ne!(from_a, ExprId::canonical(a.id() as usize));
        let later: Vec<ExprId> = (0..64).map(|_| ExprId::next()).collect();
        assert!(!later.contains(&from_a));
        assert!(!later.contains(&ExprId::canonical(0).derived("union:bigint")));
    }
}
