//! The per-session cluster index: a hash-bucketed lookup by mergekey plus
//! an append-only sorted-position list (spec §4.B).
//!
//! The source structure is a single allocation holding both a hash table
//! of intrusive singly-linked buckets and a flat array of sort positions,
//! entered and left through a lock/unlock pair around every mutation.
//! This follows the teacher's storage layer in using one `parking_lot`
//! mutex to guard the whole structure and an RAII guard in place of the
//! manual enter/leave calls, while the bucket chains themselves become
//! plain `Vec<Handle<Cluster>>` instead of intrusive pointers.

use parking_lot::{Mutex, MutexGuard};

use crate::arena::{Arena, Handle};
use crate::model::Cluster;

/// One hash bucket: every cluster whose mergekey hashed to this slot.
pub type Bucket = Vec<Handle<Cluster>>;

/// The hash-bucketed index plus sorted-position list for one session's
/// cluster population.
pub struct Reclist {
    buckets: Vec<Bucket>,
    /// Positions into `buckets`' handles, kept in the session's current
    /// sort order; rebuilt wholesale by [`ReclistGuard::sort`].
    sorted: Vec<Handle<Cluster>>,
    /// Cap applied by the most recent `limit` call, if any.
    limit: Option<usize>,
}

impl Reclist {
    /// Build an empty reclist with `hash_size` buckets.
    pub fn new(hash_size: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); hash_size.max(1)],
            sorted: Vec::new(),
            limit: None,
        }
    }

    fn bucket_index(&self, merge_key: &str) -> usize {
        let mut hash: u64 = 5381;
        for byte in merge_key.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
        }
        (hash as usize) % self.buckets.len()
    }
}

/// A mutex-guarded reclist, entered and left with RAII scope in place of
/// the source's manual `enter`/`leave` bracket.
pub struct SharedReclist {
    inner: Mutex<Reclist>,
}

impl SharedReclist {
    /// Build a new shared reclist with `hash_size` buckets.
    pub fn new(hash_size: usize) -> Self {
        Self {
            inner: Mutex::new(Reclist::new(hash_size)),
        }
    }

    /// Acquire exclusive access, mirroring the source's `reclist_enter`.
    /// The returned guard releases the lock (`reclist_leave`) on drop.
    pub fn enter(&self) -> ReclistGuard<'_> {
        ReclistGuard {
            guard: self.inner.lock(),
        }
    }
}

/// RAII handle to a locked [`Reclist`].
pub struct ReclistGuard<'a> {
    guard: MutexGuard<'a, Reclist>,
}

impl ReclistGuard<'_> {
    /// Look up every cluster already filed under `merge_key`.
    pub fn find(&self, merge_key: &str) -> &[Handle<Cluster>] {
        let idx = self.guard.bucket_index(merge_key);
        &self.guard.buckets[idx]
    }

    /// File a new cluster handle under its mergekey bucket (spec §4.B
    /// `insert`). Does not affect the sorted view until `sort` runs.
    pub fn insert(&mut self, merge_key: &str, handle: Handle<Cluster>) {
        let idx = self.guard.bucket_index(merge_key);
        self.guard.buckets[idx].push(handle);
    }

    /// Rebuild the sorted position list from an externally-supplied
    /// ordering (spec §4.B `sort`, driven by the session's comparator).
    pub fn sort(&mut self, ordered: Vec<Handle<Cluster>>) {
        self.guard.sorted = ordered;
    }

    /// Cap how many sorted entries `read_record` exposes (spec §4.B
    /// `limit`). `None` removes the cap.
    pub fn limit(&mut self, limit: Option<usize>) {
        self.guard.limit = limit;
    }

    /// Read the cluster handle at `position` in the current sort order,
    /// respecting any active limit (spec §4.B `read_record`).
    pub fn read_record(&self, position: usize) -> Option<Handle<Cluster>> {
        if let Some(limit) = self.guard.limit {
            if position >= limit {
                return None;
            }
        }
        self.guard.sorted.get(position).copied()
    }

    /// Total clusters currently filed, independent of the sorted/limited
    /// view.
    pub fn total_inserted(&self) -> usize {
        self.guard.buckets.iter().map(Vec::len).sum()
    }

    /// The length of the current sorted view, after limiting.
    pub fn sorted_len(&self) -> usize {
        match self.guard.limit {
            Some(limit) => self.guard.sorted.len().min(limit),
            None => self.guard.sorted.len(),
        }
    }

    /// Drop every filed cluster and the sorted view (spec §4.B `destroy`,
    /// called as part of session teardown before the backing arena is
    /// cleared).
    pub fn destroy(&mut self) {
        for bucket in &mut self.guard.buckets {
            bucket.clear();
        }
        self.guard.sorted.clear();
        self.guard.limit = None;
    }
}
