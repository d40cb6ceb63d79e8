// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher-side fan-out (spec `§4.E`, Design Notes §9): a [`ServerStream`]
//! owns the mapping from a path's media to the set of reader sessions
//! subscribed to it. Readers are weak references (session ids); a session's
//! departure removes itself rather than the stream reaching into the
//! session.

use std::sync::Arc;

use parking_lot::RwLock;

/// A named, published stream endpoint (the publisher side of one RTSP path).
///
/// The reader set is copy-on-write: readers clone the current `Arc<Vec<_>>`
/// without holding a lock across the delivery loop, so one slow subscriber
/// list mutation never blocks packet fan-out.
pub struct ServerStream {
    path: String,
    media_count: usize,
    readers: RwLock<Arc<Vec<String>>>,
}

impl ServerStream {
    pub fn new(path: String, media_count: usize) -> Self {
        Self {
            path,
            media_count,
            readers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn media_count(&self) -> usize {
        self.media_count
    }

    /// Subscribes `session_id` to this stream's packet fan-out (called at `PLAY`).
    pub fn subscribe(&self, session_id: &str) {
        let mut guard = self.readers.write();
        if guard.iter().any(|id| id == session_id) {
            return;
        }
        let mut next = Vec::clone(&guard);
        next.push(session_id.to_owned());
        *guard = Arc::new(next);
    }

    /// Removes `session_id` from the fan-out (called at `TEARDOWN` or on
    /// connection loss).
    pub fn unsubscribe(&self, session_id: &str) {
        let mut guard = self.readers.write();
        if !guard.iter().any(|id| id == session_id) {
            return;
        }
        let next: Vec<String> = guard.iter().filter(|id| id.as_str() != session_id).cloned().collect();
        *guard = Arc::new(next);
    }

    /// A snapshot of the current reader set, for the fast delivery path: no
    /// lock is held while packets are sent to each reader.
    pub fn readers(&self) -> Arc<Vec<String>> {
        self.readers.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribing_twice_does_not_duplicate() {
        let s = ServerStream::new("/cam".into(), 2);
        s.subscribe("s1");
        s.subscribe("s1");
        assert_eq!(s.readers().as_slice(), &["s1".to_owned()]);
    }

    #[test]
    fn unsubscribe_removes_only_the_named_reader() {
        let s = ServerStream::new("/cam".into(), 2);
        s.subscribe("s1");
        s.subscribe("s2");
        s.unsubscribe("s1");
        assert_eq!(s.readers().as_slice(), &["s2".to_owned()]);
    }

    #[test]
    fn readers_snapshot_is_unaffected_by_later_mutation() {
        let s = ServerStream::new("/cam".into(), 1);
        s.subscribe("s1");
        let snapshot = s.readers();
        s.subscribe("s2");
        assert_eq!(snapshot.as_slice(), &["s1".to_owned()]);
        assert_eq!(s.readers().len(), 2);
    }
}
