// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A bounded single-producer, single-consumer byte-message ring used for
//! per-connection outbound backpressure (spec `§4.D Backpressure`).
//!
//! Push never blocks: a full ring returns [`Error::Overflow`] immediately so
//! the caller can treat sustained overflow as a fatal transport condition
//! rather than growing memory without bound. Pull is async and waits for a
//! slot to be filled or for the ring to be closed.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{Error, ErrorInt};

pub const DEFAULT_CAPACITY: usize = 512;

struct Inner {
    slots: Mutex<State>,
    notify: Notify,
}

struct State {
    queue: VecDeque<Bytes>,
    capacity: usize,
    closed: bool,
}

/// The producer half of a ring. `push` is non-blocking.
#[derive(Clone)]
pub struct RingSender {
    inner: Arc<Inner>,
}

/// The consumer half of a ring. `pull` is async.
pub struct RingReceiver {
    inner: Arc<Inner>,
}

/// Creates a new ring with `capacity` slots, which must be a power of two.
///
/// Panics if `capacity` is zero or not a power of two; callers validate
/// configuration at construction time (`ServerOptions`/`ClientOptions`)
/// rather than here.
pub fn channel(capacity: usize) -> (RingSender, RingReceiver) {
    assert!(capacity > 0 && capacity.is_power_of_two(), "ring capacity must be a nonzero power of two, got {}", capacity);
    let inner = Arc::new(Inner {
        slots: Mutex::new(State {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            closed: false,
        }),
        notify: Notify::new(),
    });
    (
        RingSender { inner: inner.clone() },
        RingReceiver { inner },
    )
}

impl RingSender {
    /// Enqueues `data`. Returns [`Error::Overflow`] without blocking if the
    /// ring is full, or an error if the receiver has been dropped.
    pub fn push(&self, data: Bytes) -> Result<(), Error> {
        {
            let mut state = self.inner.slots.lock();
            if state.closed {
                bail!(ErrorInt::Terminated {
                    reason: "ring receiver has been dropped".into(),
                });
            }
            if state.queue.len() >= state.capacity {
                bail!(ErrorInt::Overflow { capacity: state.capacity });
            }
            state.queue.push_back(data);
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.slots.lock().closed
    }
}

impl RingReceiver {
    /// Waits for the next message, or returns `None` once the ring is
    /// closed and drained.
    pub async fn pull(&mut self) -> Option<Bytes> {
        loop {
            {
                let mut state = self.inner.slots.lock();
                if let Some(data) = state.queue.pop_front() {
                    return Some(data);
                }
                if state.closed {
                    return None;
                }
            }
            self.inner.notify.notified().await;
        }
    }
}

impl Drop for RingReceiver {
    fn drop(&mut self) {
        self.inner.slots.lock().closed = true;
        self.inner.notify.notify_one();
    }
}
