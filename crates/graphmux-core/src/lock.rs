//! Reentrant read/write lock for graph handles
//!
//! Every [`Graph`](crate::Graph) carries one `GraphLock`. The lock is
//! reentrant per thread: a thread holding the write side may take further
//! read or write guards, and a thread holding read guards may take more
//! read guards even while a writer is queued. Waiting writers block new
//! readers from other threads so a steady stream of readers cannot starve
//! them.
//!
//! Ownership is tracked per thread, which is what lets checked graphs ask
//! "does the calling thread hold this lock?" before touching the store.
//! Guards are therefore `!Send`: they must be dropped on the thread that
//! acquired them.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

/// Bookkeeping protected by the inner mutex
#[derive(Debug, Default)]
struct LockState {
    /// Read holds per thread
    readers: HashMap<ThreadId, usize>,
    /// Thread holding the write side, with its hold count
    writer: Option<(ThreadId, usize)>,
    /// Threads blocked in `write()`
    waiting_writers: usize,
}

impl LockState {
    fn writer_is(&self, thread: ThreadId) -> bool {
        matches!(self.writer, Some((owner, _)) if owner == thread)
    }
}

/// Reentrant read/write lock with per-thread ownership tracking.
#[derive(Default)]
pub struct GraphLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl GraphLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the read side, blocking while another thread writes.
    pub fn read(&self) -> ReadGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            let reentrant = state.writer_is(me) || state.readers.contains_key(&me);
            if reentrant || (state.writer.is_none() && state.waiting_writers == 0) {
                break;
            }
            self.changed.wait(&mut state);
        }
        *state.readers.entry(me).or_insert(0) += 1;
        ReadGuard {
            lock: self,
            thread: me,
            _not_send: PhantomData,
        }
    }

    /// Acquire the read side without blocking.
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        let reentrant = state.writer_is(me) || state.readers.contains_key(&me);
        if !reentrant && (state.writer.is_some() || state.waiting_writers > 0) {
            return None;
        }
        *state.readers.entry(me).or_insert(0) += 1;
        Some(ReadGuard {
            lock: self,
            thread: me,
            _not_send: PhantomData,
        })
    }

    /// Acquire the write side, blocking until no other thread reads or writes.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds only the read side. Upgrading a
    /// read hold to a write hold would otherwise deadlock.
    pub fn write(&self) -> WriteGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if let Some((owner, holds)) = state.writer.as_mut() {
            if *owner == me {
                *holds += 1;
                return WriteGuard {
                    lock: self,
                    _not_send: PhantomData,
                };
            }
        }
        assert!(
            !state.readers.contains_key(&me),
            "graph lock: a read hold cannot be upgraded to a write hold"
        );

        state.waiting_writers += 1;
        while state.writer.is_some() || !state.readers.is_empty() {
            self.changed.wait(&mut state);
        }
        state.waiting_writers -= 1;
        state.writer = Some((me, 1));
        WriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Acquire the write side without blocking.
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        let busy = !state.readers.is_empty();
        match state.writer.as_mut() {
            Some((owner, holds)) if *owner == me => *holds += 1,
            Some(_) => return None,
            None if busy => return None,
            None => state.writer = Some((me, 1)),
        }
        Some(WriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// True if the calling thread holds the read side, or the write side
    /// (which implies read access).
    pub fn is_read_held_by_current_thread(&self) -> bool {
        let me = thread::current().id();
        let state = self.state.lock();
        state.writer_is(me) || state.readers.contains_key(&me)
    }

    /// True if the calling thread holds the write side.
    pub fn is_write_held_by_current_thread(&self) -> bool {
        self.state.lock().writer_is(thread::current().id())
    }

    /// Number of read holds taken by the calling thread.
    pub fn read_hold_count(&self) -> usize {
        let me = thread::current().id();
        self.state.lock().readers.get(&me).copied().unwrap_or(0)
    }

    /// True if any thread holds the write side.
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    /// Number of threads currently holding the read side.
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers.len()
    }

    fn release_read(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        let remaining = match state.readers.get_mut(&thread) {
            Some(holds) => {
                *holds -= 1;
                *holds
            }
            None => return,
        };
        if remaining == 0 {
            state.readers.remove(&thread);
            if state.readers.is_empty() {
                self.changed.notify_all();
            }
        }
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        if let Some((_, holds)) = state.writer.as_mut() {
            *holds -= 1;
            if *holds == 0 {
                state.writer = None;
                self.changed.notify_all();
            }
        }
    }
}

impl fmt::Debug for GraphLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GraphLock")
            .field("readers", &state.readers.len())
            .field("write_locked", &state.writer.is_some())
            .field("waiting_writers", &state.waiting_writers)
            .finish()
    }
}

/// RAII read hold. Released on drop.
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a GraphLock,
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read(self.thread);
    }
}

impl fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard").finish_non_exhaustive()
    }
}

/// RAII write hold. Released on drop.
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a GraphLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

impl fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}
