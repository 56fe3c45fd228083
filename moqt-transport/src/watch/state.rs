use std::{
    future::Future,
    ops::{Deref, DerefMut},
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll, Waker},
};

struct StateInner<T> {
    value: T,
    epoch: usize,
    wakers: Vec<Waker>,
    dropped: bool,
}

impl<T> StateInner<T> {
    fn wake(&mut self) {
        self.epoch += 1;
        for waker in self.wakers.drain(..) {
            waker.wake();
        }
    }
}

// Marks one half of a split state; when the last clone of a half goes away,
// waiters wake up and observe the closure.
struct StateDrop<T> {
    inner: Arc<Mutex<StateInner<T>>>,
}

impl<T> Drop for StateDrop<T> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.dropped = true;
        inner.wake();
    }
}

/// Mutex-guarded state with modification wake-ups and drop detection.
///
/// [State::split] produces two handles to the same value. Mutating through
/// either wakes anything blocked on [StateRef::modified]; fully dropping one
/// half makes `modified` return `None` on the other, which is how every
/// writer/reader pair in this crate learns its peer went away.
pub struct State<T> {
    inner: Arc<Mutex<StateInner<T>>>,
    _drop: Arc<StateDrop<T>>,
}

impl<T> State<T> {
    pub fn new(value: T) -> Self {
        let inner = Arc::new(Mutex::new(StateInner {
            value,
            epoch: 0,
            wakers: Vec::new(),
            dropped: false,
        }));
        Self {
            _drop: Arc::new(StateDrop {
                inner: inner.clone(),
            }),
            inner,
        }
    }

    /// Split into two halves that share the value but track their lifetimes
    /// independently.
    pub fn split(self) -> (Self, Self) {
        let other = Self {
            inner: self.inner.clone(),
            _drop: Arc::new(StateDrop {
                inner: self.inner.clone(),
            }),
        };
        (self, other)
    }

    /// Lock the state for reading.
    pub fn lock(&self) -> StateRef<'_, T> {
        StateRef {
            inner: &self.inner,
            guard: self.inner.lock().unwrap(),
        }
    }

    /// Lock the state for writing; `None` when the other half was dropped.
    pub fn lock_mut(&self) -> Option<StateMut<'_, T>> {
        let guard = self.inner.lock().unwrap();
        if guard.dropped {
            return None;
        }
        Some(StateMut { guard })
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _drop: self._drop.clone(),
        }
    }
}

impl<T: Default> Default for State<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A read lock over the state.
pub struct StateRef<'a, T> {
    inner: &'a Arc<Mutex<StateInner<T>>>,
    guard: MutexGuard<'a, StateInner<T>>,
}

impl<'a, T> StateRef<'a, T> {
    /// A future that resolves on the next modification. `None` when the
    /// other half was dropped, so no further modification can happen.
    ///
    /// The future owns its own reference; drop this guard before awaiting.
    pub fn modified(&self) -> Option<StateChanged<T>> {
        if self.guard.dropped {
            return None;
        }
        Some(StateChanged {
            inner: self.inner.clone(),
            epoch: self.guard.epoch,
        })
    }

    /// Upgrade to a write lock; `None` when the other half was dropped.
    pub fn into_mut(self) -> Option<StateMut<'a, T>> {
        if self.guard.dropped {
            return None;
        }
        Some(StateMut { guard: self.guard })
    }
}

impl<T> Deref for StateRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard.value
    }
}

/// A write lock over the state; waiters are woken when it drops.
pub struct StateMut<'a, T> {
    guard: MutexGuard<'a, StateInner<T>>,
}

impl<T> Deref for StateMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard.value
    }
}

impl<T> DerefMut for StateMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard.value
    }
}

impl<T> Drop for StateMut<'_, T> {
    fn drop(&mut self) {
        self.guard.wake();
    }
}

/// Resolves once the state changes (or a half is dropped) after the epoch it
/// was created at.
pub struct StateChanged<T> {
    inner: Arc<Mutex<StateInner<T>>>,
    epoch: usize,
}

impl<T> Future for StateChanged<T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.epoch != self.epoch || inner.dropped {
            return Poll::Ready(());
        }

        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T> Unpin for StateChanged<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn modified_wakes() {
        let (a, b) = State::new(0u32).split();

        let waiting = {
            let state = a.lock();
            assert_eq!(*state, 0);
            state.modified().unwrap()
        };

        let task = tokio::spawn(async move {
            waiting.await;
            *a.lock()
        });

        *b.lock_mut().unwrap() = 7;
        assert_eq!(task.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn drop_closes() {
        let (a, b) = State::new(0u32).split();

        let waiting = a.lock().modified().unwrap();
        drop(b);

        // The pending future resolves and the closure is observable.
        waiting.await;
        assert!(a.lock().modified().is_none());
        assert!(a.lock_mut().is_none());
    }

    #[test]
    fn clone_is_same_half() {
        let (a, b) = State::new(0u32).split();
        let a2 = a.clone();

        // Dropping one clone of a half does not close the state.
        drop(a);
        assert!(b.lock_mut().is_some());

        drop(a2);
        assert!(b.lock_mut().is_none());
    }
}
