use std::collections::VecDeque;

use super::State;

/// An unbounded queue built on [State], used to hand control messages and
/// announcements between tasks.
pub struct Queue<T> {
    state: State<VecDeque<T>>,
}

impl<T> Queue<T> {
    /// Push an item onto the queue. Returns Err(item) if the queue is closed.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        match self.state.lock_mut() {
            Some(mut state) => state.push_back(item),
            None => return Err(item),
        };

        Ok(())
    }

    /// Pop an item from the queue, waiting if necessary. `None` when the
    /// queue is closed and drained.
    pub async fn pop(&mut self) -> Option<T> {
        loop {
            {
                let queue = self.state.lock();
                if !queue.is_empty() {
                    return queue.into_mut()?.pop_front();
                }
                queue.modified()?
            }
            .await;
        }
    }

    /// Close the queue, returning whatever was still buffered.
    pub fn close(self) -> Vec<T> {
        let remaining = match self.state.lock_mut() {
            Some(mut queue) => queue.drain(..).collect(),
            _ => Vec::new(),
        };

        drop(self.state);

        remaining
    }

    /// Split the queue into two handles that share the same underlying state.
    pub fn split(self) -> (Self, Self) {
        let state = self.state.split();
        (Self { state: state.0 }, Self { state: state.1 })
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            state: State::new(Default::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_pop() {
        let (mut tx, mut rx) = Queue::default().split();

        tx.push(1).unwrap();
        tx.push(2).unwrap();
        assert_eq!(rx.pop().await, Some(1));
        assert_eq!(rx.pop().await, Some(2));

        drop(tx);
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn pop_waits() {
        let (mut tx, mut rx) = Queue::default().split();

        let task = tokio::spawn(async move { rx.pop().await });
        tx.push(7).unwrap();
        assert_eq!(task.await.unwrap(), Some(7));
    }
}
