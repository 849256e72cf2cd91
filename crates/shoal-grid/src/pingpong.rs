//! Active/next buffer pair.
//!
//! [`PingPong`] holds two instances of a buffer. At any instant exactly
//! one is the *active* (readable) buffer and the other is *next*
//! (writable). [`swap`](PingPong::swap) flips the roles in one step;
//! there is no partially swapped state.

/// Two buffers alternating between active and next roles.
#[derive(Clone, Debug)]
pub struct PingPong<T> {
    buffers: [T; 2],
    /// Index of the active buffer (0 or 1).
    active: usize,
}

impl<T> PingPong<T> {
    /// Create a pair; `active` starts as the active buffer.
    pub fn new(active: T, next: T) -> Self {
        Self {
            buffers: [active, next],
            active: 0,
        }
    }

    /// The active (read) buffer.
    pub fn active(&self) -> &T {
        &self.buffers[self.active]
    }

    /// Mutable access to the active buffer.
    pub fn active_mut(&mut self) -> &mut T {
        &mut self.buffers[self.active]
    }

    /// The next (write) buffer.
    pub fn next(&self) -> &T {
        &self.buffers[1 - self.active]
    }

    /// Mutable access to the next buffer.
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.buffers[1 - self.active]
    }

    /// Borrow the active buffer for reading and the next for writing.
    pub fn split(&mut self) -> (&T, &mut T) {
        let (a, b) = self.buffers.split_at_mut(1);
        if self.active == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    /// Mutable access to both buffers as `(active, next)`.
    pub fn both_mut(&mut self) -> (&mut T, &mut T) {
        let (a, b) = self.buffers.split_at_mut(1);
        if self.active == 0 {
            (&mut a[0], &mut b[0])
        } else {
            (&mut b[0], &mut a[0])
        }
    }

    /// Exchange the roles of the two buffers.
    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }

    /// Iterate both buffers (active first).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        [self.active(), self.next()].into_iter()
    }

    /// Consume the pair, returning `(active, next)`.
    pub fn into_parts(self) -> (T, T) {
        let [a, b] = self.buffers;
        if self.active == 0 {
            (a, b)
        } else {
            (b, a)
        }
    }
}
