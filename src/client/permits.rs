use std::sync::{Condvar, Mutex, PoisonError};

/// Counting pool bounding how many requests may be in flight at once.
pub struct PermitPool {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

/// Held for the duration of one request; returns its slot when dropped.
pub struct Permit<'a> {
    pool: &'a PermitPool,
}

impl PermitPool {
    pub fn new(capacity: usize) -> Self {
        PermitPool {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks the calling thread until a permit is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self.released.wait(available).unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        Permit { pool: self }
    }

    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(Permit { pool: self })
    }

    fn release(&self) {
        {
            let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
            *available += 1;
        }
        self.released.notify_one();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}
