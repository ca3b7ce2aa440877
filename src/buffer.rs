//! Pool of reusable scratch buffers.
//!
//! A buffer is checked out as a [`PooledBuffer`] guard and goes back to its
//! pool when the guard is dropped, including on early returns and unwinds.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Buffers that grew past this are dropped instead of being kept around.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;
const MAX_POOLED: usize = 32;

pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub const fn new() -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self) -> PooledBuffer<'_> {
        let buf = self.buffers.lock().pop().unwrap_or_default();
        PooledBuffer { pool: self, buf }
    }

    fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < MAX_POOLED {
            buffers.push(buf);
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.buffers.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_returns_to_pool_cleared() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.get();
            buf.extend_from_slice(b"scratch");
        }
        assert_eq!(pool.idle(), 1);

        let buf = pool.get();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 7);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_buffer_returned_on_early_exit() {
        fn fails(pool: &BufferPool) -> Result<(), &'static str> {
            let mut buf = pool.get();
            buf.push(b'x');
            Err("bail")
        }

        let pool = BufferPool::new();
        assert!(fails(&pool).is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_oversized_buffer_is_not_retained() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.get();
            buf.reserve(MAX_RETAINED_CAPACITY + 1);
        }
        assert_eq!(pool.idle(), 0);
    }
}
