//! Append-only text buffer stored in pool slots
//!
//! Storage comes from the manager: small buffers sit in size-class slots,
//! larger ones transparently move to the system allocator. When an append
//! does not fit, the buffer moves to `(capacity + appended) * 2` bytes.

use core::fmt;
use core::ptr::{self, NonNull};

use mempool::PoolManager;
#[cfg(feature = "logging")]
use tracing::trace;

/// Growable UTF-8 buffer backed by a [`PoolManager`]
pub struct Text<'m> {
    manager: &'m PoolManager,
    buf: Option<NonNull<u8>>,
    cap: usize,
    len: usize,
}

impl<'m> Text<'m> {
    /// Creates an empty buffer; nothing is allocated until the first append
    pub fn new(manager: &'m PoolManager) -> Self {
        Self {
            manager,
            buf: None,
            cap: 0,
            len: 0,
        }
    }

    /// Appends `s`
    pub fn add(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let buf = match self.buf {
            Some(buf) if self.len + s.len() <= self.cap => buf,
            _ => self.grow(s.len()),
        };

        // SAFETY: Appending into owned storage.
        // - grow guarantees len + s.len() <= cap bytes are writable at buf
        // - s is borrowed from elsewhere, so the ranges cannot overlap
        unsafe { ptr::copy_nonoverlapping(s.as_ptr(), buf.as_ptr().add(self.len), s.len()) };
        self.len += s.len();
    }

    /// Returns the storage to the manager and empties the buffer
    pub fn release(&mut self) {
        if let Some(buf) = self.buf.take() {
            // SAFETY: buf was allocated by this manager with exactly `cap`
            // bytes and is no longer referenced (taken out of self).
            unsafe { self.manager.release(self.cap, buf) };
        }
        self.cap = 0;
        self.len = 0;
    }

    pub fn as_str(&self) -> &str {
        match self.buf {
            // SAFETY: the first len bytes were copied from whole &str values,
            // so they are initialized, valid UTF-8.
            Some(buf) => unsafe {
                core::str::from_utf8_unchecked(core::slice::from_raw_parts(buf.as_ptr(), self.len))
            },
            None => "",
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes of storage currently held
    pub fn capacity(&self) -> usize {
        self.cap
    }

    fn grow(&mut self, extra: usize) -> NonNull<u8> {
        let cap = self
            .cap
            .checked_add(extra)
            .and_then(|n| n.checked_mul(2))
            .unwrap_or_else(|| capacity_overflow());

        let buf = match self.buf {
            // SAFETY: old was allocated by this manager with `self.cap` bytes
            // and is replaced below, so it is not used again.
            Some(old) => unsafe { self.manager.reallocate(old, self.cap, cap) },
            None => self.manager.allocate(cap, false),
        };

        #[cfg(feature = "logging")]
        trace!(from = self.cap, to = cap, "text buffer grew");

        self.buf = Some(buf);
        self.cap = cap;
        buf
    }
}

#[cold]
fn capacity_overflow() -> ! {
    panic!("text capacity overflow")
}

impl Drop for Text<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Write for Text<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.add(s);
        Ok(())
    }
}

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Text")
            .field("text", &self.as_str())
            .field("cap", &self.cap)
            .finish()
    }
}

impl PartialEq<str> for Text<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Text<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
