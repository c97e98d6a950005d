//! Entry Arena Implementation.
//!
//! This module provides the buffer that every traversal walks. It supports:
//! 1. **Line-sized slots:** Each [`Entry`] sits at the start of its own cache line, so a
//!    visit touches exactly one line regardless of the header's own size.
//! 2. **Lazy allocation:** On Unix the arena is an anonymous `mmap`, so pages are only
//!    committed when the ring is first written.
//! 3. **Index relations:** Entries refer to each other by index; the arena owns all of them.

use std::fmt;
use std::io;
use std::mem;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::common::{Result, ThrashError};
use crate::config::CacheGeometry;

/// One arena entry, stored at the start of a cache line.
///
/// `prev` and `next` are indices into the owning [`EntryArena`]; they describe the
/// cycle order and never own anything.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Entry {
    /// Index of the preceding entry in the cycle.
    pub prev: usize,
    /// Index of the following entry in the cycle.
    pub next: usize,
    /// Visit counter.
    pub data: u64,
}

impl Entry {
    /// Size of the entry header in bytes. A cache line must be at least this large.
    pub const SIZE: usize = mem::size_of::<Self>();
}

/// A contiguous arena of line-sized entry slots.
///
/// On Unix this uses an anonymous private `mmap`, which is zero-filled and page
/// aligned. Elsewhere it falls back to a zeroed, line-aligned heap allocation.
pub struct EntryArena {
    ptr: NonNull<u8>,
    entries: usize,
    stride: usize,
    bytes: usize,
    is_mmap: bool,
}

// SAFETY: the arena exclusively owns its allocation; nothing else aliases it.
unsafe impl Send for EntryArena {}

impl EntryArena {
    /// Allocates an arena laid out against `geometry`.
    ///
    /// Every entry starts zeroed (`prev = next = data = 0`); callers link the
    /// ring themselves.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the geometry is invalid,
    /// [`ThrashError::SizeOverflow`] if it does not fit in the address space and
    /// [`ThrashError::Allocation`] if the host refuses the allocation.
    pub fn new(geometry: &CacheGeometry) -> Result<Self> {
        geometry.validate()?;
        let bytes = geometry.buffer_bytes()?;
        let entries = geometry.entry_count();
        let stride = geometry.line_bytes;

        let (ptr, is_mmap) = Self::allocate(bytes, stride)?;
        debug!(bytes, entries, line_bytes = stride, "allocated entry arena");

        Ok(Self {
            ptr,
            entries,
            stride,
            bytes,
            is_mmap,
        })
    }

    #[cfg(unix)]
    fn allocate(bytes: usize, _align: usize) -> Result<(NonNull<u8>, bool)> {
        // SAFETY: anonymous private mapping with no address hint; the result is
        // checked against MAP_FAILED before use.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                bytes,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if raw == libc::MAP_FAILED {
            return Err(ThrashError::Allocation {
                bytes,
                source: io::Error::last_os_error(),
            });
        }

        NonNull::new(raw.cast::<u8>())
            .map(|ptr| (ptr, true))
            .ok_or_else(|| ThrashError::Allocation {
                bytes,
                source: io::Error::from(io::ErrorKind::OutOfMemory),
            })
    }

    #[cfg(not(unix))]
    fn allocate(bytes: usize, align: usize) -> Result<(NonNull<u8>, bool)> {
        let out_of_memory = || ThrashError::Allocation {
            bytes,
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        let layout = std::alloc::Layout::from_size_align(bytes, align).map_err(|_| out_of_memory())?;
        // SAFETY: `bytes` is non-zero, guaranteed by geometry validation.
        let raw = unsafe { std::alloc::alloc_zeroed(layout) };
        NonNull::new(raw)
            .map(|ptr| (ptr, false))
            .ok_or_else(out_of_memory)
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        self.entries
    }

    /// Returns `true` if the arena has no entries. Never the case for a validated geometry.
    pub const fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Distance in bytes between consecutive entries (the cache line size).
    pub const fn line_bytes(&self) -> usize {
        self.stride
    }

    /// Total size of the arena in bytes.
    pub const fn bytes(&self) -> usize {
        self.bytes
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut Entry {
        assert!(index < self.entries, "entry index {index} out of bounds");
        // SAFETY: index < entries, so the slot lies inside the allocation; slots are
        // aligned because the base is line (or page) aligned and the stride is a
        // power of two no smaller than the header.
        unsafe { self.ptr.as_ptr().add(index * self.stride).cast::<Entry>() }
    }

    /// Swaps the full payload of two entries. Swapping an entry with itself is a no-op.
    pub fn swap(&mut self, a: usize, b: usize) {
        let (pa, pb) = (self.slot(a), self.slot(b));
        // SAFETY: both slots are valid and `ptr::swap` permits `pa == pb`.
        unsafe { ptr::swap(pa, pb) }
    }

    /// Increments the visit counter of one entry.
    ///
    /// The counter is updated with volatile accesses so repeated laps cannot be
    /// folded into a single pass.
    #[inline(always)]
    pub fn touch(&mut self, index: usize) {
        let slot = self.slot(index);
        // SAFETY: `slot` is valid and exclusively borrowed through `&mut self`.
        unsafe {
            let data = ptr::addr_of_mut!((*slot).data);
            ptr::write_volatile(data, ptr::read_volatile(data).wrapping_add(1));
        }
    }

    /// Increments the visit counter of one entry and returns its `next` index.
    ///
    /// This is the pointer-chasing step: the next address is only known once
    /// this line has been loaded.
    #[inline(always)]
    pub fn visit(&mut self, index: usize) -> usize {
        self.touch(index);
        self[index].next
    }

    /// Iterates over all entries in array order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        (0..self.entries).map(move |i| &self[i])
    }
}

impl Index<usize> for EntryArena {
    type Output = Entry;

    fn index(&self, index: usize) -> &Self::Output {
        // SAFETY: `slot` bounds-checks and the arena outlives the borrow.
        unsafe { &*self.slot(index) }
    }
}

impl IndexMut<usize> for EntryArena {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        // SAFETY: as for `index`, with exclusivity from `&mut self`.
        unsafe { &mut *self.slot(index) }
    }
}

impl fmt::Debug for EntryArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryArena")
            .field("entries", &self.entries)
            .field("line_bytes", &self.stride)
            .field("bytes", &self.bytes)
            .field("is_mmap", &self.is_mmap)
            .finish()
    }
}

impl Drop for EntryArena {
    /// Releases the arena.
    ///
    /// On Unix, unmaps the region. Elsewhere, returns the heap allocation.
    fn drop(&mut self) {
        if self.is_mmap {
            #[cfg(unix)]
            // SAFETY: the region was produced by mmap with exactly `bytes` length.
            unsafe {
                let _ = libc::munmap(self.ptr.as_ptr().cast(), self.bytes);
            }
        } else {
            #[cfg(not(unix))]
            // SAFETY: allocated by `alloc_zeroed` with this exact layout.
            unsafe {
                std::alloc::dealloc(
                    self.ptr.as_ptr(),
                    std::alloc::Layout::from_size_align_unchecked(self.bytes, self.stride),
                );
            }
        }
        debug!(bytes = self.bytes, "released entry arena");
    }
}
