//! Memory mapped directly from the operating system, bypassing the allocator.

#[cfg(not(any(unix, windows)))]
use std::alloc::{self, Layout};
use std::io;
#[cfg(unix)]
use std::ptr;
use std::ptr::NonNull;
use std::slice;

#[cfg(windows)]
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE, VirtualAlloc, VirtualFree,
};

#[cfg(not(any(unix, windows)))]
use crate::PAGE_SIZE;

/// Zero-filled memory that the operating system maps anew for every instance.
///
/// A `Vec` may be handed memory that the allocator kept from an earlier buffer, in which case
/// its pages are already backed by physical memory. The pages of a `FreshPages` have never been
/// touched, so the first access to each of them is a page fault. The pages are returned to the
/// operating system when the value is dropped.
///
/// # Examples
///
/// ```
/// use benchmarks::{FreshPages, PAGE_SIZE};
///
/// let mut pages = FreshPages::map(4 * PAGE_SIZE).unwrap();
///
/// assert_eq!(pages.len(), 4 * PAGE_SIZE);
/// assert!(pages.as_slice().iter().all(|byte| *byte == 0));
///
/// pages.as_mut_slice()[PAGE_SIZE] = 42;
/// ```
#[derive(Debug)]
pub struct FreshPages {
    start: NonNull<u8>,
    len: usize,
}

impl FreshPages {
    /// Maps `len` bytes of fresh memory. The operating system rounds the mapping up to whole
    /// pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system refuses to map the memory.
    pub fn map(len: usize) -> io::Result<Self> {
        if len == 0 {
            return Ok(Self {
                start: NonNull::dangling(),
                len: 0,
            });
        }

        Ok(Self {
            start: map_pages(len)?,
            len,
        })
    }

    /// Number of usable bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping has no usable bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The mapped memory.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: The mapping is `len` bytes long, zero-filled by the operating system when
        // mapped and owned by `self` until drop. A zero-length mapping uses a dangling but
        // aligned pointer, which is valid for empty slices.
        unsafe { slice::from_raw_parts(self.start.as_ptr(), self.len) }
    }

    /// The mapped memory, for writing.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: As in `as_slice()`, and the exclusive borrow of `self` rules out aliasing.
        unsafe { slice::from_raw_parts_mut(self.start.as_ptr(), self.len) }
    }
}

impl Drop for FreshPages {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }

        // SAFETY: The mapping came from `map_pages()` with this length and no slice of it can
        // outlive `self`.
        unsafe {
            unmap_pages(self.start, self.len);
        }
    }
}

#[cfg(unix)]
fn map_pages(len: usize) -> io::Result<NonNull<u8>> {
    // SAFETY: A private anonymous mapping at an address chosen by the kernel cannot alias
    // memory that is already in use.
    let address = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if address == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }

    NonNull::new(address.cast::<u8>())
        .ok_or_else(|| io::Error::other("memory was mapped at address zero"))
}

/// # Safety
///
/// `start` and `len` must describe a mapping returned by `map_pages()` that is no longer
/// referenced.
#[cfg(unix)]
unsafe fn unmap_pages(start: NonNull<u8>, len: usize) {
    // SAFETY: Forwarding the guarantees of the caller.
    let result = unsafe { libc::munmap(start.as_ptr().cast(), len) };

    assert!(
        result == 0,
        "cannot unmap fresh pages: {}",
        io::Error::last_os_error()
    );
}

#[cfg(windows)]
fn map_pages(len: usize) -> io::Result<NonNull<u8>> {
    // SAFETY: Reserving and committing memory at an address chosen by the system cannot alias
    // memory that is already in use.
    let address = unsafe { VirtualAlloc(None, len, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };

    NonNull::new(address.cast::<u8>()).ok_or_else(io::Error::last_os_error)
}

/// # Safety
///
/// `start` must be the address of a mapping returned by `map_pages()` that is no longer
/// referenced.
#[cfg(windows)]
unsafe fn unmap_pages(start: NonNull<u8>, _len: usize) {
    // SAFETY: Forwarding the guarantees of the caller. Releasing a whole allocation requires a
    // size of zero.
    unsafe { VirtualFree(start.as_ptr().cast(), 0, MEM_RELEASE) }
        .expect("releasing memory obtained from VirtualAlloc never fails");
}

/// Without a way to map memory directly, page-aligned zeroed allocations are the closest match.
#[cfg(not(any(unix, windows)))]
fn map_pages(len: usize) -> io::Result<NonNull<u8>> {
    let layout = Layout::from_size_align(len, PAGE_SIZE).map_err(io::Error::other)?;

    // SAFETY: The layout has a non-zero size, `map()` never asks for zero bytes.
    let address = unsafe { alloc::alloc_zeroed(layout) };

    NonNull::new(address).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
}

/// # Safety
///
/// `start` and `len` must describe an allocation returned by `map_pages()` that is no longer
/// referenced.
#[cfg(not(any(unix, windows)))]
unsafe fn unmap_pages(start: NonNull<u8>, len: usize) {
    let layout =
        Layout::from_size_align(len, PAGE_SIZE).expect("layout was valid when allocating");

    // SAFETY: Forwarding the guarantees of the caller.
    unsafe {
        alloc::dealloc(start.as_ptr(), layout);
    }
}
