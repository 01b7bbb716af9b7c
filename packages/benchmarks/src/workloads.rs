//! Memory workloads measured by the benchmark programs.
//!
//! Each kernel is a plain function so that programs can wrap it in a repetition session and
//! tests can check what it computes.

use std::fs::File;
use std::hint::black_box;
use std::io::{self, Read, Seek};

/// Size of the pages touched by [`touch_pages()`].
pub const PAGE_SIZE: usize = 4096;

/// Size of a cache line, the unit of [`read_window()`].
pub const CACHE_LINE_SIZE: usize = 64;

const WORDS_PER_LINE: usize = CACHE_LINE_SIZE / size_of::<u64>();

/// Fills the buffer with the low byte of each position.
#[expect(
    clippy::cast_possible_truncation,
    reason = "keeping only the low byte is the point"
)]
pub fn write_bytes(buffer: &mut [u8]) {
    for (index, byte) in buffer.iter_mut().enumerate() {
        *byte = index as u8;
    }
}

/// Reads the file from its start until `destination` is full.
///
/// Pass a destination as long as the file to read all of it. Whether the read touches new
/// memory is up to the caller: reading into the same destination again reuses its pages, while
/// a fresh [`FreshPages`][crate::FreshPages] mapping faults on every page.
///
/// # Errors
///
/// Returns an error if seeking or reading fails, including when the file is shorter than
/// `destination`.
pub fn read_whole_file(file: &mut File, destination: &mut [u8]) -> io::Result<()> {
    file.rewind()?;
    file.read_exact(destination)
}

/// Reads `data` in full, cache line by cache line, but folds every address into the first
/// `window_bytes` bytes.
///
/// The amount of data read is always the same; only the amount of distinct memory touched
/// changes. Shrinking the window until it fits into a cache level shows that level's bandwidth.
/// Returns a checksum of the words read.
///
/// # Panics
///
/// Panics if `window_bytes` is not a power of two of at least one cache line, or is larger than
/// `data`.
pub fn read_window(data: &[u64], window_bytes: usize) -> u64 {
    assert!(
        window_bytes.is_power_of_two() && window_bytes >= CACHE_LINE_SIZE,
        "window must be a power of two of at least {CACHE_LINE_SIZE} bytes, got {window_bytes}"
    );
    assert!(
        window_bytes <= size_of_val(data),
        "window of {window_bytes} bytes is larger than the {} bytes of data",
        size_of_val(data)
    );

    let window_mask = window_bytes
        .checked_div(size_of::<u64>())
        .and_then(|words| words.checked_sub(1))
        .expect("window is at least one cache line");

    let mut checksum = 0_u64;

    for line_start in (0..data.len()).step_by(WORDS_PER_LINE) {
        let offset = line_start & window_mask;
        let end = offset
            .checked_add(WORDS_PER_LINE)
            .expect("offset is within the window");

        let line = data
            .get(offset..end)
            .expect("window lies within the data");

        for word in line {
            checksum = checksum.wrapping_add(*word);
        }
    }

    checksum
}

/// Loads the first byte of `data` `op_count` times, `LOADS` times per loop iteration.
///
/// Every load goes through an address the compiler cannot see through, so none of them can be
/// merged. With the loop overhead spread over more loads per iteration, the time per load stops
/// improving once the loads saturate the read ports of the processor. Returns the sum of the
/// loaded bytes.
///
/// `op_count` is rounded down to whole iterations.
///
/// # Panics
///
/// Panics if `LOADS` is zero or `data` is empty.
pub fn read_loop<const LOADS: usize>(data: &[u8], op_count: usize) -> u64 {
    let iterations = op_count
        .checked_div(LOADS)
        .expect("at least one load per iteration");
    let source = data.first().expect("data must not be empty");

    let mut sum = 0_u64;

    for _ in 0..iterations {
        for _ in 0..LOADS {
            sum = sum.wrapping_add(u64::from(*black_box(source)));
        }
    }

    sum
}

/// Stores to the first byte of `data` `op_count` times, `STORES` times per loop iteration.
///
/// The write port counterpart of [`read_loop()`]. Each store goes through an address the
/// compiler cannot see through, so none of them can be eliminated.
///
/// `op_count` is rounded down to whole iterations.
///
/// # Panics
///
/// Panics if `STORES` is zero or `data` is empty.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the stored value only needs to change between stores"
)]
pub fn write_loop<const STORES: usize>(data: &mut [u8], op_count: usize) {
    let iterations = op_count
        .checked_div(STORES)
        .expect("at least one store per iteration");
    let target = data.first_mut().expect("data must not be empty");

    for iteration in 0..iterations {
        for _ in 0..STORES {
            *black_box(&mut *target) = iteration as u8;
        }
    }
}

/// Three fields stored together, the layout that [`split_fields()`] takes apart.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct Triple {
    /// First field.
    pub a: i32,

    /// Second field.
    pub b: i32,

    /// Third field.
    pub c: i32,
}

/// Copies each field of `source` into its own array.
///
/// # Panics
///
/// Panics if the destination arrays are not as long as `source`.
pub fn split_fields(source: &[Triple], a: &mut [i32], b: &mut [i32], c: &mut [i32]) {
    assert!(
        a.len() == source.len() && b.len() == source.len() && c.len() == source.len(),
        "destination arrays must match the source length"
    );

    for (((triple, a), b), c) in source.iter().zip(a).zip(b).zip(c) {
        *a = triple.a;
        *b = triple.b;
        *c = triple.c;
    }
}

/// Writes to the first byte of `count` pages of `memory`, starting from the first page or,
/// if `reverse` is set, from the last.
///
/// Pass [`FreshPages`][crate::FreshPages] to make every touched page a page fault.
///
/// # Panics
///
/// Panics if `memory` has fewer than `count` pages.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the written value only needs to differ between pages"
)]
pub fn touch_pages(memory: &mut [u8], count: usize, reverse: bool) {
    let page_count = memory.len().checked_div(PAGE_SIZE).expect("page size is non-zero");

    assert!(
        count <= page_count,
        "cannot touch {count} pages of memory that has {page_count} pages"
    );

    for step in 0..count {
        let page = if reverse {
            page_count
                .checked_sub(1)
                .and_then(|last| last.checked_sub(step))
                .expect("step is below page count")
        } else {
            step
        };

        let offset = page.checked_mul(PAGE_SIZE).expect("page is within memory");

        *memory.get_mut(offset).expect("page is within memory") = step as u8;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    #[cfg(all(unix, target_arch = "x86_64"))]
    use cycle_harness::Clock;

    use super::*;
    use crate::FreshPages;

    #[test]
    fn write_bytes_wraps_low_byte() {
        let mut buffer = vec![0xAA_u8; 300];

        write_bytes(&mut buffer);

        assert_eq!(buffer.first(), Some(&0));
        assert_eq!(buffer.get(255), Some(&255));
        assert_eq!(buffer.get(256), Some(&0));
        assert_eq!(buffer.get(299), Some(&43));
    }

    #[test]
    fn read_whole_file_rereads_from_start() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"haversine").unwrap();

        let mut buffer = [0_u8; 9];

        read_whole_file(&mut file, &mut buffer).unwrap();
        read_whole_file(&mut file, &mut buffer).unwrap();
        assert_eq!(&buffer, b"haversine");
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot map memory through the operating system.
    fn read_whole_file_into_fresh_pages() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[7_u8; 3 * PAGE_SIZE]).unwrap();

        let mut pages = FreshPages::map(3 * PAGE_SIZE).unwrap();
        read_whole_file(&mut file, pages.as_mut_slice()).unwrap();

        assert!(pages.as_slice().iter().all(|byte| *byte == 7));
    }

    #[test]
    fn read_whole_file_rejects_short_file() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"short").unwrap();

        let mut buffer = [0_u8; 9];

        let error = read_whole_file(&mut file, &mut buffer).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn full_window_reads_every_word_once() {
        let data: Vec<u64> = (1..=64).collect();

        let checksum = read_window(&data, size_of_val(data.as_slice()));

        assert_eq!(checksum, (1..=64).sum::<u64>());
    }

    #[test]
    fn small_window_rereads_first_lines() {
        // Eight cache lines of data, read through a one-line window.
        let data: Vec<u64> = (1..=64).collect();

        let checksum = read_window(&data, CACHE_LINE_SIZE);

        assert_eq!(checksum, 8 * (1..=8).sum::<u64>());
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn window_must_be_power_of_two() {
        let data = vec![0_u64; 64];

        read_window(&data, 96);
    }

    #[test]
    fn read_loop_performs_whole_iterations() {
        let data = [3_u8, 100];

        assert_eq!(read_loop::<1>(&data, 10), 30);
        assert_eq!(read_loop::<4>(&data, 10), 24);
        assert_eq!(read_loop::<4>(&data, 3), 0);
    }

    #[test]
    fn write_loop_stores_last_iteration_to_first_byte() {
        let mut data = [0_u8, 0xEE];

        write_loop::<2>(&mut data, 10);

        assert_eq!(data, [4, 0xEE]);

        write_loop::<3>(&mut data, 2);

        // No whole iteration fits, nothing is stored.
        assert_eq!(data, [4, 0xEE]);
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn read_loop_requires_data() {
        read_loop::<1>(&[], 1);
    }

    #[test]
    fn split_fields_copies_each_column() {
        let source = [
            Triple { a: 1, b: 2, c: 3 },
            Triple { a: 4, b: 5, c: 6 },
        ];
        let mut a = [0; 2];
        let mut b = [0; 2];
        let mut c = [0; 2];

        split_fields(&source, &mut a, &mut b, &mut c);

        assert_eq!(a, [1, 4]);
        assert_eq!(b, [2, 5]);
        assert_eq!(c, [3, 6]);
    }

    #[test]
    fn touch_pages_forward_and_reverse() {
        let mut forward = vec![0xFF_u8; 4 * PAGE_SIZE];
        touch_pages(&mut forward, 2, false);

        assert_eq!(forward.first(), Some(&0));
        assert_eq!(forward.get(PAGE_SIZE), Some(&1));
        assert_eq!(forward.get(2 * PAGE_SIZE), Some(&0xFF));

        let mut reverse = vec![0xFF_u8; 4 * PAGE_SIZE];
        touch_pages(&mut reverse, 2, true);

        assert_eq!(reverse.get(3 * PAGE_SIZE), Some(&0));
        assert_eq!(reverse.get(2 * PAGE_SIZE), Some(&1));
        assert_eq!(reverse.first(), Some(&0xFF));
    }

    #[test]
    #[should_panic(expected = "cannot touch")]
    fn touch_pages_checks_bounds() {
        let mut memory = vec![0_u8; PAGE_SIZE];

        touch_pages(&mut memory, 2, false);
    }

    // Other page sizes would make one fault cover several touched pages.
    #[test]
    #[cfg(all(unix, target_arch = "x86_64"))]
    #[cfg_attr(miri, ignore)] // Miri cannot map memory through the operating system.
    fn touching_fresh_pages_faults_every_page() {
        let clock = Clock::new();

        for touched in [1_usize, 10, 50, 100, 127] {
            for reverse in [false, true] {
                let mut pages = FreshPages::map(128 * PAGE_SIZE).unwrap();

                let before = clock.page_faults();
                touch_pages(pages.as_mut_slice(), touched, reverse);
                let faults = clock.page_faults().saturating_sub(before);

                assert!(
                    faults >= u64::try_from(touched).unwrap(),
                    "touching {touched} fresh pages (reverse: {reverse}) caused only {faults} faults"
                );
            }
        }
    }
}
