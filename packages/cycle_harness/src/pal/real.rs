#[cfg(any(
    miri,
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    not(any(unix, windows))
))]
use std::{sync::OnceLock, time::Instant};
#[cfg(unix)]
use std::{io, mem};

#[cfg(windows)]
use windows::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};
#[cfg(windows)]
use windows::Win32::System::ProcessStatus::{GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS};
#[cfg(windows)]
use windows::Win32::System::Threading::GetCurrentProcess;

use crate::pal::{Platform, WallClock};

#[cfg(any(unix, not(windows)))]
const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// The platform that the build is targeting.
///
/// You would only use a different platform in unit tests that need scripted counter values.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    #[inline]
    fn cycle_counter(&self) -> u64 {
        read_cycle_counter()
    }

    fn wall_clock(&self) -> WallClock {
        read_wall_clock()
    }

    fn page_fault_count(&self) -> u64 {
        read_page_fault_count()
    }
}

#[cfg(all(target_arch = "x86_64", not(miri)))]
#[inline]
fn read_cycle_counter() -> u64 {
    // SAFETY: RDTSC is present on every x86_64 processor and has no memory side effects.
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[cfg(all(target_arch = "aarch64", not(miri)))]
#[inline]
fn read_cycle_counter() -> u64 {
    let ticks: u64;

    // SAFETY: The virtual counter register is readable from user mode and reading it has
    // no side effects.
    unsafe {
        core::arch::asm!(
            "mrs {}, cntvct_el0",
            out(reg) ticks,
            options(nomem, nostack, preserves_flags),
        );
    }

    ticks
}

/// Without a readable hardware counter we count nanoseconds since a process-local epoch.
/// Calibration then simply arrives at one billion "cycles" per second.
#[cfg(any(miri, not(any(target_arch = "x86_64", target_arch = "aarch64"))))]
fn read_cycle_counter() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();

    let epoch = EPOCH.get_or_init(Instant::now);

    u64::try_from(epoch.elapsed().as_nanos())
        .expect("process running for more than 500 years - impossible")
}

#[cfg(unix)]
#[expect(
    clippy::cast_sign_loss,
    clippy::arithmetic_side_effects,
    reason = "monotonic clock values are never negative and never overflow within real-universe ranges"
)]
fn read_wall_clock() -> WallClock {
    // SAFETY: All-zero is a valid initial value for this type.
    let mut ts: libc::timespec = unsafe { mem::zeroed() };

    // SAFETY: We are passing valid arguments, no other safety requirements.
    let result = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &raw mut ts) };

    assert!(result == 0, "{}", io::Error::last_os_error());

    WallClock {
        ticks: ts.tv_sec as u64 * NANOS_PER_SECOND + ts.tv_nsec as u64,
        ticks_per_second: NANOS_PER_SECOND,
    }
}

#[cfg(windows)]
fn read_wall_clock() -> WallClock {
    let mut ticks = 0_i64;
    let mut ticks_per_second = 0_i64;

    // SAFETY: We are passing a valid pointer to a local, no other safety requirements.
    unsafe { QueryPerformanceCounter(&raw mut ticks) }
        .expect("QueryPerformanceCounter never fails on supported versions of Windows");

    // SAFETY: We are passing a valid pointer to a local, no other safety requirements.
    unsafe { QueryPerformanceFrequency(&raw mut ticks_per_second) }
        .expect("QueryPerformanceFrequency never fails on supported versions of Windows");

    WallClock {
        ticks: u64::try_from(ticks).expect("performance counter is never negative"),
        ticks_per_second: u64::try_from(ticks_per_second)
            .expect("performance counter frequency is never negative"),
    }
}

#[cfg(not(any(unix, windows)))]
fn read_wall_clock() -> WallClock {
    static EPOCH: OnceLock<Instant> = OnceLock::new();

    let epoch = EPOCH.get_or_init(Instant::now);

    WallClock {
        ticks: u64::try_from(epoch.elapsed().as_nanos())
            .expect("process running for more than 500 years - impossible"),
        ticks_per_second: NANOS_PER_SECOND,
    }
}

#[cfg(unix)]
fn read_page_fault_count() -> u64 {
    // SAFETY: rusage is a plain-old-data struct; all-zero is a valid initial value.
    let mut usage: libc::rusage = unsafe { mem::zeroed() };

    // SAFETY: We are passing a valid pointer to a local, no other safety requirements.
    let result = unsafe { libc::getrusage(libc::RUSAGE_SELF, &raw mut usage) };

    if result != 0 {
        return 0;
    }

    let minor = u64::try_from(usage.ru_minflt).unwrap_or_default();
    let major = u64::try_from(usage.ru_majflt).unwrap_or_default();

    minor.saturating_add(major)
}

#[cfg(windows)]
fn read_page_fault_count() -> u64 {
    let mut counters = PROCESS_MEMORY_COUNTERS::default();
    let size = u32::try_from(size_of::<PROCESS_MEMORY_COUNTERS>())
        .expect("memory counters structure is tiny");

    // SAFETY: We are passing a valid pointer to a local of the declared size. The current
    // process pseudo-handle does not need to be closed.
    let result = unsafe { GetProcessMemoryInfo(GetCurrentProcess(), &raw mut counters, size) };

    match result {
        Ok(()) => u64::from(counters.PageFaultCount),
        Err(_) => 0,
    }
}

#[cfg(not(any(unix, windows)))]
fn read_page_fault_count() -> u64 {
    0
}
