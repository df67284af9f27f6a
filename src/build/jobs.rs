//! Parallel job count for `make -j`

/// CPU count plus `headroom`, never above `cap`, never below 1.
pub fn parallel_jobs(cpus: usize, headroom: usize, cap: usize) -> usize {
    cpus.saturating_add(headroom).min(cap).max(1)
}

/// An explicitly requested job count, still bounded by `cap`
pub fn clamp_jobs(requested: usize, cap: usize) -> usize {
    requested.min(cap).max(1)
}

/// Processors available to this process
pub fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
