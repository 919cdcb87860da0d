//! Sizing of the zoom-level worker pool.
//!
//! Every zoom level in flight holds a resampled raster and a base raster of
//! about the same size, so concurrency is bounded by memory as well as by
//! CPU count.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tile_common::{TilerError, TilerResult, ZoomLevel};
use tracing::debug;

const DEFAULT_MEMORY_LIMIT: u64 = 16 * 1024 * 1024 * 1024;

/// Worker count and the numbers it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPlan {
    pub workers: usize,
    pub memory_budget: u64,
    pub per_zoom_bytes: u64,
}

/// Detect the memory limit from cgroup (for containerized environments) or system.
pub fn detect_memory_limit() -> u64 {
    // cgroup v2
    if let Some(bytes) = read_limit("/sys/fs/cgroup/memory.max") {
        return bytes;
    }

    // cgroup v1
    if let Some(bytes) = read_limit("/sys/fs/cgroup/memory/memory.limit_in_bytes") {
        return bytes;
    }

    if let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") {
        if let Some(kb) = parse_mem_total_kb(&meminfo) {
            return kb * 1024;
        }
    }

    DEFAULT_MEMORY_LIMIT
}

/// cgroup limit file contents; "max" and the v1 "unlimited" sentinel yield `None`.
fn read_limit(path: &str) -> Option<u64> {
    let limit = std::fs::read_to_string(path).ok()?;
    let bytes = limit.trim().parse::<u64>().ok()?;
    (bytes < u64::MAX / 2).then_some(bytes)
}

fn parse_mem_total_kb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}

/// Bytes one zoom level holds at its peak: the resampled raster plus the
/// tile-aligned base raster, estimated from the source extent at `zoom`.
pub fn zoom_footprint_bytes(
    extent_width: f64,
    extent_height: f64,
    band_count: usize,
    zoom: ZoomLevel,
) -> u64 {
    let res = zoom.resolution();
    let width = (extent_width / res).ceil().max(1.0) as u64;
    let height = (extent_height / res).ceil().max(1.0) as u64;
    let raster_bytes = width
        .saturating_mul(height)
        .saturating_mul(band_count as u64)
        .saturating_mul(std::mem::size_of::<f32>() as u64);
    raster_bytes.saturating_mul(2)
}

/// `min(cap, zoom_count, budget / per_zoom)`, at least 1.
pub fn compute_workers(cap: usize, zoom_count: usize, memory_budget: u64, per_zoom_bytes: u64) -> usize {
    let by_memory = if per_zoom_bytes == 0 {
        usize::MAX
    } else {
        usize::try_from(memory_budget / per_zoom_bytes).unwrap_or(usize::MAX)
    };
    cap.min(zoom_count).min(by_memory).max(1)
}

/// Plan the pool for `zoom_count` levels needing `per_zoom_bytes` each.
pub fn plan_workers(
    max_workers: Option<usize>,
    memory_limit: Option<u64>,
    zoom_count: usize,
    per_zoom_bytes: u64,
) -> WorkerPlan {
    let cap = max_workers.unwrap_or_else(num_cpus::get);
    let memory_budget = memory_limit.unwrap_or_else(detect_memory_limit);
    let workers = compute_workers(cap, zoom_count, memory_budget, per_zoom_bytes);

    debug!(
        workers,
        cap,
        zoom_count,
        memory_budget_mb = memory_budget / (1024 * 1024),
        per_zoom_mb = per_zoom_bytes / (1024 * 1024),
        "Planned zoom worker pool"
    );

    WorkerPlan {
        workers,
        memory_budget,
        per_zoom_bytes,
    }
}

/// Dedicated rayon pool for zoom-level workers.
pub fn build_pool(workers: usize) -> TilerResult<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("zoom-worker-{}", i))
        .build()
        .map_err(|e| TilerError::configuration(format!("failed to build worker pool: {}", e)))
}
