//! 分区并行执行
//!
//! 把 `0..len` 切成 `workers` 段连续区间，每段在 rayon 线程池中计算一个部分结果，
//! 结果按分段顺序返回，调用方按顺序合并，因此合并结果与调度顺序无关。
//!
//! 每种线程数对应一个线程池，首次使用时创建并在进程生命周期内复用。

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

static POOLS: Lazy<DashMap<usize, Arc<ThreadPool>>> = Lazy::new(DashMap::new);

/// 获取 (或创建) 指定线程数的线程池；创建失败返回 `None`
pub fn pool(workers: usize) -> Option<Arc<ThreadPool>> {
    if let Some(pool) = POOLS.get(&workers) {
        return Some(pool.value().clone());
    }

    match ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("dualstore-w{}-{}", workers, i))
        .build()
    {
        Ok(pool) => {
            log::debug!("[Parallel] created thread pool with {} workers", workers);
            let entry = POOLS.entry(workers).or_insert_with(|| Arc::new(pool));
            Some(entry.value().clone())
        }
        Err(e) => {
            log::warn!(
                "[Parallel] failed to build pool with {} workers, running serially: {}",
                workers,
                e
            );
            None
        }
    }
}

/// 把 `0..len` 切成至多 `workers` 段连续区间
///
/// 前 `len % workers` 段各多一个元素；`len == 0` 时返回一个空区间。
pub fn chunks(len: usize, workers: usize) -> Vec<Range<usize>> {
    let parts = workers.clamp(1, len.max(1));
    let base = len / parts;
    let extra = len % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// 分区执行，返回每段的部分结果 (按分段顺序)
///
/// `workers <= 1` 时在当前线程上对整个区间执行一次。
pub fn partitioned<T, F>(workers: usize, len: usize, task: F) -> Vec<T>
where
    T: Send,
    F: Fn(Range<usize>) -> T + Sync + Send,
{
    if workers <= 1 || len <= 1 {
        return vec![task(0..len)];
    }

    let ranges = chunks(len, workers);
    match pool(workers) {
        Some(pool) => pool.install(|| ranges.into_par_iter().map(|r| task(r)).collect()),
        None => ranges.into_iter().map(task).collect(),
    }
}

/// 分区执行并按分段顺序折叠
pub fn partitioned_fold<T, F, C>(workers: usize, len: usize, task: F, combine: C) -> T
where
    T: Send + Default,
    F: Fn(Range<usize>) -> T + Sync + Send,
    C: Fn(T, T) -> T,
{
    partitioned(workers, len, task)
        .into_iter()
        .fold(T::default(), combine)
}
