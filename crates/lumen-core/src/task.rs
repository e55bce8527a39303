//! Splitting pixel work across worker tasks.
//!
//! Work is divided into at most `tasks` contiguous pixel ranges of equal
//! size; the last range absorbs the remainder. Ranges run on the rayon pool
//! and every range finishes before a result is returned, so a failure in one
//! range is reported only after all others have completed.

use std::ops::Range;

use rayon::prelude::*;

use crate::error::Error;

/// Resolves a user job count: `0` means "one per available thread".
pub fn effective_jobs(jobs: usize) -> usize {
    if jobs == 0 { rayon::current_num_threads().max(1) } else { jobs }
}

/// Contiguous ranges covering `0..count`, at most `tasks` of them.
///
/// ```rust
/// use lumen_core::task_ranges;
///
/// assert_eq!(task_ranges(10, 3), vec![0..3, 3..6, 6..10]);
/// assert_eq!(task_ranges(2, 8), vec![0..1, 1..2]);
/// ```
pub fn task_ranges(count: usize, tasks: usize) -> Vec<Range<usize>> {
    if count == 0 {
        return Vec::new();
    }
    let tasks = tasks.clamp(1, count);
    let per_task = count / tasks;
    (0..tasks)
        .map(|i| {
            let start = i * per_task;
            let end = if i + 1 == tasks { count } else { start + per_task };
            start..end
        })
        .collect()
}

/// Runs `f` over disjoint pixel ranges of `src` and `dst` in parallel.
///
/// `src_stride` and `dst_stride` are elements per pixel in each slice. `f`
/// receives the pixel range, the matching source slice and the matching
/// destination slice. The first error in range order is returned once every
/// range has completed.
pub fn run_ranges<S, D, E, F>(
    tasks: usize,
    src: &[S],
    src_stride: usize,
    dst: &mut [D],
    dst_stride: usize,
    f: F,
) -> Result<(), E>
where
    S: Sync,
    D: Send,
    E: From<Error> + Send,
    F: Fn(Range<usize>, &[S], &mut [D]) -> Result<(), E> + Sync,
{
    let pixel_count = src.len() / src_stride.max(1);
    if src.len() != pixel_count * src_stride || dst.len() != pixel_count * dst_stride {
        return Err(Error::SizeMismatch {
            expected: pixel_count * dst_stride,
            actual: dst.len(),
        }
        .into());
    }

    let ranges = task_ranges(pixel_count, tasks);
    let mut work = Vec::with_capacity(ranges.len());
    let mut rest = dst;
    for range in ranges {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * dst_stride);
        work.push((range, head));
        rest = tail;
    }

    let results: Vec<Result<(), E>> = work
        .into_par_iter()
        .map(|(range, out)| {
            let input = &src[range.start * src_stride..range.end * src_stride];
            f(range, input, out)
        })
        .collect();
    results.into_iter().collect()
}

/// Runs `f` over disjoint in-place pixel ranges of `buf`.
pub fn run_ranges_in_place<T, E, F>(tasks: usize, buf: &mut [T], stride: usize, f: F) -> Result<(), E>
where
    T: Send,
    E: Send,
    F: Fn(Range<usize>, &mut [T]) -> Result<(), E> + Sync,
{
    let pixel_count = buf.len() / stride.max(1);
    let ranges = task_ranges(pixel_count, tasks);
    let mut work = Vec::with_capacity(ranges.len());
    let mut rest = buf;
    for range in ranges {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * stride);
        work.push((range, head));
        rest = tail;
    }
    let results: Vec<Result<(), E>> = work.into_par_iter().map(|(range, chunk)| f(range, chunk)).collect();
    results.into_iter().collect()
}

/// Maps every range of `0..count` to a value; results come back in range order.
pub fn map_ranges<R, F>(count: usize, tasks: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Range<usize>) -> R + Send + Sync,
{
    task_ranges(count, tasks).into_par_iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_everything() {
        for count in [1usize, 7, 64, 1000] {
            for tasks in [1usize, 3, 16, 2000] {
                let ranges = task_ranges(count, tasks);
                assert!(ranges.len() <= tasks);
                assert_eq!(ranges.first().map(|r| r.start), Some(0));
                assert_eq!(ranges.last().map(|r| r.end), Some(count));
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
        assert!(task_ranges(0, 4).is_empty());
    }

    #[test]
    fn last_range_takes_remainder() {
        let ranges = task_ranges(11, 4);
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..11]);
    }

    #[test]
    fn run_writes_every_pixel() {
        let src: Vec<u32> = (0..40).collect();
        let mut dst = vec![0u64; 20];
        run_ranges::<_, _, Error, _>(3, &src, 4, &mut dst, 2, |range, input, out| {
            for (i, px) in range.clone().enumerate() {
                out[i * 2] = input[i * 4] as u64;
                out[i * 2 + 1] = px as u64;
            }
            Ok(())
        })
        .unwrap();
        for px in 0..10 {
            assert_eq!(dst[px * 2], (px * 4) as u64);
            assert_eq!(dst[px * 2 + 1], px as u64);
        }
    }

    #[test]
    fn run_reports_failure_after_join() {
        let src = vec![0u8; 16];
        let mut dst = vec![1u8; 16];
        let res = run_ranges(4, &src, 4, &mut dst, 4, |range, input, out| {
            if range.start == 1 {
                return Err(Error::InvalidInput("bad range".into()));
            }
            out.copy_from_slice(input);
            Ok(())
        });
        assert!(res.is_err());
        // the other ranges still completed
        assert_eq!(&dst[0..4], &[0, 0, 0, 0]);
        assert_eq!(&dst[8..16], &[0; 8]);
    }

    #[test]
    fn size_mismatch() {
        let src = vec![0u8; 16];
        let mut dst = vec![0u8; 12];
        let res = run_ranges::<_, _, Error, _>(2, &src, 4, &mut dst, 4, |_, _, _| Ok(()));
        assert!(matches!(res, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn map_keeps_order() {
        let starts = map_ranges(100, 7, |r| r.start);
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn map_reduces_borrowed_buffer() {
        let values: Vec<u32> = (0..1000).collect();
        for tasks in [1, 4, 16] {
            let sums = map_ranges(values.len(), tasks, |r| values[r].iter().map(|&v| u64::from(v)).sum::<u64>());
            assert_eq!(sums.iter().sum::<u64>(), 499_500);
        }
    }
}
