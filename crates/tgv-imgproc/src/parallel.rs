use rayon::prelude::*;

use tgv_image::Image;

/// Controls how row based operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process rows in parallel.
    #[default]
    ParallelRows,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the caller already runs
    /// the pipeline on a worker thread.
    Serial,
}

/// Apply a function to each pixel in the image, rows dispatched per `strategy`.
///
/// `f` receives the `C1` samples of a source pixel and the `C2` samples of the
/// destination pixel at the same position.
///
/// PRECONDITION: `src` and `dst` must have the same size.
pub fn par_iter_rows<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    strategy: ExecutionStrategy,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    let cols = src.cols();
    par_iter_pixels::<T1, C1, T2, C2>(src.as_slice(), dst.as_slice_mut(), cols, strategy, f);
}

/// Slice form of [`par_iter_rows`], for raw buffers borrowed from the caller.
pub fn par_iter_pixels<T1, const C1: usize, T2, const C2: usize>(
    src: &[T1],
    dst: &mut [T2],
    cols: usize,
    strategy: ExecutionStrategy,
    f: impl Fn(&[T1], &mut [T2]) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    let row_op = |(src_chunk, dst_chunk): (&[T1], &mut [T2])| {
        src_chunk
            .chunks_exact(C1)
            .zip(dst_chunk.chunks_exact_mut(C2))
            .for_each(|(src_pixel, dst_pixel)| {
                f(src_pixel, dst_pixel);
            });
    };

    match strategy {
        ExecutionStrategy::Serial => src
            .chunks_exact(C1 * cols)
            .zip(dst.chunks_exact_mut(C2 * cols))
            .for_each(row_op),
        ExecutionStrategy::ParallelRows => src
            .par_chunks_exact(C1 * cols)
            .zip(dst.par_chunks_exact_mut(C2 * cols))
            .for_each(row_op),
    }
}

/// Fill each row of `dst` independently, rows dispatched per `strategy`.
///
/// `f` receives the row index and the mutable samples of that row; it may read
/// any shared input it captures, which is how the vertical filter passes look
/// at the rows above and below.
pub fn par_iter_rows_indexed<T>(
    dst: &mut [T],
    stride: usize,
    strategy: ExecutionStrategy,
    f: impl Fn(usize, &mut [T]) + Send + Sync,
) where
    T: Send + Sync,
{
    match strategy {
        ExecutionStrategy::Serial => dst
            .chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(y, row)| f(y, row)),
        ExecutionStrategy::ParallelRows => dst
            .par_chunks_exact_mut(stride)
            .enumerate()
            .for_each(|(y, row)| f(y, row)),
    }
}
