//! Times `P ∘ (A · Bᵗ)` computed densely against the masked sparse pipeline and checks that
//! both agree.

mod parsers;

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use clap::Parser;
use msp_masked::{
    BatchedDotProductEngine, CondensedRowSet, Dispatch, ParallelDispatch, SerialDispatch,
};
use msp_matrix::dense::RowMajorMatrix;
use msp_matrix::mul::mul_masked_dense_transpose;
use msp_matrix::sparse::SparseRowStore;
use msp_matrix::util::{Mismatch, first_mismatch};
use msp_matrix::{Matrix, MatrixError};
use msp_maybe_rayon::prelude::current_num_threads;
use parsers::{DispatchOptions, FillOptions, parse_probability};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use thiserror::Error;
use tracing::{info, info_span};
use tracing_forest::ForestLayer;
use tracing_forest::util::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

const DEFAULT_GROUP_LEN: NonZeroUsize =
    NonZeroUsize::new(ParallelDispatch::DEFAULT_GROUP_LEN).unwrap();

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Rows of the dense operand and of the output (n).
    #[arg(short = 'n', long, default_value_t = 1024)]
    rows: usize,

    /// Columns of the dense operand, and both dimensions of the sparse operand (k).
    #[arg(short = 'k', long, default_value_t = 4096)]
    cols: usize,

    /// Fraction of non-zero entries in the sparse operand when it is filled randomly.
    #[arg(short, long, default_value_t = 0.001, value_parser = parse_probability)]
    density: f64,

    /// Fraction of output cells selected by the mask.
    #[arg(short, long, default_value_t = 0.01, value_parser = parse_probability)]
    mask_density: f64,

    /// How both operands are filled.
    #[arg(short, long, ignore_case = true, value_enum, default_value_t = FillOptions::Random)]
    fill: FillOptions,

    /// Half-width of the band for banded fills.
    #[arg(short, long, default_value_t = 2)]
    bandwidth: usize,

    /// Seed for the random fills and the mask.
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// How the dot products are dispatched.
    #[arg(long, ignore_case = true, value_enum, default_value_t = DispatchOptions::Parallel)]
    dispatch: DispatchOptions,

    /// Dot products handed to one parallel task.
    #[arg(short, long, default_value_t = DEFAULT_GROUP_LEN)]
    group_len: NonZeroUsize,

    /// Times to run the masked pipeline; the fastest run is reported.
    #[arg(short, long, default_value_t = NonZeroUsize::MIN)]
    repeat: NonZeroUsize,

    /// Skip the dense reference product.
    #[arg(long)]
    skip_verify: bool,
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("masked product does not match the dense reference: {0}")]
    Mismatch(Mismatch),

    #[error("run {run} produced a different result from run 0: {mismatch}")]
    NotRepeatable { run: usize, mismatch: Mismatch },
}

struct Inputs {
    a: RowMajorMatrix<f32>,
    b: RowMajorMatrix<f32>,
    mask: RowMajorMatrix<f32>,
}

fn generate(args: &Args) -> Inputs {
    let mut rng = SmallRng::seed_from_u64(args.seed);
    let (n, k) = (args.rows, args.cols);
    let (a, b) = match args.fill {
        FillOptions::Random => (
            RowMajorMatrix::rand(&mut rng, n, k),
            RowMajorMatrix::rand_sparse(&mut rng, k, k, args.density),
        ),
        FillOptions::Sequential => (
            RowMajorMatrix::sequential(n, k),
            RowMajorMatrix::sequential(k, k),
        ),
        FillOptions::Banded => (
            RowMajorMatrix::banded_sequential(n, k, args.bandwidth),
            RowMajorMatrix::banded_sequential(k, k, args.bandwidth),
        ),
        FillOptions::Identity => (
            RowMajorMatrix::identity(n, k),
            RowMajorMatrix::identity(k, k),
        ),
    };
    let mask = RowMajorMatrix::rand_mask(&mut rng, n, k, args.mask_density);
    Inputs { a, b, mask }
}

/// Condense and multiply `repeat` times, returning the first result and the fastest run.
///
/// Every later run must reproduce the first result exactly.
fn run_masked<D: Dispatch>(
    inputs: &Inputs,
    b: &SparseRowStore,
    dispatch: D,
    repeat: NonZeroUsize,
) -> Result<(RowMajorMatrix<f32>, Duration), RunError> {
    let engine = BatchedDotProductEngine::new(dispatch);
    let run_once = |run: usize| -> Result<(RowMajorMatrix<f32>, Duration), RunError> {
        let start = Instant::now();
        let condensed = CondensedRowSet::new(&inputs.mask, b, &inputs.a)?;
        let c = engine.compute(&condensed, b)?;
        let elapsed = start.elapsed();
        info!(run, units = condensed.len(), ?elapsed, "masked product finished");
        Ok((c, elapsed))
    };

    let (first, mut best) = run_once(0)?;
    for run in 1..repeat.get() {
        let (c, elapsed) = run_once(run)?;
        best = best.min(elapsed);
        if let Some(mismatch) = first_mismatch(&first, &c) {
            return Err(RunError::NotRepeatable { run, mismatch });
        }
    }
    Ok((first, best))
}

fn main() -> Result<(), RunError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    Registry::default()
        .with(env_filter)
        .with(ForestLayer::default())
        .init();

    let args = Args::parse();

    println!(
        "Computing P ∘ (A · Bᵗ) with A {}x{}, B {}x{}, mask density {} on {} threads",
        args.rows,
        args.cols,
        args.cols,
        args.cols,
        args.mask_density,
        current_num_threads()
    );

    let inputs = info_span!("generate inputs").in_scope(|| generate(&args));
    let b = SparseRowStore::from_dense(&inputs.b)?;
    println!(
        "B holds {} non-zeros, padded to {} per row; the mask selects {} cells",
        b.nnz(),
        b.max_neighbors(),
        inputs.mask.count_nonzero()
    );

    let (c, masked_time) = match args.dispatch {
        DispatchOptions::Serial => run_masked(&inputs, &b, SerialDispatch, args.repeat)?,
        DispatchOptions::Parallel => run_masked(
            &inputs,
            &b,
            ParallelDispatch::new(args.group_len.get()),
            args.repeat,
        )?,
    };
    println!("masked sparse product: {masked_time:?} (best of {})", args.repeat);

    if args.skip_verify {
        return Ok(());
    }

    let start = Instant::now();
    let expected = mul_masked_dense_transpose(&inputs.mask, &inputs.a, &inputs.b)?;
    let dense_time = start.elapsed();
    println!("dense reference product: {dense_time:?}");

    if let Some(mismatch) = first_mismatch(&expected, &c) {
        return Err(RunError::Mismatch(mismatch));
    }
    println!(
        "results agree on all {} cells; speedup {:.1}x",
        c.dimensions().height * c.dimensions().width,
        dense_time.as_secs_f64() / masked_time.as_secs_f64().max(f64::MIN_POSITIVE)
    );
    Ok(())
}
