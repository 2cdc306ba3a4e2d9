criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        computing_squared_euclidean_costs,
        computing_optimal_transport_sinkhorns,
        computing_wasserstein_distance,
        projecting_local_pca,
        solving_temporal_problems,
        aggregating_cell_transitions,
        sampling_interpolated_cells,
}

const CELLS: usize = 256;
const FEATURES: usize = 16;

/// point cloud shifted along every feature by `shift`
fn cloud(n: usize, shift: f64, seed: u64) -> Array2<f64> {
    let ref mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n, FEATURES), |_| rng.random::<f64>() + shift)
}

/// dataset of three time points with a categorical cell type
fn adata() -> anyhow::Result<AnnData> {
    let features = ndarray::concatenate(
        Axis(0),
        &[
            cloud(CELLS, 0., 0).view(),
            cloud(CELLS, 1., 1).view(),
            cloud(CELLS, 2., 2).view(),
        ],
    )?;
    let n = features.nrows();
    let times = (0..n).map(|i| (i / CELLS) as f64).collect::<Vec<_>>();
    let types = (0..n).map(|i| ["A", "B", "C", "D"][i % 4]).collect::<Vec<_>>();
    Ok(AnnData::new(n)
        .with_obs("day", Column::Numeric(times))?
        .with_obs("cell_type", Column::categorical(&types[..]))?
        .with_obsm("X_pca", features)?)
}

fn prepared() -> anyhow::Result<TemporalProblem> {
    let mut problem = TemporalProblem::new(adata()?);
    problem.prepare(PrepareConfig::new("day"))?;
    Ok(problem)
}

fn solved() -> anyhow::Result<TemporalProblem> {
    let mut problem = prepared()?;
    problem.solve(SolverConfig::default())?;
    Ok(problem)
}

fn computing_squared_euclidean_costs(c: &mut criterion::Criterion) {
    let ref x = cloud(CELLS, 0., 0);
    let ref y = cloud(CELLS, 1., 1);
    c.bench_function("compute a squared euclidean cost matrix", |b| {
        b.iter(|| sq_euclidean(x.view(), y.view()))
    });
}

fn computing_optimal_transport_sinkhorns(c: &mut criterion::Criterion) {
    let ref cost = sq_euclidean(cloud(CELLS, 0., 0).view(), cloud(CELLS, 1., 1).view());
    let ref mu = uniform(CELLS);
    let ref nu = uniform(CELLS);
    c.bench_function("compute optimal transport (entropy regularized)", |b| {
        b.iter(|| {
            Sinkhorn::new(cost.view(), mu.view(), nu.view(), 1.)
                .minimize()
                .distance()
        })
    });
}

fn computing_wasserstein_distance(c: &mut criterion::Criterion) {
    let ref x = cloud(CELLS, 0., 0);
    let ref y = cloud(CELLS, 1., 1);
    c.bench_function("compute a wasserstein distance between time points", |b| {
        b.iter(|| wasserstein(x.view(), y.view(), None, None, DISTANCE_EPSILON))
    });
}

fn projecting_local_pca(c: &mut criterion::Criterion) {
    let ref x = cloud(CELLS, 0., 0);
    let ref y = cloud(CELLS, 1., 1);
    c.bench_function("project two time points onto local principal components", |b| {
        b.iter(|| Pca::new(4).and_then(|pca| pca.project(x, y)))
    });
}

fn solving_temporal_problems(c: &mut criterion::Criterion) {
    c.bench_function("solve a sequential temporal problem", |b| {
        b.iter(|| solved().map(|problem| problem.problems().len()))
    });
}

fn aggregating_cell_transitions(c: &mut criterion::Criterion) {
    let ref problem = solved().expect("solved fixture");
    let ref groups = Groups::key("cell_type");
    c.bench_function("aggregate a composed cell transition table", |b| {
        b.iter(|| problem.cell_transition(0., 2., groups, groups, true))
    });
}

fn sampling_interpolated_cells(c: &mut criterion::Criterion) {
    let ref problem = solved().expect("solved fixture");
    let ref config = InterpolationConfig::default();
    c.bench_function("compute an interpolated distance", |b| {
        b.iter(|| problem.compute_interpolated_distance(0., 1., 2., config))
    });
}

use ndarray::Array2;
use ndarray::Axis;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use waddington::data::sq_euclidean;
use waddington::data::AnnData;
use waddington::data::Column;
use waddington::data::Pca;
use waddington::problems::CellTransition;
use waddington::problems::Distances;
use waddington::problems::Groups;
use waddington::problems::InterpolationConfig;
use waddington::problems::PrepareConfig;
use waddington::problems::Temporal;
use waddington::problems::TemporalProblem;
use waddington::transport::uniform;
use waddington::transport::wasserstein;
use waddington::transport::Sinkhorn;
use waddington::transport::SolverConfig;
use waddington::DISTANCE_EPSILON;
