use chrono::{TimeZone, Utc};
use mt_grid::{double_couple_grid_random, LuneAxes, LuneParameters, MomentTensorParameterization};
use mt_search::{grid_search, MisfitCategory, MisfitEvaluator, SearchConfig, TimeShiftWindow};
use mt_types::{BoxError, MomentTensor, Origin};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Normalised L2 distance to a reference tensor, standing in for waveform misfit.
struct SyntheticL2;

impl MisfitEvaluator for SyntheticL2 {
    type Data = MomentTensor;
    type Greens = f64;

    fn evaluate(
        &self,
        data: &MomentTensor,
        greens: &f64,
        _origin: &Origin,
        source: &MomentTensor,
        _time_shift: Option<&TimeShiftWindow>,
    ) -> Result<f64, BoxError> {
        let norm = data.norm();
        if norm == 0.0 {
            return Err("reference tensor has zero norm".into());
        }
        let distance: f64 = source
            .components()
            .iter()
            .zip(data.components())
            .map(|(s, d)| ((s - d) / norm).powi(2))
            .sum();
        Ok(greens * distance)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let magnitude = 4.5;
    let npts = std::env::var("MT_GRID_POINTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50_000);

    let parameterization = MomentTensorParameterization::default();
    let observed =
        parameterization.to_moment_tensor(&LuneParameters::double_couple(magnitude, 45.0, 30.0, 0.6))?;

    let time = Utc
        .with_ymd_and_hms(2009, 4, 7, 20, 12, 55)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid origin time"))?;
    let origins = vec![Origin::new(61.454, -149.743, 33_033.6, time)];

    let categories = vec![
        MisfitCategory::new("body_waves", SyntheticL2, observed, 1.0).with_time_shift(-2.0, 2.0),
        MisfitCategory::new("surface_waves", SyntheticL2, observed, 1.0).with_time_shift(-10.0, 10.0),
    ];
    let config = SearchConfig::new().with_weights(vec![0.5, 0.5]);

    let sources = double_couple_grid_random(npts, &[magnitude], 0)?;
    info!("Searching {} double-couple sources", sources.len());

    let surface = grid_search(&categories, &origins, &sources, &config)?;
    let best = surface
        .best()
        .ok_or_else(|| anyhow::anyhow!("empty misfit surface"))?;

    let axes = LuneAxes::resolve(&sources)?;
    let params = axes.extract(&sources.coordinate_at(best.source_index)?);
    let tensor = parameterization.to_moment_tensor(&params)?;

    info!(
        "Best fit: source {} misfit {:.4e} (kappa {:.1}, sigma {:.1}, h {:.3})",
        best.source_index, best.misfit, params.kappa, params.sigma, params.h
    );
    println!("{}", serde_json::to_string_pretty(&params)?);
    println!("{}", serde_json::to_string_pretty(&tensor)?);

    Ok(())
}
