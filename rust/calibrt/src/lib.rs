//! Linear retention-time calibration against a reference (iRT) index.
//!
//! Every run gets its own ordinary-least-squares line mapping the observed
//! retention time (x) to the reference time (y). The fitted line can be
//! drawn into a [`report::DiagnosticSink`], which never influences the numbers.

pub mod plotting;
pub mod report;

pub use report::{
    DEFAULT_REPORT_PATH,
    DiagnosticReport,
    DiagnosticSink,
    DiagnosticsError,
    NullDiagnostics,
};
use tracing::{
    debug,
    warn,
};

/// Width of the terminal plot emitted at debug level.
const CALIBRATION_PLOT_WIDTH: usize = 40;

/// Height of the terminal plot emitted at debug level.
const CALIBRATION_PLOT_HEIGHT: usize = 20;

/// Minimum number of pairs needed to fit a line.
pub const MIN_CALIBRATION_POINTS: usize = 2;

/// Error types for the calibration step.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibRtError {
    /// Returned when fewer than [`MIN_CALIBRATION_POINTS`] pairs are given.
    InsufficientData { run_id: String, n_points: usize },
    /// Returned when all observed times are identical (the slope is undefined).
    DegenerateFit { run_id: String, observed_time: f64 },
    /// Returned when any of the pairs holds a NaN or infinite value.
    NonFiniteInput { run_id: String, point: Point },
}

impl std::fmt::Display for CalibRtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibRtError::InsufficientData { run_id, n_points } => write!(
                f,
                "Run {}: insufficient data for calibration ({} points, need at least {})",
                run_id, n_points, MIN_CALIBRATION_POINTS
            ),
            CalibRtError::DegenerateFit {
                run_id,
                observed_time,
            } => write!(
                f,
                "Run {}: degenerate fit, all observed times are {}",
                run_id, observed_time
            ),
            CalibRtError::NonFiniteInput { run_id, point } => write!(
                f,
                "Run {}: non-finite calibration point ({}, {})",
                run_id, point.x, point.y
            ),
        }
    }
}

impl std::error::Error for CalibRtError {}

impl CalibRtError {
    /// The run the failed calibration belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            CalibRtError::InsufficientData { run_id, .. }
            | CalibRtError::DegenerateFit { run_id, .. }
            | CalibRtError::NonFiniteInput { run_id, .. } => run_id,
        }
    }
}

/// A single observation on the observed-RT / reference-RT plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Observed retention time in the run.
    pub x: f64,
    /// Reference (iRT) time of the same peptide.
    pub y: f64,
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

/// Per-run calibrator; maps observed time to reference time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationResult {
    pub run_id: String,
    pub intercept: f64,
    pub slope: f64,
}

impl CalibrationResult {
    pub fn predict(&self, observed_time: f64) -> f64 {
        self.intercept + self.slope * observed_time
    }
}

/// The full least squares solution, including goodness of fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination, NaN if the reference times have no variance.
    pub r_squared: f64,
    /// Adjusted for one regressor, NaN for two points.
    pub adj_r_squared: f64,
    pub n_points: usize,
}

impl LinearFit {
    /// Ordinary least squares of `y` on `x` using centered sums.
    ///
    /// Validation of the inputs is done by [`fit`]; here the caller guarantees
    /// at least two points and a non-zero spread in `x`.
    fn ols(points: &[Point]) -> Self {
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for p in points {
            let dx = p.x - mean_x;
            let dy = p.y - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let ss_res: f64 = points
            .iter()
            .map(|p| {
                let resid = p.y - (intercept + slope * p.x);
                resid * resid
            })
            .sum();

        let r_squared = 1.0 - ss_res / syy;
        // Two points leave no residual degrees of freedom.
        let adj_r_squared = if points.len() <= MIN_CALIBRATION_POINTS {
            f64::NAN
        } else {
            1.0 - (1.0 - r_squared) * (n - 1.0) / (n - 2.0)
        };

        Self {
            intercept,
            slope,
            r_squared,
            adj_r_squared,
            n_points: points.len(),
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Sum of squared residuals of this line over `points`.
    pub fn rss<'a>(&self, points: impl IntoIterator<Item = &'a Point>) -> f64 {
        points
            .into_iter()
            .map(|p| {
                let e = p.y - self.predict(p.x);
                e * e
            })
            .sum()
    }
}

/// Validates the pairs and fits the least squares line, keeping the fit statistics.
pub fn fit_line(run_id: &str, points: &[Point]) -> Result<LinearFit, CalibRtError> {
    if points.len() < MIN_CALIBRATION_POINTS {
        return Err(CalibRtError::InsufficientData {
            run_id: run_id.to_string(),
            n_points: points.len(),
        });
    }

    if let Some(p) = points
        .iter()
        .find(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        return Err(CalibRtError::NonFiniteInput {
            run_id: run_id.to_string(),
            point: *p,
        });
    }

    let first_x = points[0].x;
    if points.iter().all(|p| p.x == first_x) {
        return Err(CalibRtError::DegenerateFit {
            run_id: run_id.to_string(),
            observed_time: first_x,
        });
    }

    Ok(LinearFit::ols(points))
}

/// Fits `reference_time ≈ intercept + slope * observed_time` for a single run.
///
/// # Example
/// ```
/// use calibrt::{Point, fit};
///
/// let points = vec![
///     Point { x: 10.0, y: 0.0 },
///     Point { x: 20.0, y: 50.0 },
///     Point { x: 30.0, y: 100.0 },
/// ];
///
/// let cal = fit("run_01", &points).expect("Calibration failed");
/// assert!((cal.slope - 5.0).abs() < 1e-9);
/// ```
pub fn fit(run_id: &str, points: &[Point]) -> Result<CalibrationResult, CalibRtError> {
    let line = fit_line(run_id, points)?;
    Ok(CalibrationResult {
        run_id: run_id.to_string(),
        intercept: line.intercept,
        slope: line.slope,
    })
}

/// Same as [`fit`] but also adds a diagnostic page for the run to `sink`.
///
/// Rendering problems are logged and swallowed.
pub fn fit_with_diagnostics<S: DiagnosticSink + ?Sized>(
    run_id: &str,
    points: &[Point],
    sink: &mut S,
) -> Result<CalibrationResult, CalibRtError> {
    let line = fit_line(run_id, points)?;

    debug!(
        "Run {}: intercept={} slope={} R2={} R2adj={} over {} points",
        run_id, line.intercept, line.slope, line.r_squared, line.adj_r_squared, line.n_points
    );
    debug!(
        "{}",
        plotting::format_fit_plot(
            points,
            &line,
            CALIBRATION_PLOT_WIDTH,
            CALIBRATION_PLOT_HEIGHT
        )
    );

    if let Err(e) = sink.add_page(run_id, points, &line) {
        warn!("Run {}: unable to render calibration plot: {}", run_id, e);
    }

    Ok(CalibrationResult {
        run_id: run_id.to_string(),
        intercept: line.intercept,
        slope: line.slope,
    })
}
