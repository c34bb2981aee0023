//! Terminal rendering of a calibration fit, used for debug logging.

// ANSI color codes
const COLOR_GRAY: &str = "\x1b[90m";
const COLOR_CYAN: &str = "\x1b[96m";
const COLOR_RED: &str = "\x1b[91m";
const COLOR_RESET: &str = "\x1b[0m";

use crate::{
    LinearFit,
    Point,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Empty,
    Line,
    Observed,
}

/// Computes a (min, max) range over the finite values, falling back to (-1, 1).
fn finite_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    (min, max)
}

/// Formats the observed points and the fitted line as a colored character grid.
///
/// Observed pairs are drawn as `●`, the fitted line as `·`.
///
/// # Example
/// ```
/// use calibrt::{Point, fit_line};
/// use calibrt::plotting::format_fit_plot;
///
/// let points = [Point { x: 1.0, y: 2.0 }, Point { x: 3.0, y: 6.0 }];
/// let line = fit_line("demo", &points).unwrap();
/// let plot = format_fit_plot(&points, &line, 30, 10);
/// assert!(plot.contains('●'));
/// ```
pub fn format_fit_plot(points: &[Point], line: &LinearFit, width: usize, height: usize) -> String {
    let width = width.max(2);
    let height = height.max(2);
    let mut output = String::new();

    let (x_min, x_max) = finite_range(points.iter().map(|p| p.x));
    let line_ends = [line.predict(x_min), line.predict(x_max)];
    let (y_min, y_max) = finite_range(points.iter().map(|p| p.y).chain(line_ends));
    let x_span = x_max - x_min;
    let y_span = y_max - y_min;

    let to_row = |y: f64| -> usize {
        let normalized = (y - y_min) / y_span;
        let row = ((1.0 - normalized) * (height - 1) as f64).round() as usize;
        row.min(height - 1)
    };
    let to_col = |x: f64| -> usize {
        let normalized = (x - x_min) / x_span;
        ((normalized * (width - 1) as f64).round() as usize).min(width - 1)
    };

    let mut grid = vec![vec![Cell::Empty; width]; height];

    // Sample the fitted line at each column
    for col in 0..width {
        let x = x_min + (col as f64 / (width - 1) as f64) * x_span;
        let y = line.predict(x);
        if y.is_finite() {
            grid[to_row(y)][col] = Cell::Line;
        }
    }

    // Observed points go on top of the line
    for p in points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
        grid[to_row(p.y)][to_col(p.x)] = Cell::Observed;
    }

    // Top border
    output.push('╔');
    output.push_str(&"═".repeat(width));
    output.push_str("╗\n");

    for row in &grid {
        output.push('║');
        for cell in row {
            match cell {
                Cell::Empty => output.push(' '),
                Cell::Line => output.push_str(&format!("{}·{}", COLOR_GRAY, COLOR_RESET)),
                Cell::Observed => {
                    output.push_str(&format!("{}●{}", COLOR_CYAN, COLOR_RESET))
                }
            }
        }
        output.push_str("║\n");
    }

    // Bottom border
    output.push('╚');
    output.push_str(&"═".repeat(width));
    output.push_str("╝\n");

    output.push_str(&format!(
        "\n  RT: [{:.2}, {:.2}]  iRT: [{:.2}, {:.2}]  {}R2: {:.4}{}  R2adj: {:.4}  n={}\n",
        x_min,
        x_max,
        y_min,
        y_max,
        COLOR_RED,
        line.r_squared,
        COLOR_RESET,
        line.adj_r_squared,
        line.n_points,
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit_line;

    #[test]
    fn test_plot_has_requested_dimensions() {
        let points: Vec<Point> = (0..10)
            .map(|i| Point {
                x: i as f64,
                y: 2.0 * i as f64 - 5.0,
            })
            .collect();
        let line = fit_line("dims", &points).unwrap();
        let plot = format_fit_plot(&points, &line, 25, 8);

        // top border + rows + bottom border
        let grid_lines = plot.lines().take_while(|l| !l.is_empty()).count();
        assert_eq!(grid_lines, 8 + 2);
        assert!(plot.contains("n=10"));
    }

    #[test]
    fn test_plot_handles_flat_reference_times() {
        let points = [Point { x: 1.0, y: 3.0 }, Point { x: 2.0, y: 3.0 }];
        let line = fit_line("flat", &points).unwrap();
        let plot = format_fit_plot(&points, &line, 10, 5);
        assert!(plot.contains('●'));
    }
}
