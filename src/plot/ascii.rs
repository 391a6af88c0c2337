//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted spectrum: `-` line

use crate::domain::{FitFile, SpectralResidual};

/// Render observed points and fitted spectrum for an in-memory fit.
pub fn render_ascii_plot(residuals: &[SpectralResidual], width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = residuals.iter().map(|r| (r.wave, r.observed)).collect();
    let curve: Vec<(f64, f64)> = residuals.iter().map(|r| (r.wave, r.fitted)).collect();
    render_plot(&points, Some(&curve), width, height)
}

/// Render a plot from a saved fit JSON file.
pub fn render_ascii_plot_from_fit_file(fit: &FitFile, width: usize, height: usize) -> String {
    let grid = &fit.grid;
    let points: Vec<(f64, f64)> = grid.wave_nm.iter().copied().zip(grid.observed.iter().copied()).collect();
    let curve: Vec<(f64, f64)> = grid.wave_nm.iter().copied().zip(grid.fitted.iter().copied()).collect();
    render_plot(&points, Some(&curve), width, height)
}

/// Render a single spectrum as a line (e.g. a Tara average spectrum).
pub fn render_spectrum_plot(wave: &[f64], values: &[f64], width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = wave.iter().copied().zip(values.iter().copied()).collect();
    render_plot(&[], Some(&curve), width, height)
}

fn render_plot(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<(f64, f64)> = points.iter().copied().filter(|p| is_finite_point(*p)).collect();
    let curve: Option<Vec<(f64, f64)>> =
        curve.map(|c| c.iter().copied().filter(|p| is_finite_point(*p)).collect());

    let (w_min, w_max) = x_range(&points, curve.as_deref()).unwrap_or((400.0, 700.0));
    let (y_min, y_max) = y_range(&points, curve.as_deref()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = &curve {
        draw_curve(&mut grid, curve, w_min, w_max, y_min, y_max);
    }
    for &(w, y) in &points {
        let x = map_x(w, w_min, w_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: wave=[{w_min:.1}, {w_max:.1}] nm | a=[{y_min:.4}, {y_max:.4}] 1/m\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn is_finite_point((x, y): (f64, f64)) -> bool {
    x.is_finite() && y.is_finite()
}

fn x_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    range(points.iter().chain(curve.unwrap_or_default()).map(|p| p.0))
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    range(points.iter().chain(curve.unwrap_or_default()).map(|p| p.1))
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (min.is_finite() && max.is_finite() && max > min).then_some((min, max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(w: f64, w_min: f64, w_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((w - w_min) / (w_max - w_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // max at row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], w_min: f64, w_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(w, y) in curve {
        let x = map_x(w, w_min, w_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, '-'),
            None => grid[row][x] = '-',
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|r| r.get_mut(x0 as usize)) {
            if *cell == ' ' {
                *cell = ch;
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
