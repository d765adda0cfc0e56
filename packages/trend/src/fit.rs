//! Least-squares polynomial fitting of one yearly series.
//!
//! Raw years (≈2000s) raised to the third power span ten orders of magnitude,
//! so the solve never touches them directly. Years are mapped onto
//! `t = (year - center) / scale`, with `center` the mean year and `scale` the
//! largest distance from it, which keeps every basis column within `[-1, 1]`.
//! The Vandermonde system in `t` is solved with Householder QR. Coefficients
//! are then re-expanded into year units for reporting, while slope and
//! acceleration are evaluated in `t` and rescaled by the chain rule.

use serde::Serialize;

use crate::error::FitError;
use crate::polynomial::Polynomial;

/// Diagonal entries of `R` smaller than this fraction of the largest one mark
/// the design matrix as rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

/// A polynomial fitted to one series, with its coefficient of determination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FittedModel {
    degree: usize,
    /// Ascending-power coefficients in year units; index 0 is the intercept.
    coefficients: Polynomial,
    fitness: f64,
    #[serde(skip)]
    basis: CenteredBasis,
}

/// The fit as solved: a polynomial in `t = (year - center) / scale` plus its
/// first two derivatives with respect to `t`.
#[derive(Debug, Clone, PartialEq)]
struct CenteredBasis {
    center: f64,
    scale: f64,
    value: Polynomial,
    first: Polynomial,
    second: Polynomial,
}

impl CenteredBasis {
    fn new(center: f64, scale: f64, value: Polynomial) -> Self {
        let first = value.derivative();
        let second = first.derivative();
        Self {
            center,
            scale,
            value,
            first,
            second,
        }
    }

    fn t(&self, year: f64) -> f64 {
        (year - self.center) / self.scale
    }
}

impl FittedModel {
    #[must_use]
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Ascending-power coefficients in year units (length `degree + 1`).
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        self.coefficients.coefficients()
    }

    /// Coefficient of determination, `1 - RSS / TSS`.
    #[must_use]
    pub const fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Fitted value at `year`.
    #[must_use]
    pub fn evaluate(&self, year: f64) -> f64 {
        self.basis.value.evaluate(self.basis.t(year))
    }

    /// First derivative with respect to year: `Σ i·c_i·y^(i-1)`.
    #[must_use]
    pub fn slope_at(&self, year: f64) -> f64 {
        self.basis.first.evaluate(self.basis.t(year)) / self.basis.scale
    }

    /// Second derivative with respect to year: `Σ i·(i-1)·c_i·y^(i-2)`.
    #[must_use]
    pub fn acceleration_at(&self, year: f64) -> f64 {
        self.basis.second.evaluate(self.basis.t(year)) / (self.basis.scale * self.basis.scale)
    }
}

/// Number of distinct years a degree-`degree` fit needs.
///
/// With exactly `degree + 1` years the polynomial interpolates the points and
/// fitness is 1.
#[must_use]
pub const fn required_years(degree: usize) -> usize {
    degree + 1
}

/// Fits a polynomial of `degree` to `(year, value)` points by ordinary least
/// squares.
///
/// Points need not be sorted; repeated years are allowed and all of them
/// contribute residuals.
///
/// # Errors
///
/// * [`FitError::InsufficientData`] if the series has fewer than
///   [`required_years`] distinct years.
/// * [`FitError::NumericalInstability`] if a value is not finite, the design
///   matrix is rank deficient, or the solve yields non-finite output.
#[allow(clippy::cast_precision_loss)]
pub fn fit_polynomial(points: &[(i32, f64)], degree: usize) -> Result<FittedModel, FitError> {
    let distinct_years = count_distinct_years(points);
    let required = required_years(degree);
    if degree == 0 || distinct_years < required {
        return Err(FitError::InsufficientData {
            degree,
            distinct_years,
            required,
        });
    }

    if points.iter().any(|(_, v)| !v.is_finite()) {
        return Err(unstable(degree, "series contains a non-finite value"));
    }

    let n = points.len() as f64;
    let center = points.iter().map(|&(y, _)| f64::from(y)).sum::<f64>() / n;
    let scale = points
        .iter()
        .map(|&(y, _)| (f64::from(y) - center).abs())
        .fold(0.0, f64::max);

    let values: Vec<f64> = points.iter().map(|&(_, v)| v).collect();
    let mean = values.iter().sum::<f64>() / n;
    let total_ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();

    // A flat series is reproduced exactly by its intercept; solving would only
    // add rounding noise to the higher coefficients.
    let basis_coefficients = if total_ss == 0.0 {
        let mut flat = vec![0.0; degree + 1];
        flat[0] = mean;
        flat
    } else {
        let ts: Vec<f64> = points
            .iter()
            .map(|&(y, _)| (f64::from(y) - center) / scale)
            .collect();
        solve_least_squares(vandermonde(&ts, degree), values.clone())
            .map_err(|reason| unstable(degree, reason))?
    };

    let basis = CenteredBasis::new(center, scale, Polynomial::new(basis_coefficients));

    let residual_ss: f64 = points
        .iter()
        .zip(&values)
        .map(|(&(y, _), v)| (v - basis.value.evaluate(basis.t(f64::from(y)))).powi(2))
        .sum();

    let fitness = if total_ss == 0.0 {
        1.0
    } else {
        1.0 - residual_ss / total_ss
    };
    if !fitness.is_finite() {
        return Err(unstable(degree, "fitness is not finite"));
    }

    let coefficients = basis.value.substitute_affine(center, scale);
    if coefficients.coefficients().iter().any(|c| !c.is_finite()) {
        return Err(unstable(degree, "coefficients overflow in year units"));
    }

    Ok(FittedModel {
        degree,
        coefficients,
        fitness,
        basis,
    })
}

fn unstable(degree: usize, reason: impl Into<String>) -> FitError {
    FitError::NumericalInstability {
        degree,
        reason: reason.into(),
    }
}

fn count_distinct_years(points: &[(i32, f64)]) -> usize {
    let mut years: Vec<i32> = points.iter().map(|&(y, _)| y).collect();
    years.sort_unstable();
    years.dedup();
    years.len()
}

/// Column-major power basis `[1, t, t², …, t^degree]`.
fn vandermonde(ts: &[f64], degree: usize) -> Vec<Vec<f64>> {
    let mut columns = Vec::with_capacity(degree + 1);
    columns.push(vec![1.0; ts.len()]);
    for k in 1..=degree {
        let next: Vec<f64> = columns[k - 1].iter().zip(ts).map(|(p, t)| p * t).collect();
        columns.push(next);
    }
    columns
}

/// Minimizes `‖A·x − b‖²` for a tall column-major `A` via Householder QR.
fn solve_least_squares(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, &'static str> {
    let cols = a.len();
    let rows = b.len();
    if rows < cols {
        return Err("fewer observations than coefficients");
    }

    for k in 0..cols {
        let norm = a[k][k..].iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err("design matrix is rank deficient");
        }
        let alpha = if a[k][k] > 0.0 { -norm } else { norm };

        let mut v: Vec<f64> = a[k][k..].to_vec();
        v[0] -= alpha;
        let v_norm_sq: f64 = v.iter().map(|x| x * x).sum();

        for column in a.iter_mut().skip(k) {
            reflect(&v, v_norm_sq, &mut column[k..]);
        }
        reflect(&v, v_norm_sq, &mut b[k..]);
    }

    let largest = (0..cols).map(|k| a[k][k].abs()).fold(0.0, f64::max);
    if (0..cols).any(|k| a[k][k].abs() <= RANK_TOLERANCE * largest) {
        return Err("design matrix is rank deficient");
    }

    let mut x = vec![0.0; cols];
    for k in (0..cols).rev() {
        let tail: f64 = ((k + 1)..cols).map(|j| a[j][k] * x[j]).sum();
        x[k] = (b[k] - tail) / a[k][k];
    }

    if x.iter().all(|c| c.is_finite()) {
        Ok(x)
    } else {
        Err("solution is not finite")
    }
}

/// Applies `H = I − 2·v·vᵀ / (vᵀv)` to `target` in place.
fn reflect(v: &[f64], v_norm_sq: f64, target: &mut [f64]) {
    let dot: f64 = v.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    let factor = 2.0 * dot / v_norm_sq;
    for (t, vi) in target.iter_mut().zip(v) {
        *t -= factor * vi;
    }
}
