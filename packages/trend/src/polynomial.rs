//! Dense univariate polynomials in ascending-power form.

use serde::Serialize;

/// A polynomial `c[0] + c[1]·x + … + c[d]·x^d`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Creates a polynomial from ascending-power coefficients. An empty slice
    /// is the zero polynomial.
    #[must_use]
    pub fn new(coefficients: Vec<f64>) -> Self {
        if coefficients.is_empty() {
            return Self::zero();
        }
        Self { coefficients }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self {
            coefficients: vec![0.0],
        }
    }

    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Nominal degree (number of coefficients minus one); trailing zero
    /// coefficients are not stripped.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Evaluates at `x` with Horner's scheme.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc.mul_add(x, c))
    }

    /// The analytic derivative: coefficients `{i·c[i]}` for `i ≥ 1`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn derivative(&self) -> Self {
        Self::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, &c)| i as f64 * c)
                .collect(),
        )
    }

    /// Rewrites `q(t)` with `t = (x - center) / scale` as a polynomial in `x`.
    ///
    /// Horner's scheme over polynomials: `p = (…(q_d·t + q_{d-1})·t + …) + q_0`
    /// where each multiplication by `t` is a multiplication by the linear
    /// polynomial `(-center / scale) + x / scale`.
    #[must_use]
    pub fn substitute_affine(&self, center: f64, scale: f64) -> Self {
        let offset = -center / scale;
        let slope = scale.recip();

        let mut expanded: Vec<f64> = Vec::with_capacity(self.coefficients.len());
        for &c in self.coefficients.iter().rev() {
            let mut next = vec![0.0; expanded.len() + 1];
            for (i, &e) in expanded.iter().enumerate() {
                next[i] += e * offset;
                next[i + 1] += e * slope;
            }
            next[0] += c;
            expanded = next;
        }
        Self::new(expanded)
    }
}
