use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Why a statistic could not be computed from its input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degenerate {
    Empty,
    SingleSample,
    ZeroVariance,
    ZeroMean,
}

impl fmt::Display for Degenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degenerate::Empty => write!(f, "no data"),
            Degenerate::SingleSample => write!(f, "a single data point"),
            Degenerate::ZeroVariance => write!(f, "zero variance"),
            Degenerate::ZeroMean => write!(f, "zero mean"),
        }
    }
}

/// Mean and central moments with the biased (`1/n`) normalization.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Moments {
    pub n: usize,
    pub mean: f64,
    pub m2: f64,
    pub m3: f64,
    pub m4: f64,
    constant: bool,
}

impl Moments {
    pub fn new(data: &[f64]) -> Result<Self, Degenerate> {
        if data.is_empty() {
            return Err(Degenerate::Empty);
        }

        let n = data.len();
        let mean = statistical::mean(data);
        let (mut m2, mut m3, mut m4) = (0., 0., 0.);
        for x in data {
            let d = x - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        let len = n as f64;
        let m2 = m2 / len;

        Ok(Self {
            n,
            mean,
            m2,
            m3: m3 / len,
            m4: m4 / len,
            constant: is_constant(data, mean, m2),
        })
    }

    fn spread(&self) -> Result<(), Degenerate> {
        if self.n < 2 {
            Err(Degenerate::SingleSample)
        } else if self.constant {
            Err(Degenerate::ZeroVariance)
        } else {
            Ok(())
        }
    }

    /// `m3 / m2^1.5`
    pub fn skewness(&self) -> Result<f64, Degenerate> {
        self.spread()?;
        Ok(self.m3 / self.m2.powf(1.5))
    }

    /// Excess kurtosis, `m4 / m2² - 3`.
    pub fn kurtosis(&self) -> Result<f64, Degenerate> {
        self.spread()?;
        Ok(self.m4 / (self.m2 * self.m2) - 3.)
    }
}

/// Whether `data` has no spread beyond the rounding residue of its mean.
///
/// `m2` is the biased variance around `mean`. Equal values of a constant that has no exact
/// binary representation still leave a variance of about `(ε·mean)²`.
fn is_constant(data: &[f64], mean: f64, m2: f64) -> bool {
    let equal = data.windows(2).all(|w| w[0] == w[1]);
    equal || m2 <= (f64::EPSILON * mean.abs()).powi(2) * data.len() as f64
}

/// [`is_constant`] over a non-empty slice.
fn flat(data: &[f64]) -> bool {
    let mean = statistical::mean(data);
    let m2 = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
    is_constant(data, mean, m2)
}

/// Standard deviation with Bessel's correction. Constant data yields exactly zero.
pub(crate) fn sample_std_dev(data: &[f64]) -> Result<f64, Degenerate> {
    match data.len() {
        0 => Err(Degenerate::Empty),
        1 => Err(Degenerate::SingleSample),
        _ if flat(data) => Ok(0.),
        _ => Ok(statistical::standard_deviation(data, None)),
    }
}

pub(crate) fn population_std_dev(data: &[f64]) -> Result<f64, Degenerate> {
    if data.is_empty() {
        return Err(Degenerate::Empty);
    }
    if flat(data) {
        return Ok(0.);
    }
    Ok(statistical::population_standard_deviation(data, None))
}

/// Two-sided critical value of Student's t with `df` degrees of freedom.
pub(crate) fn t_critical(df: usize, confidence: f64) -> Option<f64> {
    let dist = StudentsT::new(0., 1., df as f64).ok()?;
    let t = dist.inverse_cdf((1. + confidence) / 2.);
    t.is_finite().then_some(t)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct TTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sided one-sample t-test of `data` against the population mean `mu`.
pub(crate) fn one_sample_t_test(data: &[f64], mu: f64) -> Result<TTest, Degenerate> {
    let sd = sample_std_dev(data)?;
    if sd == 0. {
        return Err(Degenerate::ZeroVariance);
    }

    let n = data.len() as f64;
    let statistic = (statistical::mean(data) - mu) / (sd / n.sqrt());
    let dist = StudentsT::new(0., 1., n - 1.).map_err(|_| Degenerate::SingleSample)?;
    let p_value = (2. * dist.cdf(-statistic.abs())).min(1.);

    Ok(TTest { statistic, p_value })
}
