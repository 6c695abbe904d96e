use serde::{Deserialize, Serialize};

use crate::error::{BinningError, Result};

/// Number of decimals the fixed bin width is rounded to.
pub const DEFAULT_BIN_WIDTH_DECIMALS: i32 = 2;

/// Maps m/z values onto integer bin numbers.
///
/// # Description
///
/// A quantizer owns its parameters for the lifetime of a binning session. Peaks whose
/// m/z lies outside the quantizer's range do not map to any bin and yield `None`; they
/// are skipped by vocabulary construction and encoding alike.
pub trait Quantizer: Sync {
    /// Returns the bin number of `mz`, or `None` if `mz` is out of range.
    fn bin_number(&self, mz: f64) -> Option<i64>;

    /// Vectorized version of [`Quantizer::bin_number`], one entry per input value.
    fn bin_numbers(&self, mz: &[f64]) -> Vec<Option<i64>> {
        mz.iter().map(|&m| self.bin_number(m)).collect()
    }

    fn number_of_bins(&self) -> usize;

    fn mz_min(&self) -> f64;

    fn mz_max(&self) -> f64;

    /// Checks the parameters, e.g. after loading them from JSON.
    fn validate(&self) -> Result<()>;
}

/// Evenly spaced values over `[start, stop]`, last value set to `stop` exactly.
///
/// # Example
///
/// ```rust
/// # use msbin::algorithm::quantizer::linspace;
/// let edges = linspace(0.0, 100.0, 101);
/// assert_eq!(edges.len(), 101);
/// assert_eq!(edges[10], 10.0);
/// assert_eq!(edges[100], 100.0);
/// ```
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut values: Vec<f64> = (0..num).map(|i| i as f64 * step + start).collect();
            values[num - 1] = stop;
            values
        }
    }
}

/// Slope of linearly growing bin widths so that `number_of_bins` bins starting at
/// `min_bin_size` cover `[mz_min, mz_max]`.
pub fn set_slope_linear(number_of_bins: usize, min_bin_size: f64, mz_min: f64, mz_max: f64) -> f64 {
    let n = number_of_bins as f64;
    ((mz_max - mz_min) - min_bin_size * n) / ((n - 1.0) * n / 2.0)
}

/// Continuous bin number for linearly growing bin widths (not yet truncated).
///
/// A zero slope falls back to `mz / min_bin_size - mz_min * min_bin_size`. Kept as is for
/// compatibility with vocabularies built by earlier releases, although it does not equal
/// `(mz - mz_min) / min_bin_size`.
pub fn bin_number_linear(mz: f64, min_bin_size: f64, slope: f64, mz_min: f64) -> f64 {
    if slope != 0.0 {
        (2.0 * (mz - mz_min) / slope + (min_bin_size / slope + 0.5).powi(2)).sqrt() - min_bin_size / slope - 0.5
    } else {
        mz / min_bin_size - mz_min * min_bin_size
    }
}

/// Bin width for `number_of_bins` equally wide bins over `[mz_min, mz_max]`, rounded to
/// `decimals` decimal places (ties to even).
///
/// # Example
///
/// ```rust
/// # use msbin::algorithm::quantizer::set_d_bins_fixed;
/// assert_eq!(set_d_bins_fixed(1000, 10.0, 100.0, 2), 0.09);
/// ```
pub fn set_d_bins_fixed(number_of_bins: usize, mz_min: f64, mz_max: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    ((mz_max - mz_min) / number_of_bins as f64 * factor).round_ties_even() / factor
}

fn check_range(mz_min: f64, mz_max: f64) -> Result<()> {
    if !mz_min.is_finite() || !mz_max.is_finite() || mz_min < 0.0 {
        return Err(BinningError::InvalidParameter(format!(
            "m/z range must be finite and non-negative, got [{}, {}]", mz_min, mz_max
        )));
    }
    if mz_max <= mz_min {
        return Err(BinningError::InvalidParameter(format!(
            "mz_max ({}) must be larger than mz_min ({})", mz_max, mz_min
        )));
    }
    Ok(())
}

/// Binning over a custom, strictly increasing array of bin edges.
///
/// Bin `i` covers `mz_bins[i] <= mz < mz_bins[i + 1]`; the last bin also contains its
/// upper edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomBins {
    mz_bins: Vec<f64>,
    number_of_bins: usize,
    mz_min: f64,
    mz_max: f64,
}

impl CustomBins {
    /// Creates custom binning from bin edges.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use msbin::algorithm::quantizer::{linspace, CustomBins, Quantizer};
    /// let bins = CustomBins::new(linspace(10.0, 1000.0, 101)).unwrap();
    /// assert_eq!(bins.number_of_bins(), 100);
    /// assert_eq!(bins.mz_min(), 10.0);
    /// assert_eq!(bins.mz_max(), 1000.0);
    /// ```
    pub fn new(mz_bins: Vec<f64>) -> Result<Self> {
        let (mz_min, mz_max) = match (mz_bins.first(), mz_bins.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(BinningError::InvalidBinEdges("no bin edges given".to_string())),
        };
        let bins = CustomBins {
            number_of_bins: mz_bins.len().saturating_sub(1),
            mz_bins,
            mz_min,
            mz_max,
        };
        bins.validate()?;
        Ok(bins)
    }

    pub fn mz_bins(&self) -> &[f64] {
        &self.mz_bins
    }
}

impl Quantizer for CustomBins {
    fn bin_number(&self, mz: f64) -> Option<i64> {
        if !(self.mz_min..=self.mz_max).contains(&mz) {
            return None;
        }
        if mz == self.mz_max {
            return Some(self.number_of_bins as i64 - 1);
        }
        // first edge is <= mz, so the partition point is at least 1
        let upper = self.mz_bins.partition_point(|&edge| edge <= mz);
        Some(upper as i64 - 1)
    }

    fn number_of_bins(&self) -> usize {
        self.number_of_bins
    }

    fn mz_min(&self) -> f64 {
        self.mz_min
    }

    fn mz_max(&self) -> f64 {
        self.mz_max
    }

    fn validate(&self) -> Result<()> {
        if self.mz_bins.len() < 2 {
            return Err(BinningError::InvalidBinEdges(format!(
                "at least two bin edges are required, got {}", self.mz_bins.len()
            )));
        }
        if let Some(bad) = self.mz_bins.iter().find(|e| !e.is_finite()) {
            return Err(BinningError::InvalidBinEdges(format!("bin edges must be finite, got {}", bad)));
        }
        if let Some(i) = self.mz_bins.windows(2).position(|w| w[0] >= w[1]) {
            return Err(BinningError::InvalidBinEdges(format!(
                "bin edges must be strictly increasing ({} >= {} at index {})",
                self.mz_bins[i], self.mz_bins[i + 1], i
            )));
        }
        if self.number_of_bins != self.mz_bins.len() - 1
            || self.mz_min != self.mz_bins[0]
            || self.mz_max != self.mz_bins[self.mz_bins.len() - 1]
        {
            return Err(BinningError::InvalidBinEdges(
                "number_of_bins, mz_min and mz_max do not match the bin edges".to_string(),
            ));
        }
        Ok(())
    }
}

/// Binning with widths growing linearly from `min_bin_size` at `mz_min` by `slope`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearBins {
    min_bin_size: f64,
    slope: f64,
    number_of_bins: usize,
    mz_min: f64,
    mz_max: f64,
}

impl LinearBins {
    /// Creates linear binning of `number_of_bins` bins over `[mz_min, mz_max)`, the slope
    /// being derived with [`set_slope_linear`].
    pub fn new(number_of_bins: usize, min_bin_size: f64, mz_min: f64, mz_max: f64) -> Result<Self> {
        if number_of_bins < 2 {
            return Err(BinningError::InvalidParameter(format!(
                "linear binning needs at least two bins, got {}", number_of_bins
            )));
        }
        let bins = LinearBins {
            min_bin_size,
            slope: set_slope_linear(number_of_bins, min_bin_size, mz_min, mz_max),
            number_of_bins,
            mz_min,
            mz_max,
        };
        bins.validate()?;
        Ok(bins)
    }

    pub fn min_bin_size(&self) -> f64 {
        self.min_bin_size
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }
}

impl Quantizer for LinearBins {
    fn bin_number(&self, mz: f64) -> Option<i64> {
        if !(self.mz_min..self.mz_max).contains(&mz) {
            return None;
        }
        // truncation toward zero, also for the (possibly negative) zero-slope fallback
        Some(bin_number_linear(mz, self.min_bin_size, self.slope, self.mz_min) as i64)
    }

    fn number_of_bins(&self) -> usize {
        self.number_of_bins
    }

    fn mz_min(&self) -> f64 {
        self.mz_min
    }

    fn mz_max(&self) -> f64 {
        self.mz_max
    }

    fn validate(&self) -> Result<()> {
        check_range(self.mz_min, self.mz_max)?;
        if !self.min_bin_size.is_finite() || self.min_bin_size <= 0.0 {
            return Err(BinningError::InvalidParameter(format!(
                "min_bin_size must be positive, got {}", self.min_bin_size
            )));
        }
        if !self.slope.is_finite() || self.slope < 0.0 {
            return Err(BinningError::InvalidParameter(format!(
                "slope must be non-negative, got {} (min_bin_size {} too large for {} bins?)",
                self.slope, self.min_bin_size, self.number_of_bins
            )));
        }
        Ok(())
    }
}

/// Binning with one fixed bin width `d_bins` starting at `mz_min`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedBins {
    d_bins: f64,
    number_of_bins: usize,
    mz_min: f64,
    mz_max: f64,
}

impl FixedBins {
    /// Creates fixed-width binning targeting `number_of_bins` bins over `[mz_min, mz_max)`.
    ///
    /// The width is rounded to [`DEFAULT_BIN_WIDTH_DECIMALS`], so the effective upper
    /// boundary `mz_min + number_of_bins * d_bins` may differ slightly from `mz_max`.
    pub fn new(number_of_bins: usize, mz_min: f64, mz_max: f64) -> Result<Self> {
        Self::with_precision(number_of_bins, mz_min, mz_max, DEFAULT_BIN_WIDTH_DECIMALS)
    }

    pub fn with_precision(number_of_bins: usize, mz_min: f64, mz_max: f64, decimals: i32) -> Result<Self> {
        if number_of_bins == 0 {
            return Err(BinningError::InvalidParameter("number_of_bins must be positive".to_string()));
        }
        check_range(mz_min, mz_max)?;
        let bins = FixedBins {
            d_bins: set_d_bins_fixed(number_of_bins, mz_min, mz_max, decimals),
            number_of_bins,
            mz_min,
            mz_max,
        };
        bins.validate()?;
        Ok(bins)
    }

    /// Creates fixed-width binning from a known bin width.
    pub fn with_width(d_bins: f64, mz_min: f64, mz_max: f64) -> Result<Self> {
        check_range(mz_min, mz_max)?;
        if !d_bins.is_finite() || d_bins <= 0.0 {
            return Err(BinningError::InvalidParameter(format!("d_bins must be positive, got {}", d_bins)));
        }
        let bins = FixedBins {
            d_bins,
            number_of_bins: ((mz_max - mz_min) / d_bins).ceil() as usize,
            mz_min,
            mz_max,
        };
        bins.validate()?;
        Ok(bins)
    }

    pub fn d_bins(&self) -> f64 {
        self.d_bins
    }
}

impl Quantizer for FixedBins {
    fn bin_number(&self, mz: f64) -> Option<i64> {
        if !(self.mz_min..self.mz_max).contains(&mz) {
            return None;
        }
        Some(((mz - self.mz_min) / self.d_bins).floor() as i64)
    }

    fn number_of_bins(&self) -> usize {
        self.number_of_bins
    }

    fn mz_min(&self) -> f64 {
        self.mz_min
    }

    fn mz_max(&self) -> f64 {
        self.mz_max
    }

    fn validate(&self) -> Result<()> {
        check_range(self.mz_min, self.mz_max)?;
        if !self.d_bins.is_finite() || self.d_bins <= 0.0 {
            return Err(BinningError::InvalidParameter(format!(
                "bin width must be positive, got {} ({} bins over [{}, {}])",
                self.d_bins, self.number_of_bins, self.mz_min, self.mz_max
            )));
        }
        if self.number_of_bins == 0 {
            return Err(BinningError::InvalidParameter("number_of_bins must be positive".to_string()));
        }
        Ok(())
    }
}
