use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BinningError, Result};

/// Represents a fragment spectrum with m/z values, intensities and metadata.
///
/// Uses Arc<Vec<T>> for efficient cloning - clone is O(1) instead of O(n).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub mz: Arc<Vec<f64>>,
    pub intensity: Arc<Vec<f64>>,
    pub metadata: BTreeMap<String, String>,
}

impl Spectrum {
    /// Constructs a new `Spectrum` without metadata.
    ///
    /// # Arguments
    ///
    /// * `mz` - A vector of m/z values.
    /// * `intensity` - A vector of intensity values corresponding to the m/z values.
    ///
    /// # Errors
    ///
    /// Returns `BinningError::InvalidSpectrum` if the vectors differ in length or
    /// contain negative or non-finite values.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use msbin::data::spectrum::Spectrum;
    /// let spectrum = Spectrum::new(vec![100.0, 200.0], vec![10.0, 20.0]).unwrap();
    /// assert_eq!(*spectrum.mz, vec![100.0, 200.0]);
    /// assert_eq!(*spectrum.intensity, vec![10.0, 20.0]);
    /// ```
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if mz.len() != intensity.len() {
            return Err(BinningError::InvalidSpectrum(format!(
                "mz and intensity vectors must have the same length ({} != {})",
                mz.len(),
                intensity.len()
            )));
        }
        if let Some(bad) = mz.iter().find(|m| !m.is_finite() || **m < 0.0) {
            return Err(BinningError::InvalidSpectrum(format!("m/z values must be non-negative, got {}", bad)));
        }
        if let Some(bad) = intensity.iter().find(|i| !i.is_finite() || **i < 0.0) {
            return Err(BinningError::InvalidSpectrum(format!("intensities must be non-negative, got {}", bad)));
        }
        Ok(Spectrum {
            mz: Arc::new(mz),
            intensity: Arc::new(intensity),
            metadata: BTreeMap::new(),
        })
    }

    /// Adds a metadata entry, e.g. the structural identifier of the measured compound.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use msbin::data::spectrum::Spectrum;
    /// let spectrum = Spectrum::new(vec![100.0], vec![1.0]).unwrap()
    ///     .with_metadata("inchikey", "test_inchikey_01");
    /// assert_eq!(spectrum.get("inchikey"), Some("test_inchikey_01"));
    /// assert_eq!(spectrum.get("smiles"), None);
    /// ```
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }
}

/// Formats the `Spectrum` for display.
impl Display for Spectrum {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let base_peak = self.mz.iter()
            .zip(self.intensity.iter())
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

        match base_peak {
            Some((mz, i)) => write!(f, "Spectrum(data points: {}, max by intensity:({:.3}, {}))", self.mz.len(), mz, i),
            None => write!(f, "Spectrum(data points: 0)"),
        }
    }
}
