use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::error::DecodeError;
use bincode::{Decode, Encode};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sparse, fixed-dimension representation of a spectrum over a binner's known bins.
///
/// Keys of `binned_peaks` are vocabulary positions, values are summed peak weights.
/// Only the identity key of the source spectrum is carried in `metadata`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct BinnedSpectrum {
    pub binned_peaks: BTreeMap<usize, f64>,
    pub metadata: BTreeMap<String, String>,
}

impl BinnedSpectrum {
    pub fn new(binned_peaks: BTreeMap<usize, f64>, metadata: BTreeMap<String, String>) -> Self {
        BinnedSpectrum { binned_peaks, metadata }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Number of occupied positions.
    pub fn len(&self) -> usize {
        self.binned_peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binned_peaks.is_empty()
    }

    /// Convert the `BinnedSpectrum` to a dense vector of length `dimension`.
    ///
    /// `dimension` is the number of known bins of the binner that produced this
    /// spectrum. Positions at or beyond `dimension` are ignored.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use std::collections::BTreeMap;
    /// # use msbin::data::binned::BinnedSpectrum;
    /// let peaks = BTreeMap::from([(0, 0.7), (2, 0.2)]);
    /// let binned = BinnedSpectrum::new(peaks, BTreeMap::new());
    /// let dense = binned.to_dense(4);
    /// assert_eq!(dense.as_slice(), &[0.7, 0.0, 0.2, 0.0]);
    /// ```
    pub fn to_dense(&self, dimension: usize) -> DVector<f64> {
        let mut dense: DVector<f64> = DVector::<f64>::zeros(dimension);
        for (&position, &weight) in self.binned_peaks.iter() {
            if position < dimension {
                dense[position] = weight;
            }
        }
        dense
    }
}

impl Display for BinnedSpectrum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let total: f64 = self.binned_peaks.values().sum();
        write!(f, "BinnedSpectrum(occupied bins: {}, total weight: {:.3})", self.binned_peaks.len(), total)
    }
}

/// Encodes a batch of binned spectra with bincode's standard configuration.
pub fn encode_binned_spectra(spectra: &[BinnedSpectrum]) -> Result<Vec<u8>> {
    let bytes = bincode::encode_to_vec(spectra, bincode::config::standard())?;
    Ok(bytes)
}

/// Decodes a batch written by [`encode_binned_spectra`].
///
/// The buffer must hold exactly one batch; trailing bytes are a decode error.
pub fn decode_binned_spectra(bytes: &[u8]) -> Result<Vec<BinnedSpectrum>> {
    let (spectra, read): (Vec<BinnedSpectrum>, usize) =
        bincode::decode_from_slice(bytes, bincode::config::standard())?;
    if read != bytes.len() {
        return Err(DecodeError::OtherString(format!(
            "{} trailing bytes after {} binned spectra", bytes.len() - read, spectra.len()
        )).into());
    }
    Ok(spectra)
}
