use std::collections::BTreeMap;

use crate::algorithm::encoder::PeakList;
use crate::config::BinnerConfig;
use crate::data::binned::BinnedSpectrum;
use crate::data::spectrum::Spectrum;
use crate::error::{BinningError, Result};

/// Sums the weights of (position, weight) pairs per position.
///
/// # Example
///
/// ```rust
/// # use msbin::algorithm::assembler::create_peak_dict;
/// let peaks = create_peak_dict(&[(0, 0.5), (3, 0.25), (0, 0.25)]);
/// assert_eq!(peaks.get(&0), Some(&0.75));
/// assert_eq!(peaks.len(), 2);
/// ```
pub fn create_peak_dict(peaks: &[(usize, f64)]) -> BTreeMap<usize, f64> {
    let mut peak_dict: BTreeMap<usize, f64> = BTreeMap::new();
    for &(position, weight) in peaks {
        *peak_dict.entry(position).or_insert(0.0) += weight;
    }
    peak_dict
}

/// Builds the binned spectrum of one encoded spectrum.
///
/// Fails with `BinningError::MissingMassExceeded` unless `100 * missing_fraction` is at most
/// `allowed_missing_percentage`; a share equal to the budget is accepted and a NaN share
/// (weights that overflowed to infinity) is rejected.
///
/// # Arguments
///
/// * `index` - Position of the spectrum in its batch, used in the error.
/// * `peak_list` - The encoded peaks of the spectrum.
/// * `identity` - The identity value of the source spectrum, if it has one.
/// * `identity_key` - Metadata key the identity is stored under.
/// * `allowed_missing_percentage` - Weighted share (0-100) allowed to be unknown.
pub fn assemble_binned_spectrum(
    index: usize,
    peak_list: &PeakList,
    identity: Option<&str>,
    identity_key: &str,
    allowed_missing_percentage: f64,
) -> Result<BinnedSpectrum> {
    let missing_percentage = 100.0 * peak_list.missing_fraction;
    if !(missing_percentage <= allowed_missing_percentage) {
        return Err(BinningError::MissingMassExceeded {
            index,
            identity: identity.map(str::to_string),
            missing_percentage,
            allowed_percentage: allowed_missing_percentage,
        });
    }

    let mut metadata = BTreeMap::new();
    if let Some(identity) = identity {
        metadata.insert(identity_key.to_string(), identity.to_string());
    }

    Ok(BinnedSpectrum::new(create_peak_dict(&peak_list.peaks), metadata))
}

/// Assembles a whole batch in input order, stopping at the first rejected spectrum.
///
/// No partial result is returned: either every spectrum is within the missing-mass budget
/// or the batch fails. `spectra` and `peak_lists` must have the same length.
pub fn assemble_batch(spectra: &[Spectrum], peak_lists: &[PeakList], config: &BinnerConfig) -> Result<Vec<BinnedSpectrum>> {
    if spectra.len() != peak_lists.len() {
        return Err(BinningError::InvalidParameter(format!(
            "{} peak lists given for {} spectra", peak_lists.len(), spectra.len()
        )));
    }

    let mut binned_spectra = Vec::with_capacity(peak_lists.len());

    for (index, (spectrum, peak_list)) in spectra.iter().zip(peak_lists.iter()).enumerate() {
        let identity = spectrum.get(&config.identity_key);
        let binned = assemble_binned_spectrum(
            index,
            peak_list,
            identity,
            &config.identity_key,
            config.allowed_missing_percentage,
        ).inspect_err(|e| log::warn!("rejecting batch of {} spectra: {}", spectra.len(), e))?;
        binned_spectra.push(binned);
    }

    Ok(binned_spectra)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak_list(peaks: &[(usize, f64)], missing_fraction: f64) -> PeakList {
        PeakList { peaks: peaks.to_vec(), missing_fraction }
    }

    #[test]
    fn test_duplicate_positions_are_summed() {
        let binned = assemble_binned_spectrum(0, &peak_list(&[(2, 0.1), (2, 0.2), (5, 1.0)], 0.0), None, "inchikey", 0.0).unwrap();
        assert_eq!(binned.len(), 2);
        assert!((binned.binned_peaks[&2] - 0.3).abs() < 1e-12);
        assert_eq!(binned.binned_peaks[&5], 1.0);
    }

    #[test]
    fn test_identity_is_carried_over() {
        let binned = assemble_binned_spectrum(0, &peak_list(&[(0, 1.0)], 0.0), Some("test_inchikey_01"), "inchikey", 0.0).unwrap();
        assert_eq!(binned.get("inchikey"), Some("test_inchikey_01"));
        assert_eq!(binned.metadata.len(), 1);

        let anonymous = assemble_binned_spectrum(0, &peak_list(&[(0, 1.0)], 0.0), None, "inchikey", 0.0).unwrap();
        assert!(anonymous.metadata.is_empty());
    }

    #[test]
    fn test_zero_budget_rejects_any_missing_mass() {
        let result = assemble_binned_spectrum(4, &peak_list(&[(0, 1.0)], 1e-9), Some("x"), "inchikey", 0.0);
        match result {
            Err(BinningError::MissingMassExceeded { index, identity, allowed_percentage, .. }) => {
                assert_eq!(index, 4);
                assert_eq!(identity.as_deref(), Some("x"));
                assert_eq!(allowed_percentage, 0.0);
            }
            other => panic!("expected MissingMassExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_full_budget_accepts_everything() {
        let binned = assemble_binned_spectrum(0, &peak_list(&[], 1.0), None, "inchikey", 100.0).unwrap();
        assert!(binned.is_empty());
    }

    #[test]
    fn test_budget_boundary_is_inclusive() {
        assert!(assemble_binned_spectrum(0, &peak_list(&[(0, 1.0)], 0.25), None, "inchikey", 25.0).is_ok());
        assert!(assemble_binned_spectrum(0, &peak_list(&[(0, 1.0)], 0.25), None, "inchikey", 24.99).is_err());
    }

    #[test]
    fn test_batch_fails_at_first_offender() {
        let spectra: Vec<Spectrum> = ["a", "b", "c"].iter()
            .map(|key| Spectrum::new(vec![10.0], vec![1.0]).unwrap().with_metadata("inchikey", key))
            .collect();
        let peak_lists = vec![
            peak_list(&[(0, 1.0)], 0.0),
            peak_list(&[(0, 1.0)], 0.5),
            peak_list(&[], 1.0),
        ];
        let config = BinnerConfig::default().with_allowed_missing_percentage(10.0);

        match assemble_batch(&spectra, &peak_lists, &config) {
            Err(BinningError::MissingMassExceeded { index, identity, missing_percentage, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(identity.as_deref(), Some("b"));
                assert_eq!(missing_percentage, 50.0);
            }
            other => panic!("expected MissingMassExceeded, got {:?}", other),
        }

        let lenient = config.with_allowed_missing_percentage(100.0);
        assert_eq!(assemble_batch(&spectra, &peak_lists, &lenient).unwrap().len(), 3);
    }

    #[test]
    fn test_nan_missing_fraction_is_rejected() {
        let overflowed = peak_list(&[(0, f64::INFINITY)], f64::NAN);
        assert!(matches!(
            assemble_binned_spectrum(0, &overflowed, None, "inchikey", 0.0),
            Err(BinningError::MissingMassExceeded { .. })
        ));
        assert!(assemble_binned_spectrum(0, &overflowed, None, "inchikey", 100.0).is_err());
    }

    #[test]
    fn test_batch_length_mismatch_fails() {
        let spectra = vec![Spectrum::new(vec![10.0], vec![1.0]).unwrap(); 2];
        let peak_lists = vec![peak_list(&[(0, 1.0)], 0.0)];
        let config = BinnerConfig::default();

        let result = assemble_batch(&spectra, &peak_lists, &config);
        assert!(matches!(result, Err(BinningError::InvalidParameter(_))));
    }
}
