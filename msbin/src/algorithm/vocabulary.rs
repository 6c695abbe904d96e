use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::algorithm::quantizer::Quantizer;
use crate::data::spectrum::Spectrum;
use crate::error::{BinningError, Result};

/// The bins observed in a training collection, each with a dense zero-based position.
///
/// # Description
///
/// `known_bins` is sorted strictly ascending and the position of a bin is its rank in
/// `known_bins`. The number of known bins is the dimension of every binned spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Vocabulary {
    known_bins: Vec<i64>,
    peak_to_position: HashMap<i64, usize>,
}

impl Vocabulary {
    /// Creates a vocabulary from strictly increasing bin numbers.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use msbin::algorithm::vocabulary::Vocabulary;
    /// let vocabulary = Vocabulary::from_known_bins(vec![10, 40, 50]).unwrap();
    /// assert_eq!(vocabulary.position(40), Some(1));
    /// assert_eq!(vocabulary.position(41), None);
    /// assert!(Vocabulary::from_known_bins(vec![40, 10]).is_err());
    /// ```
    pub fn from_known_bins(known_bins: Vec<i64>) -> Result<Self> {
        if let Some((a, b)) = known_bins.iter().tuple_windows().find(|(a, b)| a >= b) {
            return Err(BinningError::InvalidVocabulary(format!(
                "known bins must be strictly increasing, found {} before {}", a, b
            )));
        }
        let peak_to_position = known_bins.iter()
            .enumerate()
            .map(|(position, &bin)| (bin, position))
            .collect();
        Ok(Vocabulary { known_bins, peak_to_position })
    }

    /// Creates a vocabulary from stored known bins and their stored positions, which must agree.
    pub fn from_parts(known_bins: Vec<i64>, peak_to_position: &BTreeMap<i64, usize>) -> Result<Self> {
        let vocabulary = Self::from_known_bins(known_bins)?;
        if peak_to_position.len() != vocabulary.len() {
            return Err(BinningError::InvalidVocabulary(format!(
                "{} positions given for {} known bins", peak_to_position.len(), vocabulary.len()
            )));
        }
        for (bin, &position) in peak_to_position {
            if vocabulary.position(*bin) != Some(position) {
                return Err(BinningError::InvalidVocabulary(format!(
                    "bin {} is stored at position {} but ranks {:?} among the known bins",
                    bin, position, vocabulary.position(*bin)
                )));
            }
        }
        Ok(vocabulary)
    }

    pub fn known_bins(&self) -> &[i64] {
        &self.known_bins
    }

    /// Position of `bin` in the vocabulary, `None` for unknown bins.
    pub fn position(&self, bin: i64) -> Option<usize> {
        self.peak_to_position.get(&bin).copied()
    }

    /// Bin number to position, ordered by bin number.
    pub fn peak_to_position(&self) -> BTreeMap<i64, usize> {
        self.peak_to_position.iter().map(|(&bin, &position)| (bin, position)).collect()
    }

    pub fn len(&self) -> usize {
        self.known_bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_bins.is_empty()
    }
}

/// Collects the distinct bins of all peaks in `spectra` into a vocabulary.
///
/// Spectra are quantized in parallel, each into its sorted distinct bins; the per-spectrum
/// lists are then k-way merged in input order, so the result does not depend on thread
/// scheduling. Peaks outside the quantizer's range are ignored.
///
/// # Arguments
///
/// * `spectra` - The training spectra.
/// * `quantizer` - Maps m/z values to bin numbers.
/// * `num_threads` - Number of threads to use for quantization.
pub fn unique_peaks<Q: Quantizer>(spectra: &[Spectrum], quantizer: &Q, num_threads: usize) -> Result<Vocabulary> {
    let pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

    let per_spectrum: Vec<Vec<i64>> = pool.install(|| {
        spectra.par_iter()
            .map(|spectrum| {
                quantizer.bin_numbers(&spectrum.mz)
                    .into_iter()
                    .flatten()
                    .sorted_unstable()
                    .dedup()
                    .collect::<Vec<i64>>()
            })
            .collect()
    });

    let known_bins: Vec<i64> = per_spectrum.into_iter().kmerge().dedup().collect();
    log::debug!("collected {} distinct bins from {} spectra", known_bins.len(), spectra.len());

    Vocabulary::from_known_bins(known_bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::quantizer::{linspace, CustomBins, FixedBins, LinearBins};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn spectrum(mz: &[f64], intensity: &[f64]) -> Spectrum {
        Spectrum::new(mz.to_vec(), intensity.to_vec()).unwrap()
    }

    fn random_spectra(seed: u64, count: usize) -> Vec<Spectrum> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let n = rng.gen_range(0..60);
                let mz: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1100.0)).collect();
                let intensity: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
                Spectrum::new(mz, intensity).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_unique_peaks_custom() {
        let s = spectrum(&[10.0, 20.0, 20.01, 20.1, 30.0, 40.0], &[0.0, 0.5, 0.1, 0.2, 0.2, 0.4]);
        let bins = CustomBins::new(linspace(10.0, 100.0, 1001)).unwrap();
        let vocabulary = unique_peaks(&[s.clone(), s], &bins, 2).unwrap();

        assert_eq!(vocabulary.known_bins(), &[0, 111, 112, 222, 333]);
        assert_eq!(
            vocabulary.peak_to_position(),
            BTreeMap::from([(0, 0), (111, 1), (112, 2), (222, 3), (333, 4)])
        );
    }

    #[test]
    fn test_unique_peaks_custom_upper_mz_max() {
        let s = spectrum(
            &[10.0, 20.0, 20.01, 20.1, 30.0, 40.0, 100.1, 110.0],
            &[0.0, 0.5, 0.1, 0.2, 0.2, 0.4, 0.5, 1.0],
        );
        let bins = CustomBins::new(linspace(10.0, 100.0, 1001)).unwrap();
        let vocabulary = unique_peaks(&[s.clone(), s], &bins, 2).unwrap();
        assert_eq!(vocabulary.known_bins(), &[0, 111, 112, 222, 333]);
    }

    #[test]
    fn test_unique_peaks_fixed() {
        let s = spectrum(&[10.0, 20.0, 20.01, 20.1, 30.0, 40.0], &[0.0, 0.5, 0.1, 0.2, 0.2, 0.4]);
        let bins = FixedBins::new(1000, 10.0, 100.0).unwrap();
        let vocabulary = unique_peaks(&[s.clone(), s], &bins, 1).unwrap();
        assert_eq!(vocabulary.known_bins(), &[0, 111, 112, 222, 333]);
    }

    #[test]
    fn test_unique_peaks_empty_collection() {
        let bins = FixedBins::new(1000, 10.0, 100.0).unwrap();
        let vocabulary = unique_peaks(&[], &bins, 1).unwrap();
        assert!(vocabulary.is_empty());
    }

    #[test]
    fn test_unique_peaks_is_deterministic() {
        let spectra = random_spectra(42, 200);
        let bins = LinearBins::new(500, 0.1, 10.0, 1000.0).unwrap();

        let first = unique_peaks(&spectra, &bins, 1).unwrap();
        let second = unique_peaks(&spectra, &bins, 8).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.known_bins(), second.known_bins());
    }

    #[test]
    fn test_positions_follow_bin_order() {
        let spectra = random_spectra(7, 100);
        let bins = CustomBins::new(linspace(0.0, 1000.0, 2001)).unwrap();
        let vocabulary = unique_peaks(&spectra, &bins, 4).unwrap();

        for (a, b) in vocabulary.known_bins().iter().tuple_windows() {
            assert!(a < b);
            assert!(vocabulary.position(*a).unwrap() < vocabulary.position(*b).unwrap());
        }
        for (rank, bin) in vocabulary.known_bins().iter().enumerate() {
            assert_eq!(vocabulary.position(*bin), Some(rank));
        }
    }

    #[test]
    fn test_from_parts_rejects_mismatched_positions() {
        let positions = BTreeMap::from([(10, 0), (40, 2), (50, 1)]);
        let result = Vocabulary::from_parts(vec![10, 40, 50], &positions);
        assert!(matches!(result, Err(BinningError::InvalidVocabulary(_))));

        let too_few = BTreeMap::from([(10, 0)]);
        assert!(Vocabulary::from_parts(vec![10, 40], &too_few).is_err());

        let good = BTreeMap::from([(10, 0), (40, 1)]);
        assert!(Vocabulary::from_parts(vec![10, 40], &good).is_ok());
    }
}
