use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::algorithm::assembler::assemble_batch;
use crate::algorithm::encoder::create_peak_lists;
use crate::algorithm::quantizer::{CustomBins, FixedBins, LinearBins, Quantizer};
use crate::algorithm::vocabulary::{unique_peaks, Vocabulary};
use crate::config::BinnerConfig;
use crate::data::binned::BinnedSpectrum;
use crate::data::spectrum::Spectrum;
use crate::error::{BinningError, Result};

/// Whether a binner already holds a vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub enum BinnerState {
    Unfit,
    Fit(Vocabulary),
}

/// Creates binned spectra and keeps track of the binning parameters and vocabulary.
///
/// # Description
///
/// A binner starts unfit, holding only its quantizer and configuration. `fit` (or
/// `fit_transform`) builds the vocabulary from training spectra; from then on `transform`
/// maps any spectra onto that frozen vocabulary. The whole state round-trips through a
/// flat JSON document via `to_json` / `from_json`.
///
/// # Example
///
/// ```rust
/// # use msbin::algorithm::quantizer::{linspace, CustomBins};
/// # use msbin::binner::SpectrumBinner;
/// # use msbin::config::BinnerConfig;
/// # use msbin::data::spectrum::Spectrum;
/// let bins = CustomBins::new(linspace(0.0, 100.0, 101)).unwrap();
/// let mut binner = SpectrumBinner::new(bins, BinnerConfig::default().with_peak_scaling(1.0)).unwrap();
///
/// let spectrum_1 = Spectrum::new(vec![10.0, 50.0, 99.9], vec![0.7, 0.2, 0.1]).unwrap();
/// let spectrum_2 = Spectrum::new(vec![10.0, 40.0, 90.0], vec![0.4, 0.2, 0.1]).unwrap();
/// let binned = binner.fit_transform(&[spectrum_1, spectrum_2]).unwrap();
///
/// assert_eq!(binner.known_bins(), Some(&[10, 40, 50, 90, 99][..]));
/// assert_eq!(binned[0].binned_peaks.get(&2), Some(&0.2));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumBinner<Q: Quantizer> {
    quantizer: Q,
    config: BinnerConfig,
    state: BinnerState,
}

/// Binner over custom bin edges.
pub type CustomSpectrumBinner = SpectrumBinner<CustomBins>;
/// Binner over linearly growing bin widths.
pub type LinearSpectrumBinner = SpectrumBinner<LinearBins>;
/// Binner over fixed-width bins.
pub type FixedSpectrumBinner = SpectrumBinner<FixedBins>;

#[derive(Serialize, Deserialize)]
struct BinnerRecord<Q> {
    #[serde(flatten)]
    quantizer: Q,
    #[serde(flatten)]
    config: BinnerConfig,
    peak_to_position: Option<BTreeMap<i64, usize>>,
    known_bins: Option<Vec<i64>>,
}

impl<Q: Quantizer> SpectrumBinner<Q> {
    /// Creates an unfit binner, validating quantizer and configuration.
    pub fn new(quantizer: Q, config: BinnerConfig) -> Result<Self> {
        quantizer.validate()?;
        config.validate()?;
        Ok(SpectrumBinner { quantizer, config, state: BinnerState::Unfit })
    }

    /// Uses an existing vocabulary, e.g. one shared with another binner.
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.state = BinnerState::Fit(vocabulary);
        self
    }

    pub fn quantizer(&self) -> &Q {
        &self.quantizer
    }

    pub fn config(&self) -> &BinnerConfig {
        &self.config
    }

    pub fn state(&self) -> &BinnerState {
        &self.state
    }

    pub fn is_fit(&self) -> bool {
        matches!(self.state, BinnerState::Fit(_))
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        match &self.state {
            BinnerState::Fit(vocabulary) => Some(vocabulary),
            BinnerState::Unfit => None,
        }
    }

    pub fn known_bins(&self) -> Option<&[i64]> {
        self.vocabulary().map(Vocabulary::known_bins)
    }

    /// Input dimension of downstream models, i.e. the number of known bins.
    pub fn embedding_dimension(&self) -> Result<usize> {
        self.vocabulary().map(Vocabulary::len).ok_or(BinningError::NotFit)
    }

    /// Builds the vocabulary of known bins from `spectra`, replacing any previous one.
    ///
    /// Returns the embedding dimension of the new vocabulary.
    pub fn fit(&mut self, spectra: &[Spectrum]) -> Result<usize> {
        log::info!("Collect spectrum peaks...");
        let vocabulary = unique_peaks(spectra, &self.quantizer, self.config.num_threads)?;
        let dimension = vocabulary.len();
        log::info!("Calculated embedding dimension: {}.", dimension);

        self.state = BinnerState::Fit(vocabulary);
        Ok(dimension)
    }

    /// Fits the vocabulary on `spectra` and returns their binned spectra.
    pub fn fit_transform(&mut self, spectra: &[Spectrum]) -> Result<Vec<BinnedSpectrum>> {
        self.fit(spectra)?;
        log::info!("Convert spectrums to binned spectrums...");
        self.transform(spectra)
    }

    /// Creates one binned spectrum per input spectrum, in input order.
    ///
    /// # Errors
    ///
    /// * `BinningError::NotFit` if the binner has no vocabulary yet.
    /// * `BinningError::MissingMassExceeded` for the first spectrum whose weighted share of
    ///   unknown peaks exceeds `allowed_missing_percentage`; no binned spectra are returned.
    pub fn transform(&self, spectra: &[Spectrum]) -> Result<Vec<BinnedSpectrum>> {
        let vocabulary = self.vocabulary().ok_or(BinningError::NotFit)?;

        let peak_lists = create_peak_lists(
            spectra,
            vocabulary,
            &self.quantizer,
            self.config.peak_scaling,
            self.config.num_threads,
        )?;
        log::debug!("encoded {} spectra against {} known bins", peak_lists.len(), vocabulary.len());

        assemble_batch(spectra, &peak_lists, &self.config)
    }
}

impl<Q: Quantizer + Clone + Serialize> SpectrumBinner<Q> {
    /// Serializes parameters and vocabulary into one flat JSON object.
    ///
    /// `peak_to_position` and `known_bins` are `null` for an unfit binner.
    pub fn to_json(&self) -> Result<String> {
        let vocabulary = self.vocabulary();
        let record = BinnerRecord {
            quantizer: self.quantizer.clone(),
            config: self.config.clone(),
            peak_to_position: vocabulary.map(Vocabulary::peak_to_position),
            known_bins: vocabulary.map(|v| v.known_bins().to_vec()),
        };
        Ok(serde_json::to_string(&record)?)
    }
}

impl<Q: Quantizer + DeserializeOwned> SpectrumBinner<Q> {
    /// Restores a binner written by [`SpectrumBinner::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        let record: BinnerRecord<Q> = serde_json::from_str(json)?;
        record.quantizer.validate()?;
        record.config.validate()?;

        let state = match (record.known_bins, record.peak_to_position) {
            (Some(known_bins), Some(peak_to_position)) => {
                BinnerState::Fit(Vocabulary::from_parts(known_bins, &peak_to_position)?)
            }
            (Some(known_bins), None) => BinnerState::Fit(Vocabulary::from_known_bins(known_bins)?),
            (None, None) => BinnerState::Unfit,
            (None, Some(_)) => {
                return Err(BinningError::InvalidVocabulary(
                    "peak_to_position given without known_bins".to_string(),
                ))
            }
        };

        Ok(SpectrumBinner { quantizer: record.quantizer, config: record.config, state })
    }
}
