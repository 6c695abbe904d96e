use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::algorithm::quantizer::Quantizer;
use crate::algorithm::vocabulary::Vocabulary;
use crate::data::spectrum::Spectrum;
use crate::error::Result;

/// The in-vocabulary peaks of one spectrum together with the weight share that was lost.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakList {
    /// (position, weight) pairs in the original peak order; positions may repeat.
    pub peaks: Vec<(usize, f64)>,
    /// Weight of out-of-vocabulary peaks divided by the weight of all in-range peaks.
    pub missing_fraction: f64,
}

/// Encodes one spectrum against a vocabulary.
///
/// # Description
///
/// Every in-range peak gets the weight `intensity.powf(peak_scaling)`. Peaks whose bin is
/// known are kept with their vocabulary position, the others are dropped and their weight
/// is accounted in `missing_fraction`. Peaks outside the quantizer's range are skipped
/// entirely. A spectrum without any in-range weight has a missing fraction of 0.0.
///
/// # Arguments
///
/// * `spectrum` - The spectrum to encode.
/// * `vocabulary` - The frozen vocabulary.
/// * `quantizer` - The quantizer the vocabulary was built with.
/// * `peak_scaling` - Exponent applied to the intensities.
pub fn create_peak_list<Q: Quantizer>(
    spectrum: &Spectrum,
    vocabulary: &Vocabulary,
    quantizer: &Q,
    peak_scaling: f64,
) -> PeakList {
    let mut peaks: Vec<(usize, f64)> = Vec::with_capacity(spectrum.len());
    let mut total_weight = 0.0;
    let mut missing_weight = 0.0;

    for (bin, &intensity) in quantizer.bin_numbers(&spectrum.mz).into_iter().zip(spectrum.intensity.iter()) {
        let Some(bin) = bin else { continue };
        let weight = intensity.powf(peak_scaling);
        total_weight += weight;

        match vocabulary.position(bin) {
            Some(position) => peaks.push((position, weight)),
            None => missing_weight += weight,
        }
    }

    let missing_fraction = if total_weight > 0.0 {
        missing_weight / total_weight
    } else {
        0.0
    };

    PeakList { peaks, missing_fraction }
}

/// Encodes a batch of spectra in parallel, keeping the input order.
///
/// # Arguments
///
/// * `spectra` - The spectra to encode.
/// * `vocabulary` - The frozen vocabulary.
/// * `quantizer` - The quantizer the vocabulary was built with.
/// * `peak_scaling` - Exponent applied to the intensities.
/// * `num_threads` - Number of threads to use for parallel processing.
pub fn create_peak_lists<Q: Quantizer>(
    spectra: &[Spectrum],
    vocabulary: &Vocabulary,
    quantizer: &Q,
    peak_scaling: f64,
    num_threads: usize,
) -> Result<Vec<PeakList>> {
    let pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

    let peak_lists: Vec<PeakList> = pool.install(|| {
        spectra.par_iter()
            .map(|spectrum| create_peak_list(spectrum, vocabulary, quantizer, peak_scaling))
            .collect()
    });

    Ok(peak_lists)
}
