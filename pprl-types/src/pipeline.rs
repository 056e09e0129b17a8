//! Turns configured raw records into sketches: the normalize -> q-gram ->
//! build pipeline a diagnostic runner or CLI binary calls before a
//! [`crate::config::PprlConfig`] ever reaches a session.

use pprl_core::minhash::MinHashParams;
use pprl_core::normalize;
use pprl_core::qgram;
use pprl_core::sketch::{self, BloomParams, Sketch};

use crate::config::PprlConfig;

/// Normalizes and q-grams one record's raw field values, in the order of
/// `config.fields`, into the combined set [`sketch::build_many`] consumes.
fn qgrams_for_record(config: &PprlConfig, raw_values: &[String]) -> Vec<String> {
    let normalized: Vec<String> = config
        .fields
        .iter()
        .zip(raw_values)
        .map(|(field, value)| normalize::normalize(field.method, value))
        .collect();
    let tagged: Vec<(usize, &str)> = normalized
        .iter()
        .enumerate()
        .map(|(idx, value)| (idx, value.as_str()))
        .collect();
    qgram::qgrams_for_fields(&tagged, config.qgram_length as usize)
        .into_iter()
        .collect()
}

/// Builds one [`Sketch`] per record from `config`'s Bloom, MinHash and
/// q-gram parameters.
///
/// `records` pairs each record's id with its raw field values, given in
/// the same order as `config.fields`. `seed` drives only the per-record
/// noise RNG ([`sketch::build_many`]); MinHash coefficients always derive
/// from [`pprl_core::minhash::SESSION_SEED`] so both parties in a session
/// land on identical, comparable signatures regardless of what seed each
/// side happens to build its own sketches with.
pub fn build_sketches(config: &PprlConfig, records: &[(String, Vec<String>)], seed: u64) -> Vec<Sketch> {
    let bloom_params = BloomParams {
        m: config.bloom_size,
        k: config.bloom_hashes,
        noise_rate: config.random_bits_percent,
    };
    let minhash_params = MinHashParams::with_permutations(
        pprl_core::minhash::SESSION_SEED,
        config.minhash_signatures,
        config.minhash_permutations,
    );
    let qgrammed: Vec<(String, Vec<String>)> = records
        .iter()
        .map(|(id, raw_values)| (id.clone(), qgrams_for_record(config, raw_values)))
        .collect();
    sketch::build_many(&qgrammed, bloom_params, &minhash_params, seed)
}
