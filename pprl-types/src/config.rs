//! Configuration types and CLI/environment parsing for a PPRL session.
//!
//! Mirrors the surface a diagnostic runner exposes; the core itself never
//! reads environment variables or argv directly, it is handed a
//! constructed and [`PprlConfig::validate`]d `PprlConfig`.

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;

use crate::error::PprlError;
use crate::field::{parse_field_list, FieldSpec};

/// Which role this party plays in the handshake (see §4.5): the server
/// listens first, the client dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    Server,
    Client,
}

/// The configuration for a PPRL session.
///
/// Can be configured via environment variables or command-line arguments
/// using `clap`.
#[derive(Parser, Debug, Clone)]
pub struct PprlConfig {
    /// This party's role in the handshake.
    #[clap(long, env = "PPRL_ROLE")]
    pub role: Role,

    /// Bloom filter bit length, `m`.
    #[clap(long, env = "PPRL_BLOOM_SIZE", default_value = "1000")]
    pub bloom_size: u32,

    /// Number of Bloom hash functions, `k`.
    #[clap(long, env = "PPRL_BLOOM_HASHES", default_value = "5")]
    pub bloom_hashes: u32,

    /// MinHash signature length, `s`.
    #[clap(long, env = "PPRL_MINHASH_SIGNATURES", default_value = "128")]
    pub minhash_signatures: u32,

    /// MinHash permutation count, `P`.
    #[clap(long, env = "PPRL_MINHASH_PERMUTATIONS", default_value = "1000")]
    pub minhash_permutations: u32,

    /// Q-gram length.
    #[clap(long, env = "PPRL_QGRAM_LENGTH", default_value = "2")]
    pub qgram_length: u32,

    /// Fraction of Bloom bits to randomly flip, masking cardinality.
    #[clap(long, env = "PPRL_RANDOM_BITS_PERCENT", default_value = "0.0")]
    pub random_bits_percent: f64,

    /// Maximum Hamming distance accepted as a match.
    #[clap(long, env = "PPRL_HAMMING_THRESHOLD")]
    pub hamming_threshold: u32,

    /// Minimum Jaccard similarity accepted as a match.
    #[clap(long, env = "PPRL_JACCARD_THRESHOLD", default_value = "0.8")]
    pub jaccard_threshold: f64,

    /// Ordered `method:field-name` list, comma-separated, e.g.
    /// `name:first,name:last,date:dob,zip:postal`.
    #[clap(long, env = "PPRL_FIELDS", value_parser = parse_field_list)]
    pub fields: Vec<FieldSpec>,

    /// The port this party listens on when `role` is `server`.
    #[clap(long, env = "PPRL_LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// The peer's host when `role` is `client`.
    #[clap(long, env = "PPRL_PEER_HOST")]
    pub peer_host: Option<IpAddr>,

    /// The peer's port when `role` is `client`.
    #[clap(long, env = "PPRL_PEER_PORT")]
    pub peer_port: Option<u16>,

    /// Hex-encoded X25519 static private key; a fresh one is generated if
    /// empty.
    #[clap(long, env = "PPRL_PRIVATE_KEY", default_value = "")]
    pub private_key: String,

    /// Skip the 1:1 resolver and return every match.
    #[clap(long, env = "PPRL_ALLOW_DUPLICATES", default_value = "false")]
    pub allow_duplicates: bool,

    /// Number of connection attempts the dialing side makes before giving
    /// up.
    #[clap(long, env = "PPRL_DIAL_RETRY_ATTEMPTS", default_value = "3")]
    pub dial_retry_attempts: u32,

    /// Fixed backoff between dial attempts.
    #[clap(
        long,
        env = "PPRL_DIAL_RETRY_BACKOFF",
        default_value = "1s",
        value_parser = humantime::parse_duration
    )]
    pub dial_retry_backoff: Duration,

    /// Deadline for each individual I/O operation (connect, read, write,
    /// idle, handshake).
    #[clap(
        long,
        env = "PPRL_IO_DEADLINE",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub io_deadline: Duration,

    /// Require `id1,id2`-only output, suppressing Hamming/Jaccard/score
    /// diagnostics in the intersection result.
    #[clap(long, env = "PPRL_ZERO_KNOWLEDGE_OUTPUT", default_value = "false")]
    pub zero_knowledge_output: bool,
}

impl PprlConfig {
    /// Validates cross-field invariants the derive macro cannot express on
    /// its own.
    ///
    /// # Errors
    /// Returns [`PprlError::ConfigInvalid`] on the first violation found.
    pub fn validate(&self) -> Result<(), PprlError> {
        if self.bloom_size == 0 {
            return Err(PprlError::ConfigInvalid("bloom_size must be positive".into()));
        }
        if self.bloom_hashes == 0 {
            return Err(PprlError::ConfigInvalid("bloom_hashes must be positive".into()));
        }
        if self.minhash_signatures == 0 {
            return Err(PprlError::ConfigInvalid(
                "minhash_signatures must be positive".into(),
            ));
        }
        if self.qgram_length == 0 {
            return Err(PprlError::ConfigInvalid("qgram_length must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.random_bits_percent) {
            return Err(PprlError::ConfigInvalid(
                "random_bits_percent must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jaccard_threshold) {
            return Err(PprlError::ConfigInvalid(
                "jaccard_threshold must be in [0, 1]".into(),
            ));
        }
        if self.hamming_threshold > self.bloom_size {
            return Err(PprlError::ConfigInvalid(
                "hamming_threshold cannot exceed bloom_size".into(),
            ));
        }
        if self.fields.is_empty() {
            return Err(PprlError::ConfigInvalid(
                "fields must declare at least one method:field-name entry".into(),
            ));
        }
        match self.role {
            Role::Server if self.listen_port.is_none() => Err(PprlError::ConfigInvalid(
                "listen_port is required when role is server".into(),
            )),
            Role::Client if self.peer_host.is_none() || self.peer_port.is_none() => {
                Err(PprlError::ConfigInvalid(
                    "peer_host and peer_port are required when role is client".into(),
                ))
            }
            _ => Ok(()),
        }?;
        if !self.private_key.is_empty() {
            let bytes = hex::decode(&self.private_key).map_err(|err| {
                PprlError::ConfigInvalid(format!("private_key is not valid hex: {err}"))
            })?;
            if bytes.len() != 32 {
                return Err(PprlError::ConfigInvalid(
                    "private_key must decode to exactly 32 bytes".into(),
                ));
            }
        }
        Ok(())
    }
}
