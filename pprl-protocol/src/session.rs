//! The two-party session state machine: drives one PPRL session to
//! completion over a single reliable byte stream, per §4.8's phase table.
//!
//! `BLOCK_EXCHANGE` runs two `BUCKET_BATCH` round trips rather than one:
//! first each side exchanges its once-encrypted buckets, then each side
//! re-encrypts what it received with its own key and sends that back.
//! That second pass is what lets both parties finish the phase holding a
//! directly comparable pair of doubly-encrypted point lists, without
//! either ever seeing the other's commutative key or plaintext blocking
//! keys.

use pprl_core::blocker::{self, Bucket, CandidatePair, EncryptedBlock, LshParams};
use pprl_core::comparator::{self, ComparatorParams, ScoredPair};
use pprl_core::curve::CommutativeKey;
use pprl_core::keyexchange::EphemeralSecret;
use pprl_core::sketch::Sketch;
use pprl_types::config::PprlConfig;
use pprl_types::message::{
    BucketBatchPayload, BucketWire, MatchEntry, MatchListPayload, PubKeyPayload, SketchBatchPayload,
    ShutdownPayload,
};
use pprl_types::message::FrameTag;
use pprl_types::record::SketchRecord;
use pprl_types::{Phase, PprlError};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument, warn};

use crate::framing::{decode_payload, read_frame, write_frame};
use crate::sink::MatchRecord;
use crate::state::next_phase;

/// The outcome of a completed session: every match surfaced after 1:1
/// resolution (or, under `allow_duplicates`, every match found).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub matches: Vec<MatchRecord>,
}

/// Drives one session to completion over `stream`.
pub struct Session<S> {
    stream: S,
    config: PprlConfig,
    phase: Phase,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: PprlConfig) -> Self {
        Self {
            stream,
            config,
            phase: Phase::Init,
        }
    }

    /// Runs the full session: handshake, sketch exchange, block exchange,
    /// intersect, resolve.
    #[instrument(level = "debug", skip_all, fields(role = ?self.config.role))]
    pub async fn run(mut self, local_sketches: Vec<Sketch>) -> Result<SessionOutcome, PprlError> {
        match self.run_inner(local_sketches).await {
            Ok(outcome) => {
                self.advance();
                Ok(outcome)
            }
            Err(err) => Err(self.abort(err).await),
        }
    }

    /// Moves to the next phase on the happy-path transition table.
    fn advance(&mut self) {
        self.phase = next_phase(self.phase).expect("advance() never called from a terminal phase");
    }

    async fn run_inner(&mut self, local_sketches: Vec<Sketch>) -> Result<SessionOutcome, PprlError> {
        self.advance();
        let commutative_key = CommutativeKey::random(&mut rand::thread_rng());
        let local_secret = self.load_or_generate_secret()?;
        let local_public = local_secret.public_key();

        self.send_frame(FrameTag::PubKey, &PubKeyPayload { public_key: local_public })
            .await?;

        self.advance();
        let (tag, body) = self.recv_frame().await?;
        self.expect_tag(tag, FrameTag::PubKey)?;
        let peer_pub: PubKeyPayload = decode_payload(&body)?;
        let shared_salt = local_secret.compute_shared_salt(&peer_pub.public_key);
        debug!(%shared_salt, "handshake complete");

        self.advance();
        let timestamp = chrono::Utc::now();
        let local_records: Vec<SketchRecord> = local_sketches
            .iter()
            .map(|s| SketchRecord::from_sketch(s, timestamp))
            .collect();
        self.send_frame(
            FrameTag::SketchBatch,
            &SketchBatchPayload {
                records: local_records,
            },
        )
        .await?;
        let (tag, body) = self.recv_frame().await?;
        self.expect_tag(tag, FrameTag::SketchBatch)?;
        let peer_batch: SketchBatchPayload = decode_payload(&body)?;
        let peer_sketches: Vec<Sketch> = peer_batch
            .records
            .iter()
            .map(SketchRecord::to_sketch)
            .collect::<Result<_, _>>()?;
        self.check_sketch_params(&local_sketches, &peer_sketches)?;

        self.advance();
        let lsh_params = LshParams::default();
        let local_once = blocker::build_local_blocks(&local_sketches, lsh_params, &commutative_key);
        let local_buckets = blocker::into_buckets(local_once);
        self.send_buckets(&local_buckets).await?;
        let peer_once_buckets = self.recv_buckets().await?;

        let peer_once_blocks = blocker::from_buckets(&peer_once_buckets);
        let own_doubly_locally: Vec<EncryptedBlock> =
            blocker::reencrypt(&commutative_key, &peer_once_blocks).map_err(PprlError::from)?;
        let own_doubly_buckets = blocker::into_buckets(own_doubly_locally.clone());
        self.send_buckets(&own_doubly_buckets).await?;
        let received_doubly_buckets = self.recv_buckets().await?;
        let own_records_doubly = blocker::from_buckets(&received_doubly_buckets);

        self.advance();
        let candidates: Vec<CandidatePair> = blocker::intersect(&own_records_doubly, &own_doubly_locally);

        let comparator_params = ComparatorParams {
            hamming_threshold: self.config.hamming_threshold,
            jaccard_threshold: self.config.jaccard_threshold,
            ..ComparatorParams::default()
        };
        let mut scored = Vec::new();
        for pair in &candidates {
            let Some(local) = local_sketches.iter().find(|s| s.id == pair.local_id) else {
                continue;
            };
            let Some(peer) = peer_sketches.iter().find(|s| s.id == pair.peer_id) else {
                continue;
            };
            let score = comparator::compare(local, peer, comparator_params).map_err(PprlError::from)?;
            if score.is_match {
                scored.push(ScoredPair {
                    local_id: pair.local_id.clone(),
                    peer_id: pair.peer_id.clone(),
                    score,
                });
            }
        }
        scored.sort_by(|a, b| (a.local_id.as_str(), a.peer_id.as_str()).cmp(&(b.local_id.as_str(), b.peer_id.as_str())));

        self.advance();
        let resolved = if self.config.allow_duplicates {
            scored
        } else {
            comparator::resolve_one_to_one(&scored)
        };

        let local_matches: Vec<MatchEntry> = resolved
            .iter()
            .map(|pair| MatchEntry {
                local_id: pair.local_id.clone(),
                peer_id: pair.peer_id.clone(),
            })
            .collect();
        self.send_frame(
            FrameTag::MatchList,
            &MatchListPayload {
                matches: local_matches,
            },
        )
        .await?;
        let (tag, _body) = self.recv_frame().await?;
        self.expect_tag(tag, FrameTag::MatchList)?;

        Ok(SessionOutcome {
            matches: resolved
                .into_iter()
                .map(|pair| MatchRecord {
                    local_id: pair.local_id,
                    peer_id: pair.peer_id,
                    score: pair.score,
                })
                .collect(),
        })
    }

    /// Loads the session's X25519 identity from `config.private_key` if
    /// one was configured, otherwise draws a fresh one.
    fn load_or_generate_secret(&self) -> Result<EphemeralSecret, PprlError> {
        if self.config.private_key.is_empty() {
            return Ok(EphemeralSecret::random(&mut rand::thread_rng()));
        }
        let decoded = hex::decode(&self.config.private_key)
            .map_err(|err| PprlError::ConfigInvalid(format!("private_key is not valid hex: {err}")))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|_| {
            PprlError::ConfigInvalid("private_key must decode to exactly 32 bytes".into())
        })?;
        Ok(EphemeralSecret::from_bytes(bytes))
    }

    fn expect_tag(&self, actual: FrameTag, expected: FrameTag) -> Result<(), PprlError> {
        if !self.phase.accepts(actual) || actual != expected {
            return Err(PprlError::protocol_violation(format!(
                "expected frame tag {expected:?} while in phase {}, got {actual:?}",
                self.phase
            ))
            .with_phase(self.phase));
        }
        Ok(())
    }

    /// Writes `payload` bounded by `config.io_deadline`.
    async fn send_frame<P: Serialize>(&mut self, tag: FrameTag, payload: &P) -> Result<(), PprlError> {
        tokio::time::timeout(self.config.io_deadline, write_frame(&mut self.stream, tag, payload))
            .await
            .map_err(|_| {
                PprlError::io_failed(format!(
                    "write of frame tag {tag:?} exceeded the {:?} deadline",
                    self.config.io_deadline
                ))
                .with_phase(self.phase)
            })?
    }

    /// Reads one frame bounded by `config.io_deadline`.
    async fn recv_frame(&mut self) -> Result<(FrameTag, Vec<u8>), PprlError> {
        tokio::time::timeout(self.config.io_deadline, read_frame(&mut self.stream))
            .await
            .map_err(|_| {
                PprlError::io_failed(format!(
                    "read in phase {} exceeded the {:?} deadline",
                    self.phase, self.config.io_deadline
                ))
                .with_phase(self.phase)
            })?
    }

    fn check_sketch_params(&self, local: &[Sketch], peer: &[Sketch]) -> Result<(), PprlError> {
        let (Some(first_local), Some(first_peer)) = (local.first(), peer.first()) else {
            return Ok(());
        };
        first_local.check_compatible(first_peer).map_err(PprlError::from)
    }

    async fn send_buckets(&mut self, buckets: &[Bucket]) -> Result<(), PprlError> {
        let wire = buckets.iter().map(BucketWire::from_bucket).collect();
        self.send_frame(FrameTag::BucketBatch, &BucketBatchPayload { buckets: wire })
            .await
    }

    async fn recv_buckets(&mut self) -> Result<Vec<Bucket>, PprlError> {
        let (tag, body) = self.recv_frame().await?;
        self.expect_tag(tag, FrameTag::BucketBatch)?;
        let payload: BucketBatchPayload = decode_payload(&body)?;
        payload.buckets.iter().map(BucketWire::to_bucket).collect()
    }

    /// Sends a best-effort `SHUTDOWN` frame, then returns `err` tagged with
    /// the phase it occurred in.
    async fn abort(mut self, err: PprlError) -> PprlError {
        let origin_phase = self.phase;
        self.phase = Phase::Abort;
        warn!(phase = %origin_phase, %err, "aborting session");
        let _ = self.send_frame(FrameTag::Shutdown, &ShutdownPayload).await;
        err.with_phase(origin_phase)
    }
}
