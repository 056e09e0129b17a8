//! End-to-end protocol scenarios over real and in-memory duplex streams.
//!
//! Every record pair here goes through the full pipeline: normalize ->
//! q-gram -> sketch -> handshake -> sketch exchange -> block exchange ->
//! intersect -> resolve, exactly as two independent processes would run it.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use pprl::core::normalize::NormalizationMethod;
use pprl::core::sketch::Sketch;
use pprl::protocol::framing::{read_frame, write_frame};
use pprl::protocol::retry::connect_with_retry;
use pprl::protocol::session::Session;
use pprl::types::config::{PprlConfig, Role};
use pprl::types::field::FieldSpec;
use pprl::types::message::{BucketBatchPayload, FrameTag};
use pprl::types::pipeline::build_sketches;
use pprl::types::PprlError;

const NAME: NormalizationMethod = NormalizationMethod::Name;
const DATE: NormalizationMethod = NormalizationMethod::Date;
const ZIP: NormalizationMethod = NormalizationMethod::Zip;

fn build_sketch(config: &PprlConfig, id: &str, raw_values: &[&str], seed: u64) -> Sketch {
    let records = vec![(id.to_owned(), raw_values.iter().map(|v| v.to_string()).collect())];
    build_sketches(config, &records, seed).into_iter().next().unwrap()
}

fn config(role: Role, hamming_threshold: u32, jaccard_threshold: f64, allow_duplicates: bool) -> PprlConfig {
    PprlConfig {
        role,
        bloom_size: 1024,
        bloom_hashes: 6,
        minhash_signatures: 128,
        minhash_permutations: 1000,
        qgram_length: 2,
        random_bits_percent: 0.0,
        hamming_threshold,
        jaccard_threshold,
        fields: vec![
            FieldSpec::new("first", NAME),
            FieldSpec::new("last", NAME),
            FieldSpec::new("dob", DATE),
            FieldSpec::new("zip", ZIP),
        ],
        listen_port: Some(0),
        peer_host: None,
        peer_port: None,
        private_key: String::new(),
        allow_duplicates,
        dial_retry_attempts: 3,
        dial_retry_backoff: Duration::from_millis(50),
        io_deadline: Duration::from_secs(5),
        zero_knowledge_output: false,
    }
}

/// S1. Perfect overlap: identical records on both sides match.
#[tokio::test]
async fn s1_perfect_overlap_matches() {
    let cfg = config(Role::Server, 100, 0.8, false);
    let a = build_sketch(&cfg, "r1", &["John", "Smith", "1990-01-01", "12345"], 1);
    let b = build_sketch(&cfg, "s1", &["John", "Smith", "1990-01-01", "12345"], 2);

    let (stream_a, stream_b) = tokio::io::duplex(1 << 20);
    let session_a = Session::new(stream_a, config(Role::Server, 100, 0.8, false));
    let session_b = Session::new(stream_b, config(Role::Client, 100, 0.8, false));

    let (result_a, result_b) = tokio::join!(session_a.run(vec![a]), session_b.run(vec![b]));
    let outcome_a = result_a.unwrap();
    let outcome_b = result_b.unwrap();

    assert_eq!(outcome_a.matches.len(), 1);
    assert_eq!(outcome_a.matches[0].local_id, "r1");
    assert_eq!(outcome_a.matches[0].peer_id, "s1");
    assert_eq!(outcome_b.matches.len(), 1);
    assert_eq!(outcome_b.matches[0].local_id, "s1");
    assert_eq!(outcome_b.matches[0].peer_id, "r1");
}

/// S2. Disjoint records produce an empty match list without aborting.
#[tokio::test]
async fn s2_disjoint_records_yield_no_matches() {
    let cfg = config(Role::Server, 100, 0.8, false);
    let a = build_sketch(&cfg, "r1", &["John", "Smith", "1990-01-01", "12345"], 3);
    let b = build_sketch(&cfg, "s1", &["Mary", "Jones", "1970-12-31", "99999"], 4);

    let (stream_a, stream_b) = tokio::io::duplex(1 << 20);
    let session_a = Session::new(stream_a, config(Role::Server, 100, 0.8, false));
    let session_b = Session::new(stream_b, config(Role::Client, 100, 0.8, false));

    let (result_a, result_b) = tokio::join!(session_a.run(vec![a]), session_b.run(vec![b]));
    assert!(result_a.unwrap().matches.is_empty());
    assert!(result_b.unwrap().matches.is_empty());
}

/// S3. Fuzzy match via noise: "John" vs "Jon" still match on default
/// thresholds because padded 2-gram overlap stays high.
#[tokio::test]
async fn s3_fuzzy_match_survives_a_typo() {
    let cfg = config(Role::Server, 100, 0.8, false);
    let a = build_sketch(&cfg, "r1", &["John", "Smith", "1990-01-01", "12345"], 5);
    let b = build_sketch(&cfg, "s1", &["Jon", "Smith", "1990-01-01", "12345"], 6);

    let (stream_a, stream_b) = tokio::io::duplex(1 << 20);
    let session_a = Session::new(stream_a, config(Role::Server, 100, 0.8, false));
    let session_b = Session::new(stream_b, config(Role::Client, 100, 0.8, false));

    let (result_a, result_b) = tokio::join!(session_a.run(vec![a]), session_b.run(vec![b]));
    let outcome_a = result_a.unwrap();
    let outcome_b = result_b.unwrap();
    assert_eq!(outcome_a.matches.len(), 1);
    assert_eq!((outcome_a.matches[0].local_id.as_str(), outcome_a.matches[0].peer_id.as_str()), ("r1", "s1"));
    assert_eq!(outcome_b.matches.len(), 1);
}

/// S4 (testable invariant 5). With several ambiguous overlapping records on
/// both sides, the resolved match set is a 1:1 assignment and identical on
/// both parties regardless of which side computed it.
#[tokio::test]
async fn s4_multi_record_resolution_is_one_to_one_and_agrees_both_ways() {
    let cfg = config(Role::Server, 100, 0.8, false);
    let r1 = build_sketch(&cfg, "r1", &["John", "Smith", "1990-01-01", "12345"], 7);
    let r2 = build_sketch(&cfg, "r2", &["Jane", "Doe", "1985-05-05", "54321"], 8);
    let s1 = build_sketch(&cfg, "s1", &["John", "Smith", "1990-01-01", "12345"], 9);
    let s2 = build_sketch(&cfg, "s2", &["Jane", "Doe", "1985-05-05", "54321"], 10);

    let (stream_a, stream_b) = tokio::io::duplex(1 << 20);
    let session_a = Session::new(stream_a, config(Role::Server, 100, 0.8, false));
    let session_b = Session::new(stream_b, config(Role::Client, 100, 0.8, false));

    let (result_a, result_b) = tokio::join!(
        session_a.run(vec![r1, r2]),
        session_b.run(vec![s1, s2])
    );
    let outcome_a = result_a.unwrap();
    let outcome_b = result_b.unwrap();

    assert_eq!(outcome_a.matches.len(), 2);
    let mut locals = BTreeSet::new();
    let mut peers = BTreeSet::new();
    for m in &outcome_a.matches {
        assert!(locals.insert(m.local_id.clone()), "local id used twice");
        assert!(peers.insert(m.peer_id.clone()), "peer id used twice");
    }

    let a_pairs: BTreeSet<(String, String)> = outcome_a
        .matches
        .iter()
        .map(|m| (m.local_id.clone(), m.peer_id.clone()))
        .collect();
    let b_pairs: BTreeSet<(String, String)> = outcome_b
        .matches
        .iter()
        .map(|m| (m.peer_id.clone(), m.local_id.clone()))
        .collect();
    assert_eq!(a_pairs, b_pairs);
}

/// S5. Retry: the dialer connects before the listener is ready and
/// succeeds once the listener comes up, with no special-casing needed on
/// the caller's part.
#[tokio::test]
async fn s5_dial_retry_succeeds_once_listener_starts() {
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let listener_task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        listener.accept().await.unwrap()
    });

    let addr = format!("127.0.0.1:{port}");
    let result = connect_with_retry(5, Duration::from_millis(50), || {
        let addr = addr.clone();
        async move { TcpStream::connect(addr).await }
    })
    .await;

    assert!(result.is_ok());
    listener_task.await.unwrap();
}

/// S6. Abort on protocol violation: the listener gets a `BUCKET_BATCH`
/// frame while still in `HS_PUB_RECV` and aborts before any sketches are
/// exchanged.
#[tokio::test]
async fn s6_out_of_phase_frame_aborts_with_protocol_violation() {
    let (session_stream, mut attacker_stream) = tokio::io::duplex(4096);
    let session = Session::new(session_stream, config(Role::Server, 100, 0.8, false));

    let attacker = tokio::spawn(async move {
        let (_tag, _body) = read_frame(&mut attacker_stream).await.unwrap();
        write_frame(&mut attacker_stream, FrameTag::BucketBatch, &BucketBatchPayload { buckets: vec![] })
            .await
            .unwrap();
    });

    let result = session.run(vec![]).await;
    assert!(matches!(result, Err(PprlError::ProtocolViolation { .. })));
    attacker.await.unwrap();
}
