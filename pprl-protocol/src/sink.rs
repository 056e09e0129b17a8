//! Record storage and result sink: streaming sketch records in and out,
//! and writing the final intersection list.
//!
//! CSV and JSON I/O here is synchronous (the `csv` and `serde_json` crates
//! are themselves synchronous); the session only calls into this module
//! between suspension points, never while the stream is in flight.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use pprl_core::comparator::MatchScore;
use pprl_types::record::SketchRecord;
use pprl_types::PprlError;
use serde::Serialize;

/// Reads sketch records from a CSV file with header
/// `id,bloom_filter,minhash,timestamp`.
pub fn read_sketch_records_csv(path: &Path) -> Result<Vec<SketchRecord>, PprlError> {
    let file = File::open(path).map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    reader
        .deserialize()
        .map(|row| row.map_err(|err| PprlError::RecordSourceFailed(err.to_string())))
        .collect()
}

/// Writes sketch records to a CSV file with header
/// `id,bloom_filter,minhash,timestamp`.
pub fn write_sketch_records_csv(path: &Path, records: &[SketchRecord]) -> Result<(), PprlError> {
    let file = File::create(path).map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for record in records {
        writer
            .serialize(record)
            .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))
}

/// Reads sketch records from a JSON array of objects.
pub fn read_sketch_records_json(path: &Path) -> Result<Vec<SketchRecord>, PprlError> {
    let file = File::open(path).map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))
}

/// Writes sketch records as a JSON array of objects.
pub fn write_sketch_records_json(path: &Path, records: &[SketchRecord]) -> Result<(), PprlError> {
    let file = File::create(path).map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)
        .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))
}

/// One row of the final intersection list: the resolved (or, under
/// `allow_duplicates`, unresolved) match between a local and peer record.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub local_id: String,
    pub peer_id: String,
    pub score: MatchScore,
}

#[derive(Serialize)]
struct DiagnosticRow<'a> {
    id1: &'a str,
    id2: &'a str,
    is_match: bool,
    hamming_distance: u32,
    jaccard_similarity: f64,
    match_score: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct ZeroKnowledgeRow<'a> {
    id1: &'a str,
    id2: &'a str,
}

/// Writes the final intersection list.
///
/// `zero_knowledge` selects the `id1,id2`-only header; otherwise the full
/// diagnostic header (`id1,id2,is_match,hamming_distance,
/// jaccard_similarity,match_score,timestamp`) is emitted.
pub fn write_intersection_results(
    path: &Path,
    matches: &[MatchRecord],
    zero_knowledge: bool,
    timestamp: DateTime<Utc>,
) -> Result<(), PprlError> {
    let file = File::create(path).map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for record in matches {
        if zero_knowledge {
            writer
                .serialize(ZeroKnowledgeRow {
                    id1: &record.local_id,
                    id2: &record.peer_id,
                })
                .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
        } else {
            writer
                .serialize(DiagnosticRow {
                    id1: &record.local_id,
                    id2: &record.peer_id,
                    is_match: record.score.is_match,
                    hamming_distance: record.score.hamming,
                    jaccard_similarity: record.score.jaccard,
                    match_score: record.score.score,
                    timestamp,
                })
                .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))?;
        }
    }
    writer
        .flush()
        .map_err(|err| PprlError::RecordSourceFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "pprl-sink-test-{}-{}-{name}",
            std::process::id(),
            rand_suffix()
        ));
        path
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64
    }

    fn sample_record() -> SketchRecord {
        SketchRecord {
            id: "rec-1".to_owned(),
            bloom_filter: "AAAA".to_owned(),
            minhash: "AAAA".to_owned(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn csv_roundtrips_sketch_records() {
        let path = temp_path("sketch.csv");
        let records = vec![sample_record()];
        write_sketch_records_csv(&path, &records).unwrap();
        let decoded = read_sketch_records_csv(&path).unwrap();
        assert_eq!(decoded, records);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn json_roundtrips_sketch_records() {
        let path = temp_path("sketch.json");
        let records = vec![sample_record()];
        write_sketch_records_json(&path, &records).unwrap();
        let decoded = read_sketch_records_json(&path).unwrap();
        assert_eq!(decoded, records);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn zero_knowledge_output_has_only_id_columns() {
        let path = temp_path("zk.csv");
        let matches = vec![MatchRecord {
            local_id: "l1".to_owned(),
            peer_id: "p1".to_owned(),
            score: MatchScore {
                hamming: 0,
                jaccard: 1.0,
                is_match: true,
                score: 1.0,
            },
        }];
        write_intersection_results(&path, &matches, true, Utc::now()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().next().unwrap(), "id1,id2");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn diagnostic_output_has_full_header() {
        let path = temp_path("diag.csv");
        let matches = vec![MatchRecord {
            local_id: "l1".to_owned(),
            peer_id: "p1".to_owned(),
            score: MatchScore {
                hamming: 3,
                jaccard: 0.9,
                is_match: true,
                score: 0.95,
            },
        }];
        write_intersection_results(&path, &matches, false, Utc::now()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().next().unwrap(),
            "id1,id2,is_match,hamming_distance,jaccard_similarity,match_score,timestamp"
        );
        std::fs::remove_file(&path).ok();
    }
}
