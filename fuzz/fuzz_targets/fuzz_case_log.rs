//! Fuzz target for event log normalization and anomaly scoring.
//!
//! Malformed rows must surface as errors; well-formed logs must score
//! without panicking.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tr_core::{ActivityIndex, AnomalyDetector, CaseLog, EventRecord, LogKind, NbgSet};

#[derive(Debug, Arbitrary)]
struct Row {
    case: u8,
    activity: String,
    order: Option<i16>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    clean: Vec<Row>,
    anomalous: Vec<Row>,
    alpha: u8,
}

fn records(rows: &[Row]) -> Vec<EventRecord> {
    rows.iter()
        .map(|row| EventRecord {
            case_id: format!("c{}", row.case % 16),
            activity: row.activity.clone(),
            timestamp: None,
            order: row.order.map(i64::from),
        })
        .collect()
}

fuzz_target!(|input: Input| {
    let mut index = ActivityIndex::new();
    let Ok(clean) = CaseLog::from_records(&records(&input.clean), LogKind::Clean, &mut index, false)
    else {
        return;
    };
    let graphs = NbgSet::build(&clean, &index);

    let Ok(anomalous) =
        CaseLog::from_records(&records(&input.anomalous), LogKind::Anomalous, &mut index, false)
    else {
        return;
    };

    let detector = AnomalyDetector::new(&graphs);
    let alpha = f64::from(input.alpha) / 256.0;
    for case in clean.cases() {
        assert!(detector.loc_anomalies(&case.activities(), 0.0).is_empty());
    }
    for case in anomalous.cases() {
        let matrix = detector.matrix(&case.activities(), alpha);
        let density = matrix.density();
        assert!((0.0..=1.0).contains(&density));
    }
});
