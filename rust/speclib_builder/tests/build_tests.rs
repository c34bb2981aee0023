use calibrt::{
    DiagnosticSink,
    DiagnosticsError,
    LinearFit,
    NullDiagnostics,
    Point,
};
use speclib_builder::data_sources::read_maxquant_tables;
use speclib_builder::output::{
    write_calibrators_file,
    write_library,
    write_library_file,
};
use speclib_builder::{
    BuildError,
    BuilderOptions,
    FragmentChargeAnnotator,
    LibraryBuilder,
    LibraryRecord,
    PsmRecord,
    ReferenceIndexSource,
    ReferenceTable,
};

fn psm(id: &str, run: &str, seq: &str, charge: i32, rt: f64, pep: f64) -> PsmRecord {
    PsmRecord {
        id: id.into(),
        raw_file: run.into(),
        modified_sequence: format!("_{}_", seq),
        sequence: seq.into(),
        retention_time: Some(rt),
        calibrated_retention_time: rt,
        pep,
        charge,
        precursor_mz: 450.5,
        masses: "100.1; 200.2".into(),
        intensities: "10; 20".into(),
        proteins: "P1".into(),
        ion_mobility: Some(0.9),
        reverse: None,
    }
}

fn decoy(mut p: PsmRecord) -> PsmRecord {
    p.reverse = Some("+".into());
    p
}

fn reference() -> ReferenceTable {
    ReferenceTable {
        columns: vec!["sequence".into(), "irt".into()],
        rows: vec![
            vec!["AAGC(UniMod:4)K".into(), "-10".into()],
            vec!["LLLK".into(), "90".into()],
        ],
    }
}

fn builder() -> LibraryBuilder {
    LibraryBuilder::new(BuilderOptions {
        diagnostics_path: None,
        ..Default::default()
    })
}

#[test]
fn test_end_to_end_single_run() {
    // Both reference peptides are decoys: they calibrate but never reach the library
    let psms = vec![
        decoy(psm("1", "run_a", "AAGCK", 2, 10.0, 0.001)),
        decoy(psm("2", "run_a", "LLLK", 2, 30.0, 0.001)),
        psm("3", "run_a", "PEPTIDEK", 2, 22.0, 0.01),
    ];
    let out = builder().build(psms, reference()).unwrap();

    let cal = &out.calibrators["run_a"];
    assert!((cal.slope - 5.0).abs() < 1e-9);
    assert!((cal.intercept + 60.0).abs() < 1e-9);

    assert_eq!(out.records.len(), 2);
    let expected_rt = cal.intercept + cal.slope * 22.0;
    for (rec, (mz, int)) in out.records.iter().zip([(100.1, 10.0), (200.2, 20.0)]) {
        assert_eq!(rec.transition_group_id, "3");
        assert_eq!(rec.product_mz, mz);
        assert_eq!(rec.library_intensity, int);
        assert!((rec.calibrated_rt - expected_rt).abs() < 1e-9);
        assert_eq!(rec.modified_peptide_sequence, "PEPTIDEK");
        assert_eq!(rec.ion_mobility, Some(0.9));
        assert!(!rec.decoy);
        assert_eq!(rec.transition_name, format!("3_450.5_{:?}", mz));
    }
    assert_eq!(out.summary.n_transitions, 2);
    assert_eq!(out.summary.n_decoys_removed, 2);
}

#[test]
fn test_best_hit_selection() {
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
        psm("worse", "run_a", "PEPTIDEK", 2, 22.0, 0.05),
        psm("better", "run_a", "PEPTIDEK", 2, 23.0, 0.01),
        psm("other_charge", "run_a", "PEPTIDEK", 3, 23.5, 0.2),
    ];
    let out = builder().build(psms, reference()).unwrap();

    let ids: Vec<&str> = out
        .records
        .iter()
        .filter(|r| r.peptide_sequence == "PEPTIDEK")
        .map(|r| r.transition_group_id.as_str())
        .collect();
    assert_eq!(ids, vec!["better", "better", "other_charge", "other_charge"]);
    assert_eq!(out.summary.n_best_hits, 4);
}

#[test]
fn test_decoy_removed_after_best_hit() {
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
        decoy(psm("rev", "run_a", "PEPTIDEK", 2, 22.0, 0.001)),
        psm("fwd", "run_a", "PEPTIDEK", 2, 23.0, 0.01),
    ];

    let out = builder().build(psms.clone(), reference()).unwrap();
    assert!(out.records.iter().all(|r| r.peptide_sequence != "PEPTIDEK"));

    let decoys_first = LibraryBuilder::new(BuilderOptions {
        diagnostics_path: None,
        filter_decoys_before_best_hit: true,
    });
    let out = decoys_first.build(psms, reference()).unwrap();
    let ids: Vec<&str> = out
        .records
        .iter()
        .filter(|r| r.peptide_sequence == "PEPTIDEK")
        .map(|r| r.transition_group_id.as_str())
        .collect();
    assert_eq!(ids, vec!["fwd", "fwd"]);
}

#[test]
fn test_missing_rt_and_uncalibrated_runs_are_excluded() {
    let mut no_rt = psm("no_rt", "run_a", "MISSINGK", 2, 0.0, 0.001);
    no_rt.retention_time = None;
    let mut nan_rt = psm("nan_rt", "run_a", "NANK", 2, 0.0, 0.001);
    nan_rt.retention_time = Some(f64::NAN);

    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
        no_rt,
        nan_rt,
        // one reference peptide only: cannot be fit
        psm("3", "run_b", "AAGCK", 2, 12.0, 0.001),
        psm("4", "run_b", "OTHERK", 2, 15.0, 0.001),
        // no reference peptides at all
        psm("5", "run_c", "THIRDK", 2, 15.0, 0.001),
    ];
    let out = builder().build(psms, reference()).unwrap();

    assert_eq!(out.summary.n_missing_rt, 2);
    assert_eq!(out.calibrators.len(), 1);
    let skipped: Vec<&str> = out
        .summary
        .skipped_runs
        .iter()
        .map(|(r, _)| r.as_str())
        .collect();
    assert_eq!(skipped, vec!["run_b", "run_c"]);
    assert_eq!(out.summary.n_uncalibrated_psms, 3);

    let mut seqs: Vec<&str> = out
        .records
        .iter()
        .map(|r| r.peptide_sequence.as_str())
        .collect();
    seqs.dedup();
    assert_eq!(seqs, vec!["AAGCK", "LLLK"]);
}

#[test]
fn test_malformed_fragments_abort() {
    let mut bad = psm("bad", "run_a", "PEPTIDEK", 2, 22.0, 0.01);
    bad.intensities = "10".into();
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
        bad,
    ];
    let err = builder().build(psms, reference()).unwrap_err();
    assert!(matches!(err, BuildError::MalformedFragmentList { .. }));
}

#[test]
fn test_invalid_reference_aborts() {
    let psms = vec![psm("1", "run_a", "AAGCK", 2, 10.0, 0.001)];
    let table = ReferenceTable {
        columns: vec!["sequence".into()],
        rows: vec![vec!["AAGCK".into()]],
    };
    let err = builder().build(psms, table).unwrap_err();
    assert!(matches!(err, BuildError::InvalidReferenceIndex(_)));
}

#[test]
fn test_build_is_idempotent() {
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 31.0, 0.001),
        psm("3", "run_a", "PEPTIDEK", 2, 22.0, 0.01),
        psm("4", "run_b", "AAGCK", 2, 11.0, 0.002),
        psm("5", "run_b", "LLLK", 2, 29.0, 0.003),
        psm("6", "run_b", "QQQR", 3, 17.0, 0.02),
    ];
    let render = |psms: Vec<PsmRecord>| {
        let out = builder().build(psms, reference()).unwrap();
        let mut buf = Vec::new();
        write_library(&out.records, &mut buf).unwrap();
        buf
    };
    let first = render(psms.clone());
    let second = render(psms);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_duplicate_fragments_are_collapsed() {
    let mut dup = psm("3", "run_a", "PEPTIDEK", 2, 22.0, 0.01);
    dup.masses = "100.1;100.1;200.2".into();
    dup.intensities = "10;10;20".into();
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
        dup,
    ];
    let out = builder().build(psms, reference()).unwrap();
    let n = out
        .records
        .iter()
        .filter(|r| r.transition_group_id == "3")
        .count();
    assert_eq!(n, 2);
    assert_eq!(out.summary.n_duplicates_removed, 1);
}

struct ChargeTagger;

impl FragmentChargeAnnotator for ChargeTagger {
    fn annotate(&self, library: Vec<LibraryRecord>, _psms: &[PsmRecord]) -> Vec<LibraryRecord> {
        library
            .into_iter()
            .map(|mut r| {
                r.protein_name = format!("{}|z1", r.protein_name);
                r
            })
            .collect()
    }
}

#[test]
fn test_custom_annotator_is_used() {
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
    ];
    let out = builder()
        .with_annotator(ChargeTagger)
        .build(psms, reference())
        .unwrap();
    assert!(out.records.iter().all(|r| r.protein_name == "P1|z1"));
}

fn assert_is_pdf(path: &std::path::Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    let tail = &bytes[bytes.len().saturating_sub(32)..];
    assert!(tail.windows(5).any(|w| w == b"%%EOF"));
}

fn two_calibrated_runs() -> Vec<PsmRecord> {
    vec![
        psm("1", "run_b", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_b", "LLLK", 2, 30.0, 0.001),
        psm("3", "run_a", "AAGCK", 2, 12.0, 0.001),
        psm("4", "run_a", "LLLK", 2, 33.0, 0.001),
        psm("5", "run_c", "LLLK", 2, 33.0, 0.001),
    ]
}

#[derive(Default)]
struct RecordingSink {
    runs: Vec<String>,
}

impl DiagnosticSink for RecordingSink {
    fn add_page(
        &mut self,
        run_id: &str,
        _points: &[Point],
        _line: &LinearFit,
    ) -> Result<(), DiagnosticsError> {
        self.runs.push(run_id.to_string());
        Ok(())
    }
}

#[test]
fn test_diagnostics_one_page_per_calibrated_run() {
    let mut sink = RecordingSink::default();
    let out = builder()
        .build_with_sink(two_calibrated_runs(), reference(), &mut sink)
        .unwrap();
    // run_c has a single reference peptide and gets no page
    assert_eq!(sink.runs, vec!["run_a", "run_b"]);
    assert_eq!(out.summary.skipped_runs.len(), 1);
    assert_eq!(out.summary.skipped_runs[0].0, "run_c");
}

#[test]
fn test_diagnostics_document_is_a_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join(speclib_builder::DEFAULT_REPORT_PATH);
    let builder = LibraryBuilder::new(BuilderOptions {
        diagnostics_path: Some(report_path.clone()),
        ..Default::default()
    });
    builder.build(two_calibrated_runs(), reference()).unwrap();
    assert_is_pdf(&report_path);
}

#[test]
fn test_diagnostics_document_valid_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("rtcalibration.pdf");
    let builder = LibraryBuilder::new(BuilderOptions {
        diagnostics_path: Some(report_path.clone()),
        ..Default::default()
    });
    let mut bad = psm("bad", "run_a", "PEPTIDEK", 2, 22.0, 0.01);
    bad.masses = "1;2;3".into();
    let psms = vec![
        psm("1", "run_a", "AAGCK", 2, 10.0, 0.001),
        psm("2", "run_a", "LLLK", 2, 30.0, 0.001),
        bad,
    ];
    assert!(builder.build(psms, reference()).is_err());
    assert_is_pdf(&report_path);
}

#[test]
fn test_no_diagnostics_document_when_reference_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("rtcalibration.pdf");
    let builder = LibraryBuilder::new(BuilderOptions {
        diagnostics_path: Some(report_path.clone()),
        ..Default::default()
    });
    let table = ReferenceTable {
        columns: vec!["sequence".into()],
        rows: vec![vec!["AAGCK".into()]],
    };
    let psms = vec![psm("1", "run_a", "AAGCK", 2, 10.0, 0.001)];
    assert!(builder.build(psms, table).is_err());
    assert!(!report_path.exists());
}

const EVIDENCE: &str = "\
id\tSequence\tCalibrated Retention Time\tIon mobility index
0\tAAGCK\t10.5\t100
1\tLLLK\t30.5\t200
2\tPEPTIDEK\t22.0\t300
";

const MSMS: &str = "\
Raw file\tSequence\tModified sequence\tCharge\tm/z\tRetention time\tPEP\tReverse\tProteins\tMasses\tIntensities\tid\tEvidence ID
run_a\tAAGCK\t_AAGCK_\t2\t300.1\t10\t0.001\t\tP9\t120.5;240.5\t7;8\t0\t0
run_a\tLLLK\t_LLLK_\t2\t250.2\t30\t0.001\t\tP9\t130.5\t9\t1\t1
run_a\tPEPTIDEK\t_PEPTIDEK_\t2\t464.7\t21.9\t0.01\t\tP1\t147.1; 276.2\t100; 50\t2\t2
";

const WIDE_REFERENCE: &str = "\
PrecursorMz\tModifiedPeptideSequence\tProductMz\tNormalizedRetentionTime
300.1\tAAGC(UniMod:4)K\t120.5\t-10
300.1\tAAGC(UniMod:4)K\t240.5\t-10
250.2\tLLLK\t130.5\t90
";

#[test]
fn test_maxquant_files_to_library_file() {
    let dir = tempfile::tempdir().unwrap();
    let msms = dir.path().join("msms.txt");
    let evidence = dir.path().join("evidence.txt");
    let irt = dir.path().join("irt.tsv");
    std::fs::write(&msms, MSMS).unwrap();
    std::fs::write(&evidence, EVIDENCE).unwrap();
    std::fs::write(&irt, WIDE_REFERENCE).unwrap();

    let psms = read_maxquant_tables(&msms, &evidence, "Ion mobility index").unwrap();
    assert_eq!(psms.len(), 3);

    let out = builder()
        .build_with_sink(psms, ReferenceIndexSource::Path(irt), &mut NullDiagnostics)
        .unwrap();

    // fitted on the MS/MS RT (10 -> -10, 30 -> 90), applied on the evidence RT
    let cal = &out.calibrators["run_a"];
    assert!((cal.slope - 5.0).abs() < 1e-9);
    assert!((cal.intercept + 60.0).abs() < 1e-9);

    // 2 + 1 + 2 fragments
    assert_eq!(out.records.len(), 5);
    let pep: Vec<&LibraryRecord> = out
        .records
        .iter()
        .filter(|r| r.transition_group_id == "2")
        .collect();
    assert_eq!(pep.len(), 2);
    assert!((pep[0].calibrated_rt - 50.0).abs() < 1e-9);
    assert_eq!(pep[0].ion_mobility, Some(300.0));
    assert_eq!(pep[1].product_mz, 276.2);

    let lib_path = dir.path().join("library.tsv");
    write_library_file(&out.records, &lib_path).unwrap();
    let cal_path = dir.path().join("calibrators.tsv");
    write_calibrators_file(&out.calibrators, &cal_path).unwrap();

    let lib = std::fs::read_to_string(&lib_path).unwrap();
    assert_eq!(lib.lines().count(), 6);
    assert!(lib.starts_with("transition_group_id\tPrecursorMz\tProductMz"));
    let cals = std::fs::read_to_string(&cal_path).unwrap();
    assert_eq!(cals.lines().count(), 2);
}
