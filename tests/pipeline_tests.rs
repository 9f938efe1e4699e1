mod common;

#[cfg(test)]
mod pipeline_tests {
    use chrono::NaiveDate;

    use certificate_press_server::checkpoint::{CheckpointPolicy, Stage};
    use certificate_press_server::config::SignatureMode;
    use certificate_press_server::dataset::SeatNo;
    use certificate_press_server::error::PipelineError;
    use certificate_press_server::pipeline::{GenerationRequest, RunOutcome, RunState};

    use crate::common::{fixture_upload, test_pipeline};

    fn request() -> GenerationRequest {
        GenerationRequest {
            roster: Some(fixture_upload("ms6.xlsx")),
            outcomes: Some(fixture_upload("bms.xlsx")),
            year: "MAY 2024".to_string(),
            course_name: "B.E.".to_string(),
            semester: Some("6".to_string()),
            signature: Some(fixture_upload("signature.png")),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 5),
        }
    }

    fn seats(seats: &[SeatNo]) -> Vec<&str> {
        seats.iter().map(SeatNo::as_str).collect()
    }

    #[test]
    fn test_full_batch_renders_two_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir);

        let RunOutcome::Generated { path, report } = pipeline.run(request()).unwrap() else {
            panic!("expected a generated document");
        };
        assert_eq!(seats(&report.seats), vec!["2001", "2004", "1001", "1002", "1003"]);
        assert_eq!(report.pages, 3);

        let document = lopdf::Document::load(&path).unwrap();
        assert_eq!(document.get_pages().len(), 3);
        assert_eq!(pipeline.run_state(), RunState::Completed);
        assert!(!pipeline.checkpoint().path().exists());
    }

    #[test]
    fn test_interrupted_batch_resumes_with_remaining_seats() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir);
        for seat in ["2001", "2004"] {
            pipeline
                .checkpoint()
                .record(&SeatNo::from(seat), Stage::in_progress("certificate_generation"));
        }

        let RunOutcome::Generated { report, .. } = pipeline.run(request()).unwrap() else {
            panic!("expected a generated document");
        };
        assert_eq!(seats(&report.seats), vec!["1001", "1002", "1003"]);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.pages, 2);
        assert!(pipeline.checkpoint().load().is_zero());
    }

    #[test]
    fn test_per_record_policy_still_clears_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir).with_policy(CheckpointPolicy::PerRecord);

        let first = pipeline.run(request()).unwrap();
        assert!(matches!(first, RunOutcome::Generated { .. }));

        // The stored checkpoint was cleared, so a repeat renders everything again.
        let RunOutcome::Generated { report, .. } = pipeline.run(request()).unwrap() else {
            panic!("expected a generated document");
        };
        assert_eq!(report.rendered(), 5);
    }

    #[test]
    fn test_unstored_document_leaves_every_seat_pending() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir).with_policy(CheckpointPolicy::PerRecord);
        let gens = pipeline.storage().gen_dir().to_path_buf();
        std::fs::write(&gens, b"in the way").unwrap();

        let Err(PipelineError::Storage(_)) = pipeline.run(request()) else {
            panic!("expected the document write to fail");
        };
        assert_eq!(pipeline.run_state(), RunState::Failed);
        assert!(pipeline.checkpoint().load().processed.is_empty());

        std::fs::remove_file(&gens).unwrap();
        let RunOutcome::Generated { path, report } = pipeline.run(request()).unwrap() else {
            panic!("expected a generated document");
        };
        assert_eq!(seats(&report.seats), vec!["2001", "2004", "1001", "1002", "1003"]);
        assert_eq!(report.skipped, 0);
        assert_eq!(lopdf::Document::load(&path).unwrap().get_pages().len(), 3);
    }

    #[test]
    fn test_semester_and_signature_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir);
        let request = GenerationRequest {
            semester: None,
            signature: None,
            ..request()
        };

        let outcome = pipeline.run(request).unwrap();
        assert!(matches!(outcome, RunOutcome::Generated { .. }));
    }

    #[test]
    fn test_required_signature_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir).with_signature_mode(SignatureMode::Required);
        let request = GenerationRequest {
            signature: None,
            ..request()
        };

        let Err(PipelineError::Validation(errors)) = pipeline.run(request) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.errors()[0].field, "signature");
        assert_eq!(pipeline.run_state(), RunState::Failed);
        assert!(pipeline
            .status()
            .get()
            .starts_with("Error generating certificates"));
    }

    #[test]
    fn test_uploads_are_not_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir);

        pipeline.run(request()).unwrap();
        let leftovers = std::fs::read_dir(pipeline.storage().upload_dir())
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);

        let report = pipeline.purge().unwrap();
        assert_eq!(report.artifacts, 1);
        assert_eq!(pipeline.run_state(), RunState::Idle);
    }
}
