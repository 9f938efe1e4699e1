#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use certificate_press_server::certificate::RasterImage;
use certificate_press_server::checkpoint::CheckpointStore;
use certificate_press_server::dataset::{spreadsheet, Table};
use certificate_press_server::pipeline::{CertificatePipeline, Upload};
use certificate_press_server::status::StatusBoard;
use certificate_press_server::storage::LocalStorage;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("fixture exists")
}

pub fn fixture_upload(name: &str) -> Upload {
    Upload::new(name, fixture(name))
}

pub fn fixture_table(name: &str) -> Table {
    spreadsheet::read_table(&fixture(name), name).expect("fixture is a readable workbook")
}

/// Pipeline writing everything below `dir`, with the small test template.
pub fn test_pipeline(dir: &tempfile::TempDir) -> CertificatePipeline {
    CertificatePipeline::new(
        LocalStorage::new(dir.path().join("uploads"), dir.path().join("gens")),
        CheckpointStore::new(dir.path().join("checkpoint.json")),
        RasterImage::open(&fixture_path("template.png"), "template").expect("template decodes"),
        Arc::new(StatusBoard::new()),
    )
}
