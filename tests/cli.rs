mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestWorkspace, fixture_path};
use pheno_meta::{HeaderSource, metadata::Metadata};
use predicates::prelude::*;
use predicates::str::contains;

#[test]
fn probe_writes_yaml_metadata() {
    let workspace = TestWorkspace::new();
    let meta_path = workspace.join("cohort.yml");
    cargo_bin_cmd!("pheno-meta")
        .args(["probe", "-i"])
        .arg(fixture_path("cohort.tsv"))
        .arg("-o")
        .arg(&meta_path)
        .assert()
        .success();

    let metadata = Metadata::load(&meta_path).expect("load metadata");
    assert_eq!(metadata.layout.header, HeaderSource::Comment);
    assert_eq!(metadata.columns.len(), 5);
}

#[test]
fn probe_prints_json_without_output() {
    cargo_bin_cmd!("pheno-meta")
        .args(["probe", "-i"])
        .arg(fixture_path("family.ped"))
        .assert()
        .success()
        .stdout(contains("\"class\": \"family_id\""))
        .stdout(contains("\"collapse_whitespace\": true"));
}

#[test]
fn probe_honours_forced_delimiter() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("semi.txt", "id;age\n1;30\n2;41\n3;30\n");
    let meta_path = workspace.join("semi.json");
    cargo_bin_cmd!("pheno-meta")
        .args(["probe", "--delimiter", "semicolon", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&meta_path)
        .assert()
        .success();

    let metadata = Metadata::load(&meta_path).expect("load metadata");
    assert_eq!(metadata.layout.dialect.delimiter, b';');
    assert_eq!(metadata.column_names(), vec!["id", "age"]);
}

#[test]
fn probe_rejects_binary_input() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_bytes("blob.bin", &[0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00]);
    cargo_bin_cmd!("pheno-meta")
        .args(["probe", "-i"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("not a text table"));
}

#[test]
fn extract_streams_selected_columns() {
    cargo_bin_cmd!("pheno-meta")
        .args(["extract", "-C", "iid,status", "--output-delimiter", ",", "-i"])
        .arg(fixture_path("cohort.tsv"))
        .assert()
        .success()
        .stdout("iid,status\nS1,case\nS2,control\nS3,case\nS4,control\nS5,case\n");
}

#[test]
fn extract_with_saved_metadata_writes_file() {
    let workspace = TestWorkspace::new();
    let meta_path = workspace.join("family.json");
    let output = workspace.join("out.tsv");
    let input = fixture_path("family.ped");

    cargo_bin_cmd!("pheno-meta")
        .args(["probe", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&meta_path)
        .assert()
        .success();
    cargo_bin_cmd!("pheno-meta")
        .args(["extract", "-C", "COL1,COL5", "-i"])
        .arg(&input)
        .arg("-m")
        .arg(&meta_path)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).expect("read output");
    assert_eq!(written, "COL1\tCOL5\nS1\t2.5\nS2\t1.75\nS3\t3.0\nS4\t0.5\n");
}

#[test]
fn extract_reports_all_missing_columns() {
    cargo_bin_cmd!("pheno-meta")
        .args(["extract", "-C", "iid,height,weight", "-i"])
        .arg(fixture_path("cohort.tsv"))
        .assert()
        .failure()
        .stderr(contains("height, weight"));
}

#[test]
fn columns_lists_definitions() {
    cargo_bin_cmd!("pheno-meta")
        .args(["columns", "-i"])
        .arg(fixture_path("cohort.tsv"))
        .assert()
        .success()
        .stdout(contains("status"))
        .stdout(contains("case|control"))
        .stdout(contains("value=b1"));
}

#[test]
fn preview_limits_rows() {
    cargo_bin_cmd!("pheno-meta")
        .args(["preview", "--rows", "2", "-i"])
        .arg(fixture_path("cohort.tsv"))
        .assert()
        .success()
        .stdout(contains("iid"))
        .stdout(contains("S2"))
        .stdout(contains("S3").not());
}

#[test]
fn filetype_reports_text_and_binary() {
    let workspace = TestWorkspace::new();
    cargo_bin_cmd!("pheno-meta")
        .args(["filetype", "-i"])
        .arg(fixture_path("cohort.tsv"))
        .assert()
        .success()
        .stdout(contains("ASCII text"))
        .stdout(contains("mime: text/plain; charset=us-ascii"));

    let blob = workspace.write_bytes("blob.bin", &[0u8, 1, 2, 3]);
    cargo_bin_cmd!("pheno-meta")
        .args(["filetype", "-i"])
        .arg(&blob)
        .assert()
        .failure()
        .stdout(contains("data"));
}
