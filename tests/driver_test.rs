// Exercises the batch-file CLI surface (`repcrec f -input FILE -output
// FILE`) end-to-end through real temporary files, the way the teacher
// crate's own `tests/*_test.rs` integration tests hit real I/O rather
// than mocking it.

use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

use repcrec::driver::run_file;

fn write_input(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp input file");
    file.write_all(contents.as_bytes()).expect("write temp input file");
    file
}

#[test]
fn batch_file_runs_every_end_delimited_case() {
    let input = write_input(
        "begin(T1)\nW(T1,x1,101)\nR(T1,x1)\nend(T1)\n<END>\nbegin(T2)\nW(T2,x8,88)\nend(T2)\ndump()\n",
    );
    let output = NamedTempFile::new().expect("create temp output file");

    let had_error = run_file(input.path(), output.path()).expect("batch run succeeds");
    assert!(!had_error);

    let text = fs::read_to_string(output.path()).expect("read batch output");
    assert!(text.contains("Test 1 Result"));
    assert!(text.contains("Test 2 Result"));
    assert!(text.contains("T1 commits"));
    assert!(text.contains("T2 commits"));
    assert_eq!(text.matches("88").count(), 10);
}

#[test]
fn batch_file_surfaces_duplicate_transaction_without_aborting_the_case() {
    let input = write_input("begin(T1)\nbegin(T1)\nend(T1)\n");
    let output = NamedTempFile::new().expect("create temp output file");

    let had_error = run_file(input.path(), output.path()).expect("batch run succeeds");
    assert!(had_error);

    let text = fs::read_to_string(output.path()).expect("read batch output");
    assert!(text.contains("T1 commits"));
}
