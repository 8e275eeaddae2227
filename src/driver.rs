// Tick sequencer, blocked-queue drain, and the three CLI modes
// (batch file, directory, interactive), per spec.md §4.7 and §6.
//
// Grounded on `examples/original_source/utils/driver.py::run` for the
// tick-increment-then-step loop and the post-input drain-until-no-progress
// livelock check, and on `main.py::run_file` for the per-case
// "Test N Result" header and batch/directory dispatch.

use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::common::Tick;
use crate::error::Result;
use crate::parser::{parse_line, strip_comment};
use crate::transaction::TransactionManager;

const END_MARKER: &str = "<END>";

/// A `'static`, `Clone`-able `Write` sink over a shared buffer.
///
/// Each case in a batch file gets its own `TransactionManager` (a
/// fresh transaction/site state per spec.md §4.7's per-case
/// semantics), but every case's output must land in the same output
/// file in order. `TransactionManager::out` is `Box<dyn Write>`
/// (implicitly `'static`, since it's a struct field, not a borrow
/// scoped to one call) — a plain `&mut File` can't satisfy that, so
/// this wrapper gives every case's manager its own handle onto one
/// shared sink instead.
#[derive(Clone)]
struct SharedWriter<W>(Arc<Mutex<W>>);

impl<W: Write> Write for SharedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

/// Runs one case (a list of already-stripped operation lines) against
/// a fresh `TransactionManager`, writing all operation output to `out`.
///
/// Per spec.md §7, an input error (unparsable line, duplicate
/// transaction id, reference to an unknown transaction) is fatal only
/// for *that* line: it's surfaced and the case continues with the next
/// line. Returns whether any such error occurred, so the caller can
/// pick a nonzero exit code without aborting the run.
pub fn run_case(lines: &[String], out: Box<dyn Write>) -> Result<bool> {
    let mut tm = TransactionManager::with_output(out);
    let mut tick: Tick = 0;
    let mut had_error = false;

    for line in lines {
        tick += 1;
        match parse_line(line) {
            Ok(op) => {
                if let Err(err) = tm.step(op, tick) {
                    had_error = true;
                    writeln!(tm.out_mut(), "error: {err}")?;
                }
            }
            Err(err) => {
                had_error = true;
                writeln!(tm.out_mut(), "error: {err}")?;
            }
        }
    }

    drain_until_done(&mut tm, &mut tick);
    Ok(had_error)
}

/// Retries the blocked queue, advancing the tick each pass, until it's
/// empty or a full pass makes no progress (spec.md §4.7's livelock
/// case).
fn drain_until_done(tm: &mut TransactionManager, tick: &mut Tick) {
    while tm.blocked_len() > 0 {
        let before = tm.blocked_len();
        *tick += 1;
        tm.retry(*tick);

        if tm.blocked_len() == before {
            warn!(
                remaining = before,
                "blocked queue made no progress this pass; case may not be terminable"
            );
            let ops: Vec<String> = tm.blocked_ops().iter().map(|op| op.to_string()).collect();
            let out = tm.out_mut();
            let _ = writeln!(out, "no progress on the blocked queue; this case may not terminate:");
            for op in ops {
                let _ = writeln!(out, "{op}");
            }
            break;
        }
    }
}

/// Splits a file's non-comment, non-blank lines into cases delimited
/// by `<END>`. A trailing case with no terminating `<END>` is included.
fn load_cases(path: &Path) -> io::Result<Vec<Vec<String>>> {
    let content = fs::read_to_string(path)?;
    let mut cases = Vec::new();
    let mut current = Vec::new();

    for raw in content.lines() {
        let Some(line) = strip_comment(raw) else { continue };
        if line == END_MARKER {
            cases.push(std::mem::take(&mut current));
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        cases.push(current);
    }
    Ok(cases)
}

/// `repcrec f -input FILE -output FILE`. Returns whether any case hit
/// an input error (used for the process exit code); the run itself
/// always processes every case.
pub fn run_file(input: &Path, output: &Path) -> Result<bool> {
    let cases = load_cases(input)?;
    let file = File::create(output)?;
    let out = SharedWriter(Arc::new(Mutex::new(BufWriter::new(file))));
    let mut had_error = false;

    for (case_id, case) in cases.iter().enumerate() {
        writeln!(out.0.lock().unwrap(), "Test {} Result", case_id + 1)?;
        had_error |= run_case(case, Box::new(out.clone()))?;
    }
    out.0.lock().unwrap().flush()?;
    info!(input = %input.display(), output = %output.display(), "batch run complete");
    Ok(had_error)
}

/// `repcrec d -input DIR -output DIR`
pub fn run_directory(input_dir: &Path, output_dir: &Path) -> Result<bool> {
    fs::create_dir_all(output_dir)?;

    let mut entries: Vec<_> = fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "txt").unwrap_or(false))
        .collect();
    entries.sort();

    let mut had_error = false;
    for input_path in entries {
        let file_name = input_path.file_name().expect("filtered to files with a .txt extension");
        let output_path = output_dir.join(file_name);
        had_error |= run_file(&input_path, &output_path)?;
    }
    Ok(had_error)
}

/// `repcrec i` — interactive REPL. `refresh` resets state and the tick
/// counter; `<END>` drains the blocked queue then resets, mirroring the
/// batch driver's per-case behavior; `quit` exits.
pub fn run_interactive() -> Result<()> {
    let stdin = io::stdin();
    let mut tm = TransactionManager::new();
    let mut tick: Tick = 0;

    for line in stdin.lock().lines() {
        let raw = line?;
        let Some(line) = strip_comment(&raw) else { continue };

        match line {
            "quit" => break,
            "refresh" => {
                tm = TransactionManager::new();
                tick = 0;
            }
            END_MARKER => {
                drain_until_done(&mut tm, &mut tick);
                tm = TransactionManager::new();
                tick = 0;
            }
            op_line => {
                tick += 1;
                match parse_line(op_line) {
                    Ok(op) => {
                        if let Err(err) = tm.step(op, tick) {
                            eprintln!("{err}");
                        }
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }
    Ok(())
}
