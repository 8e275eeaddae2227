// Textual operation-line grammar, per spec.md §6.
//
// Grounded on the original prototype's `OperationParser` (`model/Operation.py`):
// the same `name(args)` shape split via a `(.*)\((.*?)\)` regex, then
// `parse_variable_id` splitting `x12` into its numeric suffix. Rewritten
// here as an explicit hand parser (`regex` is not otherwise needed
// anywhere in this crate, and a one-shape grammar doesn't earn the
// dependency) that returns a `TransactionError` instead of raising.

use crate::common::{SiteId, VariableId, NUM_SITES, NUM_VARIABLES};
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::operation::Operation;

/// Parses one input line into an `Operation`. Blank lines and `//`
/// comments are the caller's concern (see `driver::read_lines`); this
/// function assumes `line` is already a bare, non-empty operation.
pub fn parse_line(line: &str) -> TransactionResult<Operation> {
    let line = line.trim();
    let open = line.find('(').ok_or_else(|| TransactionError::parse_error(line))?;
    if !line.ends_with(')') {
        return Err(TransactionError::parse_error(line));
    }
    let opcode = line[..open].trim();
    let args_str = &line[open + 1..line.len() - 1];
    let args: Vec<&str> = if args_str.trim().is_empty() {
        Vec::new()
    } else {
        args_str.split(',').map(str::trim).collect()
    };

    match opcode {
        "begin" => {
            let trans_id = require_arg(line, &args, 0)?;
            Ok(Operation::Begin { trans_id: trans_id.to_string() })
        }
        "beginRO" => {
            let trans_id = require_arg(line, &args, 0)?;
            Ok(Operation::BeginReadOnly { trans_id: trans_id.to_string() })
        }
        "R" => {
            let trans_id = require_arg(line, &args, 0)?;
            let var = parse_variable(line, require_arg(line, &args, 1)?)?;
            Ok(Operation::Read { trans_id: trans_id.to_string(), var })
        }
        "W" => {
            let trans_id = require_arg(line, &args, 0)?;
            let var = parse_variable(line, require_arg(line, &args, 1)?)?;
            let value = require_arg(line, &args, 2)?
                .parse::<i64>()
                .map_err(|_| TransactionError::parse_error(line))?;
            Ok(Operation::Write { trans_id: trans_id.to_string(), var, value })
        }
        "end" => {
            let trans_id = require_arg(line, &args, 0)?;
            Ok(Operation::End { trans_id: trans_id.to_string() })
        }
        "fail" => {
            let site = parse_site(line, require_arg(line, &args, 0)?)?;
            Ok(Operation::Fail { site })
        }
        "recover" => {
            let site = parse_site(line, require_arg(line, &args, 0)?)?;
            Ok(Operation::Recover { site })
        }
        "dump" => Ok(Operation::Dump),
        other => Err(TransactionError::unknown_opcode(other)),
    }
}

fn require_arg<'a>(line: &str, args: &[&'a str], idx: usize) -> TransactionResult<&'a str> {
    args.get(idx).copied().filter(|s| !s.is_empty()).ok_or_else(|| TransactionError::parse_error(line))
}

fn parse_variable(line: &str, token: &str) -> TransactionResult<VariableId> {
    let digits = token.strip_prefix('x').ok_or_else(|| TransactionError::parse_error(line))?;
    let var = digits.parse::<VariableId>().map_err(|_| TransactionError::parse_error(line))?;
    if !(1..=NUM_VARIABLES).contains(&var) {
        return Err(TransactionError::invalid_variable(var));
    }
    Ok(var)
}

fn parse_site(line: &str, token: &str) -> TransactionResult<SiteId> {
    let site = token.parse::<SiteId>().map_err(|_| TransactionError::parse_error(line))?;
    if !(1..=NUM_SITES).contains(&site) {
        return Err(TransactionError::invalid_site(site));
    }
    Ok(site)
}

/// Strips a `//` comment (if any) and surrounding whitespace; returns
/// `None` for lines that are blank afterward.
pub fn strip_comment(raw: &str) -> Option<&str> {
    let line = match raw.find("//") {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
