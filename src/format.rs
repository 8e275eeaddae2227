// Tabular output for read results and `dump`.
//
// Grounded on the original prototype's `print_result`/`PrettyTable`
// usage in `model/Operation.py` (same header layout: `Transaction`,
// `Site`, the variable name; and `Site Name`, `x1`..`x20` for dump) and
// on the teacher pack's use of `prettytable` for bordered CLI tables.

use std::io::{self, Write};

use prettytable::{Cell, Row, Table};

use crate::common::{SiteId, TransactionId, VariableId, NUM_VARIABLES};
use crate::transaction::site::Site;

fn row_of(cells: Vec<String>) -> Row {
    Row::new(cells.into_iter().map(|c| Cell::new(&c)).collect())
}

/// Prints a single-row table for a successful read.
pub fn print_read_result(
    out: &mut dyn Write,
    trans_id: &TransactionId,
    site_id: SiteId,
    var: VariableId,
    value: i64,
) -> io::Result<()> {
    let mut table = Table::new();
    table.set_titles(row_of(vec!["Transaction".into(), "Site".into(), format!("x{var}")]));
    table.add_row(row_of(vec![trans_id.clone(), site_id.to_string(), value.to_string()]));
    write!(out, "{table}")
}

/// Prints the `dump` table: one row per site, one column per variable,
/// blank where the site doesn't hold that variable. Dump always shows
/// the committed value regardless of accessibility.
pub fn print_dump(out: &mut dyn Write, sites: &[Site]) -> io::Result<()> {
    let mut table = Table::new();
    let mut titles = vec!["Site".to_string()];
    titles.extend((1..=NUM_VARIABLES).map(|i| format!("x{i}")));
    table.set_titles(row_of(titles));

    for site in sites {
        let mut cells = vec![format!(
            "site {} ({})",
            site.site_id,
            if site.up { "up" } else { "down" }
        )];
        for value in site.data_manager.echo() {
            cells.push(value.map(|v| v.to_string()).unwrap_or_default());
        }
        table.add_row(row_of(cells));
    }
    write!(out, "{table}")
}
