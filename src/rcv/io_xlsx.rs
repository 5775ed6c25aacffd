// Reads ballots from Excel workbooks, such as the responses exported by
// online forms.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::rcv::{
    io_common::{assemble_ballot, make_default_id, ParsedBallot},
    *,
};

pub fn read_xlsx_ballots(path: &str, source: &BallotSource) -> RcvResult<Vec<ParsedBallot>> {
    let wrange = get_range(path, source)?;
    read_range_ballots(path, &wrange, source)
}

// calamine only keeps the used part of the sheet: rows and columns are
// shifted back to sheet coordinates with the start of the range.
fn read_range_ballots(
    path: &str,
    wrange: &Range<DataType>,
    source: &BallotSource,
) -> RcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(path);

    let voter_idx_o = source.voter_column_index()?;
    let choices_start_col = source.first_vote_column_index()?;
    let first_row = source.first_vote_row_index()?;

    let (row_offset, col_offset) = wrange
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    debug!(
        "read_range_ballots: range starts at row {} column {}",
        row_offset, col_offset
    );

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let sheet_row = idx + row_offset;
        if sheet_row < first_row {
            continue;
        }
        let lineno = sheet_row + 1;
        let voter_cell = voter_idx_o
            .and_then(|voter_idx| voter_idx.checked_sub(col_offset))
            .and_then(|voter_idx| row.get(voter_idx));
        let voter = match voter_cell {
            Some(cell) => read_cell(cell, lineno)?,
            None => String::new(),
        };
        let voter = if voter.is_empty() {
            default_id(lineno)
        } else {
            voter
        };

        let choices = row
            .iter()
            .skip(choices_start_col.saturating_sub(col_offset))
            .map(|cell| read_cell(cell, lineno))
            .collect::<RcvResult<Vec<String>>>()?;
        debug!("read_range_ballots: lineno: {:?} row: {:?}", lineno, &choices);

        match assemble_ballot(voter, choices) {
            Some(pb) => res.push(pb),
            None => warn!("{}: skipping row {} without any choice", path, lineno),
        }
    }
    Ok(res)
}

fn read_cell(cell: &DataType, lineno: usize) -> RcvResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Empty => Ok(String::new()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) => Ok(f.to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

fn get_range(path: &str, source: &BallotSource) -> RcvResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &source.excel_worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    match &source.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path }),
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path }),
    }
}
