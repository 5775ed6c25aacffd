// Primitives for reading CSV files.

use std::fs::File;

use crate::rcv::{
    io_common::{assemble_ballot, make_default_id, ParsedBallot},
    *,
};

pub fn read_csv_ballots(path: &str, source: &BallotSource) -> RcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(path);

    let voter_idx_o = source.voter_column_index()?;
    let choices_start_col = source.first_vote_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(path, source)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let voter = voter_idx_o
            .and_then(|voter_idx| line.get(voter_idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| default_id(lineno));

        let choices: Vec<String> = line
            .iter()
            .skip(choices_start_col)
            .map(|s| s.trim().to_string())
            .collect();
        debug!("read_csv_ballots: lineno: {:?} row: {:?}", lineno, &choices);

        match assemble_ballot(voter, choices) {
            Some(pb) => res.push(pb),
            None => warn!("{}: skipping line {} without any choice", path, lineno),
        }
    }
    Ok(res)
}

fn get_records(path: &str, source: &BallotSource) -> RcvResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = source.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    for _ in 0..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
