// The history log: one CSV row per book and per election, appended after
// each count.

use std::fs::OpenOptions;

use serde::Serialize;

use crate::rcv::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub date: String,
    pub contest: String,
    pub book_id: String,
    pub title: String,
    pub author: String,
    /// Number of rounds in which the book was still running.
    pub rounds: u32,
    pub eliminated_in_round: Option<u32>,
    /// Tally of the book in the last round it took part in.
    pub final_votes: u64,
    pub winner: bool,
}

pub fn history_rows(
    date: &str,
    contest: &str,
    poll: &Poll,
    result: &ElectionResult,
) -> Vec<HistoryRow> {
    let mut rows: Vec<HistoryRow> = Vec::new();
    for book in poll.books().iter() {
        let candidate = match book.candidate() {
            Ok(c) => c,
            Err(e) => {
                warn!("history_rows: skipping {:?}: {}", book.id, e);
                continue;
            }
        };
        rows.push(HistoryRow {
            date: date.to_string(),
            contest: contest.to_string(),
            book_id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            rounds: result.rounds_survived(&candidate),
            eliminated_in_round: result.elimination_round(&candidate),
            final_votes: result.final_tally(&candidate).unwrap_or(0),
            winner: result.winner() == Some(&candidate),
        });
    }
    rows
}

/// Appends the rows to the log. The header is only written when the log is
/// new or empty.
pub fn append_history(path: &str, rows: &[HistoryRow]) -> RcvResult<()> {
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(WritingOutputSnafu { path })?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for row in rows.iter() {
        wtr.serialize(row).context(WritingHistorySnafu { path })?;
    }
    wtr.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}
