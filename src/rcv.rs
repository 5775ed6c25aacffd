use log::{debug, info, warn};

use book_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::rcv::config_reader::*;
use crate::rcv::io_common::ParsedBallot;

pub mod config_reader;
pub mod history;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RcvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook {path} has no worksheet named {name}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Unexpected cell content on line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a column or row index (number or letters), found {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Unknown ballot provider {provider:?} (expected csv or xlsx)"))]
    UnknownProvider { provider: String },
    #[snafu(display("Nothing to count: provide a configuration or a ballot file"))]
    NothingToCount {},
    #[snafu(display("Invalid vote from {voter}: {source}"))]
    InvalidVote { source: PollError, voter: String },
    #[snafu(display("Tabulation failed: {source}"))]
    Tabulation { source: TabulationError },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing history log {path}"))]
    WritingHistory { source: csv::Error, path: String },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RcvResult<T> = Result<T, RcvError>;

/// What to count and where to put the results. Built from the command line.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionRequest {
    pub config_path: Option<String>,
    pub input_path: Option<String>,
    pub input_type: Option<String>,
    pub excel_worksheet_name: Option<String>,
    pub out_path: Option<String>,
    pub reference_path: Option<String>,
    pub history_path: Option<String>,
}

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct ElectionOutput {
    pub poll: Poll,
    pub result: ElectionResult,
    pub summary: JSValue,
}

fn label_of(poll: &Poll, candidate: &Candidate) -> String {
    poll.book(candidate.as_str())
        .map(|b| b.label())
        .unwrap_or_else(|| candidate.to_string())
}

fn result_stats_to_json(rs: &ElectionResult, poll: &Poll) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.rounds.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (c, count) in round_stat.tally.iter() {
            tally.insert(label_of(poll, c), json!(count.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        for elim_stats in round_stat.transfers.iter() {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            for (c, count) in elim_stats.transfers.iter() {
                transfers.insert(label_of(poll, c), json!(count.to_string()));
            }
            if elim_stats.exhausted > 0 {
                transfers.insert(
                    "exhausted".to_string(),
                    json!(elim_stats.exhausted.to_string()),
                );
            }
            tally_results.push(json!({
                "eliminated": label_of(poll, &elim_stats.candidate),
                "transfers": transfers
            }));
        }
        if let Some(winner) = &round_stat.elected {
            tally_results.push(json!({
                "elected": label_of(poll, winner),
                "transfers": {}
            }));
        }

        let js = json!({"round": round_stat.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn outcome_to_json(rs: &ElectionResult, poll: &Poll) -> JSValue {
    match &rs.outcome {
        Outcome::Winner(c) => json!({ "winner": label_of(poll, c) }),
        Outcome::Tie(cs) => {
            let names: Vec<String> = cs.iter().map(|c| label_of(poll, c)).collect();
            json!({ "tie": names })
        }
        Outcome::NoCandidates => json!({ "noCandidates": true }),
    }
}

fn build_summary_js(settings: &OutputSettings, rv: &ElectionResult, poll: &Poll) -> JSValue {
    let c = OutputConfig {
        contest: settings.contest_name.clone(),
        date: settings.contest_date.clone(),
        threshold: Some(rv.threshold().to_string()),
    };
    json!({
        "config": c,
        "results": result_stats_to_json(rv, poll),
        "outcome": outcome_to_json(rv, poll) })
}

fn print_round_summary(rv: &ElectionResult, poll: &Poll) {
    info!(
        "{} ballots, {} books, {} rounds",
        rv.total_ballots,
        poll.books().len(),
        rv.rounds.len()
    );
    for r in rv.rounds.iter() {
        info!("Round {} (winning threshold: {})", r.round, r.threshold);
        for (c, count) in r.tally.iter() {
            let status = if r.elected.as_ref() == Some(c) {
                " -> elected".to_string()
            } else if let Some(es) = r.transfers.iter().find(|es| es.candidate == *c) {
                let mut moves: Vec<String> = es
                    .transfers
                    .iter()
                    .map(|(t, n)| format!("{} to {}", n, label_of(poll, t)))
                    .collect();
                if es.exhausted > 0 {
                    moves.push(format!("{} exhausted", es.exhausted));
                }
                format!(" -> eliminated: {}", moves.join(", "))
            } else {
                String::new()
            };
            info!("{:>7} {}{}", count, label_of(poll, c), status);
        }
        if r.exhausted_ballots > 0 {
            info!("{:>7} exhausted ballots", r.exhausted_ballots);
        }
    }
    match &rv.outcome {
        Outcome::Winner(c) => info!("Winner: {}", label_of(poll, c)),
        Outcome::Tie(cs) => {
            let names: Vec<String> = cs.iter().map(|c| label_of(poll, c)).collect();
            warn!("No winner, tie between: {}", names.join(", "))
        }
        Outcome::NoCandidates => warn!("No book was nominated"),
    }
}

fn read_ranking_data(path: &Path, source: &BallotSource) -> RcvResult<Vec<ParsedBallot>> {
    let p = path.display().to_string();
    info!("Attempting to read ballot file {:?}", p);
    match source.provider.as_str() {
        "csv" => io_csv::read_csv_ballots(&p, source),
        "xlsx" => io_xlsx::read_xlsx_ballots(&p, source),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

// The books of the election. Without any nomination, every distinct choice
// found on the ballots becomes a book.
fn build_poll(books: &[BookEntry], ballots: &[ParsedBallot]) -> RcvResult<Poll> {
    let mut poll = Poll::new();
    if books.is_empty() {
        info!("No books in the configuration, inferring them from the ballots");
        for pb in ballots.iter() {
            for choice in pb.choices.iter().map(|c| c.trim()) {
                if !choice.is_empty() && poll.resolve(choice).is_none() {
                    poll.nominate(Book {
                        id: choice.to_string(),
                        title: choice.to_string(),
                        author: String::new(),
                        description: String::new(),
                        genre: String::new(),
                        page_count: 0,
                    });
                }
            }
        }
    } else {
        for entry in books.iter() {
            let book = entry.to_book();
            if !poll.nominate(book) {
                warn!("Ignoring duplicate nomination of {:?}", entry.title);
            }
        }
    }

    for pb in ballots.iter() {
        debug!("Choices for ballot {:?}: {:?}", pb.voter, pb.choices);
        poll.cast_vote(&pb.voter, pb.choices.as_slice())
            .context(InvalidVoteSnafu {
                voter: pb.voter.as_str(),
            })?;
    }
    Ok(poll)
}

fn write_summary(out: &str, summary: &JSValue) -> RcvResult<()> {
    let pretty_js_stats = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if out == "stdout" {
        println!("{}", pretty_js_stats);
    } else {
        fs::write(out, pretty_js_stats).context(WritingOutputSnafu { path: out })?;
        info!("Summary written to {}", out);
    }
    Ok(())
}

fn check_reference(reference_path: &str, summary: &JSValue) -> RcvResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("summary: {:?}", summary_ref);
    if summary_ref != *summary {
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        let pretty_js_stats = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        return ReferenceMismatchSnafu {}.fail();
    }
    info!("The summary matches the reference {}", reference_path);
    Ok(())
}

pub fn run_election(request: &ElectionRequest) -> RcvResult<ElectionOutput> {
    let (config, root_p): (ElectionConfig, PathBuf) = match &request.config_path {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {
                    path: config_path.as_str(),
                })?
                .to_path_buf();
            (config, root_p)
        }
        None => {
            ensure!(request.input_path.is_some(), NothingToCountSnafu {});
            (ElectionConfig::default(), PathBuf::new())
        }
    };
    debug!("config: {:?}", config);

    // Validate the rules:
    let rules = config.rules.vote_rules()?;

    let mut sources: Vec<(PathBuf, BallotSource)> = config
        .ballot_sources
        .iter()
        .map(|s| (root_p.join(&s.file_path), s.clone()))
        .collect();
    if let Some(input) = &request.input_path {
        let provider = request
            .input_type
            .clone()
            .unwrap_or_else(|| "csv".to_string());
        let mut source = BallotSource::new(&provider, input);
        source.excel_worksheet_name = request.excel_worksheet_name.clone();
        sources.push((PathBuf::from(input), source));
    }

    let mut data: Vec<ParsedBallot> = config
        .votes
        .iter()
        .map(|(voter, choices)| ParsedBallot {
            voter: voter.clone(),
            choices: choices.clone(),
        })
        .collect();
    for (path, source) in sources.iter() {
        let mut file_data = read_ranking_data(path, source)?;
        info!("Read {} ballots from {}", file_data.len(), path.display());
        data.append(&mut file_data);
    }

    let poll = build_poll(&config.books, &data)?;
    let result = poll.tabulate(&rules).context(TabulationSnafu {})?;
    print_round_summary(&result, &poll);

    // Assemble the final json
    let summary = build_summary_js(&config.output_settings, &result, &poll);

    if let Some(out) = &request.out_path {
        write_summary(out, &summary)?;
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &request.reference_path {
        check_reference(reference_path, &summary)?;
    }

    if let Some(history_path) = &request.history_path {
        let date = config
            .output_settings
            .contest_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        let rows = history::history_rows(
            &date,
            &config.output_settings.contest_name,
            &poll,
            &result,
        );
        history::append_history(history_path, &rows)?;
        info!("Appended {} rows to {}", rows.len(), history_path);
    }

    Ok(ElectionOutput {
        poll,
        result,
        summary,
    })
}
