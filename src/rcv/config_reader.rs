use crate::rcv::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "contestName", default)]
    pub contest_name: String,
    /// Date of the meeting, as written in the history log. Today if missing.
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub threshold: Option<String>,
}

/// A nominated book, as written in the election file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BookEntry {
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub id: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "pageCount")]
    pub page_count: Option<u32>,
}

impl BookEntry {
    pub fn to_book(&self) -> Book {
        let mut book = Book::new(&self.title, &self.author);
        if let Some(id) = self.id.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            book.id = id.to_string();
        }
        book.description = self.description.clone().unwrap_or_default();
        book.genre = self.genre.clone().unwrap_or_default();
        book.page_count = self.page_count.unwrap_or(0);
        book
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "voterColumnIndex")]
    _voter_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl BallotSource {
    /// A source with the default layout: voter in the first column, choices
    /// from the second column, one header row.
    pub fn new(provider: &str, file_path: &str) -> BallotSource {
        BallotSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _voter_column_index: None,
            _first_vote_column_index: None,
            _first_vote_row_index: None,
            excel_worksheet_name: None,
        }
    }

    /// 0-based column of the voter names. `0` in the file means that the
    /// ballots carry no voter name.
    pub fn voter_column_index(&self) -> RcvResult<Option<usize>> {
        match &self._voter_column_index {
            None => Ok(Some(0)),
            Some(js) => Ok(read_js_int(js)?.checked_sub(1)),
        }
    }

    /// 0-based column of the first choice.
    pub fn first_vote_column_index(&self) -> RcvResult<usize> {
        read_index(&self._first_vote_column_index, 2)
    }

    /// 0-based row of the first ballot.
    pub fn first_vote_row_index(&self) -> RcvResult<usize> {
        read_index(&self._first_vote_row_index, 2)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ElectionRules {
    #[serde(rename = "eliminationMode")]
    pub elimination_mode: Option<String>,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<JSValue>,
}

impl ElectionRules {
    pub fn vote_rules(&self) -> RcvResult<VoteRules> {
        let elimination_algorithm = match self.elimination_mode.as_deref() {
            None | Some("allTiedLowest") => EliminationAlgorithm::AllTiedLowest,
            Some("single") => EliminationAlgorithm::Single,
            Some(x) => whatever!("Unknown elimination mode {:?}", x),
        };
        let tiebreak_mode = match self.tiebreak_mode.as_deref() {
            None | Some("useCandidateOrder") => TieBreakMode::UseCandidateOrder,
            Some("nextPreference") => TieBreakMode::NextPreference,
            Some("random") => {
                let seed_js = self
                    .random_seed
                    .as_ref()
                    .whatever_context("Missing randomSeed for the random tiebreak mode")?;
                let seed = read_js_int(seed_js)?;
                let seed = u32::try_from(seed)
                    .with_whatever_context(|_| format!("randomSeed {} is too large", seed))?;
                TieBreakMode::Random(seed)
            }
            Some(x) => whatever!("Unknown tiebreak mode {:?}", x),
        };
        if elimination_algorithm == EliminationAlgorithm::AllTiedLowest
            && tiebreak_mode != TieBreakMode::UseCandidateOrder
        {
            warn!("The tiebreak mode is only used with the single elimination mode, ignoring it");
        }
        Ok(VoteRules {
            elimination_algorithm,
            tiebreak_mode,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub books: Vec<BookEntry>,
    /// Rankings entered directly in the file, by voter name.
    #[serde(default)]
    pub votes: BTreeMap<String, Vec<String>>,
    #[serde(rename = "ballotSources", default)]
    pub ballot_sources: Vec<BallotSource>,
    #[serde(default)]
    pub rules: ElectionRules,
}

pub fn read_config(path: &str) -> RcvResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    info!("Read config file {}", path);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

pub fn read_summary(path: &str) -> RcvResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

// Converts a 1-based index (default when missing) into a 0-based one.
fn read_index(x: &Option<JSValue>, default: usize) -> RcvResult<usize> {
    match x {
        None => Ok(default - 1),
        Some(js) => read_js_int(js)?
            .checked_sub(1)
            .context(ParsingJsonNumberSnafu {
                value: js.to_string(),
            }),
    }
}

/// Reads a 1-based index: a number, a string of digits or Excel-style
/// column letters (A is 1, AA is 27).
fn read_js_int(x: &JSValue) -> RcvResult<usize> {
    match x {
        JSValue::Number(n) => n.as_u64().map(|x| x as usize).context(ParsingJsonNumberSnafu {
            value: x.to_string(),
        }),
        JSValue::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => s
            .to_ascii_uppercase()
            .bytes()
            .try_fold(0usize, |acc, b| {
                acc.checked_mul(26)?.checked_add((b - b'A') as usize + 1)
            })
            .context(ParsingJsonNumberSnafu { value: s.as_str() }),
        JSValue::String(s) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu { value: s.as_str() }),
        _ => ParsingJsonNumberSnafu {
            value: x.to_string(),
        }
        .fail(),
    }
}
