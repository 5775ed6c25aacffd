use std::path::Path;

/// A ranking read from a ballot file, before the choices get matched with
/// the nominated books.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub voter: String,
    pub choices: Vec<String>,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Names the voters of anonymous ballots after the file and the line.
pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Builds the ballot of one row. Rows without any choice are skipped.
pub fn assemble_ballot(voter: String, choices: Vec<String>) -> Option<ParsedBallot> {
    if choices.iter().all(|c| c.is_empty()) {
        return None;
    }
    Some(ParsedBallot { voter, choices })
}
