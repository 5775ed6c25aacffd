use clap::Parser;

/// Ranked-choice elections for book clubs.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the election: books, votes, ballot files and rules.
    /// See the manual of the book_tally crate for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, bookvote will
    /// check that the tabulated summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path or 'stdout') Where to write the round-by-round JSON summary.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) A ballot file, read in addition to the ballot files of the configuration.
    /// Without a configuration, the books are inferred from the ballots.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) If specified, one row per book is appended to this CSV history log.
    #[clap(long, value_parser)]
    pub history: Option<String>,

    // Other arguments
    /// Logs the tallies and intermediate steps of the count.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
