// ********* Input data structures ***********

use snafu::prelude::*;
use std::collections::HashSet;
use std::fmt::Display;

/// Errors raised while building candidates and ballots.
#[derive(Debug, Snafu, Eq, PartialEq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum BallotError {
    #[snafu(display("a candidate identifier may not be empty"))]
    EmptyCandidate {},
    #[snafu(display("candidate {candidate} is ranked more than once on the same ballot"))]
    DuplicateChoice { candidate: String },
}

/// Builds the identifier of a book from its title and author.
///
/// Spaces become underscores and the result is lower-cased, so that
/// `"Dune"` by `"Frank Herbert"` becomes `dune_frank_herbert`.
pub fn book_id(title: &str, author: &str) -> String {
    format!("{}_{}", title.trim(), author.trim())
        .replace(' ', "_")
        .to_lowercase()
}

/// A candidate of the election, identified by a non-empty string.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct Candidate(String);

impl Candidate {
    /// Creates a candidate. Surrounding whitespace is dropped and the
    /// remaining identifier must not be empty.
    pub fn new(id: impl Into<String>) -> Result<Candidate, BallotError> {
        let id: String = id.into();
        let trimmed = id.trim();
        ensure!(!trimmed.is_empty(), EmptyCandidateSnafu {});
        Ok(Candidate(trimmed.to_string()))
    }

    /// The candidate for a book, using the identifier scheme of [book_id].
    pub fn from_title_author(title: &str, author: &str) -> Result<Candidate, BallotError> {
        ensure!(!title.trim().is_empty(), EmptyCandidateSnafu {});
        Candidate::new(book_id(title, author))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// The ranking of one voter, most preferred candidate first.
///
/// A ballot never names the same candidate twice. It does not need to rank
/// every candidate: the candidates that are left out are never a choice on
/// this ballot, and an empty ballot is exhausted from the first round.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct Ballot {
    choices: Vec<Candidate>,
}

impl Ballot {
    pub fn new(choices: Vec<Candidate>) -> Result<Ballot, BallotError> {
        let mut seen: HashSet<&Candidate> = HashSet::new();
        for c in choices.iter() {
            ensure!(
                seen.insert(c),
                DuplicateChoiceSnafu {
                    candidate: c.as_str()
                }
            );
        }
        Ok(Ballot { choices })
    }

    /// Convenience constructor from candidate identifiers.
    ///
    /// ```
    /// use book_tally::Ballot;
    ///
    /// let ballot = Ballot::from_names(&["dune_frank_herbert", "emma_jane_austen"])?;
    /// assert_eq!(ballot.len(), 2);
    /// assert!(Ballot::from_names(&["emma", "emma"]).is_err());
    /// # Ok::<(), book_tally::BallotError>(())
    /// ```
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Ballot, BallotError> {
        let choices = names
            .iter()
            .map(|n| Candidate::new(n.as_ref()))
            .collect::<Result<Vec<Candidate>, BallotError>>()?;
        Ballot::new(choices)
    }

    pub fn choices(&self) -> &[Candidate] {
        &self.choices
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// The same ranking with one candidate struck out.
    pub fn without(&self, candidate: &Candidate) -> Ballot {
        Ballot {
            choices: self
                .choices
                .iter()
                .filter(|c| *c != candidate)
                .cloned()
                .collect(),
        }
    }
}

// ******** Output data structures *********

/// Where the ballots of an eliminated candidate went.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationStats {
    pub candidate: Candidate,
    /// Ballots moved to the next active choice, in candidate order.
    pub transfers: Vec<(Candidate, u64)>,
    /// Ballots with no active choice left after the elimination.
    pub exhausted: u64,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Round {
    /// Starts at 1.
    pub round: u32,
    pub active: Vec<Candidate>,
    /// One entry per active candidate, in candidate order.
    pub tally: Vec<(Candidate, u64)>,
    pub valid_ballots: u64,
    pub exhausted_ballots: u64,
    /// Winning vote threshold
    pub threshold: u64,
    pub eliminated: Vec<Candidate>,
    pub transfers: Vec<EliminationStats>,
    pub elected: Option<Candidate>,
    /// True when the eliminated candidate had to be picked among several
    /// candidates tied at the lowest tally.
    pub tiebreak: bool,
}

impl Round {
    pub fn votes_for(&self, candidate: &Candidate) -> Option<u64> {
        self.tally
            .iter()
            .find(|(c, _)| c == candidate)
            .map(|(_, count)| *count)
    }

    /// Share of the valid ballots held by a candidate, in percent.
    pub fn vote_share(&self, candidate: &Candidate) -> Option<f64> {
        let count = self.votes_for(candidate)?;
        if self.valid_ballots == 0 {
            Some(0.0)
        } else {
            Some(100.0 * count as f64 / self.valid_ballots as f64)
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Outcome {
    Winner(Candidate),
    /// No majority, and every remaining candidate sits at the lowest tally.
    Tie(Vec<Candidate>),
    /// The election had no candidate at all.
    NoCandidates,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    pub rounds: Vec<Round>,
    pub total_ballots: u64,
    pub outcome: Outcome,
}

impl ElectionResult {
    pub fn winner(&self) -> Option<&Candidate> {
        match &self.outcome {
            Outcome::Winner(c) => Some(c),
            _ => None,
        }
    }

    pub fn tied(&self) -> Option<&[Candidate]> {
        match &self.outcome {
            Outcome::Tie(cs) => Some(cs.as_slice()),
            _ => None,
        }
    }

    /// The round in which a candidate got eliminated, if it did.
    pub fn elimination_round(&self, candidate: &Candidate) -> Option<u32> {
        self.rounds
            .iter()
            .find(|r| r.eliminated.contains(candidate))
            .map(|r| r.round)
    }

    /// Number of rounds in which a candidate was still running.
    pub fn rounds_survived(&self, candidate: &Candidate) -> u32 {
        self.rounds
            .iter()
            .filter(|r| r.active.contains(candidate))
            .count() as u32
    }

    /// The tally of a candidate in the last round it took part in.
    pub fn final_tally(&self, candidate: &Candidate) -> Option<u64> {
        self.rounds
            .iter()
            .rev()
            .find_map(|r| r.votes_for(candidate))
    }

    /// The vote threshold of the last round.
    pub fn threshold(&self) -> u64 {
        self.rounds.last().map(|r| r.threshold).unwrap_or(0)
    }
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Debug, Snafu, Eq, PartialEq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum TabulationError {
    /// A ballot ranks a name that is not in the candidate set.
    #[snafu(display(
        "ballot at index {ballot} ranks {candidate}, which is not a candidate of this election"
    ))]
    InvalidBallot { ballot: usize, candidate: String },
}

// ********* Configuration **********

/// How to pick the single candidate to eliminate when several candidates
/// share the lowest tally. Only used by [EliminationAlgorithm::Single].
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// The tied candidate that comes last in the candidate order goes first.
    UseCandidateOrder,
    /// The tied candidate that the fewest ballots rank right after their
    /// current choice goes first. Remaining ties use the candidate order.
    NextPreference,
    /// A permutation that is hard to guess in advance but reproducible
    /// for a given seed. It relies on a cryptographic hash of the candidate
    /// identifiers.
    Random(u32),
}

/// The elimination algorithm to apply.
///
/// - AllTiedLowest eliminates every candidate that holds the lowest tally
/// in the same round. No tie-break is ever needed.
///
/// - Single eliminates one candidate per round, breaking ties between the
/// lowest candidates with the [TieBreakMode] of the rules.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum EliminationAlgorithm {
    AllTiedLowest,
    Single,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRules {
    pub elimination_algorithm: EliminationAlgorithm,
    pub tiebreak_mode: TieBreakMode,
}

impl VoteRules {
    pub const DEFAULT_RULES: VoteRules = VoteRules {
        elimination_algorithm: EliminationAlgorithm::AllTiedLowest,
        tiebreak_mode: TieBreakMode::UseCandidateOrder,
    };
}

impl Default for VoteRules {
    fn default() -> Self {
        VoteRules::DEFAULT_RULES
    }
}
