// Nominations and votes of one book club election.

use log::{debug, info, warn};
use snafu::prelude::*;

use crate::config::*;

#[derive(Debug, Snafu, Eq, PartialEq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum PollError {
    #[snafu(display("the voter name may not be empty"))]
    EmptyVoterName {},
    #[snafu(display("at least 2 books are needed to vote, {count} nominated"))]
    NotEnoughBooks { count: usize },
    #[snafu(display("{choice} is not a nominated book"))]
    UnknownBook { choice: String },
    #[snafu(display("invalid ballot: {source}"))]
    InvalidBallot { source: BallotError },
}

/// A nominated book.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    pub page_count: u32,
}

impl Book {
    /// A book with its identifier derived from the title and the author.
    pub fn new(title: &str, author: &str) -> Book {
        Book {
            id: book_id(title, author),
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            description: String::new(),
            genre: String::new(),
            page_count: 0,
        }
    }

    /// How the book is shown to the voters: `<title> by <author>`.
    pub fn label(&self) -> String {
        if self.author.is_empty() {
            self.title.clone()
        } else {
            format!("{} by {}", self.title, self.author)
        }
    }

    pub fn candidate(&self) -> Result<Candidate, BallotError> {
        Candidate::new(self.id.as_str())
    }
}

/// The state of an election while it is running: the nominated books, in
/// nomination order, and one ballot per voter.
///
/// ```
/// use book_tally::{Book, Poll, VoteRules};
///
/// let mut poll = Poll::new();
/// poll.nominate(Book::new("Dune", "Frank Herbert"));
/// poll.nominate(Book::new("Emma", "Jane Austen"));
///
/// poll.cast_vote("ana", &["Dune by Frank Herbert", "emma_jane_austen"])?;
/// poll.cast_vote("bo", &["dune_frank_herbert"])?;
///
/// let result = poll.tabulate(&VoteRules::DEFAULT_RULES)?;
/// assert_eq!(result.winner().map(|c| c.as_str()), Some("dune_frank_herbert"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Poll {
    books: Vec<Book>,
    votes: Vec<(String, Ballot)>,
}

impl Poll {
    pub fn new() -> Poll {
        Poll::default()
    }

    /// Adds a book to the nominations. Returns false if a book with the same
    /// identifier is already nominated.
    pub fn nominate(&mut self, book: Book) -> bool {
        if self.books.iter().any(|b| b.id == book.id) {
            debug!("nominate: {} is already nominated", book.id);
            return false;
        }
        info!("Nominated {}", book.label());
        self.books.push(book);
        true
    }

    /// Removes a book from the nominations and strikes it from every ballot.
    pub fn withdraw(&mut self, book_id: &str) -> Option<Book> {
        let idx = self.books.iter().position(|b| b.id == book_id)?;
        let book = self.books.remove(idx);
        if let Ok(c) = book.candidate() {
            for (_, ballot) in self.votes.iter_mut() {
                *ballot = ballot.without(&c);
            }
        }
        info!("Withdrew {}", book.label());
        Some(book)
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book(&self, book_id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == book_id)
    }

    /// Finds a book from its identifier or its label.
    pub fn resolve(&self, choice: &str) -> Option<&Book> {
        let choice = choice.trim();
        self.book(choice)
            .or_else(|| self.books.iter().find(|b| b.label() == choice))
    }

    /// Records the ranking of a voter. A voter who already voted gets the
    /// previous ballot replaced.
    ///
    /// Choices are book identifiers or labels. Blank choices are skipped.
    pub fn cast_vote<S: AsRef<str>>(&mut self, voter: &str, choices: &[S]) -> Result<(), PollError> {
        let voter = voter.trim();
        ensure!(!voter.is_empty(), EmptyVoterNameSnafu {});
        ensure!(
            self.books.len() >= 2,
            NotEnoughBooksSnafu {
                count: self.books.len()
            }
        );

        let mut candidates: Vec<Candidate> = Vec::new();
        for choice in choices.iter().map(|c| c.as_ref()) {
            if choice.trim().is_empty() {
                continue;
            }
            let book = self
                .resolve(choice)
                .context(UnknownBookSnafu { choice })?;
            candidates.push(book.candidate().context(InvalidBallotSnafu {})?);
        }
        let ballot = Ballot::new(candidates).context(InvalidBallotSnafu {})?;

        match self.votes.iter_mut().find(|(v, _)| v == voter) {
            Some((_, previous)) => {
                warn!("Replacing the previous vote of {}", voter);
                *previous = ballot;
            }
            None => {
                debug!("cast_vote: {} ranked {} books", voter, ballot.len());
                self.votes.push((voter.to_string(), ballot));
            }
        }
        Ok(())
    }

    /// Removes the vote of a voter. Returns false if that voter did not vote.
    pub fn retract_vote(&mut self, voter: &str) -> bool {
        let voter = voter.trim();
        let before = self.votes.len();
        self.votes.retain(|(v, _)| v != voter);
        before != self.votes.len()
    }

    pub fn voters(&self) -> Vec<&str> {
        self.votes.iter().map(|(v, _)| v.as_str()).collect()
    }

    pub fn ballot(&self, voter: &str) -> Option<&Ballot> {
        self.votes
            .iter()
            .find(|(v, _)| v == voter.trim())
            .map(|(_, b)| b)
    }

    /// Counts the votes, with the nominated books as candidates.
    pub fn tabulate(&self, rules: &VoteRules) -> Result<ElectionResult, TabulationError> {
        let candidates: Vec<Candidate> = self
            .books
            .iter()
            .filter_map(|b| b.candidate().ok())
            .collect();
        let ballots: Vec<Ballot> = self.votes.iter().map(|(_, b)| b.clone()).collect();
        crate::tabulate_with_rules(&candidates, &ballots, rules)
    }
}
