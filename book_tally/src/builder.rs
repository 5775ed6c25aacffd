use crate::config::*;

/// A builder for adding votes from plain strings.
///
/// ```
/// use book_tally::builder::Builder;
/// use book_tally::VoteRules;
///
/// let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)?
///     .candidates(&["dune".to_string(), "emma".to_string()])?;
///
/// builder.add_vote_simple(&["dune".to_string(), "".to_string(), "emma".to_string()])?;
/// builder.add_vote(&["emma".to_string()], 2)?;
///
/// let result = builder.tabulate()?;
/// assert_eq!(result.winner().map(|c| c.as_str()), Some("emma"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Builder {
    pub(crate) _rules: VoteRules,
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &VoteRules) -> Result<Builder, BallotError> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    /// Sets the candidates. The ballots added so far are dropped.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, BallotError> {
        let candidates = cands
            .iter()
            .map(|name| Candidate::new(name.as_str()))
            .collect::<Result<Vec<Candidate>, BallotError>>()?;
        Ok(Builder {
            _rules: self._rules,
            _candidates: candidates,
            _ballots: Vec::new(),
        })
    }

    /// Adds a vote to the builder.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_vote_simple(&mut self, candidates: &[String]) -> Result<(), BallotError> {
        self.add_vote(candidates, 1)
    }

    /// Adds the same vote `count` times.
    ///
    /// candidates: the list of choices made by the voter, in order. Blank
    /// choices are skipped ranks. Names that are not candidates are kept and
    /// will be reported when tabulating.
    pub fn add_vote(&mut self, candidates: &[String], count: u32) -> Result<(), BallotError> {
        let choices = candidates
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Candidate::new(s.as_str()))
            .collect::<Result<Vec<Candidate>, BallotError>>()?;
        let ballot = Ballot::new(choices)?;
        for _ in 0..count {
            self._ballots.push(ballot.clone());
        }
        Ok(())
    }

    pub fn add_ballot(&mut self, ballot: &Ballot) {
        self._ballots.push(ballot.clone());
    }

    pub fn tabulate(&self) -> Result<ElectionResult, TabulationError> {
        crate::tabulate_with_rules(&self._candidates, &self._ballots, &self._rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builder_reports_unknown_names_when_tabulating() {
        let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["a", "b"]))
            .unwrap();
        builder.add_vote_simple(&names(&["a"])).unwrap();
        builder.add_vote_simple(&names(&["zzz", "b"])).unwrap();
        let err = builder.tabulate().unwrap_err();
        assert_eq!(
            err,
            TabulationError::InvalidBallot {
                ballot: 1,
                candidate: "zzz".to_string()
            }
        );
    }

    #[test]
    fn builder_rejects_duplicates() {
        let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["a", "b"]))
            .unwrap();
        assert!(builder.add_vote_simple(&names(&["a", "b", "a"])).is_err());
        assert!(builder._ballots.is_empty());
    }

    #[test]
    fn builder_with_single_elimination() {
        let rules = VoteRules {
            elimination_algorithm: EliminationAlgorithm::Single,
            tiebreak_mode: TieBreakMode::UseCandidateOrder,
        };
        let mut builder = Builder::new(&rules)
            .unwrap()
            .candidates(&names(&["x", "y", "z"]))
            .unwrap();
        builder.add_vote(&names(&["x", "y", "z"]), 3).unwrap();
        builder.add_vote(&names(&["y", "z", "x"]), 2).unwrap();
        builder.add_vote(&names(&["z", "y", "x"]), 2).unwrap();
        let res = builder.tabulate().unwrap();
        assert_eq!(res.total_ballots, 7);
        assert_eq!(res.winner().map(|c| c.as_str()), Some("y"));
    }

    #[test]
    fn builder_accepts_prepared_ballots() {
        let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["dune", "emma"]))
            .unwrap();
        let ballot = Ballot::from_names(&["emma", "dune"]).unwrap();
        builder.add_ballot(&ballot);
        builder.add_ballot(&ballot);
        builder.add_vote_simple(&names(&["dune"])).unwrap();
        let res = builder.tabulate().unwrap();
        assert_eq!(res.total_ballots, 3);
        assert_eq!(res.winner().map(|c| c.as_str()), Some("emma"));
    }
}
