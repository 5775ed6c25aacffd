/*!
Instant-runoff tabulation for book club elections.

The entry point is [tabulate]: give it the nominated candidates and the
ranked ballots, and it returns every round of the count along with the
outcome of the election.

```
use book_tally::{tabulate, Ballot, Candidate, Outcome};

let candidates: Vec<Candidate> = ["dune", "emma"]
    .iter()
    .map(|n| Candidate::new(*n))
    .collect::<Result<_, _>>()?;
let ballots = vec![
    Ballot::from_names(&["dune", "emma"])?,
    Ballot::from_names(&["dune"])?,
    Ballot::from_names(&["emma"])?,
];

let result = tabulate(&candidates, &ballots)?;
assert_eq!(result.outcome, Outcome::Winner(candidates[0].clone()));
assert_eq!(result.rounds.len(), 1);
# Ok::<(), Box<dyn std::error::Error>>(())
```

See the [manual] for the rules applied during the count.
*/

pub mod builder;
mod config;
pub mod manual;
mod poll;

use log::{debug, info};
use snafu::prelude::*;

use std::{
    collections::{HashMap, HashSet},
    ops::{Add, AddAssign},
};

pub use crate::config::*;
pub use crate::poll::*;

// **** Private structures ****

type RoundId = u32;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

// Identical rankings are counted once, with a multiplicity.
#[derive(Eq, PartialEq, Debug, Clone)]
struct VoteInternal {
    ranks: Vec<CandidateId>,
    count: VoteCount,
}

impl VoteInternal {
    /// The position and the identity of the highest ranked candidate that
    /// is still running, or None if the ballot is exhausted.
    fn first_active(&self, still_valid: &HashSet<CandidateId>) -> Option<(usize, CandidateId)> {
        self.ranks
            .iter()
            .enumerate()
            .find(|(_, cid)| still_valid.contains(cid))
            .map(|(idx, cid)| (idx, *cid))
    }
}

// The candidates of the election, in candidate order. The id of a candidate
// is its position in this order.
struct Registry {
    names: Vec<Candidate>,
    ids: HashMap<Candidate, CandidateId>,
}

impl Registry {
    // Duplicated candidates are collapsed, the first occurence wins.
    fn new(candidates: &[Candidate]) -> Registry {
        let mut names: Vec<Candidate> = Vec::new();
        let mut ids: HashMap<Candidate, CandidateId> = HashMap::new();
        for c in candidates.iter() {
            if !ids.contains_key(c) {
                ids.insert(c.clone(), CandidateId(names.len() as u32));
                names.push(c.clone());
            }
        }
        Registry { names, ids }
    }

    fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn all_ids(&self) -> Vec<CandidateId> {
        (0..self.names.len() as u32).map(CandidateId).collect()
    }

    fn name(&self, cid: CandidateId) -> Candidate {
        self.names[cid.0 as usize].clone()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum TiebreakSituation {
    Clean,
    TiebreakOccured,
}

// An eliminated candidate, the transfers of its votes, and the exhausted votes.
type TransferStats = (CandidateId, Vec<(CandidateId, VoteCount)>, VoteCount);

#[derive(Eq, PartialEq, Debug, Clone)]
enum RoundOutcome {
    Elected(CandidateId),
    Eliminated(Vec<CandidateId>),
    Deadlock,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundStatistics {
    tally: Vec<(CandidateId, VoteCount)>,
    exhausted: VoteCount,
    // Winning vote threshold
    vote_threshold: VoteCount,
    /// For every eliminated candidate, the transfers of its votes to each
    /// candidate, and the number of exhausted votes.
    elimination_stats: Vec<TransferStats>,
    tiebreak: TiebreakSituation,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundResult {
    stats: RoundStatistics,
    outcome: RoundOutcome,
}

/// Runs the count with the default rules: every candidate at the lowest
/// tally is eliminated in the same round.
///
/// Arguments:
/// * `candidates` the candidates of this election. Duplicates are ignored.
/// * `ballots` the ballots to count. Every name they rank must be one of the
/// candidates.
pub fn tabulate(
    candidates: &[Candidate],
    ballots: &[Ballot],
) -> Result<ElectionResult, TabulationError> {
    tabulate_with_rules(candidates, ballots, &VoteRules::DEFAULT_RULES)
}

/// Runs the voting algorithm with the given rules for the given ballots.
pub fn tabulate_with_rules(
    candidates: &[Candidate],
    ballots: &[Ballot],
    rules: &VoteRules,
) -> Result<ElectionResult, TabulationError> {
    info!(
        "Processing {:?} ballots, {:?} candidates, rules: {:?}",
        ballots.len(),
        candidates.len(),
        rules
    );

    let registry = Registry::new(candidates);
    let votes = checks(ballots, &registry)?;
    let total_ballots = ballots.len() as u64;

    if registry.is_empty() {
        info!("No candidates, nothing to count");
        return Ok(ElectionResult {
            rounds: Vec::new(),
            total_ballots,
            outcome: Outcome::NoCandidates,
        });
    }

    info!("Processing {:?} aggregated votes", votes.len());
    for (idx, name) in registry.names.iter().enumerate() {
        info!("Candidate: {}: {}", idx + 1, name);
    }

    // The candidates that are still running, in candidate order.
    let mut cur_candidates: Vec<CandidateId> = registry.all_ids();
    let mut rounds: Vec<Round> = Vec::new();

    loop {
        let round_id = rounds.len() as RoundId + 1;
        debug!(
            "Round id: {:?} cur_candidates: {:?}",
            round_id, cur_candidates
        );
        let round_res = run_one_round(&votes, rules, &cur_candidates, &registry, round_id);
        debug!("Round id: {:?} stats: {:?}", round_id, round_res.stats);

        rounds.push(round_result_to_stat(
            &round_res,
            round_id,
            &cur_candidates,
            &registry,
        ));

        match round_res.outcome {
            RoundOutcome::Elected(cid) => {
                info!("Round {}: {} is elected", round_id, registry.name(cid));
                return Ok(ElectionResult {
                    rounds,
                    total_ballots,
                    outcome: Outcome::Winner(registry.name(cid)),
                });
            }
            RoundOutcome::Deadlock => {
                let tied: Vec<Candidate> = cur_candidates
                    .iter()
                    .map(|cid| registry.name(*cid))
                    .collect();
                info!("Round {}: deadlock between {:?}", round_id, tied);
                return Ok(ElectionResult {
                    rounds,
                    total_ballots,
                    outcome: Outcome::Tie(tied),
                });
            }
            RoundOutcome::Eliminated(eliminated) => {
                let survivors: Vec<CandidateId> = cur_candidates
                    .iter()
                    .filter(|cid| !eliminated.contains(cid))
                    .cloned()
                    .collect();
                // Invariant: the number of candidates decreased, and some are left.
                debug_assert!(
                    !survivors.is_empty() && survivors.len() < cur_candidates.len(),
                    "The number of candidates did not decrease properly: {:?} -> {:?}",
                    cur_candidates,
                    survivors
                );
                cur_candidates = survivors;
            }
        }
    }
}

// Translates the ballots to internal ids and aggregates identical rankings.
fn checks(ballots: &[Ballot], registry: &Registry) -> Result<Vec<VoteInternal>, TabulationError> {
    debug!("checks: ballots: {:?}", ballots.len());
    let mut counts: HashMap<Vec<CandidateId>, VoteCount> = HashMap::new();
    // Keeps the aggregated votes in the order of first appearance.
    let mut signatures: Vec<Vec<CandidateId>> = Vec::new();
    for (idx, ballot) in ballots.iter().enumerate() {
        let mut ranks: Vec<CandidateId> = Vec::with_capacity(ballot.len());
        for c in ballot.choices() {
            let cid = registry.ids.get(c).cloned().context(InvalidBallotSnafu {
                ballot: idx,
                candidate: c.as_str(),
            })?;
            ranks.push(cid);
        }
        match counts.get_mut(&ranks) {
            Some(count) => *count += VoteCount(1),
            None => {
                counts.insert(ranks.clone(), VoteCount(1));
                signatures.push(ranks);
            }
        }
    }
    Ok(signatures
        .into_iter()
        .map(|ranks| {
            let count = counts.get(&ranks).cloned().unwrap_or(VoteCount::EMPTY);
            VoteInternal { ranks, count }
        })
        .collect())
}

fn get_threshold(valid: VoteCount) -> VoteCount {
    if valid == VoteCount::EMPTY {
        VoteCount::EMPTY
    } else {
        VoteCount((valid.0 / 2) + 1)
    }
}

// The tally of every running candidate, in candidate order, and the number
// of exhausted votes.
fn compute_tally(
    votes: &[VoteInternal],
    candidates: &[CandidateId],
) -> (Vec<(CandidateId, VoteCount)>, VoteCount) {
    let still_valid: HashSet<CandidateId> = candidates.iter().cloned().collect();
    // Initialize the tally with all the candidates to capture the ones that
    // do not even have a vote.
    let mut counts: HashMap<CandidateId, VoteCount> = candidates
        .iter()
        .map(|cid| (*cid, VoteCount::EMPTY))
        .collect();
    let mut exhausted = VoteCount::EMPTY;
    for v in votes.iter() {
        match v.first_active(&still_valid) {
            Some((_, cid)) => {
                if let Some(vc) = counts.get_mut(&cid) {
                    *vc += v.count;
                }
            }
            None => {
                exhausted += v.count;
            }
        }
    }
    let tally = candidates
        .iter()
        .map(|cid| (*cid, counts.get(cid).cloned().unwrap_or(VoteCount::EMPTY)))
        .collect();
    (tally, exhausted)
}

fn run_one_round(
    votes: &[VoteInternal],
    rules: &VoteRules,
    candidates: &[CandidateId],
    registry: &Registry,
    num_round: RoundId,
) -> RoundResult {
    let (tally, exhausted) = compute_tally(votes, candidates);
    debug!("run_one_round: tally: {:?} exhausted: {:?}", tally, exhausted);

    let valid: VoteCount = tally.iter().map(|(_, vc)| *vc).sum();
    let vote_threshold = get_threshold(valid);
    debug!("run_one_round: vote_threshold: {:?}", vote_threshold);

    let stats = |elimination_stats: Vec<TransferStats>, tiebreak: TiebreakSituation| RoundStatistics {
        tally: tally.clone(),
        exhausted,
        vote_threshold,
        elimination_stats,
        tiebreak,
    };

    // A strict majority of the valid votes. At most one candidate can hold it.
    let majority = tally
        .iter()
        .find(|(_, vc)| *vc > VoteCount::EMPTY && *vc >= vote_threshold);
    if let Some((cid, count)) = majority {
        debug!(
            "run_one_round: {:?} has count {:?}, marking as winner",
            cid, count
        );
        return RoundResult {
            stats: stats(Vec::new(), TiebreakSituation::Clean),
            outcome: RoundOutcome::Elected(*cid),
        };
    }

    // Only one candidate. It is the winner by any standard.
    if let [cid] = candidates {
        debug!("run_one_round: only one candidate, directly winning: {:?}", cid);
        return RoundResult {
            stats: stats(Vec::new(), TiebreakSituation::Clean),
            outcome: RoundOutcome::Elected(*cid),
        };
    }

    let lowest = find_lowest_candidates(&tally);
    if lowest.len() == candidates.len() {
        debug!(
            "run_one_round: all the candidates are tied at the lowest tally: {:?}",
            lowest
        );
        return RoundResult {
            stats: stats(Vec::new(), TiebreakSituation::Clean),
            outcome: RoundOutcome::Deadlock,
        };
    }

    let (eliminated, tiebreak) = match rules.elimination_algorithm {
        EliminationAlgorithm::AllTiedLowest => (lowest, TiebreakSituation::Clean),
        EliminationAlgorithm::Single if lowest.len() == 1 => (lowest, TiebreakSituation::Clean),
        EliminationAlgorithm::Single => {
            let loser = find_eliminated_candidate_single(
                &lowest,
                votes,
                candidates,
                rules.tiebreak_mode,
                registry,
                num_round,
            );
            (vec![loser], TiebreakSituation::TiebreakOccured)
        }
    };
    debug!(
        "run_one_round: eliminated: {:?} tiebreak: {:?}",
        eliminated, tiebreak
    );

    let elimination_stats = compute_transfers(votes, candidates, &eliminated);
    RoundResult {
        stats: stats(elimination_stats, tiebreak),
        outcome: RoundOutcome::Eliminated(eliminated),
    }
}

// All the candidates sharing the smallest tally, in candidate order.
fn find_lowest_candidates(tally: &[(CandidateId, VoteCount)]) -> Vec<CandidateId> {
    let min_count = match tally.iter().map(|(_, vc)| *vc).min() {
        Some(x) => x,
        None => return Vec::new(),
    };
    tally
        .iter()
        .filter(|(_, vc)| *vc == min_count)
        .map(|(cid, _)| *cid)
        .collect()
}

// Statistics about transfers:
// For every eliminated candidate, keep the vote transfer, or the exhausted vote.
fn compute_transfers(
    votes: &[VoteInternal],
    candidates: &[CandidateId],
    eliminated: &[CandidateId],
) -> Vec<TransferStats> {
    let still_valid: HashSet<CandidateId> = candidates.iter().cloned().collect();
    let remaining: HashSet<CandidateId> = candidates
        .iter()
        .filter(|cid| !eliminated.contains(cid))
        .cloned()
        .collect();

    let mut elimination_stats: HashMap<CandidateId, (HashMap<CandidateId, VoteCount>, VoteCount)> =
        eliminated
            .iter()
            .map(|cid| (*cid, (HashMap::new(), VoteCount::EMPTY)))
            .collect();

    for v in votes.iter() {
        let old_first = match v.first_active(&still_valid) {
            Some((_, cid)) => cid,
            None => continue,
        };
        if let Some(e) = elimination_stats.get_mut(&old_first) {
            match v.first_active(&remaining) {
                Some((_, new_first)) => {
                    let e2 = e.0.entry(new_first).or_insert(VoteCount::EMPTY);
                    *e2 += v.count;
                }
                None => {
                    // Ballot is now exhausted. Record the exhausted vote.
                    e.1 += v.count;
                }
            }
        }
    }

    eliminated
        .iter()
        .map(|cid| {
            let (transfers, exhausted) = elimination_stats
                .remove(cid)
                .unwrap_or((HashMap::new(), VoteCount::EMPTY));
            let mut transfers: Vec<(CandidateId, VoteCount)> = transfers.into_iter().collect();
            transfers.sort_by_key(|(cid, _)| *cid);
            (*cid, transfers, exhausted)
        })
        .collect()
}

// Picks the one candidate to remove among several candidates tied at the
// lowest tally.
fn find_eliminated_candidate_single(
    tied: &[CandidateId],
    votes: &[VoteInternal],
    candidates: &[CandidateId],
    tiebreak: TieBreakMode,
    registry: &Registry,
    num_round: RoundId,
) -> CandidateId {
    let sorted_candidates: Vec<CandidateId> = match tiebreak {
        TieBreakMode::UseCandidateOrder => {
            // For loser selection, the selection is done in reverse order.
            let mut res = tied.to_vec();
            res.sort();
            res.reverse();
            debug!(
                "find_eliminated_candidate_single: elimination queue using candidate order: {:?}",
                res
            );
            res
        }
        TieBreakMode::NextPreference => {
            let next_counts = next_preference_counts(votes, candidates, tied);
            debug!(
                "find_eliminated_candidate_single: next preference counts: {:?}",
                next_counts
            );
            let mut res = tied.to_vec();
            // Fewest next preferences first, then reverse candidate order.
            res.sort_by_key(|cid| {
                let c = next_counts.get(cid).cloned().unwrap_or(VoteCount::EMPTY);
                (c, std::cmp::Reverse(*cid))
            });
            res
        }
        TieBreakMode::Random(seed) => {
            let cand_with_names: Vec<(CandidateId, String)> = tied
                .iter()
                .map(|cid| (*cid, registry.name(*cid).as_str().to_string()))
                .collect();
            let res = candidate_permutation_crypto(&cand_with_names, seed, num_round);
            debug!(
                "find_eliminated_candidate_single: elimination queue using random seed {}: {:?}",
                seed, res
            );
            res
        }
    };
    // The tied set is never empty when a tiebreak is needed.
    sorted_candidates[0]
}

// For every tied candidate, how many ballots rank it next among the tied
// candidates, after their current choice.
fn next_preference_counts(
    votes: &[VoteInternal],
    candidates: &[CandidateId],
    tied: &[CandidateId],
) -> HashMap<CandidateId, VoteCount> {
    let still_valid: HashSet<CandidateId> = candidates.iter().cloned().collect();
    let tied_set: HashSet<CandidateId> = tied.iter().cloned().collect();
    let mut counts: HashMap<CandidateId, VoteCount> =
        tied.iter().map(|cid| (*cid, VoteCount::EMPTY)).collect();
    for v in votes.iter() {
        if let Some((idx, _)) = v.first_active(&still_valid) {
            let next = v.ranks[idx + 1..].iter().find(|cid| tied_set.contains(cid));
            if let Some(cid) = next {
                if let Some(vc) = counts.get_mut(cid) {
                    *vc += v.count;
                }
            }
        }
    }
    counts
}

/// Generates a "random" permutation of the candidates. Random in this context means hard to guess in advance.
/// This uses a cryptographic algorithm that is resilient to collisions.
fn candidate_permutation_crypto(
    candidates: &[(CandidateId, String)],
    seed: u32,
    num_round: u32,
) -> Vec<CandidateId> {
    let mut data: Vec<(CandidateId, String)> = candidates
        .iter()
        .map(|(cid, name)| {
            let key = format!("{:08}{:08}{}", seed, num_round, name);
            (*cid, sha256::digest(key.as_str()))
        })
        .collect();
    data.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    data.iter().map(|p| p.0).collect()
}

fn round_result_to_stat(
    round_res: &RoundResult,
    round_id: RoundId,
    candidates: &[CandidateId],
    registry: &Registry,
) -> Round {
    let stats = &round_res.stats;
    let (eliminated, elected): (Vec<Candidate>, Option<Candidate>) = match &round_res.outcome {
        RoundOutcome::Eliminated(cids) => (
            cids.iter().map(|cid| registry.name(*cid)).collect(),
            None,
        ),
        RoundOutcome::Elected(cid) => (Vec::new(), Some(registry.name(*cid))),
        RoundOutcome::Deadlock => (Vec::new(), None),
    };
    let transfers = stats
        .elimination_stats
        .iter()
        .map(|(cid, transfers, exhausted)| EliminationStats {
            candidate: registry.name(*cid),
            transfers: transfers
                .iter()
                .map(|(t_cid, t_count)| (registry.name(*t_cid), t_count.0))
                .collect(),
            exhausted: exhausted.0,
        })
        .collect();
    Round {
        round: round_id,
        active: candidates.iter().map(|cid| registry.name(*cid)).collect(),
        tally: stats
            .tally
            .iter()
            .map(|(cid, vc)| (registry.name(*cid), vc.0))
            .collect(),
        valid_ballots: stats.tally.iter().map(|(_, vc)| vc.0).sum(),
        exhausted_ballots: stats.exhausted.0,
        threshold: stats.vote_threshold.0,
        eliminated,
        transfers,
        elected,
        tiebreak: stats.tiebreak == TiebreakSituation::TiebreakOccured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cands(names: &[&str]) -> Vec<Candidate> {
        names.iter().map(|n| Candidate::new(*n).unwrap()).collect()
    }

    fn cand(name: &str) -> Candidate {
        Candidate::new(name).unwrap()
    }

    fn ballots(groups: &[(usize, &[&str])]) -> Vec<Ballot> {
        let mut res = Vec::new();
        for (count, names) in groups.iter() {
            for _ in 0..*count {
                res.push(Ballot::from_names(names).unwrap());
            }
        }
        res
    }

    fn scenario_a() -> (Vec<Candidate>, Vec<Ballot>) {
        (
            cands(&["X", "Y", "Z"]),
            ballots(&[(3, &["X", "Y", "Z"]), (2, &["Y", "Z", "X"]), (2, &["Z", "Y", "X"])]),
        )
    }

    #[test]
    fn empty_candidates() {
        init();
        let res = tabulate(&[], &[]).unwrap();
        assert!(res.rounds.is_empty());
        assert_eq!(res.outcome, Outcome::NoCandidates);
        assert_eq!(res.winner(), None);
    }

    #[test]
    fn empty_candidates_with_empty_ballots() {
        init();
        let res = tabulate(&[], &[Ballot::default(), Ballot::default()]).unwrap();
        assert!(res.rounds.is_empty());
        assert_eq!(res.total_ballots, 2);
        assert_eq!(res.outcome, Outcome::NoCandidates);
    }

    #[test]
    fn single_candidate_wins_immediately() {
        init();
        let cs = cands(&["solo"]);
        let res = tabulate(&cs, &ballots(&[(2, &["solo"])])).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert!(res.rounds[0].eliminated.is_empty());
        assert_eq!(res.outcome, Outcome::Winner(cand("solo")));
    }

    #[test]
    fn single_candidate_without_ballots() {
        init();
        let cs = cands(&["solo"]);
        let res = tabulate(&cs, &[]).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.rounds[0].valid_ballots, 0);
        assert_eq!(res.rounds[0].threshold, 0);
        assert_eq!(res.winner(), Some(&cand("solo")));
    }

    #[test]
    fn unknown_candidate_is_rejected() {
        init();
        let cs = cands(&["A", "B"]);
        let bs = ballots(&[(1, &["A"]), (1, &["B", "C"])]);
        let err = tabulate(&cs, &bs).unwrap_err();
        assert_eq!(
            err,
            TabulationError::InvalidBallot {
                ballot: 1,
                candidate: "C".to_string()
            }
        );
    }

    #[test]
    fn unknown_candidate_with_empty_candidate_set() {
        init();
        let err = tabulate(&[], &ballots(&[(1, &["A"])])).unwrap_err();
        assert!(matches!(err, TabulationError::InvalidBallot { ballot: 0, .. }));
    }

    #[test]
    fn scenario_a_eliminates_all_tied_lowest() {
        init();
        let (cs, bs) = scenario_a();
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds.len(), 2);

        let r1 = &res.rounds[0];
        assert_eq!(
            r1.tally,
            vec![(cand("X"), 3), (cand("Y"), 2), (cand("Z"), 2)]
        );
        assert_eq!(r1.valid_ballots, 7);
        assert_eq!(r1.threshold, 4);
        assert_eq!(r1.eliminated, cands(&["Y", "Z"]));
        assert!(!r1.tiebreak);
        assert_eq!(
            r1.transfers,
            vec![
                EliminationStats {
                    candidate: cand("Y"),
                    transfers: vec![(cand("X"), 2)],
                    exhausted: 0
                },
                EliminationStats {
                    candidate: cand("Z"),
                    transfers: vec![(cand("X"), 2)],
                    exhausted: 0
                },
            ]
        );

        let r2 = &res.rounds[1];
        assert_eq!(r2.active, cands(&["X"]));
        assert_eq!(r2.tally, vec![(cand("X"), 7)]);
        assert_eq!(r2.elected, Some(cand("X")));
        assert_eq!(res.outcome, Outcome::Winner(cand("X")));
        assert_eq!(res.elimination_round(&cand("Y")), Some(1));
        assert_eq!(res.rounds_survived(&cand("X")), 2);
        assert_eq!(res.final_tally(&cand("Z")), Some(2));
    }

    #[test]
    fn scenario_b_majority_in_first_round() {
        init();
        let cs = cands(&["A", "B"]);
        let bs = ballots(&[(3, &["A"]), (2, &["B"])]);
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.rounds[0].threshold, 3);
        assert_eq!(res.winner(), Some(&cand("A")));
    }

    #[test]
    fn scenario_c_deadlock() {
        init();
        let cs = cands(&["A", "B"]);
        let bs = ballots(&[(2, &["A"]), (2, &["B"])]);
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert!(res.rounds[0].eliminated.is_empty());
        assert_eq!(res.rounds[0].elected, None);
        assert_eq!(res.outcome, Outcome::Tie(cands(&["A", "B"])));
        assert_eq!(res.tied(), Some(cands(&["A", "B"]).as_slice()));
    }

    #[test]
    fn exhausted_ballots_do_not_count_toward_majority() {
        init();
        // Round 1: A=2 B=2 C=1, C is eliminated and its ballot exhausts.
        // Round 2: A=2 B=2 over 4 valid ballots: deadlock.
        let cs = cands(&["A", "B", "C"]);
        let bs = ballots(&[(2, &["A"]), (2, &["B"]), (1, &["C"])]);
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds.len(), 2);
        assert_eq!(res.rounds[0].transfers[0].exhausted, 1);
        assert_eq!(res.rounds[1].valid_ballots, 4);
        assert_eq!(res.rounds[1].exhausted_ballots, 1);
        assert_eq!(res.outcome, Outcome::Tie(cands(&["A", "B"])));
    }

    #[test]
    fn exhausted_ballots_are_reported_per_round() {
        init();
        let cs = cands(&["A", "B", "C"]);
        let bs = ballots(&[(3, &["A"]), (2, &["B"]), (1, &["C"]), (1, &["C", "A"])]);
        let res = tabulate(&cs, &bs).unwrap();
        // C holds 2 votes: round 1 is A=3 B=2 C=2, B and C go together.
        assert_eq!(res.rounds[0].eliminated, cands(&["B", "C"]));
        assert_eq!(res.rounds[1].tally, vec![(cand("A"), 4)]);
        assert_eq!(res.rounds[1].exhausted_ballots, 3);
        assert_eq!(res.winner(), Some(&cand("A")));
    }

    #[test]
    fn all_ballots_exhausted_is_a_tie() {
        init();
        let cs = cands(&["A", "B", "C"]);
        let bs = vec![Ballot::default(), Ballot::default()];
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.rounds[0].exhausted_ballots, 2);
        assert_eq!(res.outcome, Outcome::Tie(cs));
    }

    #[test]
    fn candidates_without_votes_are_eliminated_first() {
        init();
        let cs = cands(&["A", "B", "C", "D"]);
        let bs = ballots(&[(2, &["A", "B"]), (1, &["B", "A"]), (1, &["C", "A"])]);
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds[0].tally.len(), 4);
        assert_eq!(res.rounds[0].eliminated, cands(&["D"]));
        assert_eq!(res.rounds[1].eliminated, cands(&["B", "C"]));
        assert_eq!(res.winner(), Some(&cand("A")));
        assert_eq!(res.rounds.len(), 3);
    }

    #[test]
    fn duplicated_candidates_are_collapsed() {
        init();
        let cs = cands(&["A", "B", "A"]);
        let bs = ballots(&[(2, &["A"]), (1, &["B"])]);
        let res = tabulate(&cs, &bs).unwrap();
        assert_eq!(res.rounds[0].active, cands(&["A", "B"]));
        assert_eq!(res.winner(), Some(&cand("A")));
    }

    #[test]
    fn rounds_are_bounded_by_candidates() {
        init();
        let cs = cands(&["A", "B", "C", "D", "E"]);
        let bs = ballots(&[
            (5, &["A", "B"]),
            (4, &["B", "C"]),
            (3, &["C", "D"]),
            (2, &["D", "E"]),
            (1, &["E", "A"]),
        ]);
        for rules in [
            VoteRules::DEFAULT_RULES,
            VoteRules {
                elimination_algorithm: EliminationAlgorithm::Single,
                tiebreak_mode: TieBreakMode::UseCandidateOrder,
            },
        ] {
            let res = tabulate_with_rules(&cs, &bs, &rules).unwrap();
            assert!(res.rounds.len() <= cs.len());
            assert!(res.winner().is_some());
        }
    }

    #[test]
    fn tabulation_is_idempotent() {
        init();
        let (cs, bs) = scenario_a();
        let first = tabulate(&cs, &bs).unwrap();
        let second = tabulate(&cs, &bs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn transfers_account_for_every_ballot() {
        init();
        let cs = cands(&["A", "B", "C", "D"]);
        let bs = ballots(&[
            (5, &["A", "B"]),
            (4, &["B"]),
            (1, &["C", "B"]),
            (1, &["C", "A"]),
            (1, &["C"]),
        ]);
        let res = tabulate(&cs, &bs).unwrap();
        let r1 = &res.rounds[0];
        assert_eq!(r1.eliminated, cands(&["D"]));
        let r2 = &res.rounds[1];
        assert_eq!(r2.eliminated, cands(&["C"]));
        let c_stats = &r2.transfers[0];
        let moved: u64 = c_stats.transfers.iter().map(|(_, n)| *n).sum();
        assert_eq!(moved + c_stats.exhausted, r2.votes_for(&cand("C")).unwrap());
        assert_eq!(c_stats.transfers, vec![(cand("A"), 1), (cand("B"), 1)]);
        assert_eq!(c_stats.exhausted, 1);
        // Round 3: A=6 B=5 over 11 valid ballots.
        assert_eq!(res.rounds[2].threshold, 6);
        assert_eq!(res.rounds[2].exhausted_ballots, 1);
        assert_eq!(res.winner(), Some(&cand("A")));
    }

    #[test]
    fn single_elimination_uses_candidate_order() {
        init();
        let (cs, bs) = scenario_a();
        let rules = VoteRules {
            elimination_algorithm: EliminationAlgorithm::Single,
            tiebreak_mode: TieBreakMode::UseCandidateOrder,
        };
        let res = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        // Z comes last and goes first; its ballots move to Y, which then wins 4 to 3.
        assert_eq!(res.rounds[0].eliminated, cands(&["Z"]));
        assert!(res.rounds[0].tiebreak);
        assert_eq!(res.rounds[1].tally, vec![(cand("X"), 3), (cand("Y"), 4)]);
        assert_eq!(res.winner(), Some(&cand("Y")));
    }

    #[test]
    fn single_elimination_uses_next_preference() {
        init();
        // Y and Z are tied at 2. Z is ranked next on 2 ballots, Y on 5.
        let (cs, bs) = scenario_a();
        let rules = VoteRules {
            elimination_algorithm: EliminationAlgorithm::Single,
            tiebreak_mode: TieBreakMode::NextPreference,
        };
        let res = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        assert_eq!(res.rounds[0].eliminated, cands(&["Z"]));

        // Reverse the candidate order: the next preferences still decide.
        let cs_rev = cands(&["Z", "Y", "X"]);
        let res_rev = tabulate_with_rules(&cs_rev, &bs, &rules).unwrap();
        assert_eq!(res_rev.rounds[0].eliminated, cands(&["Z"]));
        assert_eq!(res_rev.winner(), Some(&cand("Y")));
    }

    #[test]
    fn next_preference_falls_back_to_candidate_order() {
        init();
        let cs = cands(&["A", "B", "C"]);
        let bs = ballots(&[(3, &["A"]), (1, &["B"]), (1, &["C"])]);
        let rules = VoteRules {
            elimination_algorithm: EliminationAlgorithm::Single,
            tiebreak_mode: TieBreakMode::NextPreference,
        };
        let res = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        // A has 3 of 5: majority in the first round.
        assert_eq!(res.rounds.len(), 1);

        let bs = ballots(&[(2, &["A"]), (1, &["B"]), (1, &["C"])]);
        let res = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        assert_eq!(res.rounds[0].eliminated, cands(&["C"]));
    }

    #[test]
    fn random_tiebreak_is_reproducible() {
        init();
        let (cs, bs) = scenario_a();
        let rules = VoteRules {
            elimination_algorithm: EliminationAlgorithm::Single,
            tiebreak_mode: TieBreakMode::Random(42),
        };
        let first = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        let second = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.rounds[0].eliminated.len(), 1);
        assert!(cands(&["Y", "Z"]).contains(&first.rounds[0].eliminated[0]));
    }

    #[test]
    fn single_elimination_still_detects_deadlock() {
        init();
        let cs = cands(&["A", "B", "C"]);
        let bs = ballots(&[(1, &["A"]), (1, &["B"]), (1, &["C"])]);
        let rules = VoteRules {
            elimination_algorithm: EliminationAlgorithm::Single,
            tiebreak_mode: TieBreakMode::NextPreference,
        };
        let res = tabulate_with_rules(&cs, &bs, &rules).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.outcome, Outcome::Tie(cs));
    }

    #[test]
    fn permutation_depends_on_round() {
        let cands: Vec<(CandidateId, String)> = (0..6)
            .map(|i| (CandidateId(i), format!("book_{}", i)))
            .collect();
        let p1 = candidate_permutation_crypto(&cands, 7, 1);
        assert_eq!(p1, candidate_permutation_crypto(&cands, 7, 1));
        let mut sorted = p1.clone();
        sorted.sort();
        assert_eq!(sorted, (0..6).map(CandidateId).collect::<Vec<_>>());
    }
}
