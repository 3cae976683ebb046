//! Per-insight helpful / not-helpful votes for one anonymous identity.
//!
//! At most one vote row exists per `(insight, user)` pair. Voting the same
//! type twice removes the vote; voting the other type replaces it with a
//! delete followed by an insert, so an interrupted switch can leave the pair
//! without a vote but never with two.
//!
//! A transition for an insight that already has one in flight is rejected.
//! Transitions for different insights run independently.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{FeedbackError, StoreError};
use crate::model::{InsightId, VoteType};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum VoteState {
  #[default]
  NoVote,
  Up,
  Down,
}

impl VoteState {
  pub fn vote_type(&self) -> Option<VoteType> {
    match self {
      VoteState::NoVote => None,
      VoteState::Up => Some(VoteType::Up),
      VoteState::Down => Some(VoteType::Down),
    }
  }
}

impl From<VoteType> for VoteState {
  fn from(vote: VoteType) -> Self {
    match vote {
      VoteType::Up => VoteState::Up,
      VoteType::Down => VoteState::Down,
    }
  }
}

impl From<Option<VoteType>> for VoteState {
  fn from(vote: Option<VoteType>) -> Self {
    vote.map(VoteState::from).unwrap_or_default()
  }
}

/// Store work needed to move from one state to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// No vote yet: insert one.
  Insert(VoteType),
  /// Same type again: delete the existing row.
  Remove,
  /// Opposite type: delete, then insert.
  Switch(VoteType),
}

pub fn plan(current: VoteState, vote: VoteType) -> Transition {
  match current.vote_type() {
    None => Transition::Insert(vote),
    Some(existing) if existing == vote => Transition::Remove,
    Some(_) => Transition::Switch(vote),
  }
}

/// Point-in-time copy of vote and busy state, for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackSnapshot {
  votes: HashMap<InsightId, VoteType>,
  busy: HashSet<InsightId>,
}

impl FeedbackSnapshot {
  pub fn state(&self, insight_id: InsightId) -> VoteState {
    self.votes.get(&insight_id).copied().into()
  }

  pub fn is_busy(&self, insight_id: InsightId) -> bool {
    self.busy.contains(&insight_id)
  }

  pub fn vote_count(&self) -> usize {
    self.votes.len()
  }
}

#[derive(Debug, Default)]
struct Ledger {
  votes: HashMap<InsightId, VoteType>,
  busy: HashSet<InsightId>,
  // Ids transitioned locally; a later bulk load must not overwrite them.
  touched: HashSet<InsightId>,
}

impl Ledger {
  fn state(&self, insight_id: InsightId) -> VoteState {
    self.votes.get(&insight_id).copied().into()
  }

  fn commit(&mut self, insight_id: InsightId, state: VoteState) {
    match state.vote_type() {
      Some(vote) => self.votes.insert(insight_id, vote),
      None => self.votes.remove(&insight_id),
    };
    self.touched.insert(insight_id);
  }
}

/// Clears the busy flag for an insight when the transition ends, however it ends.
struct BusyGuard<'a> {
  ledger: &'a Mutex<Ledger>,
  insight_id: InsightId,
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    lock(self.ledger).busy.remove(&self.insight_id);
  }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
  ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the local vote map and busy guard for one anonymous identity.
pub struct FeedbackMachine {
  store: Arc<dyn RecordStore>,
  user_id: String,
  ledger: Mutex<Ledger>,
}

impl FeedbackMachine {
  pub fn new(store: Arc<dyn RecordStore>, user_id: impl Into<String>) -> Self {
    Self { store, user_id: user_id.into(), ledger: Mutex::new(Ledger::default()) }
  }

  pub fn state(&self, insight_id: InsightId) -> VoteState {
    lock(&self.ledger).state(insight_id)
  }

  pub fn is_busy(&self, insight_id: InsightId) -> bool {
    lock(&self.ledger).busy.contains(&insight_id)
  }

  pub fn snapshot(&self) -> FeedbackSnapshot {
    let ledger = lock(&self.ledger);
    FeedbackSnapshot { votes: ledger.votes.clone(), busy: ledger.busy.clone() }
  }

  /// Fetch this identity's existing votes and merge them into the local map.
  ///
  /// Insights voted on locally since the machine was created, or with a vote
  /// in flight, keep their local state. Returns how many remote rows applied.
  pub async fn load(&self) -> Result<usize, StoreError> {
    let rows = self.store.fetch_feedback(&self.user_id).await?;

    let mut ledger = lock(&self.ledger);
    let mut applied = 0;
    for row in rows {
      if ledger.touched.contains(&row.insight_id) || ledger.busy.contains(&row.insight_id) {
        debug!(insight_id = %row.insight_id, "Keeping local vote over fetched one");
        continue;
      }
      ledger.votes.insert(row.insight_id, row.vote_type);
      applied += 1;
    }

    info!(user_id = %self.user_id, applied, "Loaded existing feedback");
    Ok(applied)
  }

  /// Cast `vote` on an insight and return the resulting state.
  ///
  /// On failure the local state is left as it was, except when a switch
  /// removed the old vote but could not insert the new one: the insight
  /// then reads as [`VoteState::NoVote`], matching the store.
  pub async fn vote(&self, insight_id: InsightId, vote: VoteType) -> Result<VoteState, FeedbackError> {
    let current = {
      let mut ledger = lock(&self.ledger);
      if !ledger.busy.insert(insight_id) {
        warn!(%insight_id, "Vote rejected, another is in flight");
        return Err(FeedbackError::Busy(insight_id));
      }
      ledger.state(insight_id)
    };
    let _guard = BusyGuard { ledger: &self.ledger, insight_id };

    let transition = plan(current, vote);
    debug!(%insight_id, ?current, ?transition, "Applying vote transition");

    let outcome = match transition {
      Transition::Remove => {
        self.store.delete_feedback(insight_id, &self.user_id).await.map(|_| VoteState::NoVote)
      }
      // A stale local view may hide an existing row, so inserts always clear first.
      Transition::Insert(cast) | Transition::Switch(cast) => {
        match self.store.delete_feedback(insight_id, &self.user_id).await {
          Ok(()) => match self.store.insert_feedback(insight_id, &self.user_id, cast).await {
            Ok(()) => Ok(cast.into()),
            Err(source) if current != VoteState::NoVote => {
              warn!(%insight_id, error = %source, "Vote switch interrupted after removal");
              lock(&self.ledger).commit(insight_id, VoteState::NoVote);
              return Err(FeedbackError::SwitchInterrupted { insight_id, source });
            }
            Err(source) => Err(source),
          },
          Err(source) => Err(source),
        }
      }
    };

    match outcome {
      Ok(next) => {
        lock(&self.ledger).commit(insight_id, next);
        info!(%insight_id, ?next, "Vote recorded");
        Ok(next)
      }
      Err(source) => {
        warn!(%insight_id, error = %source, "Vote failed, keeping previous state");
        Err(FeedbackError::Store { insight_id, source })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::FeedbackRow;
  use crate::store::MockRecordStore;
  use mockall::Sequence;

  const USER: &str = "anon_test";

  fn machine(store: MockRecordStore) -> FeedbackMachine {
    FeedbackMachine::new(Arc::new(store), USER)
  }

  fn rejected() -> StoreError {
    StoreError::Rejected { status: 409, message: "duplicate key".to_string() }
  }

  #[test]
  fn test_transition_table() {
    assert_eq!(plan(VoteState::NoVote, VoteType::Up), Transition::Insert(VoteType::Up));
    assert_eq!(plan(VoteState::Up, VoteType::Up), Transition::Remove);
    assert_eq!(plan(VoteState::Up, VoteType::Down), Transition::Switch(VoteType::Down));
    assert_eq!(plan(VoteState::Down, VoteType::Down), Transition::Remove);
  }

  #[tokio::test]
  async fn test_first_vote_clears_then_inserts() {
    let mut store = MockRecordStore::new();
    let mut seq = Sequence::new();
    store
      .expect_delete_feedback()
      .withf(|id, user| *id == InsightId(5) && user == USER)
      .times(1)
      .in_sequence(&mut seq)
      .returning(|_, _| Ok(()));
    store
      .expect_insert_feedback()
      .withf(|id, user, vote| *id == InsightId(5) && user == USER && *vote == VoteType::Up)
      .times(1)
      .in_sequence(&mut seq)
      .returning(|_, _, _| Ok(()));

    let machine = machine(store);
    assert_eq!(machine.vote(InsightId(5), VoteType::Up).await.unwrap(), VoteState::Up);
    assert_eq!(machine.state(InsightId(5)), VoteState::Up);
    assert!(!machine.is_busy(InsightId(5)));
  }

  #[tokio::test]
  async fn test_failed_insert_keeps_no_vote() {
    let mut store = MockRecordStore::new();
    store.expect_delete_feedback().returning(|_, _| Ok(()));
    store.expect_insert_feedback().returning(|_, _, _| Err(rejected()));

    let machine = machine(store);
    let err = machine.vote(InsightId(1), VoteType::Down).await.unwrap_err();

    assert!(matches!(err, FeedbackError::Store { insight_id: InsightId(1), .. }));
    assert_eq!(machine.state(InsightId(1)), VoteState::NoVote);
    assert!(!machine.is_busy(InsightId(1)));
  }

  #[tokio::test]
  async fn test_failed_toggle_off_keeps_vote() {
    let mut store = MockRecordStore::new();
    store
      .expect_fetch_feedback()
      .returning(|_| Ok(vec![FeedbackRow { insight_id: InsightId(2), vote_type: VoteType::Up }]));
    store
      .expect_delete_feedback()
      .returning(|_, _| Err(StoreError::Transport("connection reset".to_string())));

    let machine = machine(store);
    machine.load().await.unwrap();

    let err = machine.vote(InsightId(2), VoteType::Up).await.unwrap_err();
    assert!(matches!(err, FeedbackError::Store { .. }));
    assert_eq!(machine.state(InsightId(2)), VoteState::Up);
  }

  #[tokio::test]
  async fn test_interrupted_switch_lands_on_no_vote() {
    let mut store = MockRecordStore::new();
    store
      .expect_fetch_feedback()
      .returning(|_| Ok(vec![FeedbackRow { insight_id: InsightId(3), vote_type: VoteType::Up }]));
    store.expect_delete_feedback().times(1).returning(|_, _| Ok(()));
    store.expect_insert_feedback().times(1).returning(|_, _, _| Err(rejected()));

    let machine = machine(store);
    machine.load().await.unwrap();

    let err = machine.vote(InsightId(3), VoteType::Down).await.unwrap_err();
    assert!(matches!(err, FeedbackError::SwitchInterrupted { insight_id: InsightId(3), .. }));
    assert_eq!(machine.state(InsightId(3)), VoteState::NoVote);
  }

  #[tokio::test]
  async fn test_load_does_not_overwrite_local_votes() {
    let mut store = MockRecordStore::new();
    store.expect_delete_feedback().returning(|_, _| Ok(()));
    store.expect_insert_feedback().returning(|_, _, _| Ok(()));
    store.expect_fetch_feedback().returning(|_| {
      Ok(vec![
        FeedbackRow { insight_id: InsightId(7), vote_type: VoteType::Up },
        FeedbackRow { insight_id: InsightId(8), vote_type: VoteType::Down },
      ])
    });

    let machine = machine(store);
    machine.vote(InsightId(7), VoteType::Down).await.unwrap();
    let applied = machine.load().await.unwrap();

    assert_eq!(applied, 1);
    assert_eq!(machine.state(InsightId(7)), VoteState::Down);
    assert_eq!(machine.state(InsightId(8)), VoteState::Down);
  }

  #[tokio::test]
  async fn test_load_failure_leaves_map_untouched() {
    let mut store = MockRecordStore::new();
    store
      .expect_fetch_feedback()
      .returning(|_| Err(StoreError::Transport("timed out".to_string())));

    let machine = machine(store);
    assert!(machine.load().await.is_err());
    assert_eq!(machine.snapshot().vote_count(), 0);
  }
}
