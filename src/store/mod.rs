/**
 * The store module holds persistence for polls.
 *
 * Every implementation must apply a vote as one indivisible step: recording the voter address
 * and changing the tally either both happen or neither does, and a second vote from the same
 * address can never slip in between.
 */
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PollError;
use crate::models::{NewPoll, Poll, Selection, VoteOutcome, VoterAddress};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait PollStore: Send + Sync {
    async fn create(&self, poll: NewPoll) -> Result<Poll, PollError>;

    /**
     * All polls, newest first.
     *
     * Listings only carry tallies: `who_voted` is left empty.
     */
    async fn list(&self) -> Result<Vec<Poll>, PollError>;

    async fn find(&self, id: &Uuid) -> Result<Poll, PollError>;

    async fn delete(&self, id: &Uuid) -> Result<(), PollError>;

    /**
     * Point-in-time membership test of the voted set, with no locking
     */
    async fn has_voted(&self, id: &Uuid, address: &VoterAddress) -> Result<bool, PollError>;

    /**
     * Atomically add `address` to the voted set and, only if it was newly added, apply the
     * selection to the tallies.
     *
     * An existing-choice selection which names no choice of this poll is an InvalidInput error
     * and leaves the poll untouched.
     */
    async fn record_vote(
        &self,
        id: &Uuid,
        address: &VoterAddress,
        selection: &Selection,
    ) -> Result<VoteOutcome, PollError>;
}

pub(crate) fn poll_not_found(id: &Uuid) -> PollError {
    PollError::NotFound(format!("No poll with id {}", id))
}

pub(crate) fn tally_overflow(id: &Uuid) -> PollError {
    PollError::Overflow(format!("Choice {} cannot count any more votes", id))
}

pub(crate) fn choice_not_found(id: &Uuid) -> PollError {
    PollError::InvalidInput(format!("No such choice {} in this poll", id))
}
