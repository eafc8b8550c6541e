/**
 * Deciding whether an address may vote, and recording the votes which are allowed
 */
use log::*;
use uuid::Uuid;

use crate::error::PollError;
use crate::models::{Selection, VoteOutcome, VoterAddress};
use crate::store::PollStore;

/**
 * Whether `address` may still vote on the poll.
 *
 * This is only a snapshot for display purposes. `apply_vote` repeats the check atomically, so
 * a `true` here is no promise the next vote will be accepted.
 */
pub async fn is_eligible(
    store: &dyn PollStore,
    poll_id: &Uuid,
    address: &VoterAddress,
) -> Result<bool, PollError> {
    Ok(!store.has_voted(poll_id, address).await?)
}

/**
 * Record a vote from `address`, unless that address already voted on this poll
 */
pub async fn apply_vote(
    store: &dyn PollStore,
    poll_id: &Uuid,
    address: &VoterAddress,
    selection: Selection,
) -> Result<VoteOutcome, PollError> {
    let selection = selection.validated()?;
    debug!("Vote from {} on {}: {:?}", address, poll_id, selection);

    let outcome = store.record_vote(poll_id, address, &selection).await?;
    if outcome.is_accepted() {
        info!("Recorded vote from {} on poll {}", address, outcome.poll().id);
    } else {
        info!("Rejected repeat vote from {} on poll {}", address, outcome.poll().id);
    }
    Ok(outcome)
}
