use async_std::sync::{Arc, Mutex, RwLock};
use async_trait::async_trait;
use chrono::Utc;
use log::*;
use uuid::Uuid;

use std::collections::HashMap;

use super::{choice_not_found, poll_not_found, tally_overflow, PollStore};
use crate::error::PollError;
use crate::models::{Choice, NewPoll, Poll, Selection, VoteOutcome, VoterAddress};

/**
 * Keeps polls in process memory.
 *
 * Each poll sits behind its own mutex so that votes on one poll are serialized while votes on
 * different polls proceed independently. The outer lock only guards membership of the map.
 */
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    polls: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Poll>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: &Uuid) -> Result<Arc<Mutex<Poll>>, PollError> {
        self.polls
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| poll_not_found(id))
    }
}

/**
 * Apply a vote to a poll the caller already holds exclusively
 */
fn apply(poll: &mut Poll, address: &VoterAddress, selection: &Selection) -> Result<(), PollError> {
    match selection {
        Selection::Existing(choice_id) => {
            let choice = poll
                .choices
                .iter_mut()
                .find(|c| c.id == *choice_id)
                .ok_or_else(|| choice_not_found(choice_id))?;
            choice.count = choice
                .count
                .checked_add(1)
                .ok_or_else(|| tally_overflow(choice_id))?;
        }
        Selection::WriteIn(text) => {
            let mut choice = Choice::new(text.clone());
            choice.count = 1;
            poll.choices.push(choice);
        }
    }
    poll.who_voted.insert(address.as_str().to_string());
    poll.updated_at = Utc::now();
    Ok(())
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create(&self, new: NewPoll) -> Result<Poll, PollError> {
        let poll = Poll::from_new(new, Utc::now());
        self.polls
            .write()
            .await
            .insert(poll.id, Arc::new(Mutex::new(poll.clone())));
        debug!("Created poll {}", poll.id);
        Ok(poll)
    }

    async fn list(&self) -> Result<Vec<Poll>, PollError> {
        let slots: Vec<Arc<Mutex<Poll>>> = self.polls.read().await.values().cloned().collect();

        let mut polls = Vec::with_capacity(slots.len());
        for slot in slots {
            let mut poll = slot.lock().await.clone();
            poll.who_voted.clear();
            polls.push(poll);
        }
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls)
    }

    async fn find(&self, id: &Uuid) -> Result<Poll, PollError> {
        let slot = self.slot(id).await?;
        let poll = slot.lock().await.clone();
        Ok(poll)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PollError> {
        match self.polls.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(poll_not_found(id)),
        }
    }

    async fn has_voted(&self, id: &Uuid, address: &VoterAddress) -> Result<bool, PollError> {
        let slot = self.slot(id).await?;
        let voted = slot.lock().await.has_voted(address);
        Ok(voted)
    }

    async fn record_vote(
        &self,
        id: &Uuid,
        address: &VoterAddress,
        selection: &Selection,
    ) -> Result<VoteOutcome, PollError> {
        let slot = self.slot(id).await?;
        let mut poll = slot.lock().await;

        if poll.has_voted(address) {
            return Ok(VoteOutcome::AlreadyVoted(poll.clone()));
        }

        apply(&mut poll, address, selection)?;
        Ok(VoteOutcome::Accepted(poll.clone()))
    }
}
