use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::error::PollError;

/**
 * A poll along with its choices and the set of addresses which have voted on it
 */
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub created_by: String,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing)]
    pub who_voted: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    /**
     * Build a fresh poll with zeroed tallies, as the stores do on creation
     */
    pub fn from_new(new: NewPoll, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            created_by: new.created_by,
            choices: new.choices.into_iter().map(Choice::new).collect(),
            who_voted: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_voted(&self, address: &VoterAddress) -> bool {
        self.who_voted.contains(address.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Choice {
    pub id: Uuid,
    pub choice: String,
    pub count: u32,
}

impl Choice {
    pub fn new(label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            choice: label,
            count: 0,
        }
    }
}

/**
 * Validated details for creating a poll
 */
#[derive(Clone, Debug)]
pub struct NewPoll {
    pub title: String,
    pub created_by: String,
    pub choices: Vec<String>,
}

impl NewPoll {
    /**
     * Blank choice entries are dropped, but the title and at least one choice must remain
     */
    pub fn new(title: &str, created_by: &str, choices: &[String]) -> Result<Self, PollError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PollError::InvalidInput("A poll needs a title".to_string()));
        }

        let choices: Vec<String> = choices
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        if choices.is_empty() {
            return Err(PollError::InvalidInput(
                "A poll needs at least one choice".to_string(),
            ));
        }

        Ok(Self {
            title: title.to_string(),
            created_by: created_by.trim().to_string(),
            choices,
        })
    }
}

/**
 * What a voter picked: one of the poll's existing choices, or their own write-in
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Existing(Uuid),
    WriteIn(String),
}

impl Selection {
    /**
     * Interpret the `choice`/`other` pair submitted by the vote form.
     *
     * A non-empty `other` always wins over `choice`.
     */
    pub fn from_form(choice: Option<&str>, other: Option<&str>) -> Result<Self, PollError> {
        if let Some(other) = other.map(str::trim).filter(|o| !o.is_empty()) {
            return Ok(Selection::WriteIn(other.to_string()));
        }

        match choice.map(str::trim).filter(|c| !c.is_empty()) {
            Some(choice) => Uuid::parse_str(choice)
                .map(Selection::Existing)
                .map_err(|_| PollError::InvalidInput(format!("Invalid choice: {}", choice))),
            None => Err(PollError::InvalidInput("No choice was selected".to_string())),
        }
    }

    /**
     * Reject selections which could never be applied, before any storage is touched
     */
    pub fn validated(self) -> Result<Self, PollError> {
        match self {
            Selection::WriteIn(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Err(PollError::InvalidInput("Write-in text is empty".to_string()))
                } else {
                    Ok(Selection::WriteIn(text.to_string()))
                }
            }
            Selection::Existing(id) if id.is_nil() => {
                Err(PollError::InvalidInput("No choice was selected".to_string()))
            }
            existing => Ok(existing),
        }
    }
}

/**
 * The network address a vote came from, which is the only deduplication key
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoterAddress(String);

impl VoterAddress {
    pub fn new(address: &str) -> Result<Self, PollError> {
        let address = address.trim();
        if address.is_empty() {
            Err(PollError::InvalidInput("Missing voter address".to_string()))
        } else {
            Ok(Self(address.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/**
 * Result of an attempt to record a vote
 */
#[derive(Clone, Debug, PartialEq)]
pub enum VoteOutcome {
    /// The vote was applied, carrying the updated poll
    Accepted(Poll),
    /// The address had already voted, carrying the untouched poll
    AlreadyVoted(Poll),
}

impl VoteOutcome {
    pub fn poll(&self) -> &Poll {
        match self {
            VoteOutcome::Accepted(poll) | VoteOutcome::AlreadyVoted(poll) => poll,
        }
    }

    pub fn into_poll(self) -> Poll {
        match self {
            VoteOutcome::Accepted(poll) | VoteOutcome::AlreadyVoted(poll) => poll,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, VoteOutcome::Accepted(_))
    }
}
