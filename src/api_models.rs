use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PollError;
use crate::models::{Choice, NewPoll, Poll, Selection};

/**
 * User-provided details to create a Poll, either from the form or the JSON API
 */
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InsertablePoll {
    pub title: String,
    pub created_by: String,
    /**
     * Just the label of each choice
     */
    pub choices: Vec<String>,
}

impl InsertablePoll {
    /**
     * Validate, falling back to `identity` when no creator was filled in
     */
    pub fn into_new_poll(self, identity: Option<String>) -> Result<NewPoll, PollError> {
        let created_by = if self.created_by.trim().is_empty() {
            identity.unwrap_or_default()
        } else {
            self.created_by
        };
        NewPoll::new(&self.title, &created_by, &self.choices)
    }
}

/**
 * User-provided ballot: either an existing choice, or the text of a write-in under `other`
 */
#[derive(Debug, Default, Deserialize)]
pub struct Ballot {
    pub choice: Option<String>,
    pub other: Option<String>,
}

impl Ballot {
    pub fn selection(&self) -> Result<Selection, PollError> {
        Selection::from_form(self.choice.as_deref(), self.other.as_deref())
    }
}

/**
 * Response to a ballot cast through the JSON API
 */
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub accepted: bool,
    pub poll: Poll,
}

/**
 * Results from a given poll
 */
#[derive(Debug, Serialize)]
pub struct Tally<'a> {
    pub poll: &'a Poll,
    pub most_voted: Option<&'a Choice>,
    pub total_votes: u64,
    pub chart: serde_json::Value,
}

impl<'a> Tally<'a> {
    pub fn of(poll: &'a Poll) -> Self {
        Self {
            poll,
            most_voted: crate::tally::most_voted(poll),
            total_votes: crate::tally::total_votes(poll),
            chart: crate::tally::chart_config(poll),
        }
    }
}

/**
 * One row of the poll listing page
 */
#[derive(Debug, Serialize)]
pub struct PollSummary<'a> {
    pub poll: &'a Poll,
    pub most_votes: Option<&'a Choice>,
    pub owner: bool,
}

impl<'a> PollSummary<'a> {
    pub fn of(poll: &'a Poll, viewer: Option<&str>) -> Self {
        Self {
            poll,
            most_votes: crate::tally::most_voted(poll),
            owner: viewer.map_or(false, |v| !v.is_empty() && v == poll.created_by),
        }
    }
}

/**
 * Everything the view page template needs
 */
#[derive(Debug, Serialize)]
pub struct PollView<'a> {
    pub title: &'static str,
    pub poll: &'a Poll,
    pub share_url: String,
    /**
     * Chart configuration, already serialized and escaped for use inside a `<script>`
     */
    pub data: String,
    pub already_voted: bool,
}

impl<'a> PollView<'a> {
    pub fn new(poll: &'a Poll, share_url: String, already_voted: bool) -> Self {
        let chart = crate::tally::chart_config(poll).to_string();
        Self {
            title: "Poll",
            poll,
            share_url,
            data: html_escape::encode_script(&chart).into_owned(),
            already_voted,
        }
    }
}

pub fn parse_poll_id(raw: &str) -> Result<Uuid, PollError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| PollError::InvalidInput(format!("Invalid poll id: {}", raw)))
}
