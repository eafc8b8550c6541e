use log::*;
use serde_json::json;
use tide::{Redirect, Request, StatusCode};

use super::{render, requested_poll_id};
use crate::api_models::{Ballot, InsertablePoll, PollSummary, PollView};
use crate::error::PollError;
use crate::identity::display_user;
use crate::models::VoteOutcome;
use crate::voting::{apply_vote, is_eligible};
use crate::AppState;

/**
 * Browsers percent-encode the brackets in `choices[0]`, which strict mode refuses to decode
 */
fn form_config() -> serde_qs::Config {
    serde_qs::Config::new(5, false)
}

/**
 *  GET /polls
 */
pub async fn list(req: Request<AppState>) -> tide::Result {
    let polls = req.state().store.list().await.map_err(PollError::into_http)?;
    let viewer = display_user(req.as_ref());

    let summaries: Vec<PollSummary> = polls
        .iter()
        .map(|poll| PollSummary::of(poll, viewer.as_deref()))
        .collect();

    render(&req, "polls", &json!({ "title": "Polls", "polls": summaries }))
}

/**
 *  GET /new
 */
pub async fn new_form(req: Request<AppState>) -> tide::Result {
    render(&req, "new-poll", &json!({ "title": "New Poll" }))
}

/**
 *  POST /new
 */
pub async fn create(mut req: Request<AppState>) -> tide::Result {
    let body = req.body_string().await?;
    let form: InsertablePoll = form_config()
        .deserialize_str(&body)
        .map_err(|err| tide::Error::from_str(StatusCode::BadRequest, err.to_string()))?;
    debug!("Poll received: {:?}", form);

    let new = form
        .into_new_poll(display_user(req.as_ref()))
        .map_err(PollError::into_http)?;
    let poll = req.state().store.create(new).await.map_err(PollError::into_http)?;
    info!("Created poll {} ({})", poll.id, poll.title);

    Ok(Redirect::new("/polls").into())
}

/**
 *  GET /view/:id
 *
 * Visitors who can be identified and have voted already see the notice straight away
 */
pub async fn view(req: Request<AppState>) -> tide::Result {
    let id = requested_poll_id(&req)?;
    let poll = req.state().store.find(&id).await.map_err(PollError::into_http)?;

    let already_voted = match req.state().voters.voter(req.as_ref()) {
        Some(voter) => !is_eligible(req.state().store.as_ref(), &id, &voter)
            .await
            .map_err(PollError::into_http)?,
        None => false,
    };

    let share_url = req.state().settings.share_url(&poll.id);
    render(&req, "view-poll", &PollView::new(&poll, share_url, already_voted))
}

/**
 *  POST /view/:id
 *
 * An accepted vote redirects back to the poll, a repeat vote re-renders it with a notice
 */
pub async fn vote(mut req: Request<AppState>) -> tide::Result {
    let body = req.body_string().await?;
    let id = requested_poll_id(&req)?;

    let ballot: Ballot = form_config()
        .deserialize_str(&body)
        .map_err(|err| tide::Error::from_str(StatusCode::BadRequest, err.to_string()))?;
    let selection = ballot.selection().map_err(PollError::into_http)?;

    let voter = req
        .state()
        .voters
        .voter(req.as_ref())
        .ok_or_else(|| tide::Error::from_str(StatusCode::BadRequest, "Unable to identify voter"))?;

    let outcome = apply_vote(req.state().store.as_ref(), &id, &voter, selection)
        .await
        .map_err(PollError::into_http)?;

    match outcome {
        VoteOutcome::Accepted(_) => Ok(Redirect::new(format!("/view/{}", id)).into()),
        VoteOutcome::AlreadyVoted(poll) => {
            let share_url = req.state().settings.share_url(&poll.id);
            render(&req, "view-poll", &PollView::new(&poll, share_url, true))
        }
    }
}

/**
 *  GET /delete/:id
 */
pub async fn delete(req: Request<AppState>) -> tide::Result {
    let id = requested_poll_id(&req)?;
    req.state().store.delete(&id).await.map_err(PollError::into_http)?;
    info!("Deleted poll {}", id);
    Ok(Redirect::new("/polls").into())
}
