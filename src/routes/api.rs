use log::*;
use tide::{Body, Request, Response, StatusCode};

use super::requested_poll_id;
use crate::api_models::{Ballot, InsertablePoll, Tally, VoteResponse};
use crate::error::PollError;
use crate::identity::display_user;
use crate::voting::apply_vote;
use crate::AppState;

/**
 *  PUT /api/v1/polls
 */
pub async fn create(mut req: Request<AppState>) -> tide::Result {
    let poll = req.body_json::<InsertablePoll>().await?;
    let new = poll
        .into_new_poll(display_user(req.as_ref()))
        .map_err(PollError::into_http)?;

    let poll = req.state().store.create(new).await.map_err(PollError::into_http)?;
    info!("Created poll {} ({})", poll.id, poll.title);

    Ok(Response::builder(StatusCode::Created)
        .body(Body::from_json(&poll)?)
        .build())
}

/**
 * GET /api/v1/polls/:id
 */
pub async fn get(req: Request<AppState>) -> tide::Result<Body> {
    let id = requested_poll_id(&req)?;
    debug!("Fetching poll: {}", id);

    let poll = req.state().store.find(&id).await.map_err(PollError::into_http)?;
    Body::from_json(&poll)
}

/**
 *  POST /api/v1/polls/:id/vote
 */
pub async fn vote(mut req: Request<AppState>) -> tide::Result<Body> {
    let ballot = req.body_json::<Ballot>().await?;
    let id = requested_poll_id(&req)?;
    let selection = ballot.selection().map_err(PollError::into_http)?;

    let voter = req
        .state()
        .voters
        .voter(req.as_ref())
        .ok_or_else(|| tide::Error::from_str(StatusCode::BadRequest, "Unable to identify voter"))?;

    let outcome = apply_vote(req.state().store.as_ref(), &id, &voter, selection)
        .await
        .map_err(PollError::into_http)?;

    Body::from_json(&VoteResponse {
        accepted: outcome.is_accepted(),
        poll: outcome.into_poll(),
    })
}

/**
 *  GET /api/v1/polls/:id/results
 */
pub async fn results(req: Request<AppState>) -> tide::Result<Body> {
    let id = requested_poll_id(&req)?;
    let poll = req.state().store.find(&id).await.map_err(PollError::into_http)?;
    Body::from_json(&Tally::of(&poll))
}
