pub mod ballot_box;

use std::fmt;

use actix_web::{HttpResponse, ResponseError, web};
use actix_web::http::{StatusCode, header::{self, ContentType}};
use actix_web::web::{Data, Form, Path, Query, ServiceConfig};
use thiserror::Error;

use crate::model::*;
use crate::operations::*;
use crate::views;

pub const INDEX_PATH: &str = "/";
pub const CREATE_POLL_PATH: &str = "/create_poll";
pub const POLL_PATH: &str = "/poll/{poll_id}";
pub const VOTE_PATH: &str = "/poll/{poll_id}/vote";
pub const ADD_OPTION_PATH: &str = "/poll/{poll_id}/add_option";
pub const JOIN_PATH: &str = "/poll/{poll_id}/join";
pub const LEAVE_PATH: &str = "/poll/{poll_id}/leave";

/// Failures answered with an HTTP error status instead of an alert.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Not found.")]
    NotFound,

    #[error("Access denied.")]
    Forbidden,

    #[error("Something went wrong.")]
    Unexpected,
}

impl ResponseError for PageError {
    fn status_code(&self) -> StatusCode {
        match self {
            PageError::NotFound => StatusCode::NOT_FOUND,
            PageError::Forbidden => StatusCode::FORBIDDEN,
            PageError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<fmt::Error> for PageError {
    fn from(e: fmt::Error) -> Self {
        error!("failed to render page: {}", e);
        Self::Unexpected
    }
}

type PageResult = Result<HttpResponse, PageError>;

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn notice(notice: Notice, location: &str) -> HttpResponse {
    html(views::notice_redirect(notice, location))
}

fn poll_location(poll_id: &str) -> String {
    format!("/poll/{}", poll_id)
}

async fn list_polls_handler<A: 'static + PollOperationsT>(ops: Data<A>) -> PageResult {
    let polls = ops.list_polls()
        .await
        .map_err(|e| match e {
            ListPollsError::Unexpected => PageError::Unexpected,
        })?;
    Ok(html(views::poll_index(&polls)?))
}

async fn create_poll_form_handler() -> PageResult {
    Ok(html(views::create_poll_form()?))
}

async fn create_poll_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    body: Form<CreatePollRequest>,
) -> PageResult {
    let Form(request) = body;
    match ops.create_poll(&request).await {
        Ok(created) => Ok(see_other(&poll_location(&created.id))),
        Err(CreatePollError::MissingName) => Ok(notice(Notice::MissingName, CREATE_POLL_PATH)),
        Err(CreatePollError::Unexpected) => Err(PageError::Unexpected),
    }
}

async fn get_poll_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    path: Path<String>,
) -> PageResult {
    let poll = ops.get_poll(&path)
        .await
        .map_err(|e| match e {
            GetPollError::NotFound => PageError::NotFound,
            GetPollError::Unexpected => PageError::Unexpected,
        })?;
    Ok(html(views::poll_page(&poll)?))
}

async fn vote_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    path: Path<String>,
    body: Form<VoteRequest>,
) -> PageResult {
    let poll_id = path.into_inner();
    let location = poll_location(&poll_id);
    match ops.record_vote(&poll_id, &body).await {
        Ok(_) => Ok(see_other(&location)),
        Err(RecordVoteError::InvalidOption) => Ok(notice(Notice::InvalidOption, &location)),
        Err(RecordVoteError::NoSelection) => Ok(notice(Notice::NoSelection, &location)),
        Err(RecordVoteError::MissingName) => Ok(notice(Notice::MissingName, &location)),
        Err(RecordVoteError::PollNotFound) => Err(PageError::NotFound),
        Err(RecordVoteError::Unexpected) => Err(PageError::Unexpected),
    }
}

async fn add_option_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    path: Path<String>,
    body: Form<AddOptionRequest>,
) -> PageResult {
    let poll_id = path.into_inner();
    let location = poll_location(&poll_id);
    match ops.add_option(&poll_id, &body).await {
        Ok(AddOptionResponse { created: true, .. }) => Ok(see_other(&location)),
        Ok(AddOptionResponse { created: false, .. }) => Ok(notice(Notice::DuplicateOption, &location)),
        Err(AddOptionError::MissingName) => Ok(notice(Notice::MissingName, &location)),
        Err(AddOptionError::PollNotFound) => Err(PageError::NotFound),
        Err(AddOptionError::Unexpected) => Err(PageError::Unexpected),
    }
}

async fn join_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    path: Path<String>,
    body: Form<ParticipantRequest>,
) -> PageResult {
    let poll_id = path.into_inner();
    let location = poll_location(&poll_id);
    match ops.join_poll(&poll_id, &body).await {
        Ok(JoinOutcome::Joined) => Ok(see_other(&location)),
        Ok(JoinOutcome::AlreadyJoined) => Ok(notice(Notice::DuplicateParticipant, &location)),
        Err(ParticipationError::MissingName) => Ok(notice(Notice::MissingName, &location)),
        Err(ParticipationError::PollNotFound) => Err(PageError::NotFound),
        Err(ParticipationError::Unexpected) => Err(PageError::Unexpected),
    }
}

async fn leave<A: 'static + PollOperationsT>(
    ops: Data<A>,
    poll_id: String,
    request: ParticipantRequest,
) -> PageResult {
    match ops.leave_poll(&poll_id, &request).await {
        Ok(_) => Ok(see_other(&poll_location(&poll_id))),
        Err(ParticipationError::PollNotFound) => Err(PageError::NotFound),
        Err(ParticipationError::MissingName) | Err(ParticipationError::Unexpected) => Err(PageError::Unexpected),
    }
}

async fn leave_query_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    path: Path<String>,
    query: Query<ParticipantRequest>,
) -> PageResult {
    leave(ops, path.into_inner(), query.into_inner()).await
}

async fn leave_form_handler<A: 'static + PollOperationsT>(
    ops: Data<A>,
    path: Path<String>,
    body: Form<ParticipantRequest>,
) -> PageResult {
    leave(ops, path.into_inner(), body.into_inner()).await
}

pub fn config<A: 'static + PollOperationsT>(cfg: &mut ServiceConfig) {
    cfg.route(INDEX_PATH, web::get().to(list_polls_handler::<A>))
        .service(web::resource(CREATE_POLL_PATH)
            .route(web::get().to(create_poll_form_handler))
            .route(web::post().to(create_poll_handler::<A>)))
        .route(POLL_PATH, web::get().to(get_poll_handler::<A>))
        .route(VOTE_PATH, web::post().to(vote_handler::<A>))
        .route(ADD_OPTION_PATH, web::post().to(add_option_handler::<A>))
        .route(JOIN_PATH, web::post().to(join_handler::<A>))
        .service(web::resource(LEAVE_PATH)
            .route(web::get().to(leave_query_handler::<A>))
            .route(web::post().to(leave_form_handler::<A>)))
    ;
}
