use actix_web::{HttpRequest, web};
use actix_web::web::{Data, Form, ServiceConfig};

use crate::ballot_box::{AddressGate, BallotFile, BallotFileError, CastError};
use crate::model::{BallotForm, Notice};
use crate::views;

use super::{PageError, PageResult, html, notice, see_other};

pub const BALLOT_BOX_PATH: &str = "/";
pub const CAST_PATH: &str = "/votar";

fn client_address<G: AddressGate>(req: &HttpRequest, gate: &G) -> Result<String, PageError> {
    let address = req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default();
    if gate.is_blocked(&address) {
        warn!("refused blocked address {}", address);
        return Err(PageError::Forbidden);
    }
    Ok(address)
}

fn file_error(e: BallotFileError) -> PageError {
    error!("{}", e);
    PageError::Unexpected
}

async fn ballot_box_handler<G: 'static + AddressGate>(
    file: Data<BallotFile>,
    gate: Data<G>,
    req: HttpRequest,
) -> PageResult {
    client_address(&req, gate.get_ref())?;
    let file = file.get_ref().clone();
    let sheet = web::block(move || file.load())
        .await
        .map_err(|e| {
            error!("ballot file task failed: {}", e);
            PageError::Unexpected
        })?
        .map_err(file_error)?;
    Ok(html(views::ballot_box_page(&sheet)?))
}

async fn cast_handler<G: 'static + AddressGate>(
    file: Data<BallotFile>,
    gate: Data<G>,
    req: HttpRequest,
    body: Form<BallotForm>,
) -> PageResult {
    let address = client_address(&req, gate.get_ref())?;
    let file = file.get_ref().clone();
    let Form(form) = body;

    let outcome = web::block(move || -> Result<Result<String, CastError>, BallotFileError> {
        let mut sheet = file.load()?;
        let outcome = sheet.cast(&address, &form.nome, form.opcao.as_deref(), form.nova_opcao.as_deref());
        if outcome.is_ok() {
            file.save(&sheet)?;
        }
        Ok(outcome)
    })
    .await
    .map_err(|e| {
        error!("ballot file task failed: {}", e);
        PageError::Unexpected
    })?
    .map_err(file_error)?;

    let notice_for = |n: Notice| -> PageResult { Ok(notice(n, BALLOT_BOX_PATH)) };
    match outcome {
        Ok(option) => {
            debug!("ballot cast for [{}]", option);
            Ok(see_other(BALLOT_BOX_PATH))
        }
        Err(CastError::AlreadyVoted) => notice_for(Notice::AlreadyVoted),
        Err(CastError::DuplicateOption(_)) => notice_for(Notice::DuplicateOption),
        Err(CastError::InvalidOption(_)) => notice_for(Notice::InvalidOption),
        Err(CastError::NoSelection) => notice_for(Notice::NoSelection),
        Err(CastError::MissingName) => notice_for(Notice::MissingName),
    }
}

pub fn config<G: 'static + AddressGate>(cfg: &mut ServiceConfig) {
    cfg.route(BALLOT_BOX_PATH, web::get().to(ballot_box_handler::<G>))
        .route(CAST_PATH, web::post().to(cast_handler::<G>))
    ;
}
