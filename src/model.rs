use chrono::{DateTime, offset::Utc};
use std::sync::Arc;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct CreatePollRequest {
    pub poll_name: String,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct CreatePollResponse {
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(test, derive(Clone, PartialEq))]
pub struct PollSummary {
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone))]
pub struct GetPollResponse {
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
    pub options: Vec<OptionTally>,
    pub votes: Vec<VoteSummary>,
    pub participants: Vec<ParticipantSummary>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct OptionTally {
    pub id: i32,
    pub name: Arc<String>,
    pub votes: i64,
    pub voters: Vec<Arc<String>>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct VoteSummary {
    pub voter_name: Arc<String>,
    pub option_name: Arc<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct ParticipantSummary {
    pub name: String,
    pub joined: DateTime<Utc>,
}

/// Vote form. Exactly one of `option_id` and `new_option` is expected to
/// carry content; `new_option` wins when both do.
#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct VoteRequest {
    pub voter_name: String,
    pub option_id: Option<String>,
    pub new_option: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct RecordVoteResponse {
    pub option_id: i32,
    pub option_created: bool,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct AddOptionRequest {
    pub option_name: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub struct AddOptionResponse {
    pub option_id: i32,
    pub created: bool,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct ParticipantRequest {
    pub participant_name: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(Clone))]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

/// Ballot-box vote form, field names as posted by the page.
#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct BallotForm {
    pub nome: String,
    pub opcao: Option<String>,
    pub nova_opcao: Option<String>,
}

/// Failures reported to the user as an alert rather than an HTTP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InvalidOption,
    NoSelection,
    DuplicateOption,
    DuplicateParticipant,
    MissingName,
    AlreadyVoted,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::InvalidOption => "That option does not belong to this poll.",
            Notice::NoSelection => "Pick an option or suggest a new one.",
            Notice::DuplicateOption => "That option already exists!",
            Notice::DuplicateParticipant => "You have already joined this poll.",
            Notice::MissingName => "Please enter a name.",
            Notice::AlreadyVoted => "You have already voted! Only one vote per address is allowed.",
        }
    }
}
