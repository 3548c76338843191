use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;

use crate::{model::*, util};
use crate::db::{
    self,
    PollDb,
};

#[cfg(test)]
use mockall::automock;

#[derive(Debug)]
pub enum ListPollsError {
    Unexpected,
}

impl From<sqlx::Error> for ListPollsError {
    fn from(e: sqlx::Error) -> Self {
        log_sql_error(e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum CreatePollError {
    MissingName,
    Unexpected,
}

impl From<sqlx::Error> for CreatePollError {
    fn from(e: sqlx::Error) -> Self {
        log_sql_error(e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum GetPollError {
    NotFound,
    Unexpected,
}

impl From<sqlx::Error> for GetPollError {
    fn from(e: sqlx::Error) -> Self {
        log_sql_error(e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum AddOptionError {
    PollNotFound,
    MissingName,
    Unexpected,
}

impl From<sqlx::Error> for AddOptionError {
    fn from(e: sqlx::Error) -> Self {
        log_sql_error(e);
        Self::Unexpected
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RecordVoteError {
    PollNotFound,
    InvalidOption,
    NoSelection,
    MissingName,
    Unexpected,
}

impl From<sqlx::Error> for RecordVoteError {
    fn from(e: sqlx::Error) -> Self {
        log_sql_error(e);
        Self::Unexpected
    }
}

#[derive(Debug)]
pub enum ParticipationError {
    PollNotFound,
    MissingName,
    Unexpected,
}

impl From<sqlx::Error> for ParticipationError {
    fn from(e: sqlx::Error) -> Self {
        log_sql_error(e);
        Self::Unexpected
    }
}

fn log_sql_error(e: sqlx::Error) {
    error!("unexpected sql error: {:?}", e);
    if let Some(e) = e.into_database_error() {
        error!("{}", e.message())
    };
}

/// What a vote form resolved to before touching the store.
#[derive(Debug, PartialEq, Eq)]
pub enum VoteChoice<'r> {
    Existing(i32),
    NewOption(&'r str),
}

impl<'r> VoteChoice<'r> {
    pub fn from_request(request: &'r VoteRequest) -> Result<VoteChoice<'r>, RecordVoteError> {
        if let Some(name) = util::non_blank(request.new_option.as_deref()) {
            return Ok(VoteChoice::NewOption(name));
        }
        match util::non_blank(request.option_id.as_deref()) {
            Some(id) => id.parse()
                .map(VoteChoice::Existing)
                .map_err(|_| RecordVoteError::InvalidOption),
            None => Err(RecordVoteError::NoSelection),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PollOperationsT {
    async fn list_polls(&self) -> Result<Vec<PollSummary>, ListPollsError>;
    async fn create_poll(&self, request: &CreatePollRequest) -> Result<CreatePollResponse, CreatePollError>;
    async fn get_poll(&self, id: &str) -> Result<GetPollResponse, GetPollError>;
    async fn add_option(&self, poll_id: &str, request: &AddOptionRequest) -> Result<AddOptionResponse, AddOptionError>;
    async fn record_vote(&self, poll_id: &str, request: &VoteRequest) -> Result<RecordVoteResponse, RecordVoteError>;
    async fn join_poll(&self, poll_id: &str, request: &ParticipantRequest) -> Result<JoinOutcome, ParticipationError>;
    async fn leave_poll(&self, poll_id: &str, request: &ParticipantRequest) -> Result<u64, ParticipationError>;
}

#[derive(Clone)]
pub struct PollOperations {
    db: PollDb,
}

impl PollOperations {
    pub fn new(db: PollDb) -> PollOperations {
        PollOperations {
            db
        }
    }
}

#[async_trait]
impl PollOperationsT for PollOperations {

    async fn list_polls(&self) -> Result<Vec<PollSummary>, ListPollsError> {
        let polls = self.db.select_polls()
        .await?
        .into_iter()
        .map(|p| PollSummary {
            id: p.id,
            name: p.name,
            created: p.created,
        })
        .collect();
        Ok(polls)
    }

    async fn create_poll(&self, request: &CreatePollRequest)
    -> Result<CreatePollResponse, CreatePollError> {
        let name = util::non_blank(Some(&request.poll_name))
        .ok_or(CreatePollError::MissingName)?;

        let poll = db::Poll {
            id: util::new_poll_id(),
            name: name.to_owned(),
            created: Utc::now(),
        };

        let mut transaction = self.db.new_transaction().await?;
        transaction.insert_poll(&poll).await?;
        transaction.commit().await?;

        info!("created poll id={}", poll.id);
        Ok(CreatePollResponse {
            id: poll.id,
        })
    }

    async fn get_poll(&self, id: &str) -> Result<GetPollResponse, GetPollError> {
        let mut transaction = self.db.new_transaction()
        .await?;
        transaction.set_repeatable_read().await?;

        let poll = transaction.select_poll(id)
            .await?
            .ok_or(GetPollError::NotFound)?;

        let tallies = transaction.select_tallies(id)
        .await?;
        let votes = transaction.select_votes(id)
        .await?;
        let participants = transaction.select_participants(id)
        .await?;

        let option_id_to_name: HashMap<i32, Arc<String>> = tallies.iter()
        .map(|t| (t.id, Arc::new(t.name.clone())))
        .collect();

        let votes: Vec<VoteSummary> = votes.into_iter()
        .flat_map(|v| {
            option_id_to_name
            .get(&v.option_id)
            .map(|option_name| VoteSummary {
                voter_name: Arc::new(v.voter_name.clone()),
                option_name: option_name.clone(),
                timestamp: v.timestamp,
            })
            .or_else(|| {
                error!("Option not found for vote_id={},option_id={}", v.id, v.option_id);
                None
            })
        })
        .collect();

        let mut voters_by_option: HashMap<Arc<String>, Vec<Arc<String>>> = votes.iter()
        .map(|v| (v.option_name.clone(), v.voter_name.clone()))
        .into_group_map();

        let options = tallies.into_iter()
        .map(|t| {
            let name = option_id_to_name[&t.id].clone();
            OptionTally {
                id: t.id,
                voters: voters_by_option.remove(&name).unwrap_or_default(),
                name,
                votes: t.votes,
            }
        })
        .collect();

        let participants = participants.into_iter()
        .map(|p| ParticipantSummary {
            name: p.name,
            joined: p.joined,
        })
        .collect();

        Ok(GetPollResponse {
            id: poll.id,
            name: poll.name,
            created: poll.created,
            options,
            votes,
            participants,
        })
    }

    async fn add_option(&self, poll_id: &str, request: &AddOptionRequest)
    -> Result<AddOptionResponse, AddOptionError> {
        let mut tx = self.db.new_transaction().await?;

        /*poll exists?*/ tx.select_poll(poll_id).await?
        .ok_or(AddOptionError::PollNotFound)?;

        let name = util::non_blank(Some(&request.option_name))
        .ok_or(AddOptionError::MissingName)?;

        let (option_id, created) = tx.insert_option(poll_id, name).await?;
        tx.commit().await?;

        if created {
            debug!("created option poll_id={},option_id={}", poll_id, option_id);
        }
        Ok(AddOptionResponse {
            option_id,
            created,
        })
    }

    async fn record_vote(&self, poll_id: &str, request: &VoteRequest)
    -> Result<RecordVoteResponse, RecordVoteError> {
        let mut tx = self.db.new_transaction().await?;

        /*poll exists?*/ tx.select_poll(poll_id).await?
        .ok_or(RecordVoteError::PollNotFound)?;

        let voter_name = util::non_blank(Some(&request.voter_name))
        .ok_or(RecordVoteError::MissingName)?;

        let (option_id, option_created) = match VoteChoice::from_request(request)? {
            VoteChoice::NewOption(name) => tx.insert_option(poll_id, name).await?,
            VoteChoice::Existing(option_id) => {
                let option = tx.select_option(option_id)
                .await?
                .filter(|o| o.poll_id == poll_id)
                .ok_or(RecordVoteError::InvalidOption)?;
                (option.id, false)
            }
        };

        tx.insert_vote(option_id, voter_name, Utc::now()).await?;
        tx.commit().await?;

        debug!("recorded vote poll_id={},option_id={},new_option={}", poll_id, option_id, option_created);
        Ok(RecordVoteResponse {
            option_id,
            option_created,
        })
    }

    async fn join_poll(&self, poll_id: &str, request: &ParticipantRequest)
    -> Result<JoinOutcome, ParticipationError> {
        let mut tx = self.db.new_transaction().await?;

        /*poll exists?*/ tx.select_poll(poll_id).await?
        .ok_or(ParticipationError::PollNotFound)?;

        let name = util::non_blank(Some(&request.participant_name))
        .ok_or(ParticipationError::MissingName)?;

        let joined = tx.insert_participant(poll_id, name, Utc::now()).await?;
        tx.commit().await?;

        if joined {
            info!("participant joined poll_id={}", poll_id);
            Ok(JoinOutcome::Joined)
        } else {
            Ok(JoinOutcome::AlreadyJoined)
        }
    }

    async fn leave_poll(&self, poll_id: &str, request: &ParticipantRequest)
    -> Result<u64, ParticipationError> {
        let mut tx = self.db.new_transaction().await?;

        /*poll exists?*/ tx.select_poll(poll_id).await?
        .ok_or(ParticipationError::PollNotFound)?;

        let removed = match util::non_blank(Some(&request.participant_name)) {
            Some(name) => tx.delete_participant(poll_id, name).await?,
            None => 0,
        };
        tx.commit().await?;

        if removed > 0 {
            info!("participant left poll_id={}", poll_id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::db::test_db;
    use super::*;

    fn vote(voter_name: &str, option_id: Option<&str>, new_option: Option<&str>) -> VoteRequest {
        VoteRequest {
            voter_name: voter_name.to_owned(),
            option_id: option_id.map(str::to_owned),
            new_option: new_option.map(str::to_owned),
        }
    }

    fn participant(name: &str) -> ParticipantRequest {
        ParticipantRequest {
            participant_name: name.to_owned(),
        }
    }

    async fn post_mock_poll(ops: &PollOperations, name: &str) -> String {
        ops.create_poll(&CreatePollRequest { poll_name: name.to_owned() })
            .await
            .expect("Should create poll")
            .id
    }

    mod vote_choice {
        use super::*;

        #[test]
        fn new_option_wins_when_non_blank() {
            let request = vote("Ann", Some("3"), Some("  Rust "));
            assert_eq!(VoteChoice::from_request(&request), Ok(VoteChoice::NewOption("Rust")));
        }

        #[test]
        fn blank_new_option_falls_back_to_selection() {
            let request = vote("Ann", Some("3"), Some("   "));
            assert_eq!(VoteChoice::from_request(&request), Ok(VoteChoice::Existing(3)));
        }

        #[test]
        fn nothing_selected() {
            let request = vote("Ann", None, Some(""));
            assert_eq!(VoteChoice::from_request(&request), Err(RecordVoteError::NoSelection));
        }

        #[test]
        fn garbage_option_id() {
            let request = vote("Ann", Some("cake"), None);
            assert_eq!(VoteChoice::from_request(&request), Err(RecordVoteError::InvalidOption));
        }
    }

    #[tokio::test]
    #[ignore = "needs STRAWPOLL_TEST_DB"]
    async fn test_create_poll() {
        let db = test_db::new_db().await;
        let ops = PollOperations::new(db);

        let id = post_mock_poll(&ops, "  Dessert ").await;
        let poll = ops.get_poll(&id).await.expect("get poll should succeed");
        assert_eq!(poll.name, "Dessert");
        assert!(poll.options.is_empty());

        let listed = ops.list_polls().await.expect("list polls should succeed");
        assert!(listed.iter().any(|p| p.id == id));
    }

    #[tokio::test]
    #[ignore = "needs STRAWPOLL_TEST_DB"]
    async fn blank_poll_name() {
        let db = test_db::new_db().await;
        let ops = PollOperations::new(db);

        let result = ops.create_poll(&CreatePollRequest { poll_name: " ".to_owned() }).await;
        assert!(matches!(result, Err(CreatePollError::MissingName)));
    }

    #[tokio::test]
    #[ignore = "needs STRAWPOLL_TEST_DB"]
    async fn missing_poll() {
        let db = test_db::new_db().await;
        let ops = PollOperations::new(db);

        assert!(matches!(ops.get_poll("nope").await, Err(GetPollError::NotFound)));
        assert_eq!(
            ops.record_vote("nope", &vote("Ann", None, Some("Go"))).await,
            Err(RecordVoteError::PollNotFound)
        );
        assert!(matches!(
            ops.join_poll("nope", &participant("Ann")).await,
            Err(ParticipationError::PollNotFound)
        ));
        assert!(matches!(
            ops.leave_poll("nope", &participant("Ann")).await,
            Err(ParticipationError::PollNotFound)
        ));
    }

    #[tokio::test]
    #[ignore = "needs STRAWPOLL_TEST_DB"]
    async fn missing_poll_wins_over_blank_names() {
        let db = test_db::new_db().await;
        let ops = PollOperations::new(db);

        assert_eq!(
            ops.record_vote("nope", &vote("  ", None, None)).await,
            Err(RecordVoteError::PollNotFound)
        );
        assert!(matches!(
            ops.join_poll("nope", &participant("")).await,
            Err(ParticipationError::PollNotFound)
        ));
        assert!(matches!(
            ops.add_option("nope", &AddOptionRequest { option_name: " ".to_owned() }).await,
            Err(AddOptionError::PollNotFound)
        ));
    }

    mod test_add_option {
        use super::*;

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn case_insensitive_duplicate() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_id = post_mock_poll(&ops, "Dessert").await;

            let first = ops.add_option(&poll_id, &AddOptionRequest { option_name: "Ice Cream".to_owned() })
                .await
                .expect("add option should succeed");
            let second = ops.add_option(&poll_id, &AddOptionRequest { option_name: "ice cream".to_owned() })
                .await
                .expect("add option should succeed");

            assert!(first.created);
            assert_eq!(second, AddOptionResponse { option_id: first.option_id, created: false });

            let poll = ops.get_poll(&poll_id).await.unwrap();
            assert_eq!(poll.options.len(), 1);
            assert_eq!(poll.options[0].name.as_str(), "Ice Cream");
        }
    }

    mod test_record_vote {
        use super::*;

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn new_option_matches_existing() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);

            //given poll "Best Language" with option "Go"
            let poll_id = post_mock_poll(&ops, "Best Language").await;
            let go = ops.add_option(&poll_id, &AddOptionRequest { option_name: "Go".to_owned() })
                .await
                .unwrap();

            //when Ann writes in "go"
            let response = ops.record_vote(&poll_id, &vote("Ann", None, Some("go")))
                .await
                .expect("vote should succeed");

            //then the vote lands on the existing option
            assert_eq!(response, RecordVoteResponse { option_id: go.option_id, option_created: false });
            let poll = ops.get_poll(&poll_id).await.unwrap();
            assert_eq!(poll.options.len(), 1);
            assert_eq!(poll.options[0].votes, 1);
            assert_eq!(poll.options[0].voters.iter().map(|v| v.as_str()).collect::<Vec<_>>(), vec!["Ann"]);
            assert_eq!(poll.votes.len(), 1);
            assert_eq!(poll.votes[0].option_name.as_str(), "Go");
        }

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn new_option_is_created() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_id = post_mock_poll(&ops, "Best Language").await;

            let response = ops.record_vote(&poll_id, &vote("Ann", None, Some("Rust")))
                .await
                .expect("vote should succeed");
            assert!(response.option_created);

            //same voter may vote again
            let again = ops.record_vote(&poll_id, &vote("Ann", Some(&response.option_id.to_string()), None))
                .await
                .expect("vote should succeed");
            assert_eq!(again.option_id, response.option_id);

            let poll = ops.get_poll(&poll_id).await.unwrap();
            assert_eq!(poll.options[0].name.as_str(), "Rust");
            assert_eq!(poll.options[0].votes, 2);
        }

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn option_from_another_poll() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_a = post_mock_poll(&ops, "A").await;
            let poll_b = post_mock_poll(&ops, "B").await;
            let foreign = ops.add_option(&poll_b, &AddOptionRequest { option_name: "x".to_owned() })
                .await
                .unwrap();

            let result = ops.record_vote(&poll_a, &vote("Ann", Some(&foreign.option_id.to_string()), None)).await;
            assert_eq!(result, Err(RecordVoteError::InvalidOption));

            let poll = ops.get_poll(&poll_b).await.unwrap();
            assert_eq!(poll.options[0].votes, 0);
            assert!(ops.get_poll(&poll_a).await.unwrap().votes.is_empty());
        }

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn no_selection() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_id = post_mock_poll(&ops, "Empty").await;

            let result = ops.record_vote(&poll_id, &vote("Ann", None, Some("  "))).await;
            assert_eq!(result, Err(RecordVoteError::NoSelection));
            assert!(ops.get_poll(&poll_id).await.unwrap().votes.is_empty());
        }

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn blank_voter() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_id = post_mock_poll(&ops, "Empty").await;

            let result = ops.record_vote(&poll_id, &vote(" ", None, Some("Go"))).await;
            assert_eq!(result, Err(RecordVoteError::MissingName));
            assert!(ops.get_poll(&poll_id).await.unwrap().options.is_empty());
        }
    }

    mod test_participation {
        use super::*;

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn join_twice_any_case() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_id = post_mock_poll(&ops, "Picnic").await;

            assert_eq!(ops.join_poll(&poll_id, &participant("Ann")).await.unwrap(), JoinOutcome::Joined);
            assert_eq!(ops.join_poll(&poll_id, &participant("ANN")).await.unwrap(), JoinOutcome::AlreadyJoined);

            let poll = ops.get_poll(&poll_id).await.unwrap();
            assert_eq!(poll.participants.len(), 1);
            assert_eq!(poll.participants[0].name, "Ann");
        }

        #[tokio::test]
        #[ignore = "needs STRAWPOLL_TEST_DB"]
        async fn leave_is_idempotent() {
            let db = test_db::new_db().await;
            let ops = PollOperations::new(db);
            let poll_id = post_mock_poll(&ops, "Picnic").await;
            ops.join_poll(&poll_id, &participant("Ann")).await.unwrap();

            assert_eq!(ops.leave_poll(&poll_id, &participant("Bob")).await.unwrap(), 0);
            assert_eq!(ops.get_poll(&poll_id).await.unwrap().participants.len(), 1);

            assert_eq!(ops.leave_poll(&poll_id, &participant("ann")).await.unwrap(), 1);
            assert_eq!(ops.leave_poll(&poll_id, &participant("ann")).await.unwrap(), 0);
            assert!(ops.get_poll(&poll_id).await.unwrap().participants.is_empty());
        }
    }
}
