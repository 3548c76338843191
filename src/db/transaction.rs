use sqlx::{Postgres, Transaction, postgres::PgQueryResult};

use crate::util::name_key;
use super::*;

pub struct PollTransaction<'a>{
    tx: Transaction<'a, Postgres>,
}

impl<'a> PollTransaction<'a> {

    pub async fn new(db: &'a PgPool) -> Result<PollTransaction<'a>, sqlx::Error> {
        Ok(PollTransaction {
            tx: db.begin().await?
        })
    }

    /// Every later read in this transaction sees the same snapshot. Must run
    /// before the first query.
    pub async fn set_repeatable_read(&mut self) -> Result<PgQueryResult, sqlx::Error> {
        sqlx::query("set transaction isolation level repeatable read")
        .execute(&mut *self.tx)
        .await
    }

    pub async fn select_poll(&mut self, id: &str) -> Result<Option<Poll>, sqlx::Error> {
        sqlx::query_as::<_, Poll>(
            "select id, name, created from poll where id=$1",
        ).bind(id)
        .fetch_optional(&mut *self.tx)
        .await
    }

    pub async fn insert_poll(&mut self, poll: &Poll) -> Result<PgQueryResult, sqlx::Error> {
        sqlx::query(
            "insert into poll(id, name, created) values ($1, $2, $3)"
        ).bind(&poll.id)
        .bind(&poll.name)
        .bind(poll.created)
        .execute(&mut *self.tx)
        .await
    }

    pub async fn select_option(&mut self, option_id: i32)
    -> Result<Option<PollOption>, sqlx::Error> {
        sqlx::query_as::<_, PollOption>(
            "select id, poll_id, name from poll_option where id = $1"
        ).bind(option_id)
        .fetch_optional(&mut *self.tx)
        .await
    }

    pub async fn select_options(&mut self, poll_id: &str)
    -> Result<Vec<PollOption>, sqlx::Error> {
        sqlx::query_as::<_, PollOption>(
            "select id, poll_id, name from poll_option where poll_id = $1 order by id"
        ).bind(poll_id)
        .fetch_all(&mut *self.tx)
        .await
    }

    /// Returns the option id and whether this call created it. A name whose
    /// key is already taken in the poll resolves to the existing option.
    pub async fn insert_option(&mut self, poll_id: &str, name: &str)
    -> Result<(i32, bool), sqlx::Error> {
        let key = name_key(name);
        let inserted: Option<(i32,)> = sqlx::query_as(
            "insert into poll_option(poll_id, name, name_key) values ($1, $2, $3) \
            on conflict (poll_id, name_key) do nothing \
            returning id"
        ).bind(poll_id)
        .bind(name)
        .bind(&key)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some((id,)) = inserted {
            return Ok((id, true));
        }

        let (id,): (i32,) = sqlx::query_as(
            "select id from poll_option where poll_id = $1 and name_key = $2"
        ).bind(poll_id)
        .bind(&key)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok((id, false))
    }

    pub async fn select_tallies(&mut self, poll_id: &str) -> Result<Vec<Tally>, sqlx::Error> {
        sqlx::query_as::<_, Tally>(
            "select o.id, o.name, count(v.id) as votes \
            from poll_option o left join vote v on v.option_id = o.id \
            where o.poll_id = $1 \
            group by o.id, o.name \
            order by o.id"
        ).bind(poll_id)
        .fetch_all(&mut *self.tx)
        .await
    }

    pub async fn select_votes(&mut self, poll_id: &str) -> Result<Vec<Vote>, sqlx::Error> {
        sqlx::query_as::<_, Vote>(
            "select v.id, v.option_id, v.voter_name, v.timestamp \
            from vote v join poll_option o on o.id = v.option_id \
            where o.poll_id = $1 \
            order by v.id"
        ).bind(poll_id)
        .fetch_all(&mut *self.tx)
        .await
    }

    pub async fn insert_vote(&mut self, option_id: i32, voter_name: &str, timestamp: Timestamp)
    -> Result<PgQueryResult, sqlx::Error> {
        sqlx::query(
            "insert into vote(option_id, voter_name, timestamp) values ($1, $2, $3)"
        ).bind(option_id)
        .bind(voter_name)
        .bind(timestamp)
        .execute(&mut *self.tx)
        .await
    }

    pub async fn select_participants(&mut self, poll_id: &str)
    -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            "select name, joined from participant where poll_id = $1 order by joined, id"
        ).bind(poll_id)
        .fetch_all(&mut *self.tx)
        .await
    }

    /// `false` when a participant with the same name key is already present.
    pub async fn insert_participant(&mut self, poll_id: &str, name: &str, joined: Timestamp)
    -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "insert into participant(poll_id, name, name_key, joined) values ($1, $2, $3, $4) \
            on conflict (poll_id, name_key) do nothing"
        ).bind(poll_id)
        .bind(name)
        .bind(name_key(name))
        .bind(joined)
        .execute(&mut *self.tx)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    pub async fn delete_participant(&mut self, poll_id: &str, name: &str)
    -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            "delete from participant where poll_id = $1 and name_key = $2"
        ).bind(poll_id)
        .bind(name_key(name))
        .execute(&mut *self.tx)
        .await?;
        Ok(done.rows_affected())
    }

    pub async fn commit(self)-> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}
