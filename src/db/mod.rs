mod transaction;

pub use transaction::*;
use chrono::{
    DateTime,
    offset::Utc,
};
use sqlx::PgPool;

pub const ENV_KEY: &str = "STRAWPOLL_DB_URL";

/// Statements are idempotent so they can run on every start-up.
const SCHEMA: [&str; 4] = [
    "create table if not exists poll ( \
        id varchar(16) primary key, \
        name text not null, \
        created timestamptz not null)",
    "create table if not exists poll_option ( \
        id serial primary key, \
        poll_id varchar(16) not null references poll(id) on delete cascade, \
        name text not null, \
        name_key text not null, \
        unique (poll_id, name_key))",
    "create table if not exists vote ( \
        id serial primary key, \
        option_id integer not null references poll_option(id) on delete cascade, \
        voter_name text not null, \
        timestamp timestamptz not null)",
    "create table if not exists participant ( \
        id serial primary key, \
        poll_id varchar(16) not null references poll(id) on delete cascade, \
        name text not null, \
        name_key text not null, \
        joined timestamptz not null, \
        unique (poll_id, name_key))",
];

#[derive(Clone)]
pub struct PollDb {
    pool: PgPool
}

type Timestamp = DateTime<Utc>;

#[derive(sqlx::FromRow, Debug, Eq, PartialEq)]
#[cfg_attr(test, derive(Clone))]
pub struct Poll {
    pub id: String,
    pub name: String,
    pub created: Timestamp,
}

#[derive(sqlx::FromRow, Debug, Eq, PartialEq)]
#[cfg_attr(test, derive(Clone))]
pub struct PollOption {
    pub id: i32,
    pub poll_id: String,
    pub name: String,
}

#[derive(sqlx::FromRow, Debug, Eq, PartialEq)]
pub struct Tally {
    pub id: i32,
    pub name: String,
    pub votes: i64,
}

#[derive(sqlx::FromRow, Debug, Eq, PartialEq)]
pub struct Vote {
    pub id: i32,
    pub option_id: i32,
    pub voter_name: String,
    pub timestamp: Timestamp,
}

#[derive(sqlx::FromRow, Debug, Eq, PartialEq)]
pub struct Participant {
    pub name: String,
    pub joined: Timestamp,
}

impl PollDb {
    pub fn new(db_pool: PgPool) -> PollDb {
        PollDb{ pool: db_pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA.iter() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn new_transaction(&self) -> Result<PollTransaction<'_>, sqlx::Error> {
        PollTransaction::new(&self.pool).await
    }

    pub async fn select_polls(&self) -> Result<Vec<Poll>, sqlx::Error> {
        sqlx::query_as::<_, Poll>(
            "select id, name, created from poll order by created desc, id"
        ).fetch_all(&self.pool)
        .await
    }
}
