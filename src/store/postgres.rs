use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use uuid::Uuid;

use std::collections::{BTreeSet, HashMap};

use super::{choice_not_found, poll_not_found, tally_overflow, PollStore};
use crate::error::PollError;
use crate::models::{Choice, NewPoll, Poll, Selection, VoteOutcome, VoterAddress};

/// SQLSTATE raised when `count + 1` no longer fits the column
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/**
 * Polls persisted in PostgreSQL
 *
 * The voted set lives in the `voters` table whose primary key is `(poll_id, address)`, so the
 * insert of an address doubles as the atomic "was this address new?" test.
 */
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PollRow {
    id: Uuid,
    title: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ChoiceRow {
    id: Uuid,
    poll_id: Uuid,
    choice: String,
    count: i32,
}

#[derive(sqlx::FromRow)]
struct VoterRow {
    address: String,
}

impl From<ChoiceRow> for Choice {
    fn from(row: ChoiceRow) -> Self {
        Choice {
            id: row.id,
            choice: row.choice,
            count: row.count as u32,
        }
    }
}

fn assemble(row: PollRow, choices: Vec<Choice>, who_voted: BTreeSet<String>) -> Poll {
    Poll {
        id: row.id,
        title: row.title,
        created_by: row.created_by,
        choices,
        who_voted,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn overflow_or_storage(err: sqlx::Error, choice_id: &Uuid) -> PollError {
    let overflow = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE)
    );
    if overflow {
        tally_overflow(choice_id)
    } else {
        PollError::Storage(err)
    }
}

/**
 * Load a single poll with its choices and voters through the given connection
 */
async fn load(conn: &mut PgConnection, id: &Uuid) -> Result<Poll, PollError> {
    let row = sqlx::query_as::<_, PollRow>(
        "SELECT id, title, created_by, created_at, updated_at FROM polls WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| poll_not_found(id))?;

    let choices = sqlx::query_as::<_, ChoiceRow>(
        "SELECT id, poll_id, choice, count FROM choices WHERE poll_id = $1 ORDER BY seq ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Choice::from)
    .collect();

    let who_voted = sqlx::query_as::<_, VoterRow>(
        "SELECT address FROM voters WHERE poll_id = $1",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|v| v.address)
    .collect();

    Ok(assemble(row, choices, who_voted))
}

impl PgStore {
    /**
     * Create the connection pool and bring the schema up to date
     */
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database schema is up to date");

        Ok(Self { pool })
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn create(&self, new: NewPoll) -> Result<Poll, PollError> {
        let poll = Poll::from_new(new, Utc::now());
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO polls (id, title, created_by, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(poll.id)
        .bind(&poll.title)
        .bind(&poll.created_by)
        .bind(poll.created_at)
        .bind(poll.updated_at)
        .execute(&mut tx)
        .await?;

        for choice in poll.choices.iter() {
            sqlx::query("INSERT INTO choices (id, poll_id, choice, count) VALUES ($1, $2, $3, 0)")
                .bind(choice.id)
                .bind(poll.id)
                .bind(&choice.choice)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Created poll {}", poll.id);
        Ok(poll)
    }

    async fn list(&self) -> Result<Vec<Poll>, PollError> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, PollRow>(
            "SELECT id, title, created_by, created_at, updated_at FROM polls ORDER BY created_at DESC",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut choices: HashMap<Uuid, Vec<Choice>> = HashMap::new();
        for row in sqlx::query_as::<_, ChoiceRow>(
            "SELECT id, poll_id, choice, count FROM choices ORDER BY poll_id, seq ASC",
        )
        .fetch_all(&mut *conn)
        .await?
        {
            choices.entry(row.poll_id).or_default().push(Choice::from(row));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                assemble(row, choices.remove(&id).unwrap_or_default(), BTreeSet::new())
            })
            .collect())
    }

    async fn find(&self, id: &Uuid) -> Result<Poll, PollError> {
        let mut conn = self.pool.acquire().await?;
        load(&mut *conn, id).await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PollError> {
        let deleted = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(poll_not_found(id));
        }
        Ok(())
    }

    async fn has_voted(&self, id: &Uuid, address: &VoterAddress) -> Result<bool, PollError> {
        let (exists, voted): (bool, bool) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM polls WHERE id = $1), \
             EXISTS(SELECT 1 FROM voters WHERE poll_id = $1 AND address = $2)",
        )
        .bind(id)
        .bind(address.as_str())
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Err(poll_not_found(id));
        }
        Ok(voted)
    }

    async fn record_vote(
        &self,
        id: &Uuid,
        address: &VoterAddress,
        selection: &Selection,
    ) -> Result<VoteOutcome, PollError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM polls WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Err(poll_not_found(id));
        }

        let inserted = sqlx::query(
            "INSERT INTO voters (poll_id, address) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(address.as_str())
        .execute(&mut tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            let poll = load(&mut *tx, id).await?;
            tx.rollback().await?;
            return Ok(VoteOutcome::AlreadyVoted(poll));
        }

        match selection {
            Selection::Existing(choice_id) => {
                let updated = sqlx::query(
                    "UPDATE choices SET count = count + 1 WHERE id = $1 AND poll_id = $2",
                )
                .bind(choice_id)
                .bind(id)
                .execute(&mut tx)
                .await
                .map_err(|err| overflow_or_storage(err, choice_id))?
                .rows_affected();

                if updated == 0 {
                    tx.rollback().await?;
                    return Err(choice_not_found(choice_id));
                }
            }
            Selection::WriteIn(text) => {
                sqlx::query(
                    "INSERT INTO choices (id, poll_id, choice, count) VALUES ($1, $2, $3, 1)",
                )
                .bind(Uuid::new_v4())
                .bind(id)
                .bind(text)
                .execute(&mut tx)
                .await?;
            }
        }

        sqlx::query("UPDATE polls SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut tx)
            .await?;

        let poll = load(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(VoteOutcome::Accepted(poll))
    }
}
