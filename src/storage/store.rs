use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::time::Duration;

use crate::errors::GameError;
use crate::helpers::{millis_to_utc, utc_to_millis};
use crate::models::game::{Match, MatchStatus, Player};
use crate::models::question::Question;

/// How many times a busy/locked SQLite error is retried before surfacing.
const BUSY_RETRIES: u32 = 3;
const BUSY_BACKOFF: Duration = Duration::from_millis(25);

/// Durable registry of matches, players and the question pool, backed by a
/// single SQLite connection. Callers share it behind a mutex; multi-step
/// read-check-write sequences are serialized by the match locks, not here.
///
/// Answer lists and the per-match question snapshot are JSON columns, so a
/// match row always carries the exact questions (correct answers included)
/// it was created with.
pub struct MatchStore {
    conn: Connection,
}

impl MatchStore {
    pub fn open(path: &str) -> Result<MatchStore, GameError> {
        MatchStore::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<MatchStore, GameError> {
        MatchStore::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<MatchStore, GameError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS questions (
                id              TEXT PRIMARY KEY,
                body            TEXT NOT NULL,
                correct_answers TEXT NOT NULL,
                published       INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS matches (
                id                TEXT PRIMARY KEY,
                status            TEXT NOT NULL,
                questions         TEXT NOT NULL,
                pair_created_at   INTEGER NOT NULL,
                started_at        INTEGER,
                finished_at       INTEGER,
                opponent_deadline INTEGER
            );
            CREATE TABLE IF NOT EXISTS players (
                id       TEXT PRIMARY KEY,
                match_id TEXT NOT NULL,
                user_id  TEXT NOT NULL,
                name     TEXT NOT NULL,
                score    INTEGER NOT NULL,
                answers  TEXT NOT NULL,
                finished INTEGER NOT NULL,
                is_first INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_players_match ON players(match_id);
            CREATE INDEX IF NOT EXISTS idx_players_user ON players(user_id);",
        )?;
        Ok(MatchStore { conn })
    }

    pub fn add_question(&self, question: &Question) -> Result<(), GameError> {
        let correct_answers = serde_json::to_string(&question.correct_answers)?;
        with_busy_retry(|| {
            self.conn.execute(
                "INSERT OR REPLACE INTO questions (id, body, correct_answers, published)
                 VALUES (?1, ?2, ?3, ?4)",
                params![question.id, question.body, correct_answers, question.published],
            )
        })?;
        Ok(())
    }

    pub fn published_questions(&self) -> Result<Vec<Question>, GameError> {
        let mut statement = self
            .conn
            .prepare("SELECT id, body, correct_answers, published FROM questions WHERE published = 1")?;
        let questions = statement
            .query_map([], |row| {
                let correct_answers: String = row.get(2)?;
                Ok(Question {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    correct_answers: serde_json::from_str(&correct_answers).map_err(json_column_err)?,
                    published: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<Question>, rusqlite::Error>>()?;
        Ok(questions)
    }

    /// Writes the match row and both player rows in one transaction. Serves
    /// both first insert and every later update; there is no generic save for
    /// arbitrary entities.
    pub fn save_match(&mut self, game: &Match) -> Result<(), GameError> {
        let questions = serde_json::to_string(&game.questions)?;
        let first_answers = serde_json::to_string(&game.first_player.answers)?;
        let second_answers = match game.second_player.as_ref() {
            Some(player) => Some(serde_json::to_string(&player.answers)?),
            None => None,
        };

        let mut attempts = 0;
        loop {
            let result = (|| {
                let tx = self.conn.transaction()?;
                tx.execute(
                    "INSERT OR REPLACE INTO matches
                     (id, status, questions, pair_created_at, started_at, finished_at, opponent_deadline)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        game.id,
                        game.status.as_str(),
                        questions,
                        utc_to_millis(game.pair_created_at),
                        game.started_at.map(utc_to_millis),
                        game.finished_at.map(utc_to_millis),
                        game.opponent_deadline.map(utc_to_millis),
                    ],
                )?;
                tx.execute(
                    "INSERT OR REPLACE INTO players
                     (id, match_id, user_id, name, score, answers, finished, is_first)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                    params![
                        game.first_player.id,
                        game.id,
                        game.first_player.user_id,
                        game.first_player.name,
                        game.first_player.score,
                        first_answers,
                        game.first_player.finished,
                    ],
                )?;
                if let (Some(player), Some(answers)) =
                    (game.second_player.as_ref(), second_answers.as_ref())
                {
                    tx.execute(
                        "INSERT OR REPLACE INTO players
                         (id, match_id, user_id, name, score, answers, finished, is_first)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                        params![
                            player.id,
                            game.id,
                            player.user_id,
                            player.name,
                            player.score,
                            answers,
                            player.finished,
                        ],
                    )?;
                }
                tx.commit()
            })();
            match result {
                Err(error) if is_busy(&error) && attempts < BUSY_RETRIES => {
                    attempts += 1;
                    std::thread::sleep(BUSY_BACKOFF);
                }
                Err(error) => return Err(error.into()),
                Ok(()) => return Ok(()),
            }
        }
    }

    pub fn match_by_id(&self, match_id: &str) -> Result<Option<Match>, GameError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, status, questions, pair_created_at, started_at, finished_at, opponent_deadline
                 FROM matches WHERE id = ?1",
                params![match_id],
                |row| {
                    let status: String = row.get(1)?;
                    let questions: String = row.get(2)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        MatchStatus::from_str(&status).ok_or_else(|| status_column_err(&status))?,
                        serde_json::from_str::<Vec<Question>>(&questions).map_err(json_column_err)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()?;

        let (id, status, questions, pair_created_at, started_at, finished_at, opponent_deadline) =
            match row {
                Some(row) => row,
                None => return Ok(None),
            };

        let mut players = self.players_of(&id)?;
        let first_player = match players.first.take() {
            Some(player) => player,
            // A match row without its first player should not exist.
            None => return Err(rusqlite::Error::QueryReturnedNoRows.into()),
        };

        Ok(Some(Match {
            id,
            status,
            questions,
            first_player,
            second_player: players.second,
            pair_created_at: millis_to_utc(pair_created_at),
            started_at: started_at.map(millis_to_utc),
            finished_at: finished_at.map(millis_to_utc),
            opponent_deadline: opponent_deadline.map(millis_to_utc),
        }))
    }

    /// The match a user currently plays in or waits in, if any. Finished
    /// matches are history and never returned here.
    pub fn live_match_for_user(&self, user_id: &str) -> Result<Option<Match>, GameError> {
        let match_id: Option<String> = self
            .conn
            .query_row(
                "SELECT m.id FROM matches m
                 JOIN players p ON p.match_id = m.id
                 WHERE p.user_id = ?1 AND m.status != 'finished'
                 LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match match_id {
            Some(match_id) => self.match_by_id(&match_id),
            None => Ok(None),
        }
    }

    /// FIFO pick for the matchmaker: the pending match that has waited
    /// longest, with the id as a deterministic tie-break.
    pub fn oldest_pending_match(&self) -> Result<Option<Match>, GameError> {
        let match_id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM matches WHERE status = 'pending_second_player'
                 ORDER BY pair_created_at ASC, id ASC
                 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match match_id {
            Some(match_id) => self.match_by_id(&match_id),
            None => Ok(None),
        }
    }

    /// Active matches whose opponent deadline lies at or before `now_millis`.
    pub fn overdue_match_ids(&self, now_millis: i64) -> Result<Vec<String>, GameError> {
        let mut statement = self.conn.prepare(
            "SELECT id FROM matches
             WHERE status = 'active' AND opponent_deadline IS NOT NULL AND opponent_deadline <= ?1",
        )?;
        let ids = statement
            .query_map(params![now_millis], |row| row.get(0))?
            .collect::<Result<Vec<String>, rusqlite::Error>>()?;
        Ok(ids)
    }

    fn players_of(&self, match_id: &str) -> Result<MatchPlayers, GameError> {
        let mut statement = self.conn.prepare(
            "SELECT id, user_id, name, score, answers, finished, is_first
             FROM players WHERE match_id = ?1",
        )?;
        let rows = statement
            .query_map(params![match_id], |row| {
                let answers: String = row.get(4)?;
                let player = Player {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    score: row.get(3)?,
                    answers: serde_json::from_str(&answers).map_err(json_column_err)?,
                    finished: row.get(5)?,
                };
                let is_first: bool = row.get(6)?;
                Ok((player, is_first))
            })?
            .collect::<Result<Vec<(Player, bool)>, rusqlite::Error>>()?;

        let mut players = MatchPlayers {
            first: None,
            second: None,
        };
        for (player, is_first) in rows {
            if is_first {
                players.first = Some(player);
            } else {
                players.second = Some(player);
            }
        }
        Ok(players)
    }
}

struct MatchPlayers {
    first: Option<Player>,
    second: Option<Player>,
}

fn with_busy_retry<T>(
    mut operation: impl FnMut() -> Result<T, rusqlite::Error>,
) -> Result<T, rusqlite::Error> {
    let mut attempts = 0;
    loop {
        match operation() {
            Err(error) if is_busy(&error) && attempts < BUSY_RETRIES => {
                attempts += 1;
                std::thread::sleep(BUSY_BACKOFF);
            }
            other => return other,
        }
    }
}

fn is_busy(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::DatabaseBusy || failure.code == ErrorCode::DatabaseLocked
        }
        _ => false,
    }
}

fn json_column_err(error: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(error))
}

fn status_column_err(raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown match status: {}", raw),
        )),
    )
}
