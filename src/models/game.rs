use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::GameError;
use crate::models::question::Question;

/// Every match plays the same fixed number of questions.
pub const QUESTIONS_PER_MATCH: usize = 5;

/// Once one player has answered everything, the opponent gets this long
/// before the timeout sweeper force-finishes the match.
pub const ANSWER_GRACE_SECONDS: i64 = 10;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    PendingSecondPlayer,
    Active,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::PendingSecondPlayer => "pending_second_player",
            MatchStatus::Active => "active",
            MatchStatus::Finished => "finished",
        }
    }

    pub fn from_str(raw: &str) -> Option<MatchStatus> {
        match raw {
            "pending_second_player" => Some(MatchStatus::PendingSecondPlayer),
            "active" => Some(MatchStatus::Active),
            "finished" => Some(MatchStatus::Finished),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerStatus {
    Correct,
    Incorrect,
}

/// One graded submission. Immutable once created; its position in the
/// player's answer list says which of the five questions it answered.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnswerRecord {
    pub question_id: String,
    pub status: AnswerStatus,
    pub submitted_at: DateTime<Utc>,
}

/// A user's participation in one match.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Player {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub score: i32,
    pub answers: Vec<AnswerRecord>,
    pub finished: bool,
}

impl Player {
    pub fn new(user_id: &str, name: &str) -> Player {
        Player {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            score: 0,
            answers: Vec::new(),
            finished: false,
        }
    }
}

/// The match aggregate: both players plus the question snapshot taken at
/// draw time. All gameplay rules live here; handlers only load, call and
/// save under the match lock.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Match {
    pub id: String,
    pub status: MatchStatus,
    pub questions: Vec<Question>,
    pub first_player: Player,
    pub second_player: Option<Player>,
    pub pair_created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub opponent_deadline: Option<DateTime<Utc>>,
}

impl Match {
    /// A fresh match waiting for its second player. `questions` is the
    /// five-element draw from the pool, kept verbatim as the snapshot.
    pub fn create(user_id: &str, name: &str, questions: Vec<Question>, now: DateTime<Utc>) -> Match {
        Match {
            id: Uuid::new_v4().to_string(),
            status: MatchStatus::PendingSecondPlayer,
            questions,
            first_player: Player::new(user_id, name),
            second_player: None,
            pair_created_at: now,
            started_at: None,
            finished_at: None,
            opponent_deadline: None,
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.first_player.user_id == user_id
            || self
                .second_player
                .as_ref()
                .map(|player| player.user_id == user_id)
                .unwrap_or(false)
    }

    /// Attaches the joining user and starts the match. Only legal while the
    /// match is still waiting for a second player.
    pub fn attach_second_player(
        &mut self,
        user_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        if self.status != MatchStatus::PendingSecondPlayer {
            return Err(GameError::NoSuchMatch);
        }
        self.second_player = Some(Player::new(user_id, name));
        self.status = MatchStatus::Active;
        self.started_at = Some(now);
        Ok(())
    }

    /// Grades and records one answer for `user_id`.
    ///
    /// The speed bonus is decided on the counts as they stand *before* this
    /// answer is appended: the opponent already at five and the caller at
    /// four means the opponent finished first, and earns +1 unless their
    /// score is zero. Checking after the append would make both players look
    /// simultaneous and lose the who-was-first signal.
    pub fn submit_answer(
        &mut self,
        user_id: &str,
        raw_answer: &str,
        now: DateTime<Utc>,
    ) -> Result<AnswerRecord, GameError> {
        if self.status != MatchStatus::Active {
            return Err(GameError::NotInActiveMatch);
        }

        let is_first = if self.first_player.user_id == user_id {
            true
        } else if self
            .second_player
            .as_ref()
            .map(|player| player.user_id == user_id)
            .unwrap_or(false)
        {
            false
        } else {
            return Err(GameError::NotInActiveMatch);
        };

        let question_index = if is_first {
            self.first_player.answers.len()
        } else {
            self.second_player.as_ref().unwrap().answers.len()
        };
        if question_index >= QUESTIONS_PER_MATCH {
            return Err(GameError::AlreadyFinished);
        }

        // Players answer in draw order, no skipping: the pending question is
        // always the one at the count of already-accepted answers. A snapshot
        // shorter than five answers means a corrupt row, not a panic.
        let question = self
            .questions
            .get(question_index)
            .cloned()
            .ok_or(GameError::CorruptSnapshot)?;

        let second = self
            .second_player
            .as_mut()
            .ok_or(GameError::NotInActiveMatch)?;
        let (player, opponent) = if is_first {
            (&mut self.first_player, second)
        } else {
            (second, &mut self.first_player)
        };

        if opponent.answers.len() == QUESTIONS_PER_MATCH
            && player.answers.len() == QUESTIONS_PER_MATCH - 1
            && opponent.score != 0
        {
            opponent.score += 1;
        }

        let status = if question.accepts(raw_answer) {
            AnswerStatus::Correct
        } else {
            AnswerStatus::Incorrect
        };
        let record = AnswerRecord {
            question_id: question.id.clone(),
            status,
            submitted_at: now,
        };
        player.answers.push(record.clone());
        if status == AnswerStatus::Correct {
            player.score += 1;
        }

        let player_done = player.answers.len() == QUESTIONS_PER_MATCH;
        let opponent_done = opponent.answers.len() == QUESTIONS_PER_MATCH;

        if player_done && opponent_done {
            self.finish(now);
        } else if player_done && self.opponent_deadline.is_none() {
            // Armed exactly once, the moment the first player gets through
            // all five questions.
            self.opponent_deadline = Some(now + Duration::seconds(ANSWER_GRACE_SECONDS));
        }

        Ok(record)
    }

    /// True when the slower player's grace period has run out.
    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == MatchStatus::Active
            && self
                .opponent_deadline
                .map(|deadline| deadline <= now)
                .unwrap_or(false)
    }

    /// Finalizes an overdue match. No bonus is granted here: the sweeper only
    /// runs when the slower player never finished, and the faster player's
    /// bonus is only ever granted on the slower player's final submission.
    pub fn force_finish(&mut self, now: DateTime<Utc>) {
        self.finish(now);
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.status = MatchStatus::Finished;
        self.finished_at = Some(now);
        self.first_player.finished = true;
        if let Some(second) = self.second_player.as_mut() {
            second.finished = true;
        }
    }
}
