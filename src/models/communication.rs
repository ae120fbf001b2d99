#![allow(non_camel_case_types, non_snake_case)]

use serde::{Deserialize, Serialize};

use crate::models::game::{AnswerStatus, Match, MatchStatus, Player};

/// Messages a client may send. Everything except `register` carries the auth
/// token issued by `register`; clients poll with `getCurrentMatch`, there is
/// no push delivery.
#[derive(Serialize, Deserialize, Debug)]
#[serde(untagged)]
pub enum ClientMessage {
    CommandTokenPair(CommandTokenPair),
    UnauthorizedCommand(UnauthorizedCommand),
}

#[derive(Serialize, Deserialize, Debug)]
pub enum UnauthorizedCommand {
    register { name: String },
}

#[derive(Serialize, Deserialize, Debug)]
pub enum Command {
    connect {},
    getCurrentMatch {},
    getMatchById { matchId: String },
    submitAnswer { answer: String },
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CommandTokenPair {
    #[serde(flatten)]
    pub command: Command,
    pub token: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "response", content = "data")]
pub enum Response {
    registerResponse {
        token: String,
        userId: String,
    },
    connectResponse {
        matchView: MatchView,
    },
    currentMatchResponse {
        matchView: Option<MatchView>,
    },
    matchByIdResponse {
        matchView: MatchView,
    },
    answerResponse {
        answer: AnswerView,
        score: i32,
    },
    errorResponse {
        code: String,
        errorText: String,
    },
}

/// Player-visible projection of a match.
///
/// The second player's progress and the question list stay hidden while the
/// match is still waiting for an opponent, so question content never leaks
/// before pairing completes.
#[derive(Serialize, Deserialize, Clone)]
pub struct MatchView {
    pub id: String,
    pub status: String,
    pub firstPlayerProgress: PlayerProgress,
    pub secondPlayerProgress: Option<PlayerProgress>,
    pub questions: Option<Vec<QuestionView>>,
    pub pairCreatedAt: i64,
    pub startedAt: Option<i64>,
    pub finishedAt: Option<i64>,
    pub opponentDeadline: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct PlayerProgress {
    pub userId: String,
    pub name: String,
    pub score: i32,
    pub answers: Vec<AnswerView>,
    pub finished: bool,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct AnswerView {
    pub questionId: String,
    pub correct: bool,
    pub submittedAt: i64,
}

/// Question as shown to players: body only, never the correct-answer set.
#[derive(Serialize, Deserialize, Clone)]
pub struct QuestionView {
    pub id: String,
    pub body: String,
}

impl MatchView {
    pub fn project(game: &Match) -> MatchView {
        let revealed = matches!(game.status, MatchStatus::Active | MatchStatus::Finished);
        MatchView {
            id: game.id.clone(),
            status: game.status.as_str().to_string(),
            firstPlayerProgress: PlayerProgress::project(&game.first_player),
            secondPlayerProgress: if revealed {
                game.second_player.as_ref().map(PlayerProgress::project)
            } else {
                None
            },
            questions: if revealed {
                Some(
                    game.questions
                        .iter()
                        .map(|question| QuestionView {
                            id: question.id.clone(),
                            body: question.body.clone(),
                        })
                        .collect(),
                )
            } else {
                None
            },
            pairCreatedAt: game.pair_created_at.timestamp_millis(),
            startedAt: game.started_at.map(|at| at.timestamp_millis()),
            finishedAt: game.finished_at.map(|at| at.timestamp_millis()),
            opponentDeadline: game.opponent_deadline.map(|at| at.timestamp_millis()),
        }
    }
}

impl PlayerProgress {
    fn project(player: &Player) -> PlayerProgress {
        PlayerProgress {
            userId: player.user_id.clone(),
            name: player.name.clone(),
            score: player.score,
            answers: player
                .answers
                .iter()
                .map(|answer| AnswerView {
                    questionId: answer.question_id.clone(),
                    correct: answer.status == AnswerStatus::Correct,
                    submittedAt: answer.submitted_at.timestamp_millis(),
                })
                .collect(),
            finished: player.finished,
        }
    }
}
