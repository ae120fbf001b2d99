use log::{info, warn};
use uuid::Uuid;

use crate::errors::GameError;
use crate::handlers::{game_handler, matchmaker, view_handler};
use crate::jwtoken::{decode_token, generate_token};
use crate::models::communication::{
    AnswerView, Command, CommandTokenPair, MatchView, Response, UnauthorizedCommand,
};
use crate::server_messages::{send_message, PeerMap};
use crate::state::GameState;

/// `register` is the only command that works without a token: it mints a
/// fresh user id and hands back the signed identity every other command
/// must carry.
pub fn execute_unauthorized_command(
    command: UnauthorizedCommand,
    peers: &PeerMap,
    connection_id: &str,
) {
    match command {
        UnauthorizedCommand::register { name } => {
            info!("Register request on connection {}", connection_id);
            let user_id = Uuid::new_v4().to_string();
            let response = match generate_token(&user_id, &name) {
                Ok(token) => Response::registerResponse {
                    token,
                    userId: user_id,
                },
                Err(error) => {
                    warn!("Token generation failed: {}", error);
                    Response::errorResponse {
                        code: "SERVER_ERROR".to_string(),
                        errorText: error.to_string(),
                    }
                }
            };
            send_message(response, peers, connection_id);
        }
    }
}

pub fn execute_authorized_command(
    pair: CommandTokenPair,
    state: &GameState,
    peers: &PeerMap,
    connection_id: &str,
) {
    let claims = match decode_token(&pair.token) {
        Ok(data) => data.claims,
        Err(error) => {
            warn!("Token rejected on connection {}: {}", connection_id, error);
            let response = Response::errorResponse {
                code: "INVALID_TOKEN".to_string(),
                errorText: error.to_string(),
            };
            send_message(response, peers, connection_id);
            return;
        }
    };

    let result = match pair.command {
        Command::connect {} => {
            info!("Connect request from user {}", claims.id);
            matchmaker::connect(state, &claims.id, &claims.name)
                .map(|game| Response::connectResponse {
                    matchView: MatchView::project(&game),
                })
        }
        Command::getCurrentMatch {} => view_handler::current_match(state, &claims.id)
            .map(|view| Response::currentMatchResponse { matchView: view }),
        Command::getMatchById { matchId } => {
            view_handler::match_by_id(state, &claims.id, &matchId)
                .map(|view| Response::matchByIdResponse { matchView: view })
        }
        Command::submitAnswer { answer } => {
            info!("Answer from user {}", claims.id);
            game_handler::submit_answer(state, &claims.id, &answer).map(|(record, score)| {
                Response::answerResponse {
                    answer: AnswerView {
                        questionId: record.question_id.clone(),
                        correct: record.status == crate::models::game::AnswerStatus::Correct,
                        submittedAt: record.submitted_at.timestamp_millis(),
                    },
                    score,
                }
            })
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            warn!("Command failed for user {}: {}", claims.id, error);
            error_response(&error)
        }
    };
    send_message(response, peers, connection_id);
}

fn error_response(error: &GameError) -> Response {
    Response::errorResponse {
        code: error.code().to_string(),
        errorText: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_kind_has_a_stable_code() {
        assert_eq!(GameError::AlreadyInMatch.code(), "ALREADY_IN_MATCH");
        assert_eq!(GameError::Forbidden.code(), "FORBIDDEN");
        assert_eq!(GameError::NotInActiveMatch.code(), "NOT_IN_ACTIVE_MATCH");
        assert_eq!(GameError::AlreadyFinished.code(), "ALREADY_FINISHED");
        assert_eq!(GameError::NoSuchMatch.code(), "NO_SUCH_MATCH");
        assert_eq!(GameError::InvalidMatchId.code(), "INVALID_MATCH_ID");
        assert_eq!(
            GameError::InsufficientQuestions {
                available: 0,
                required: 5
            }
            .code(),
            "INSUFFICIENT_QUESTIONS"
        );
    }
}
