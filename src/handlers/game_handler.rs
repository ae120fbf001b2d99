use chrono::Utc;
use log::info;

use crate::errors::GameError;
use crate::models::game::{AnswerRecord, MatchStatus};
use crate::state::GameState;

/// Grades and records one answer for the caller's active match.
///
/// The whole load-grade-save sequence runs under the match's exclusive lock,
/// because the speed-bonus and completion rules read both players' counts:
/// two "simultaneous" submissions must serialize, and the timeout sweeper
/// takes the same lock, so a late answer and a force-finish cannot both hit
/// the match. The match is reloaded after the lock is taken; a submission
/// that lost the race against a timeout fails like any other answer to a
/// finished match.
///
/// Returns the graded answer together with the caller's score after it.
pub fn submit_answer(
    state: &GameState,
    user_id: &str,
    raw_answer: &str,
) -> Result<(AnswerRecord, i32), GameError> {
    let match_id = {
        let store = state.store.lock().unwrap();
        match store.live_match_for_user(user_id)? {
            Some(game) if game.status == MatchStatus::Active => game.id,
            _ => return Err(GameError::NotInActiveMatch),
        }
    };

    let lock = state.locks.lock_for(&match_id);
    let _guard = lock.lock().unwrap();
    let mut store = state.store.lock().unwrap();

    let mut game = store
        .match_by_id(&match_id)?
        .ok_or(GameError::NoSuchMatch)?;
    let record = game.submit_answer(user_id, raw_answer, Utc::now())?;
    store.save_match(&game)?;

    let score = if game.first_player.user_id == user_id {
        game.first_player.score
    } else {
        game.second_player
            .as_ref()
            .map(|player| player.score)
            .unwrap_or(0)
    };

    if game.status == MatchStatus::Finished {
        info!("Match {} finished naturally", game.id);
        drop(store);
        state.locks.discard(&match_id);
    }

    Ok((record, score))
}
