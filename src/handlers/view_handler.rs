use uuid::Uuid;

use crate::errors::GameError;
use crate::models::communication::MatchView;
use crate::models::game::Match;
use crate::state::GameState;

/// Projects a match for a requesting user. Only the two players of a match
/// may view it; the same policy applies to "get by id" and "get current".
pub fn view_for(game: &Match, user_id: &str) -> Result<MatchView, GameError> {
    if !game.is_participant(user_id) {
        return Err(GameError::Forbidden);
    }
    Ok(MatchView::project(game))
}

/// The user's pending or active match, if any. Finished matches drop out of
/// here; clients keep their match id and poll `get_match_by_id` for results.
pub fn current_match(state: &GameState, user_id: &str) -> Result<Option<MatchView>, GameError> {
    let store = state.store.lock().unwrap();
    match store.live_match_for_user(user_id)? {
        Some(game) => Ok(Some(view_for(&game, user_id)?)),
        None => Ok(None),
    }
}

pub fn match_by_id(
    state: &GameState,
    user_id: &str,
    match_id: &str,
) -> Result<MatchView, GameError> {
    if Uuid::parse_str(match_id).is_err() {
        return Err(GameError::InvalidMatchId);
    }
    let store = state.store.lock().unwrap();
    let game = store
        .match_by_id(match_id)?
        .ok_or(GameError::NoSuchMatch)?;
    view_for(&game, user_id)
}
