use chrono::Utc;
use futures_timer::Delay;
use log::{info, warn};
use std::time::Duration;

use crate::errors::GameError;
use crate::models::game::MatchStatus;
use crate::state::GameState;

/// How often the sweeper wakes up. Scheduling granularity only; correctness
/// comes from the deadline check under the match lock.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Background task that force-finishes matches whose slower player ran out
/// of grace time. Holds no state of its own between rounds.
pub async fn run_timeout_sweeper(state: GameState) {
    info!("Timeout sweeper running every {:?}", SWEEP_PERIOD);
    loop {
        Delay::new(SWEEP_PERIOD).await;
        match sweep_once(&state) {
            Ok(0) => (),
            Ok(count) => info!("Force-finished {} overdue match(es)", count),
            Err(error) => warn!("Sweep failed: {}", error),
        }
    }
}

/// One sweep round: scan for overdue active matches, then finalize each one
/// under its own match lock. The deadline is re-checked after the lock is
/// taken, so a final answer that slipped in first wins and the sweep backs
/// off.
pub fn sweep_once(state: &GameState) -> Result<usize, GameError> {
    let now = Utc::now();
    let overdue = {
        let store = state.store.lock().unwrap();
        store.overdue_match_ids(now.timestamp_millis())?
    };

    let mut finished = 0;
    for match_id in overdue {
        let lock = state.locks.lock_for(&match_id);
        let _guard = lock.lock().unwrap();
        let mut store = state.store.lock().unwrap();

        let mut game = match store.match_by_id(&match_id)? {
            Some(game) => game,
            None => continue,
        };
        if game.deadline_elapsed(now) {
            game.force_finish(Utc::now());
            store.save_match(&game)?;
            finished += 1;
            info!("Match {} force-finished after deadline", match_id);
        }

        let done = game.status == MatchStatus::Finished;
        drop(store);
        if done {
            state.locks.discard(&match_id);
        }
    }
    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{game_handler, matchmaker};
    use crate::models::game::QUESTIONS_PER_MATCH;
    use crate::models::question::Question;
    use crate::storage::store::MatchStore;
    use chrono::Duration as ChronoDuration;

    fn seeded_state() -> GameState {
        let store = MatchStore::open_in_memory().unwrap();
        for index in 0..QUESTIONS_PER_MATCH {
            let mut question =
                Question::new(&format!("question {}", index), vec!["yes".to_string()]);
            question.published = true;
            store.add_question(&question).unwrap();
        }
        GameState::new(store)
    }

    fn active_match_with_finished_first_player(state: &GameState) -> String {
        matchmaker::connect(state, "user-a", "Alice").unwrap();
        let game = matchmaker::connect(state, "user-b", "Bob").unwrap();
        for _ in 0..QUESTIONS_PER_MATCH {
            game_handler::submit_answer(state, "user-a", "yes").unwrap();
        }
        game.id
    }

    fn backdate_deadline(state: &GameState, match_id: &str, seconds: i64) {
        let mut store = state.store.lock().unwrap();
        let mut game = store.match_by_id(match_id).unwrap().unwrap();
        let deadline = game.opponent_deadline.unwrap();
        game.opponent_deadline = Some(deadline - ChronoDuration::seconds(seconds));
        store.save_match(&game).unwrap();
    }

    #[test]
    fn fresh_deadlines_are_left_alone() {
        let state = seeded_state();
        let match_id = active_match_with_finished_first_player(&state);

        assert_eq!(sweep_once(&state).unwrap(), 0);

        let store = state.store.lock().unwrap();
        let game = store.match_by_id(&match_id).unwrap().unwrap();
        assert_eq!(game.status, MatchStatus::Active);
    }

    #[test]
    fn overdue_match_is_force_finished_without_bonus() {
        let state = seeded_state();
        let match_id = active_match_with_finished_first_player(&state);
        backdate_deadline(&state, &match_id, 3600);

        assert_eq!(sweep_once(&state).unwrap(), 1);

        let store = state.store.lock().unwrap();
        let game = store.match_by_id(&match_id).unwrap().unwrap();
        assert_eq!(game.status, MatchStatus::Finished);
        assert!(game.finished_at.is_some());
        assert!(game.first_player.finished);
        assert!(game.second_player.as_ref().unwrap().finished);
        // Score stays at the 5 correct answers: the sweep grants no bonus,
        // and the slower player keeps the single answer they made.
        assert_eq!(game.first_player.score, QUESTIONS_PER_MATCH as i32);
        assert_eq!(game.second_player.as_ref().unwrap().answers.len(), 0);
    }

    #[test]
    fn swept_match_rejects_late_answers() {
        let state = seeded_state();
        let match_id = active_match_with_finished_first_player(&state);
        backdate_deadline(&state, &match_id, 3600);
        sweep_once(&state).unwrap();

        let late = game_handler::submit_answer(&state, "user-b", "yes");
        assert!(matches!(
            late,
            Err(crate::errors::GameError::NotInActiveMatch)
        ));
    }

    #[test]
    fn sweep_is_idempotent() {
        let state = seeded_state();
        let match_id = active_match_with_finished_first_player(&state);
        backdate_deadline(&state, &match_id, 3600);

        assert_eq!(sweep_once(&state).unwrap(), 1);
        assert_eq!(sweep_once(&state).unwrap(), 0);
    }
}
