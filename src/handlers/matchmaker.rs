use chrono::Utc;
use log::info;

use crate::errors::GameError;
use crate::models::game::{Match, QUESTIONS_PER_MATCH};
use crate::state::GameState;
use crate::storage::question_pool;

/// Puts the user into a match: joins the oldest pending match as the second
/// player, or creates a fresh pending one when nobody is waiting.
///
/// Runs entirely under the pairing lock, so the already-in-match check and
/// the join are one atomic unit: two simultaneous callers can never both
/// become the second player of the same pending match, and a user cannot
/// slip into two live matches at once.
pub fn connect(state: &GameState, user_id: &str, name: &str) -> Result<Match, GameError> {
    let _pairing = state.locks.pairing_guard();
    let mut store = state.store.lock().unwrap();

    if store.live_match_for_user(user_id)?.is_some() {
        return Err(GameError::AlreadyInMatch);
    }

    let now = Utc::now();
    if let Some(mut pending) = store.oldest_pending_match()? {
        pending.attach_second_player(user_id, name, now)?;
        store.save_match(&pending)?;
        info!("User {} joined match {}", user_id, pending.id);
        return Ok(pending);
    }

    let questions = question_pool::draw(&store, QUESTIONS_PER_MATCH)?;
    let game = Match::create(user_id, name, questions, now);
    store.save_match(&game)?;
    info!("User {} opened pending match {}", user_id, game.id);
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::MatchStatus;
    use crate::models::question::Question;
    use crate::storage::store::MatchStore;
    use std::collections::HashSet;
    use std::thread;

    fn seeded_state(questions: usize) -> GameState {
        let store = MatchStore::open_in_memory().unwrap();
        for index in 0..questions {
            let mut question =
                Question::new(&format!("question {}", index), vec!["yes".to_string()]);
            question.published = true;
            store.add_question(&question).unwrap();
        }
        GameState::new(store)
    }

    #[test]
    fn first_connect_opens_a_pending_match() {
        let state = seeded_state(8);
        let game = connect(&state, "user-a", "Alice").unwrap();

        assert_eq!(game.status, MatchStatus::PendingSecondPlayer);
        assert_eq!(game.questions.len(), QUESTIONS_PER_MATCH);
        assert_eq!(game.first_player.user_id, "user-a");
        assert!(game.second_player.is_none());
    }

    #[test]
    fn second_connect_joins_and_activates() {
        let state = seeded_state(8);
        let pending = connect(&state, "user-a", "Alice").unwrap();
        let joined = connect(&state, "user-b", "Bob").unwrap();

        assert_eq!(joined.id, pending.id);
        assert_eq!(joined.status, MatchStatus::Active);
        assert!(joined.started_at.is_some());
        assert_eq!(joined.second_player.unwrap().user_id, "user-b");
        // Both players see the same question set.
        assert_eq!(
            joined.questions.iter().map(|q| &q.id).collect::<Vec<_>>(),
            pending.questions.iter().map(|q| &q.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn a_user_holds_at_most_one_live_match() {
        let state = seeded_state(8);
        connect(&state, "user-a", "Alice").unwrap();

        let again = connect(&state, "user-a", "Alice");
        assert!(matches!(again, Err(GameError::AlreadyInMatch)));

        // Still blocked while the match is active.
        connect(&state, "user-b", "Bob").unwrap();
        let third = connect(&state, "user-a", "Alice");
        assert!(matches!(third, Err(GameError::AlreadyInMatch)));
    }

    #[test]
    fn thin_question_pool_refuses_match_creation() {
        let state = seeded_state(QUESTIONS_PER_MATCH - 1);
        let result = connect(&state, "user-a", "Alice");
        assert!(matches!(
            result,
            Err(GameError::InsufficientQuestions { .. })
        ));

        // Nothing half-created is left behind.
        let store = state.store.lock().unwrap();
        assert!(store.live_match_for_user("user-a").unwrap().is_none());
    }

    #[test]
    fn oldest_pending_match_is_joined_first() {
        let state = seeded_state(12);
        let first = connect(&state, "user-a", "Alice").unwrap();
        // user-a's match is pending, so user-b's own connect makes a second
        // pending match only after joining is impossible for the same user.
        let joined = connect(&state, "user-b", "Bob").unwrap();
        assert_eq!(joined.id, first.id);

        let third = connect(&state, "user-c", "Carol").unwrap();
        assert_eq!(third.status, MatchStatus::PendingSecondPlayer);
        let fourth = connect(&state, "user-d", "Dave").unwrap();
        assert_eq!(fourth.id, third.id);
    }

    #[test]
    fn concurrent_connects_from_one_user_yield_one_match() {
        let state = seeded_state(8);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let state = state.clone();
            handles.push(thread::spawn(move || connect(&state, "user-a", "Alice")));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(GameError::AlreadyInMatch))));
    }

    #[test]
    fn concurrent_joins_do_not_double_fill_a_pending_match() {
        let state = seeded_state(16);
        let pending = connect(&state, "user-a", "Alice").unwrap();

        let mut handles = Vec::new();
        for user in ["user-b", "user-c"] {
            let state = state.clone();
            handles.push(thread::spawn(move || connect(&state, user, user)));
        }
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let store = state.store.lock().unwrap();
        let activated = store.match_by_id(&pending.id).unwrap().unwrap();
        assert_eq!(activated.status, MatchStatus::Active);

        let players: HashSet<String> = [
            activated.first_player.user_id.clone(),
            activated.second_player.as_ref().unwrap().user_id.clone(),
        ]
        .into_iter()
        .collect();
        assert_eq!(players.len(), 2);
        assert!(players.contains("user-a"));

        // The loser of the race opened its own pending match instead.
        assert!(store.oldest_pending_match().unwrap().is_some());
    }
}
