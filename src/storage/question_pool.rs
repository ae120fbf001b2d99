use rand::seq::SliceRandom;

use crate::errors::GameError;
use crate::models::question::Question;
use crate::storage::store::MatchStore;

/// Uniform random sample of `count` distinct published questions. The order
/// of the returned sequence is fixed from here on: it becomes the match's
/// question snapshot and every player answers in exactly this order.
pub fn draw(store: &MatchStore, count: usize) -> Result<Vec<Question>, GameError> {
    let published = store.published_questions()?;
    if published.len() < count {
        return Err(GameError::InsufficientQuestions {
            available: published.len(),
            required: count,
        });
    }
    let mut rng = rand::thread_rng();
    Ok(published
        .choose_multiple(&mut rng, count)
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::QUESTIONS_PER_MATCH;
    use std::collections::HashSet;

    fn seed(store: &MatchStore, total: usize) {
        for index in 0..total {
            let mut question = Question::new(&format!("question {}", index), vec!["yes".to_string()]);
            question.published = true;
            store.add_question(&question).unwrap();
        }
    }

    #[test]
    fn draw_returns_distinct_published_questions() {
        let store = MatchStore::open_in_memory().unwrap();
        seed(&store, 12);

        let drawn = draw(&store, QUESTIONS_PER_MATCH).unwrap();
        assert_eq!(drawn.len(), QUESTIONS_PER_MATCH);

        let ids: HashSet<&String> = drawn.iter().map(|question| &question.id).collect();
        assert_eq!(ids.len(), QUESTIONS_PER_MATCH);
    }

    #[test]
    fn draw_fails_on_a_thin_pool() {
        let store = MatchStore::open_in_memory().unwrap();
        seed(&store, QUESTIONS_PER_MATCH - 1);

        let result = draw(&store, QUESTIONS_PER_MATCH);
        assert!(matches!(
            result,
            Err(GameError::InsufficientQuestions {
                available: 4,
                required: 5
            })
        ));
    }
}
