use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A trivia question from the published pool.
///
/// `correct_answers` is a set of exact strings; grading is case- and
/// whitespace-sensitive membership, nothing fuzzier. Once a question has been
/// drawn into a match the match keeps its own snapshot, so edits to the pool
/// copy never change how an in-flight match grades.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Question {
    pub id: String,
    pub body: String,
    pub correct_answers: HashSet<String>,
    pub published: bool,
}

impl Question {
    pub fn new(body: &str, correct_answers: Vec<String>) -> Question {
        Question {
            id: Uuid::new_v4().to_string(),
            body: body.to_string(),
            correct_answers: correct_answers.into_iter().collect(),
            published: false,
        }
    }

    pub fn accepts(&self, raw_answer: &str) -> bool {
        self.correct_answers.contains(raw_answer)
    }
}

/// On-disk seed format: a named pack of questions, loaded once at startup.
#[derive(Serialize, Deserialize)]
pub struct QuestionPack {
    pub name: String,
    pub questions: Vec<PackedQuestion>,
}

#[derive(Serialize, Deserialize)]
pub struct PackedQuestion {
    pub body: String,
    pub correct_answers: Vec<String>,
}

impl QuestionPack {
    /// Turns pack entries into published pool questions with fresh ids.
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
            .into_iter()
            .map(|entry| {
                let mut question = Question::new(&entry.body, entry.correct_answers);
                question.published = true;
                question
            })
            .collect()
    }
}
