use rand::seq::SliceRandom;
use rand::{Rng, rng};

use quiz_core::model::{Category, Question, QuestionBank};

/// Picks the question list for a new session.
///
/// Every shuffle is a Fisher–Yates pass (`SliceRandom::shuffle`), so all
/// orderings are equally likely.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionSelector;

impl QuestionSelector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The full bank, unmodified.
    #[must_use]
    pub fn all_questions(&self, bank: &QuestionBank) -> Vec<Question> {
        bank.all().to_vec()
    }

    /// Questions for a practice run.
    ///
    /// - With a category: that category's questions in bank order.
    /// - Without one: the whole bank, shuffled.
    /// - A category with no questions falls back to the bank's first question
    ///   so the session is never empty.
    #[must_use]
    pub fn select_for_practice(
        &self,
        bank: &QuestionBank,
        category: Option<Category>,
    ) -> Vec<Question> {
        self.select_for_practice_with(bank, category, &mut rng())
    }

    /// Same as [`Self::select_for_practice`] with a caller-provided RNG.
    pub fn select_for_practice_with<R: Rng + ?Sized>(
        &self,
        bank: &QuestionBank,
        category: Option<Category>,
        rng: &mut R,
    ) -> Vec<Question> {
        let Some(category) = category else {
            let mut questions = bank.all().to_vec();
            questions.shuffle(rng);
            return questions;
        };

        let filtered: Vec<Question> = bank.in_category(category).cloned().collect();
        if filtered.is_empty() {
            tracing::debug!(%category, "no questions in category, falling back to first question");
            return bank.first().cloned().into_iter().collect();
        }
        filtered
    }

    /// A random draw of `size` distinct questions, or the whole bank shuffled
    /// when it is smaller than `size`.
    #[must_use]
    pub fn select_for_exam(&self, bank: &QuestionBank, size: u32) -> Vec<Question> {
        self.select_for_exam_with(bank, size, &mut rng())
    }

    /// Same as [`Self::select_for_exam`] with a caller-provided RNG.
    pub fn select_for_exam_with<R: Rng + ?Sized>(
        &self,
        bank: &QuestionBank,
        size: u32,
        rng: &mut R,
    ) -> Vec<Question> {
        let take = usize::try_from(size).unwrap_or(usize::MAX).min(bank.len());
        let mut questions = bank.all().to_vec();
        let (picked, _) = questions.partial_shuffle(rng, take);
        picked.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashMap, HashSet};

    fn ids(questions: &[Question]) -> Vec<&str> {
        questions.iter().map(|q| q.id().as_str()).collect()
    }

    #[test]
    fn exam_draw_is_distinct_and_capped() {
        let bank = QuestionBank::builtin();
        let selector = QuestionSelector::new();
        let mut rng = StdRng::seed_from_u64(7);

        for size in [0_u32, 1, 3, 5, 50] {
            let picked = selector.select_for_exam_with(&bank, size, &mut rng);
            let expected = usize::try_from(size).unwrap().min(bank.len());
            assert_eq!(picked.len(), expected);

            let unique: HashSet<&QuestionId> = picked.iter().map(Question::id).collect();
            assert_eq!(unique.len(), picked.len());
            assert!(picked.iter().all(|q| bank.get(q.id()).is_some()));
        }
    }

    #[test]
    fn practice_category_keeps_bank_order() {
        let bank = QuestionBank::from_json(
            r#"[
                {"id": "a", "category": "Attitude", "question": "Q1", "options": ["x", "y"], "correctAnswerIndex": 0, "explanation": ""},
                {"id": "b", "category": "Alertness", "question": "Q2", "options": ["x", "y"], "correctAnswerIndex": 0, "explanation": ""},
                {"id": "c", "category": "Attitude", "question": "Q3", "options": ["x", "y"], "correctAnswerIndex": 0, "explanation": ""}
            ]"#,
        )
        .unwrap();

        let picked = QuestionSelector::new().select_for_practice(&bank, Some(Category::Attitude));
        assert_eq!(ids(&picked), vec!["a", "c"]);
    }

    #[test]
    fn empty_category_falls_back_to_first_question() {
        let bank = QuestionBank::builtin();
        let picked =
            QuestionSelector::new().select_for_practice(&bank, Some(Category::VehicleLoading));
        assert_eq!(ids(&picked), vec!["1"]);
    }

    #[test]
    fn unfiltered_practice_is_a_permutation_of_the_bank() {
        let bank = QuestionBank::builtin();
        let mut rng = StdRng::seed_from_u64(42);
        let mut picked =
            QuestionSelector::new().select_for_practice_with(&bank, None, &mut rng);
        assert_eq!(picked.len(), bank.len());

        picked.sort_by(|a, b| a.id().cmp(b.id()));
        assert_eq!(ids(&picked), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn exam_shuffle_is_close_to_uniform() {
        let bank = QuestionBank::from_json(
            r#"[
                {"id": "a", "category": "Attitude", "question": "Q1", "options": ["x", "y"], "correctAnswerIndex": 0, "explanation": ""},
                {"id": "b", "category": "Attitude", "question": "Q2", "options": ["x", "y"], "correctAnswerIndex": 0, "explanation": ""},
                {"id": "c", "category": "Attitude", "question": "Q3", "options": ["x", "y"], "correctAnswerIndex": 0, "explanation": ""}
            ]"#,
        )
        .unwrap();
        let selector = QuestionSelector::new();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<String, u32> = HashMap::new();

        for _ in 0..6_000 {
            let picked = selector.select_for_exam_with(&bank, 3, &mut rng);
            *counts.entry(ids(&picked).concat()).or_default() += 1;
        }

        // 6 orderings, ~1000 each; a comparator-sort shuffle skews well past this band.
        assert_eq!(counts.len(), 6);
        for (order, count) in counts {
            assert!((850..=1_150).contains(&count), "{order}: {count}");
        }
    }
}
