// src/handlers/material_test.rs

//! Practice test attached to a single material. Unlike the final exam every
//! question must be answered before submitting.

use crate::{
    api::MaterialBackend,
    error::ClientError,
    models::{
        progress::{MaterialTestResult, ProgressRecord, SubmitMaterialTestRequest},
        question::Question,
        session::AnswerMap,
    },
};

#[derive(Debug)]
pub struct PracticeTest {
    material_id: i64,
    questions: Vec<Question>,
    answers: AnswerMap,
    progress: Option<ProgressRecord>,
    result: Option<MaterialTestResult>,
}

impl PracticeTest {
    /// Fetches the material's tests and its current progress.
    ///
    /// A progress failure is not fatal: the test can still be taken.
    pub async fn load<B>(api: &B, material_id: i64) -> Result<Self, ClientError>
    where
        B: MaterialBackend + ?Sized,
    {
        let questions = api
            .tests_by_material(material_id)
            .await?
            .into_iter()
            .map(Question::from)
            .collect();

        let progress = match api.material_progress(material_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Progress for material {} unavailable: {}", material_id, e);
                None
            }
        };

        Ok(Self {
            material_id,
            questions,
            answers: AnswerMap::new(),
            progress,
            result: None,
        })
    }

    pub fn material_id(&self) -> i64 {
        self.material_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn progress(&self) -> Option<&ProgressRecord> {
        self.progress.as_ref()
    }

    pub fn result(&self) -> Option<&MaterialTestResult> {
        self.result.as_ref()
    }

    /// Taken from the server's `test_submitted` flag as-is.
    pub fn already_submitted(&self) -> bool {
        self.progress.as_ref().is_some_and(|p| p.test_submitted)
    }

    pub fn select_answer(
        &mut self,
        question_id: i64,
        option: impl Into<String>,
    ) -> Result<(), ClientError> {
        let option = option.into();
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                ClientError::Validation(format!("Test {} is not part of this material", question_id))
            })?;

        if !question.has_option(&option) {
            return Err(ClientError::Validation(format!(
                "'{}' is not an option of test {}",
                option, question_id
            )));
        }

        self.answers.insert(question_id, option);
        Ok(())
    }

    /// Ids of questions still without an answer, in display order.
    pub fn unanswered(&self) -> Vec<i64> {
        self.questions
            .iter()
            .map(|q| q.id)
            .filter(|id| !self.answers.contains_key(id))
            .collect()
    }

    /// Submits the answers, then re-reads the material's progress.
    pub async fn submit<B>(&mut self, api: &B) -> Result<&MaterialTestResult, ClientError>
    where
        B: MaterialBackend + ?Sized,
    {
        if self.questions.is_empty() {
            return Err(ClientError::Validation(
                "This material has no tests".to_string(),
            ));
        }

        let missing = self.unanswered();
        if !missing.is_empty() {
            return Err(ClientError::Validation(format!(
                "Please answer all questions ({} of {} unanswered)",
                missing.len(),
                self.questions.len()
            )));
        }

        let request = SubmitMaterialTestRequest {
            material_id: self.material_id,
            answers: self.answers.clone(),
        };
        let result = api.submit_material_test(&request).await?;
        tracing::info!(
            "Practice test for material {}: {}/{}",
            self.material_id,
            result.correct_count,
            result.total_tests
        );

        match api.material_progress(self.material_id).await {
            Ok(record) => self.progress = Some(record),
            Err(e) => tracing::warn!("Progress refresh after practice test failed: {}", e),
        }

        let result = &*self.result.insert(result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::ProgressBackend,
        models::{
            material::Material,
            progress::{CompletionEntry, MarkCompleteRequest, MaterialTestAnswer},
            question::Test,
        },
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMaterial {
        submitted: Mutex<Vec<SubmitMaterialTestRequest>>,
        progress_calls: Mutex<u32>,
    }

    #[async_trait]
    impl ProgressBackend for FakeMaterial {
        async fn material_progress(&self, material_id: i64) -> Result<ProgressRecord, ClientError> {
            *self.progress_calls.lock().unwrap() += 1;
            let submitted = !self.submitted.lock().unwrap().is_empty();
            Ok(ProgressRecord {
                test_submitted: submitted,
                total_tests: 2,
                completed_tests: if submitted { 2 } else { 0 },
                ..ProgressRecord::empty(material_id)
            })
        }

        async fn mark_complete(
            &self,
            _request: &MarkCompleteRequest,
        ) -> Result<CompletionEntry, ClientError> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl MaterialBackend for FakeMaterial {
        async fn material(&self, _id: i64) -> Result<Material, ClientError> {
            unimplemented!()
        }

        async fn tests_by_material(&self, material_id: i64) -> Result<Vec<Test>, ClientError> {
            Ok((1..=2)
                .map(|id| Test {
                    id,
                    material_id: Some(material_id),
                    question: format!("Test {}", id),
                    options: vec!["yes".into(), "no".into()],
                    correct_answer: None,
                })
                .collect())
        }

        async fn submit_material_test(
            &self,
            request: &SubmitMaterialTestRequest,
        ) -> Result<MaterialTestResult, ClientError> {
            self.submitted.lock().unwrap().push(request.clone());
            Ok(MaterialTestResult {
                correct_count: 1,
                total_tests: 2,
                results: vec![MaterialTestAnswer {
                    test_id: 1,
                    question: "Test 1".into(),
                    user_answer: Some("yes".into()),
                    correct_answer: "yes".into(),
                    is_correct: true,
                }],
            })
        }
    }

    #[tokio::test]
    async fn every_question_needs_an_answer() {
        let api = FakeMaterial::default();
        let mut test = PracticeTest::load(&api, 3).await.unwrap();
        assert!(!test.already_submitted());

        test.select_answer(1, "yes").unwrap();
        assert_eq!(test.unanswered(), vec![2]);

        let err = test.submit(&api).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(api.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_refreshes_progress() {
        let api = FakeMaterial::default();
        let mut test = PracticeTest::load(&api, 3).await.unwrap();
        test.select_answer(1, "yes").unwrap();
        test.select_answer(2, "no").unwrap();

        let result = test.submit(&api).await.unwrap();
        assert_eq!(result.percentage(), 50.0);

        assert!(test.already_submitted());
        assert_eq!(test.progress().unwrap().tests_label(), "2/2");
        assert_eq!(*api.progress_calls.lock().unwrap(), 2);

        let sent = api.submitted.lock().unwrap();
        assert_eq!(sent[0].material_id, 3);
        assert_eq!(sent[0].answers.len(), 2);
    }

    #[tokio::test]
    async fn unknown_option_is_rejected() {
        let api = FakeMaterial::default();
        let mut test = PracticeTest::load(&api, 3).await.unwrap();

        assert!(test.select_answer(1, "maybe").is_err());
        assert!(test.select_answer(7, "yes").is_err());
        assert!(test.answers().is_empty());
    }
}
