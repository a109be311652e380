#[cfg(test)]
mod tests {
    use crate::config::QuizConfig;
    use crate::errors::{GenerationError, NotFoundError, QuizError, StateError};
    use crate::quiz_interface::QuizService;
    use crate::quiz_interface::{CreateSessionRequest, SessionRequest, SubmitAnswerRequest};
    use crate::session::GameStatus;
    use crate::tests::common::{correct_answer_for, started_session, test_service, wrong_answer};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn submit(session_id: &str, answer: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            session_id: session_id.to_string(),
            answer: answer.to_string(),
            time_spent_ms: Some(750),
        }
    }

    #[test]
    fn play_a_full_quiz_through_the_service() {
        // Arrange
        let service = test_service();
        let (id, first) = started_session(&service, "normal", 4, 12);
        assert_eq!(first.number, 1);

        // Act
        let mut last = None;
        for i in 0..4 {
            let correct = correct_answer_for(&service, &id);
            let answer = if i == 0 { wrong_answer(correct) } else { correct };
            let response = service.submit_answer(submit(&id, answer.name())).unwrap();
            assert_eq!(response.is_correct, i != 0);
            assert_eq!(response.correct_answer, correct);
            assert_eq!(response.progress.answered, i + 1);
            assert_eq!(response.is_game_completed, i == 3);
            assert_eq!(response.next_question.is_none(), i == 3);
            last = Some(response);
        }

        // Assert
        let results = last.unwrap().final_results.unwrap();
        assert_eq!(results.correct, 3);
        assert_eq!(results.accuracy, 75.0);
        assert_eq!(results.average_time_ms, 750);

        let status = service.get_game_status(SessionRequest::new(&id)).unwrap();
        assert_eq!(status.status, GameStatus::Completed);
        assert_eq!(status.progress.percent, 100.0);
        assert_eq!(status.results, Some(results));
        assert!(status.timing.end_time.is_some());
        assert_eq!(status.timing.estimated_time_ms, 60_000);

        assert_eq!(
            service.submit_answer(submit(&id, "normal")),
            Err(QuizError::State(StateError::AlreadyCompleted))
        );
    }

    #[test]
    fn status_before_and_after_start() {
        let service = test_service();
        let id = service
            .create_session(CreateSessionRequest::new("easy", 3))
            .unwrap()
            .session_id;

        let status = service.get_game_status(SessionRequest::new(&id)).unwrap();
        assert_eq!(status.status, GameStatus::NotStarted);
        assert_eq!(status.timing.start_time, None);
        assert_eq!(status.results, None);
        let current = service.get_current_question(SessionRequest::new(&id)).unwrap();
        assert_eq!(current.current_question, None);

        service.start_game(SessionRequest::new(&id)).unwrap();
        let status = service.get_game_status(SessionRequest::new(&id)).unwrap();
        assert_eq!(status.status, GameStatus::InProgress);
        assert!(status.timing.start_time.is_some());

        assert_eq!(
            service.start_game(SessionRequest::new(&id)),
            Err(QuizError::State(StateError::AlreadyStarted))
        );
    }

    #[test]
    fn end_then_reset_then_replay() {
        let service = test_service();
        let (id, first) = started_session(&service, "hard", 3, 5);
        let correct = correct_answer_for(&service, &id);
        service.submit_answer(submit(&id, correct.name())).unwrap();

        let ended = service.end_game(SessionRequest::new(&id)).unwrap();
        assert_eq!(ended.results.correct, 1);
        assert_eq!(ended.results.answered, 3);

        let reset = service.reset_game(SessionRequest::new(&id)).unwrap();
        assert_eq!(reset.status, "reset");
        assert_eq!(
            service.end_game(SessionRequest::new(&id)),
            Err(QuizError::State(StateError::NotStarted))
        );

        let restarted = service.start_game(SessionRequest::new(&id)).unwrap();
        assert_eq!(restarted.current_question, Some(first));
        assert_eq!(restarted.progress.answered, 0);
    }

    #[test]
    fn concurrent_players_do_not_interfere() {
        let service = test_service();
        let ids: Vec<String> = (0..4)
            .map(|seed| started_session(&service, "normal", 10, seed).0)
            .collect();

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let service = service.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        let correct = correct_answer_for(&service, &id);
                        service.submit_answer(submit(&id, correct.name())).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in &ids {
            let status = service.get_game_status(SessionRequest::new(id)).unwrap();
            assert_eq!(status.status, GameStatus::Completed);
            assert_eq!(status.results.map(|r| r.correct), Some(10));
        }
    }

    #[test]
    fn swept_sessions_are_not_found() {
        let service = test_service();
        let (id, _) = started_session(&service, "easy", 2, 3);
        let policy = service.config().sweep_policy();
        let much_later = Utc::now() + chrono::Duration::hours(2);

        service
            .registry()
            .sweep_expired(policy.ttl, policy.grace, much_later);
        let report = service
            .registry()
            .sweep_expired(policy.ttl, policy.grace, much_later);

        assert_eq!(report.swept, 1);
        assert_eq!(
            service.get_current_question(SessionRequest::new(&id)),
            Err(QuizError::NotFound(NotFoundError::Session(id.clone())))
        );
    }

    #[test]
    fn configured_generation_timeout_fails_creation() {
        // Arrange
        let config = QuizConfig::from_ron_str("(generation_timeout_ms: Some(0))").unwrap();
        let service = QuizService::new(config);

        // Act
        let result = service.create_session(CreateSessionRequest::new("hard", 20));

        // Assert
        assert!(matches!(
            result,
            Err(QuizError::Generation(GenerationError::TimedOut {
                requested: 20,
                ..
            }))
        ));
        assert!(service.registry().is_empty());
    }

    #[test]
    fn variety_floor_from_tool_arguments_is_enforced() {
        // Arrange
        let service = test_service();
        let request: CreateSessionRequest = serde_json::from_value(serde_json::json!({
            "difficulty": "normal",
            "question_count": 2,
            "seed": 1,
            "min_effectiveness_variety": 3,
        }))
        .unwrap();
        assert_eq!(request.min_effectiveness_variety, Some(3));

        // Act
        let result = service.create_session(request);

        // Assert
        assert!(matches!(
            result,
            Err(QuizError::Generation(GenerationError::InsufficientVariety {
                required: 3,
                ..
            }))
        ));
        assert!(service.registry().is_empty());
    }
}
