use chrono::Duration;

use super::common::{caller, department_scope, now, seeded_store, MINE_SITE, OPERATIONS};
use crate::compliance::exams::{
    AnswerDraft, AttemptHandle, ChoiceDraft, ExamDraft, ExamError, ExamKind, ExamRemoval,
    ExamRepository, ExamService, QuestionDraft, QuestionStep, MAX_QUESTION_SCORE,
};
use crate::error::ServiceError;
use crate::targeting::ScopeDraft;

fn exam_draft(kind: ExamKind, scope: ScopeDraft) -> ExamDraft {
    ExamDraft {
        title: "Site safety basics".to_string(),
        description: String::new(),
        kind,
        scope,
        duration_minutes: 20,
        pass_score: 3,
        is_active: true,
    }
}

fn question(order: u32, score: u32) -> QuestionDraft {
    QuestionDraft {
        text: format!("Question {order}"),
        image_key: None,
        score,
        order,
        choices: vec![
            ChoiceDraft {
                text: "Right".to_string(),
                is_correct: true,
            },
            ChoiceDraft {
                text: "Wrong".to_string(),
                is_correct: false,
            },
        ],
    }
}

fn select(step: &QuestionStep, text: &str) -> AnswerDraft {
    let QuestionStep::Question(view) = step else {
        panic!("expected a question, got {step:?}");
    };
    let choice = view
        .choices
        .iter()
        .find(|choice| choice.text == text)
        .expect("choice present");
    AnswerDraft { choice: choice.id }
}

#[test]
fn official_exam_is_scored_once_and_cannot_be_retaken() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let worker = caller(&store, "site.worker");

    let exam = service
        .create(&manager, exam_draft(ExamKind::Official, department_scope(&[OPERATIONS])), now())
        .expect("exam");
    service
        .replace_questions(&manager, exam.id, vec![question(2, 2), question(1, 1)])
        .expect("questions");

    let started = service.start(&worker, exam.id, now()).expect("start");
    assert!(matches!(started.handle, AttemptHandle::Official(_)));
    assert_eq!(started.total_questions, 2);

    let first = service
        .question(&worker, started.handle, 1, now())
        .expect("first question");
    let second = service
        .answer(&worker, started.handle, 1, select(&first, "Right"), now())
        .expect("answer first");
    let done = service
        .answer(&worker, started.handle, 2, select(&second, "Wrong"), now())
        .expect("answer second");
    assert!(matches!(done, QuestionStep::FinishRequired { .. }));

    let result = service
        .finish(&worker, started.handle, now() + Duration::minutes(2))
        .expect("finish");
    assert_eq!(result.total_score, 1);
    assert_eq!(result.max_score, 3);
    assert!(!result.is_passed);
    assert!(!result.is_practice);

    let again = service
        .finish(&worker, started.handle, now() + Duration::minutes(9))
        .expect("finish again");
    assert_eq!(again.completed_at, result.completed_at);

    assert!(matches!(
        service.start(&worker, exam.id, now()),
        Err(ExamError::AlreadyAttempted)
    ));
}

#[test]
fn practice_exams_never_write_attempts() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let worker = caller(&store, "ops.worker");

    let exam = service
        .create(&manager, exam_draft(ExamKind::Practice, ScopeDraft::org_wide()), now())
        .expect("exam");
    service
        .replace_questions(&manager, exam.id, vec![question(1, 3)])
        .expect("questions");

    for _ in 0..2 {
        let started = service.start(&worker, exam.id, now()).expect("start");
        assert!(matches!(started.handle, AttemptHandle::Practice(_)));
        let step = service
            .question(&worker, started.handle, 1, now())
            .expect("question");
        service
            .answer(&worker, started.handle, 1, select(&step, "Right"), now())
            .expect("answer");
        let result = service.finish(&worker, started.handle, now()).expect("finish");
        assert!(result.is_practice);
        assert!(result.is_passed);
        assert!(matches!(
            service.finish(&worker, started.handle, now()),
            Err(ExamError::Service(ServiceError::NotFound(_)))
        ));
    }

    assert!(store.attempts_for_exam(exam.id).expect("attempts").is_empty());
}

#[test]
fn exams_without_ready_questions_cannot_start() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let worker = caller(&store, "ops.worker");
    let exam = service
        .create(&manager, exam_draft(ExamKind::Official, ScopeDraft::org_wide()), now())
        .expect("exam");

    assert!(matches!(
        service.start(&worker, exam.id, now()),
        Err(ExamError::NoQuestions)
    ));

    let mut broken = question(1, 1);
    broken.choices[1].is_correct = true;
    assert!(matches!(
        service.replace_questions(&manager, exam.id, vec![broken]),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn question_scores_are_bounded_and_totals_add_up() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let worker = caller(&store, "ops.worker");
    let exam = service
        .create(&manager, exam_draft(ExamKind::Official, ScopeDraft::org_wide()), now())
        .expect("exam");

    for score in [u32::MAX, MAX_QUESTION_SCORE + 1] {
        let oversized = vec![question(1, score), question(2, score)];
        match service.replace_questions(&manager, exam.id, oversized) {
            Err(ServiceError::Validation(errors)) => assert!(errors.has("questions")),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    service
        .replace_questions(
            &manager,
            exam.id,
            vec![question(1, MAX_QUESTION_SCORE), question(2, MAX_QUESTION_SCORE)],
        )
        .expect("questions");
    let started = service.start(&worker, exam.id, now()).expect("start");
    let first = service
        .question(&worker, started.handle, 1, now())
        .expect("first question");
    let second = service
        .answer(&worker, started.handle, 1, select(&first, "Right"), now())
        .expect("answer first");
    service
        .answer(&worker, started.handle, 2, select(&second, "Right"), now())
        .expect("answer second");

    let result = service.finish(&worker, started.handle, now()).expect("finish");
    assert_eq!(result.total_score, 2 * MAX_QUESTION_SCORE);
    assert_eq!(result.max_score, 2 * MAX_QUESTION_SCORE);
    assert!(result.is_passed);
}

#[test]
fn out_of_scope_exam_is_not_found() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let exam = service
        .create(&manager, exam_draft(ExamKind::Official, department_scope(&[MINE_SITE])), now())
        .expect("exam");
    service
        .replace_questions(&manager, exam.id, vec![question(1, 1)])
        .expect("questions");

    let ops = caller(&store, "ops.worker");
    assert!(matches!(
        service.start(&ops, exam.id, now()),
        Err(ExamError::Service(ServiceError::NotFound("exam")))
    ));
    assert!(service.available(&ops).expect("available").is_empty());
    assert!(matches!(
        service.start(&manager, exam.id, now()),
        Err(ExamError::Service(ServiceError::Access(_)))
    ));
}

#[test]
fn expired_attempt_requires_finishing_and_foreign_choices_are_rejected() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let worker = caller(&store, "site.worker");
    let exam = service
        .create(&manager, exam_draft(ExamKind::Official, ScopeDraft::org_wide()), now())
        .expect("exam");
    let exam = service
        .replace_questions(&manager, exam.id, vec![question(1, 1), question(2, 1)])
        .expect("questions");
    let started = service.start(&worker, exam.id, now()).expect("start");

    let foreign = AnswerDraft {
        choice: exam.questions[1].choices[0].id,
    };
    assert!(matches!(
        service.answer(&worker, started.handle, 1, foreign, now()),
        Err(ExamError::ForeignChoice)
    ));

    let late = now() + Duration::minutes(20);
    assert!(matches!(
        service.question(&worker, started.handle, 1, late),
        Ok(QuestionStep::FinishRequired { .. })
    ));
    assert!(matches!(
        service.question(&worker, started.handle, 3, now()),
        Ok(QuestionStep::FinishRequired { .. })
    ));

    let intruder = caller(&store, "ops.worker");
    assert!(matches!(
        service.question(&intruder, started.handle, 1, now()),
        Err(ExamError::Service(ServiceError::NotFound("attempt")))
    ));
}

#[test]
fn official_exam_with_attempts_is_deactivated_instead_of_deleted() {
    let store = seeded_store();
    let service = ExamService::new(store.clone());
    let manager = caller(&store, "manager");
    let worker = caller(&store, "ops.worker");

    let exam = service
        .create(&manager, exam_draft(ExamKind::Official, ScopeDraft::org_wide()), now())
        .expect("exam");
    service
        .replace_questions(&manager, exam.id, vec![question(1, 1)])
        .expect("questions");
    service.start(&worker, exam.id, now()).expect("start");

    assert_eq!(
        service.delete(&manager, exam.id).expect("delete"),
        ExamRemoval::Deactivated
    );
    let stored = store.exam(exam.id).expect("read").expect("still stored");
    assert!(!stored.is_active);

    let unused = service
        .create(&manager, exam_draft(ExamKind::Official, ScopeDraft::org_wide()), now())
        .expect("exam");
    assert_eq!(
        service.delete(&manager, unused.id).expect("delete"),
        ExamRemoval::Deleted
    );
    assert!(store.exam(unused.id).expect("read").is_none());
}
