use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::enrollment::domain::{
    ApplicationStatus, PaymentStatus, ReviewAction, StudentStatus,
};
use crate::workflows::enrollment::service::EnrollmentError;

#[test]
fn submit_assigns_sequential_application_numbers() {
    let env = env();

    let first = env
        .service
        .submit_application(form(&env), now())
        .expect("first submission");
    assert_eq!(first.application_number, "APP-2024-03-0001");
    assert_eq!(first.status, ApplicationStatus::Pending);
    assert_eq!(first.application_date, now().date());

    let mut second_form = form(&env);
    second_form.nrc_number = "777777/10/1".to_string();
    second_form.email = "second@example.com".to_string();
    let second = env
        .service
        .submit_application(second_form, now())
        .expect("second submission");
    assert_eq!(second.application_number, "APP-2024-03-0002");
}

#[test]
fn submit_rejects_duplicate_nrc() {
    let env = env();
    env.service
        .submit_application(form(&env), now())
        .expect("first submission");

    let error = env
        .service
        .submit_application(form(&env), now())
        .expect_err("duplicate nrc");
    assert!(matches!(
        error,
        EnrollmentError::Conflict { field: "nrc_number" }
    ));
}

#[test]
fn submit_rejects_blank_required_fields_and_bad_email() {
    let env = env();

    let mut blank = form(&env);
    blank.first_name = "  ".to_string();
    assert!(matches!(
        env.service.submit_application(blank, now()),
        Err(EnrollmentError::Validation(_))
    ));

    let mut bad_email = form(&env);
    bad_email.email = "not-an-email".to_string();
    assert!(matches!(
        env.service.submit_application(bad_email, now()),
        Err(EnrollmentError::Validation(_))
    ));
}

#[test]
fn submit_notifies_admin_and_applicant() {
    let env = env();
    env.service
        .submit_application(form(&env), now())
        .expect("submission");

    let sent = env.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].recipient, "admin@keemdrivingschool.com");
    assert!(sent[0].subject.contains("APP-2024-03-0001"));
    assert_eq!(sent[1].recipient, "chanda.mwansa@example.com");
}

#[test]
fn submission_survives_notifier_outage() {
    let notifier = Arc::new(RecordingNotifier {
        failing: true,
        ..RecordingNotifier::default()
    });
    let env = env_with_notifier(notifier);

    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission despite outage");
    assert_eq!(application.status, ApplicationStatus::Pending);
}

#[test]
fn review_moves_pending_to_reviewing() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");

    let outcome = env
        .service
        .review(
            application.id,
            ReviewAction::Review,
            &env.luanshya_admin,
            Some("documents look complete".to_string()),
            now(),
        )
        .expect("review transition");

    assert_eq!(outcome.application.status, ApplicationStatus::Reviewing);
    assert_eq!(outcome.application.reviewed_by, Some(env.luanshya_admin.id));
    assert_eq!(
        outcome.application.admin_notes.as_deref(),
        Some("documents look complete")
    );
    assert!(outcome.student.is_none());
}

#[test]
fn accept_materializes_student_with_fee_and_dates() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");

    let outcome = env
        .service
        .review(application.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect("acceptance");
    let student = outcome.student.expect("student materialized");

    assert_eq!(student.student_number, "202403001");
    assert_eq!(student.application_id, application.id);
    assert_eq!(student.total_fee, dec!(2500.00));
    assert_eq!(student.amount_paid, dec!(0));
    assert_eq!(student.payment_status, PaymentStatus::Pending);
    assert_eq!(student.status, StudentStatus::Active);
    assert_eq!(student.enrollment_date, now().date());
    assert_eq!(student.course_start_date, now().date() + Duration::days(7));
    assert_eq!(
        student.course_end_date,
        student.course_start_date + Duration::weeks(6)
    );
    assert_eq!(student.assigned_instructor, Some(env.luanshya_admin.id));
}

#[test]
fn accept_sends_letter_with_attachment() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");

    env.service
        .review(application.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect("acceptance");

    let sent = env.notifier.sent();
    let acceptance = sent
        .iter()
        .find(|message| message.subject.contains("Accepted"))
        .expect("acceptance email");
    assert_eq!(acceptance.recipient, "chanda.mwansa@example.com");
    assert!(acceptance.body.contains("202403001"));
    assert_eq!(acceptance.attachments.len(), 1);
    let letter = String::from_utf8(acceptance.attachments[0].bytes.clone()).expect("utf8");
    assert!(letter.contains("Class B - Light Vehicle"));
    assert!(letter.contains("APP-2024-03-0001"));
}

#[test]
fn terminal_applications_reject_further_actions() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");
    env.service
        .review(application.id, ReviewAction::Reject, &env.super_admin, None, now())
        .expect("rejection");

    let error = env
        .service
        .review(application.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect_err("terminal state");
    assert!(matches!(error, EnrollmentError::Validation(_)));
}

#[test]
fn reviewers_cannot_touch_other_branches() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission at luanshya");

    let error = env
        .service
        .review(
            application.id,
            ReviewAction::Accept,
            &env.mufulira_admin,
            None,
            now(),
        )
        .expect_err("cross-branch review");
    assert!(matches!(error, EnrollmentError::Permission(_)));
}

#[test]
fn listings_are_branch_scoped() {
    let env = env();
    env.service
        .submit_application(form(&env), now())
        .expect("luanshya submission");
    env.service
        .submit_application(mufulira_form(&env), now())
        .expect("mufulira submission");

    let all = env
        .service
        .applications(&env.super_admin)
        .expect("super admin list");
    assert_eq!(all.len(), 2);

    let luanshya_only = env
        .service
        .applications(&env.luanshya_admin)
        .expect("scoped list");
    assert_eq!(luanshya_only.len(), 1);
    assert_eq!(luanshya_only[0].branch_id, env.luanshya.id);
}

#[test]
fn status_lookup_requires_matching_birth_date() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");

    let view = env
        .service
        .application_status(
            &application.application_number,
            NaiveDate::from_ymd_opt(2000, 6, 12).expect("valid date"),
        )
        .expect("status lookup");
    assert_eq!(view.status, "pending");
    assert_eq!(view.course_name, "Class B - Light Vehicle");

    let error = env
        .service
        .application_status(
            &application.application_number,
            NaiveDate::from_ymd_opt(1999, 1, 1).expect("valid date"),
        )
        .expect_err("mismatched birth date");
    assert!(matches!(error, EnrollmentError::NotFound(_)));
}

#[test]
fn statistics_reflect_scope_and_lifecycle() {
    let env = env();
    let luanshya_app = env
        .service
        .submit_application(form(&env), now())
        .expect("luanshya submission");
    env.service
        .submit_application(mufulira_form(&env), now())
        .expect("mufulira submission");
    env.service
        .review(luanshya_app.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect("acceptance");

    let global = env
        .service
        .statistics(&env.super_admin)
        .expect("global stats");
    assert_eq!(global.total_applications, 2);
    assert_eq!(global.pending_applications, 1);
    assert_eq!(global.accepted_applications, 1);
    assert_eq!(global.total_students, 1);
    assert_eq!(global.active_students, 1);
    assert_eq!(global.outstanding_balance, dec!(2500.00));

    let scoped = env
        .service
        .statistics(&env.mufulira_admin)
        .expect("scoped stats");
    assert_eq!(scoped.total_applications, 1);
    assert_eq!(scoped.total_students, 0);
}

#[test]
fn duplicate_lesson_slot_is_rejected() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");
    let student = env
        .service
        .review(application.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect("acceptance")
        .student
        .expect("student");

    let date = now().date() + Duration::days(1);
    let slot = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");
    env.service
        .schedule_lesson(student.id, env.luanshya_admin.id, date, slot, &env.super_admin)
        .expect("first lesson");
    let error = env
        .service
        .schedule_lesson(student.id, env.luanshya_admin.id, date, slot, &env.super_admin)
        .expect_err("slot already taken");
    assert!(matches!(
        error,
        EnrollmentError::Conflict {
            field: "lesson_slot"
        }
    ));

    let later = NaiveTime::from_hms_opt(11, 0, 0).expect("valid time");
    env.service
        .schedule_lesson(student.id, env.luanshya_admin.id, date, later, &env.super_admin)
        .expect("different time on the same day");
}

#[test]
fn lesson_score_above_one_hundred_is_rejected() {
    let env = env();
    let application = env
        .service
        .submit_application(form(&env), now())
        .expect("submission");
    let student = env
        .service
        .review(application.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect("acceptance")
        .student
        .expect("student");
    let lesson = env
        .service
        .schedule_lesson(
            student.id,
            env.luanshya_admin.id,
            now().date() + Duration::days(1),
            NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            &env.super_admin,
        )
        .expect("lesson");

    let error = env
        .service
        .complete_lesson(lesson.id, Some(101), &env.super_admin, now().date())
        .expect_err("score out of range");
    assert!(matches!(error, EnrollmentError::Validation(_)));

    let (completed, refreshed) = env
        .service
        .complete_lesson(lesson.id, Some(100), &env.super_admin, now().date())
        .expect("boundary score accepted");
    assert_eq!(completed.score, Some(100));
    assert_eq!(refreshed.last_assessment_score, Some(100));
}
