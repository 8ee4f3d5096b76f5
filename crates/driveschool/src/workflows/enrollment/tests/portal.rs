use chrono::{Duration, NaiveDate, NaiveTime};
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::enrollment::domain::{PaymentMethod, ReviewAction, Student};
use crate::workflows::enrollment::portal::{PortalLogin, PortalRegistration};
use crate::workflows::enrollment::service::{EnrollmentError, PaymentRequest};
use crate::workflows::enrollment::store::EnrollmentStore;

fn accepted_student(env: &TestEnv) -> Student {
    let application = env
        .service
        .submit_application(form(env), now())
        .expect("submission");
    env.service
        .review(application.id, ReviewAction::Accept, &env.super_admin, None, now())
        .expect("acceptance")
        .student
        .expect("student materialized")
}

fn registration(student: &Student) -> PortalRegistration {
    PortalRegistration {
        student_number: student.student_number.clone(),
        email: "chanda.mwansa@example.com".to_string(),
        phone: "+260 96 5551234".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2000, 6, 12).expect("valid date"),
    }
}

fn code_shape_holds(code: &str) {
    assert_eq!(code.len(), 8);
    assert!(code[..4].chars().all(|c| c.is_ascii_uppercase()));
    assert!(code[4..7].chars().all(|c| c.is_ascii_digit()));
    assert!(code[7..].chars().all(|c| c.is_ascii_uppercase()));
}

#[test]
fn registration_verifies_identity_and_issues_code() {
    let env = env();
    let student = accepted_student(&env);

    let access = env
        .service
        .register_portal(registration(&student), now())
        .expect("registration");
    assert!(access.active);
    code_shape_holds(&access.access_code);

    let welcome = env
        .notifier
        .sent()
        .into_iter()
        .find(|message| message.subject.contains("Portal"))
        .expect("welcome email");
    assert!(welcome.body.contains(&access.access_code));
}

#[test]
fn registration_rejects_mismatched_factors() {
    let env = env();
    let student = accepted_student(&env);

    let mut wrong_phone = registration(&student);
    wrong_phone.phone = "+260 95 0000000".to_string();
    assert!(matches!(
        env.service.register_portal(wrong_phone, now()),
        Err(EnrollmentError::NotFound(_))
    ));

    let mut wrong_dob = registration(&student);
    wrong_dob.date_of_birth = NaiveDate::from_ymd_opt(1999, 1, 1).expect("valid date");
    assert!(matches!(
        env.service.register_portal(wrong_dob, now()),
        Err(EnrollmentError::NotFound(_))
    ));
}

#[test]
fn double_registration_conflicts_while_active() {
    let env = env();
    let student = accepted_student(&env);
    env.service
        .register_portal(registration(&student), now())
        .expect("first registration");

    let error = env
        .service
        .register_portal(registration(&student), now())
        .expect_err("already registered");
    assert!(matches!(error, EnrollmentError::Conflict { .. }));
}

#[test]
fn disabled_access_reactivates_with_a_fresh_code() {
    let env = env();
    let student = accepted_student(&env);
    let original = env
        .service
        .register_portal(registration(&student), now())
        .expect("registration");

    env.service
        .disable_portal_access(student.id, &env.super_admin)
        .expect("disable");
    assert!(matches!(
        env.service.portal_login(
            &PortalLogin {
                student_number: student.student_number.clone(),
                access_code: original.access_code.clone(),
            },
            now(),
        ),
        Err(EnrollmentError::NotFound(_))
    ));

    let reactivated = env
        .service
        .register_portal(registration(&student), now())
        .expect("reactivation");
    assert!(reactivated.active);
    assert_ne!(reactivated.access_code, original.access_code);
}

#[test]
fn login_bumps_bookkeeping_and_rejects_bad_codes() {
    let env = env();
    let student = accepted_student(&env);
    let access = env
        .service
        .register_portal(registration(&student), now())
        .expect("registration");

    let login = PortalLogin {
        student_number: student.student_number.clone(),
        access_code: access.access_code.clone(),
    };
    env.service.portal_login(&login, now()).expect("login");
    env.service.portal_login(&login, now()).expect("second login");

    let stored = env
        .service
        .store()
        .portal_access_for(student.id)
        .expect("store read")
        .expect("access row");
    assert_eq!(stored.login_count, 2);
    assert_eq!(stored.last_login, Some(now()));

    let error = env
        .service
        .portal_login(
            &PortalLogin {
                student_number: student.student_number.clone(),
                access_code: "WRONG00X".to_string(),
            },
            now(),
        )
        .expect_err("bad code");
    assert!(matches!(error, EnrollmentError::Permission(_)));
}

#[test]
fn login_normalizes_code_case_and_whitespace() {
    let env = env();
    let student = accepted_student(&env);
    let access = env
        .service
        .register_portal(registration(&student), now())
        .expect("registration");

    let sloppy = format!("  {}  ", access.access_code.to_lowercase());
    env.service
        .portal_login(
            &PortalLogin {
                student_number: student.student_number.clone(),
                access_code: sloppy,
            },
            now(),
        )
        .expect("normalized login");
}

#[test]
fn dashboard_joins_payments_lessons_and_fresh_progress() {
    let env = env();
    let student = accepted_student(&env);
    let access = env
        .service
        .register_portal(registration(&student), now())
        .expect("registration");

    env.service
        .record_payment(
            student.id,
            PaymentRequest {
                amount: dec!(500.00),
                method: PaymentMethod::Cash,
                payment_date: now().date(),
                notes: None,
            },
            &env.super_admin,
            now(),
        )
        .expect("payment");

    let slot = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");
    let first = env
        .service
        .schedule_lesson(student.id, env.luanshya_admin.id, now().date() + Duration::days(1), slot, &env.super_admin)
        .expect("first lesson");
    env.service
        .schedule_lesson(student.id, env.luanshya_admin.id, now().date() + Duration::days(2), slot, &env.super_admin)
        .expect("second lesson");
    env.service
        .complete_lesson(first.id, Some(85), &env.super_admin, now().date() + Duration::days(1))
        .expect("completion");

    let dashboard = env
        .service
        .portal_dashboard(
            &PortalLogin {
                student_number: student.student_number.clone(),
                access_code: access.access_code,
            },
            now(),
        )
        .expect("dashboard");

    assert_eq!(dashboard.full_name, "Chanda Mwansa");
    assert_eq!(dashboard.course_name, "Class B - Light Vehicle");
    assert_eq!(dashboard.balance, dec!(2000.00));
    assert_eq!(dashboard.progress_percentage, 50);
    assert_eq!(dashboard.total_lessons, 2);
    assert_eq!(dashboard.completed_lessons, 1);
    assert_eq!(dashboard.upcoming_lessons.len(), 1);
    assert_eq!(dashboard.recent_payments.len(), 1);
    assert_eq!(dashboard.student.last_assessment_score, Some(85));
}

#[test]
fn admin_grant_and_reset_respect_branch_scope() {
    let env = env();
    let student = accepted_student(&env);

    assert!(matches!(
        env.service.grant_portal_access(student.id, &env.mufulira_admin, now()),
        Err(EnrollmentError::Permission(_))
    ));

    let granted = env
        .service
        .grant_portal_access(student.id, &env.luanshya_admin, now())
        .expect("grant");
    let reset = env
        .service
        .reset_portal_code(student.id, &env.luanshya_admin)
        .expect("reset");
    assert_ne!(granted.access_code, reset.access_code);
}
