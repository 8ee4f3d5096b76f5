use chrono::NaiveDate;
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::enrollment::domain::{
    PaymentMethod, PaymentState, PaymentStatus, ReviewAction, Student,
};
use crate::workflows::enrollment::service::{EnrollmentError, PaymentRequest};

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

fn request(amount: rust_decimal::Decimal) -> PaymentRequest {
    PaymentRequest {
        amount,
        method: PaymentMethod::MobileMoney,
        payment_date: NaiveDate::from_ymd_opt(2024, 3, 20).expect("valid date"),
        notes: None,
    }
}

#[test]
fn payments_accumulate_and_rederive_status() {
    let env = env();
    let student = accepted_student(&env);

    let (first, student) = env
        .service
        .record_payment(student.id, request(dec!(500.00)), &env.luanshya_admin, now())
        .expect("first payment");
    assert_eq!(first.payment_number, "PAY-202403001-001");
    assert_eq!(first.state, PaymentState::Completed);
    assert_eq!(student.amount_paid, dec!(500.00));
    assert_eq!(student.payment_status, PaymentStatus::Partial);
    assert_eq!(student.balance(), dec!(2000.00));

    let (second, student) = env
        .service
        .record_payment(student.id, request(dec!(2000.00)), &env.luanshya_admin, now())
        .expect("second payment");
    assert_eq!(second.payment_number, "PAY-202403001-002");
    assert_eq!(student.amount_paid, dec!(2500.00));
    assert_eq!(student.payment_status, PaymentStatus::Paid);
    assert_eq!(student.balance(), dec!(0.00));
}

#[test]
fn overpayment_is_allowed_and_goes_negative() {
    let env = env();
    let student = accepted_student(&env);

    let (_, student) = env
        .service
        .record_payment(student.id, request(dec!(3000.00)), &env.super_admin, now())
        .expect("overpayment");
    assert_eq!(student.payment_status, PaymentStatus::Paid);
    assert_eq!(student.balance(), dec!(-500.00));
}

#[test]
fn non_positive_amounts_are_rejected() {
    let env = env();
    let student = accepted_student(&env);

    for amount in [dec!(0), dec!(-10.00)] {
        let error = env
            .service
            .record_payment(student.id, request(amount), &env.super_admin, now())
            .expect_err("rejected amount");
        assert!(matches!(error, EnrollmentError::Validation(_)));
    }
}

#[test]
fn receivers_are_branch_scoped() {
    let env = env();
    let student = accepted_student(&env);

    let error = env
        .service
        .record_payment(student.id, request(dec!(100.00)), &env.mufulira_admin, now())
        .expect_err("cross-branch payment");
    assert!(matches!(error, EnrollmentError::Permission(_)));
}

#[test]
fn receipt_email_carries_invoice_attachment() {
    let env = env();
    let student = accepted_student(&env);

    env.service
        .record_payment(student.id, request(dec!(500.00)), &env.super_admin, now())
        .expect("payment");

    let sent = env.notifier.sent();
    let receipt = sent
        .iter()
        .find(|message| message.subject.contains("Payment Received"))
        .expect("receipt email");
    assert_eq!(receipt.attachments.len(), 1);
    let invoice = String::from_utf8(receipt.attachments[0].bytes.clone()).expect("utf8");
    assert!(invoice.contains("PAY-202403001-001"));
    assert!(invoice.contains("202403001"));
}

#[test]
fn verification_stamps_the_verifier() {
    let env = env();
    let student = accepted_student(&env);
    let (payment, _) = env
        .service
        .record_payment(student.id, request(dec!(500.00)), &env.luanshya_admin, now())
        .expect("payment");
    assert_eq!(payment.verified_by, None);

    let verified = env
        .service
        .verify_payment(payment.id, &env.super_admin)
        .expect("verification");
    assert_eq!(verified.verified_by, Some(env.super_admin.id));
}

#[test]
fn payment_listing_follows_reviewer_scope() {
    let env = env();
    let student = accepted_student(&env);
    env.service
        .record_payment(student.id, request(dec!(500.00)), &env.super_admin, now())
        .expect("payment");

    let visible = env
        .service
        .payments(&env.luanshya_admin)
        .expect("scoped payments");
    assert_eq!(visible.len(), 1);

    let hidden = env
        .service
        .payments(&env.mufulira_admin)
        .expect("scoped payments");
    assert!(hidden.is_empty());
}

#[test]
fn exports_render_scoped_csv() {
    let env = env();
    let student = accepted_student(&env);
    env.service
        .record_payment(student.id, request(dec!(500.00)), &env.super_admin, now())
        .expect("payment");

    let students = env
        .service
        .export_students(&env.super_admin)
        .expect("student export");
    assert_eq!(students.content_type, "text/csv");
    let sheet = String::from_utf8(students.bytes).expect("utf8");
    assert!(sheet.starts_with("id,student_number"));
    assert!(sheet.contains("202403001"));
    assert!(sheet.contains("Chanda"));

    let payments = env
        .service
        .export_payments(&env.mufulira_admin)
        .expect("payment export");
    let sheet = String::from_utf8(payments.bytes).expect("utf8");
    assert!(!sheet.contains("PAY-202403001-001"));
}
