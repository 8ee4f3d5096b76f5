use crate::infra::{seed_demo_data, LoggingNotifier};
use chrono::{Local, NaiveDate};
use clap::Args;
use driveschool::config::SchoolConfig;
use driveschool::error::AppError;
use driveschool::workflows::enrollment::{
    ApplicationDocuments, ApplicationForm, EmergencyContact, EnrollmentService, Gender,
    MemoryStore, PaymentMethod, PaymentRequest, PortalRegistration, ReviewAction,
    TextDocumentRenderer,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the demo submission date (YYYY-MM-DD, defaults to today).
    #[arg(long)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the payment portion of the demo.
    #[arg(long)]
    pub(crate) skip_payments: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = args
        .today
        .unwrap_or_else(|| Local::now().date_naive())
        .and_hms_opt(9, 0, 0)
        .unwrap_or_else(|| Local::now().naive_local());

    let store = Arc::new(MemoryStore::new());
    let seed = seed_demo_data(store.as_ref()).map_err(driveschool::workflows::enrollment::EnrollmentError::from)?;
    let service = Arc::new(EnrollmentService::new(
        store,
        Arc::new(LoggingNotifier),
        Arc::new(TextDocumentRenderer::default()),
        SchoolConfig::default(),
    ));

    println!("Seeded catalogue:");
    for branch in &seed.branches {
        println!("  - branch {} ({})", branch.name, branch.code);
    }
    for course in &seed.courses {
        println!(
            "  - course {} [{}] fee {} over {} weeks",
            course.name, course.code, course.fee, course.duration_weeks
        );
    }

    println!("\nSubmitting a public application...");
    let course = &seed.courses[1];
    let application = service.submit_application(
        ApplicationForm {
            first_name: "Chanda".to_string(),
            last_name: "Mwansa".to_string(),
            email: "chanda.mwansa@example.com".to_string(),
            phone: "+260 96 5551234".to_string(),
            whatsapp: None,
            date_of_birth: NaiveDate::from_ymd_opt(2000, 6, 12).expect("valid date"),
            gender: Gender::Female,
            nrc_number: "123456/10/1".to_string(),
            address: "House 45, Mpatamatu".to_string(),
            city: "Luanshya".to_string(),
            province: "Copperbelt".to_string(),
            course_id: course.id,
            branch_id: course.branch_id,
            preferred_schedule: Some("weekday_morning".to_string()),
            preferred_language: None,
            education_level: Some("Grade 12".to_string()),
            previous_experience: None,
            medical_conditions: None,
            emergency_contact: EmergencyContact {
                name: "Bwalya Mwansa".to_string(),
                phone: "+260 97 5559876".to_string(),
                relation: Some("Brother".to_string()),
            },
            documents: ApplicationDocuments::default(),
        },
        now,
    )?;
    println!(
        "  Received {} for {} -> status {}",
        application.application_number,
        course.name,
        application.status.label()
    );

    println!("\nReviewing and accepting...");
    let reviewer = service.require_admin(seed.super_admin.id)?;
    let outcome = service.review(
        application.id,
        ReviewAction::Accept,
        &reviewer,
        Some("documents verified at front desk".to_string()),
        now,
    )?;
    let student = outcome.student.expect("acceptance materializes a student");
    println!(
        "  Student {} enrolled; course runs {} to {}, fee {}",
        student.student_number, student.course_start_date, student.course_end_date, student.total_fee
    );

    if !args.skip_payments {
        println!("\nRecording payments...");
        for amount in [dec!(500.00), dec!(2000.00)] {
            let (payment, student) = service.record_payment(
                student.id,
                PaymentRequest {
                    amount,
                    method: PaymentMethod::MobileMoney,
                    payment_date: now.date(),
                    notes: None,
                },
                &reviewer,
                now,
            )?;
            println!(
                "  {} of {} -> balance {} ({})",
                payment.payment_number,
                payment.amount,
                student.balance(),
                student.payment_status.label()
            );
        }
    }

    println!("\nRegistering portal access...");
    let access = service.register_portal(
        PortalRegistration {
            student_number: student.student_number.clone(),
            email: "chanda.mwansa@example.com".to_string(),
            phone: "+260 96 5551234".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 6, 12).expect("valid date"),
        },
        now,
    )?;
    println!("  Access code issued: {}", access.access_code);

    let stats = service.statistics(&reviewer)?;
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("\nDashboard statistics:\n{json}"),
        Err(err) => println!("\nDashboard statistics unavailable: {err}"),
    }

    Ok(())
}
