use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use driveschool::workflows::enrollment::{
    Admin, AdminRole, Branch, BranchScope, Course, CourseCategory, EnrollmentStore, NewAdmin,
    NewBranch, NewCourse, Notification, Notifier, NotifierError, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal_macros::dec;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier that writes outbound mail to the log instead of a transport.
/// Stands in until an SMTP/WhatsApp adapter is wired up.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn send(&self, message: Notification) -> Result<(), NotifierError> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "outbound notification"
        );
        Ok(())
    }
}

pub(crate) struct SeedData {
    pub(crate) branches: Vec<Branch>,
    pub(crate) courses: Vec<Course>,
    pub(crate) super_admin: Admin,
}

/// Seed the store with the school's two Copperbelt branches, the standard
/// course catalogue, and a bootstrap administrator account.
pub(crate) fn seed_demo_data<S: EnrollmentStore>(store: &S) -> Result<SeedData, StoreError> {
    let luanshya = store.insert_branch(NewBranch {
        name: "Luanshya Main".to_string(),
        code: "LSH".to_string(),
        address: "Plot 12, Buntungwa Street".to_string(),
        city: "Luanshya".to_string(),
        phone: Some("+260 97 1234567".to_string()),
        email: Some("luanshya@keemdrivingschool.com".to_string()),
    })?;
    let mufulira = store.insert_branch(NewBranch {
        name: "Mufulira Branch".to_string(),
        code: "MFL".to_string(),
        address: "14 Independence Avenue".to_string(),
        city: "Mufulira".to_string(),
        phone: Some("+260 96 7654321".to_string()),
        email: Some("mufulira@keemdrivingschool.com".to_string()),
    })?;

    let super_admin = store.insert_admin(NewAdmin {
        username: "keemadmin".to_string(),
        name: "System Administrator".to_string(),
        email: "admin@keemdrivingschool.com".to_string(),
        role: AdminRole::SuperAdmin,
        scope: BranchScope::All,
    })?;
    let luanshya_instructor = store.insert_admin(NewAdmin {
        username: "lsh-instructor".to_string(),
        name: "Luanshya Instructor".to_string(),
        email: "instructor.lsh@keemdrivingschool.com".to_string(),
        role: AdminRole::Instructor,
        scope: BranchScope::Only(luanshya.id),
    })?;
    let mufulira_instructor = store.insert_admin(NewAdmin {
        username: "mfl-instructor".to_string(),
        name: "Mufulira Instructor".to_string(),
        email: "instructor.mfl@keemdrivingschool.com".to_string(),
        role: AdminRole::Instructor,
        scope: BranchScope::Only(mufulira.id),
    })?;

    let mut courses = Vec::new();
    for (branch, instructor) in [
        (&luanshya, &luanshya_instructor),
        (&mufulira, &mufulira_instructor),
    ] {
        courses.push(store.insert_course(NewCourse {
            name: "Class A - Motorcycle".to_string(),
            code: format!("{}-CLA", branch.code),
            category: CourseCategory::Motorcycle,
            duration_weeks: 4,
            total_hours: 24,
            fee: dec!(1500.00),
            branch_id: branch.id,
            instructor: Some(instructor.id),
        })?);
        courses.push(store.insert_course(NewCourse {
            name: "Class B - Light Vehicle".to_string(),
            code: format!("{}-CLB", branch.code),
            category: CourseCategory::LightVehicle,
            duration_weeks: 6,
            total_hours: 40,
            fee: dec!(2500.00),
            branch_id: branch.id,
            instructor: Some(instructor.id),
        })?);
        courses.push(store.insert_course(NewCourse {
            name: "Class C - Heavy Vehicle".to_string(),
            code: format!("{}-CLC", branch.code),
            category: CourseCategory::HeavyVehicle,
            duration_weeks: 8,
            total_hours: 60,
            fee: dec!(4000.00),
            branch_id: branch.id,
            instructor: Some(instructor.id),
        })?);
    }

    Ok(SeedData {
        branches: vec![luanshya, mufulira],
        courses,
        super_admin,
    })
}
