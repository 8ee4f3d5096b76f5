use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;

use crate::config::SchoolConfig;
use crate::workflows::enrollment::documents::TextDocumentRenderer;
use crate::workflows::enrollment::domain::{
    Admin, AdminRole, ApplicationDocuments, ApplicationForm, Branch, BranchScope, Course,
    CourseCategory, EmergencyContact, Gender,
};
use crate::workflows::enrollment::memory::MemoryStore;
use crate::workflows::enrollment::notifier::{Notification, Notifier, NotifierError};
use crate::workflows::enrollment::service::EnrollmentService;
use crate::workflows::enrollment::store::{
    EnrollmentStore, NewAdmin, NewBranch, NewCourse,
};

/// Captures every outbound message so tests can assert on side effects.
#[derive(Default)]
pub(super) struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub failing: bool,
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: Notification) -> Result<(), NotifierError> {
        if self.failing {
            return Err(NotifierError::Transport("smtp offline".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(message);
        Ok(())
    }
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

pub(super) type TestService =
    EnrollmentService<MemoryStore, RecordingNotifier, TextDocumentRenderer>;

pub(super) struct TestEnv {
    pub service: Arc<TestService>,
    pub notifier: Arc<RecordingNotifier>,
    pub super_admin: Admin,
    pub luanshya_admin: Admin,
    pub mufulira_admin: Admin,
    pub luanshya: Branch,
    pub mufulira: Branch,
    pub class_b: Course,
    pub motorcycle: Course,
}

pub(super) fn env() -> TestEnv {
    env_with_notifier(Arc::new(RecordingNotifier::default()))
}

pub(super) fn env_with_notifier(notifier: Arc<RecordingNotifier>) -> TestEnv {
    let store = Arc::new(MemoryStore::new());

    let luanshya = store
        .insert_branch(NewBranch {
            name: "Luanshya Main".to_string(),
            code: "LSH".to_string(),
            address: "Plot 12, Buntungwa Street".to_string(),
            city: "Luanshya".to_string(),
            phone: Some("+260 97 1234567".to_string()),
            email: Some("luanshya@keemdrivingschool.com".to_string()),
        })
        .expect("seed branch");
    let mufulira = store
        .insert_branch(NewBranch {
            name: "Mufulira Branch".to_string(),
            code: "MFL".to_string(),
            address: "14 Independence Avenue".to_string(),
            city: "Mufulira".to_string(),
            phone: None,
            email: None,
        })
        .expect("seed branch");

    let super_admin = store
        .insert_admin(NewAdmin {
            username: "keemadmin".to_string(),
            name: "System Administrator".to_string(),
            email: "admin@keemdrivingschool.com".to_string(),
            role: AdminRole::SuperAdmin,
            scope: BranchScope::All,
        })
        .expect("seed admin");
    let luanshya_admin = store
        .insert_admin(NewAdmin {
            username: "lsh-admin".to_string(),
            name: "Luanshya Admin".to_string(),
            email: "lsh@keemdrivingschool.com".to_string(),
            role: AdminRole::Admin,
            scope: BranchScope::Only(luanshya.id),
        })
        .expect("seed admin");
    let mufulira_admin = store
        .insert_admin(NewAdmin {
            username: "mfl-admin".to_string(),
            name: "Mufulira Admin".to_string(),
            email: "mfl@keemdrivingschool.com".to_string(),
            role: AdminRole::Admin,
            scope: BranchScope::Only(mufulira.id),
        })
        .expect("seed admin");

    let class_b = store
        .insert_course(NewCourse {
            name: "Class B - Light Vehicle".to_string(),
            code: "CLB".to_string(),
            category: CourseCategory::LightVehicle,
            duration_weeks: 6,
            total_hours: 40,
            fee: dec!(2500.00),
            branch_id: luanshya.id,
            instructor: Some(luanshya_admin.id),
        })
        .expect("seed course");
    let motorcycle = store
        .insert_course(NewCourse {
            name: "Class A - Motorcycle".to_string(),
            code: "CLA".to_string(),
            category: CourseCategory::Motorcycle,
            duration_weeks: 4,
            total_hours: 24,
            fee: dec!(1500.00),
            branch_id: mufulira.id,
            instructor: Some(mufulira_admin.id),
        })
        .expect("seed course");

    let service = Arc::new(EnrollmentService::new(
        store,
        Arc::clone(&notifier),
        Arc::new(TextDocumentRenderer::default()),
        SchoolConfig::default(),
    ));

    TestEnv {
        service,
        notifier,
        super_admin,
        luanshya_admin,
        mufulira_admin,
        luanshya,
        mufulira,
        class_b,
        motorcycle,
    }
}

pub(super) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .expect("valid date")
        .and_hms_opt(10, 30, 0)
        .expect("valid time")
}

pub(super) fn form(env: &TestEnv) -> ApplicationForm {
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
        course_id: env.class_b.id,
        branch_id: env.luanshya.id,
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
    }
}

pub(super) fn mufulira_form(env: &TestEnv) -> ApplicationForm {
    ApplicationForm {
        first_name: "Mutale".to_string(),
        last_name: "Banda".to_string(),
        email: "mutale.banda@example.com".to_string(),
        phone: "+260 95 5554321".to_string(),
        nrc_number: "654321/20/1".to_string(),
        course_id: env.motorcycle.id,
        branch_id: env.mufulira.id,
        ..form(env)
    }
}
