use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(/// Arena key for a branch row.
    BranchId);
entity_id!(/// Arena key for a course row.
    CourseId);
entity_id!(/// Arena key for an admin row.
    AdminId);
entity_id!(/// Arena key for an application row.
    ApplicationId);
entity_id!(/// Arena key for a student row.
    StudentId);
entity_id!(/// Arena key for a payment row.
    PaymentId);
entity_id!(/// Arena key for a lesson row.
    LessonId);

/// A physical school location. Scopes visibility of every other entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub code: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseCategory {
    Motorcycle,
    LightVehicle,
    HeavyVehicle,
    Psv,
    Special,
}

impl CourseCategory {
    pub const fn label(self) -> &'static str {
        match self {
            CourseCategory::Motorcycle => "Motorcycle",
            CourseCategory::LightVehicle => "Light Vehicle",
            CourseCategory::HeavyVehicle => "Heavy Vehicle",
            CourseCategory::Psv => "PSV",
            CourseCategory::Special => "Special",
        }
    }
}

/// An offering with a fixed fee and duration that applications target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub code: String,
    pub category: CourseCategory,
    pub duration_weeks: u32,
    pub total_hours: u32,
    pub fee: Decimal,
    pub branch_id: BranchId,
    pub instructor: Option<AdminId>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    Instructor,
    Staff,
}

/// Which branches an admin may see. `All` corresponds to the "Both" branch value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchScope {
    All,
    Only(BranchId),
}

/// Filter applied to every list query on behalf of a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    All,
    Branch(BranchId),
}

impl ScopeFilter {
    pub fn admits(&self, branch: BranchId) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Branch(own) => *own == branch,
        }
    }
}

/// A staff account able to review applications and record payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub scope: BranchScope,
    pub active: bool,
    pub last_login: Option<NaiveDateTime>,
}

impl Admin {
    /// Branch-scoped visibility rule applied uniformly to every entity query.
    pub fn can_access(&self, branch: BranchId) -> bool {
        self.role == AdminRole::SuperAdmin || self.scope_filter().admits(branch)
    }

    pub fn scope_filter(&self) -> ScopeFilter {
        if self.role == AdminRole::SuperAdmin {
            return ScopeFilter::All;
        }
        match self.scope {
            BranchScope::All => ScopeFilter::All,
            BranchScope::Only(branch) => ScopeFilter::Branch(branch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewing,
    Accepted,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    /// Accepted, rejected, and cancelled rows never transition again.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Cancelled
        )
    }
}

/// Reviewer-driven action against a pending or reviewing application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Review,
    Accept,
    Reject,
    Cancel,
}

impl ReviewAction {
    /// Resolve the target status, or `None` when the transition is not allowed.
    ///
    /// `pending → {reviewing, accepted, rejected, cancelled}` and
    /// `reviewing → {accepted, rejected, cancelled}`; terminal states admit nothing.
    pub fn next_status(self, from: ApplicationStatus) -> Option<ApplicationStatus> {
        if from.is_terminal() {
            return None;
        }
        match self {
            ReviewAction::Review => {
                (from == ApplicationStatus::Pending).then_some(ApplicationStatus::Reviewing)
            }
            ReviewAction::Accept => Some(ApplicationStatus::Accepted),
            ReviewAction::Reject => Some(ApplicationStatus::Rejected),
            ReviewAction::Cancel => Some(ApplicationStatus::Cancelled),
        }
    }
}

/// Uploaded document filenames carried on the application; storage itself is external.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDocuments {
    pub profile_photo: Option<String>,
    pub nrc_copy: Option<String>,
    pub medical_certificate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: Option<String>,
}

/// Inbound submission payload for the public application form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub whatsapp: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub nrc_number: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub course_id: CourseId,
    pub branch_id: BranchId,
    #[serde(default)]
    pub preferred_schedule: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub previous_experience: Option<String>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub documents: ApplicationDocuments,
}

/// A prospective student's enrollment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub application_number: String,
    pub application_date: NaiveDate,
    pub status: ApplicationStatus,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub nrc_number: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub course_id: CourseId,
    pub branch_id: BranchId,
    pub preferred_schedule: Option<String>,
    pub preferred_language: String,
    pub education_level: Option<String>,
    pub previous_experience: Option<String>,
    pub medical_conditions: Option<String>,
    pub emergency_contact: EmergencyContact,
    pub reviewed_by: Option<AdminId>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub admin_notes: Option<String>,
    pub documents: ApplicationDocuments,
    pub created_at: NaiveDateTime,
}

impl Application {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whole years of age, adjusted for whether the birthday has passed yet.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.date_of_birth, today)
    }
}

pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    use chrono::Datelike;
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Completed,
    Suspended,
    Withdrawn,
    OnLeave,
}

impl StudentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Completed => "completed",
            StudentStatus::Suspended => "suspended",
            StudentStatus::Withdrawn => "withdrawn",
            StudentStatus::OnLeave => "on_leave",
        }
    }
}

/// Derived financial state of a student. Never written directly; always the
/// product of `derive` over the stored fee and paid amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    /// Present in the schema; no recording path derives it.
    Overdue,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }

    /// `paid` iff paid >= fee, `partial` iff 0 < paid < fee, else `pending`.
    pub fn derive(amount_paid: Decimal, total_fee: Decimal) -> Self {
        if amount_paid >= total_fee {
            PaymentStatus::Paid
        } else if amount_paid > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }
}

/// The enrolled entity, created only when an application is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub student_number: String,
    pub application_id: ApplicationId,
    pub enrollment_date: NaiveDate,
    pub course_start_date: NaiveDate,
    pub course_end_date: NaiveDate,
    pub status: StudentStatus,
    pub progress_percentage: u8,
    pub last_assessment_score: Option<u8>,
    pub total_fee: Decimal,
    pub amount_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub course_id: CourseId,
    pub branch_id: BranchId,
    pub assigned_instructor: Option<AdminId>,
    pub created_by: Option<AdminId>,
    pub created_at: NaiveDateTime,
}

impl Student {
    /// Outstanding amount; negative when the student has overpaid.
    pub fn balance(&self) -> Decimal {
        self.total_fee - self.amount_paid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    BankTransfer,
    Card,
    Check,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Check => "check",
        }
    }
}

/// Status of an individual payment row. Only `completed` rows count toward
/// a student's `amount_paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentState {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
            PaymentState::Cancelled => "cancelled",
        }
    }
}

/// A recorded financial transaction against a student's balance. Immutable
/// once completed except for the verification stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub payment_number: String,
    pub student_id: StudentId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub state: PaymentState,
    pub payment_date: NaiveDate,
    pub received_date: NaiveDate,
    pub received_by: AdminId,
    pub verified_by: Option<AdminId>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl LessonStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::Completed => "completed",
            LessonStatus::Cancelled => "cancelled",
            LessonStatus::Rescheduled => "rescheduled",
            LessonStatus::NoShow => "no_show",
        }
    }
}

/// A scheduled session; unique per (student, date, time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub student_id: StudentId,
    pub instructor_id: AdminId,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: LessonStatus,
    pub score: Option<u8>,
    pub completion_date: Option<NaiveDate>,
}

/// Secondary credential letting a student self-serve their own records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalAccess {
    pub id: u32,
    pub student_id: StudentId,
    pub access_code: String,
    pub email: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
    pub login_count: u32,
    pub active: bool,
}

/// Truncated percentage of completed lessons.
pub fn progress_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed * 100) / total) as u8
}
