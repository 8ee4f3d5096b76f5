use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Lesson, Payment, Student};

/// Sanitized application status exposed to the public lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_number: String,
    pub full_name: String,
    pub status: &'static str,
    pub course_name: String,
    pub branch_name: String,
    pub application_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<NaiveDateTime>,
}

/// Public student status lookup payload.
#[derive(Debug, Clone, Serialize)]
pub struct StudentStatusView {
    pub student_number: String,
    pub full_name: String,
    pub status: &'static str,
    pub course_name: String,
    pub payment_status: &'static str,
    pub progress_percentage: u8,
    pub course_start_date: NaiveDate,
    pub course_end_date: NaiveDate,
}

/// Branch-scoped dashboard counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_applications: usize,
    pub pending_applications: usize,
    pub reviewing_applications: usize,
    pub accepted_applications: usize,
    pub rejected_applications: usize,
    pub total_students: usize,
    pub active_students: usize,
    pub total_revenue: Decimal,
    pub outstanding_balance: Decimal,
}

/// Everything the student portal dashboard shows in one read.
#[derive(Debug, Clone, Serialize)]
pub struct PortalDashboard {
    pub student: Student,
    pub full_name: String,
    pub course_name: String,
    pub branch_name: String,
    pub balance: Decimal,
    /// Fresh value derived from lesson counts at read time.
    pub progress_percentage: u8,
    pub recent_payments: Vec<Payment>,
    pub upcoming_lessons: Vec<Lesson>,
    pub completed_lessons: usize,
    pub total_lessons: usize,
}

/// Content fields of the acceptance letter; layout belongs to the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceLetter {
    pub school_name: String,
    pub application_number: String,
    pub full_name: String,
    pub course_name: String,
    pub branch_name: String,
    pub course_start_date: NaiveDate,
    pub total_fee: Decimal,
    pub currency: String,
    pub issued_on: NaiveDate,
}

/// Content fields of a payment invoice/receipt.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    pub school_name: String,
    pub payment_number: String,
    pub payment_date: NaiveDate,
    pub student_number: String,
    pub student_name: String,
    pub course_name: String,
    pub amount: Decimal,
    pub method: &'static str,
    pub balance: Decimal,
    pub currency: String,
}

/// Flattened application row for spreadsheet export and the printable summary.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationExportRow {
    pub id: u32,
    pub application_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: &'static str,
    pub nrc_number: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub course: String,
    pub branch: String,
    pub status: &'static str,
    pub application_date: NaiveDate,
    pub admin_notes: Option<String>,
}

/// Flattened student row for spreadsheet export.
#[derive(Debug, Clone, Serialize)]
pub struct StudentExportRow {
    pub id: u32,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub course: String,
    pub branch: String,
    pub enrollment_date: NaiveDate,
    pub course_start_date: NaiveDate,
    pub course_end_date: NaiveDate,
    pub status: &'static str,
    pub payment_status: &'static str,
    pub total_fee: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub progress_percentage: u8,
}

/// Flattened payment row for spreadsheet export.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentExportRow {
    pub id: u32,
    pub payment_number: String,
    pub student_number: String,
    pub student_name: String,
    pub amount: Decimal,
    pub payment_method: &'static str,
    pub payment_date: NaiveDate,
    pub status: &'static str,
    pub received_by: String,
    pub notes: Option<String>,
}
