//! Driving-school enrollment lifecycle: public application intake, the
//! reviewer-driven state machine, student materialization on acceptance,
//! payment recording, lesson scheduling, and the student self-service portal.
//!
//! Storage, notification, and document rendering sit behind traits so the
//! HTTP layer and tests compose the service from in-memory pieces.

pub mod documents;
pub mod domain;
pub(crate) mod identifiers;
pub mod memory;
pub mod notifier;
pub mod portal;
pub mod router;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use documents::{DocumentError, DocumentFile, DocumentGenerator, TextDocumentRenderer};
pub use domain::{
    age_on, Admin, AdminId, AdminRole, Application, ApplicationDocuments, ApplicationForm,
    ApplicationId, ApplicationStatus, Branch, BranchId, BranchScope, Course, CourseCategory,
    CourseId, EmergencyContact, Gender, Lesson, LessonId, LessonStatus, Payment, PaymentId,
    PaymentMethod, PaymentState, PaymentStatus, PortalAccess, ReviewAction, ScopeFilter, Student,
    StudentId, StudentStatus,
};
pub use memory::MemoryStore;
pub use notifier::{Notification, Notifier, NotifierError};
pub use portal::{PortalLogin, PortalRegistration};
pub use router::enrollment_router;
pub use service::{EnrollmentError, EnrollmentService, PaymentRequest, ReviewOutcome};
pub use store::{
    EnrollmentStore, NewAdmin, NewBranch, NewCourse, NewLesson, NewPayment, NewStudent, StoreError,
};
pub use views::{
    AcceptanceLetter, ApplicationStatusView, DashboardStats, InvoiceView, PortalDashboard,
    StudentStatusView,
};
