use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::views::{
    AcceptanceLetter, ApplicationExportRow, InvoiceView, PaymentExportRow, StudentExportRow,
};

/// Rendered artifact handed to download responses and notification attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Rendering error; non-fatal when the document is a post-commit side effect.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to render {kind}: {reason}")]
    Render { kind: &'static str, reason: String },
}

impl DocumentError {
    fn csv(kind: &'static str, source: csv::Error) -> Self {
        DocumentError::Render {
            kind,
            reason: source.to_string(),
        }
    }
}

/// Pure functions of their input views; no side effect on the data model.
pub trait DocumentGenerator: Send + Sync {
    fn acceptance_letter(&self, letter: &AcceptanceLetter) -> Result<DocumentFile, DocumentError>;
    fn invoice(&self, invoice: &InvoiceView) -> Result<DocumentFile, DocumentError>;
    fn application_summary(
        &self,
        row: &ApplicationExportRow,
    ) -> Result<DocumentFile, DocumentError>;
    fn applications_sheet(
        &self,
        rows: &[ApplicationExportRow],
    ) -> Result<DocumentFile, DocumentError>;
    fn students_sheet(&self, rows: &[StudentExportRow]) -> Result<DocumentFile, DocumentError>;
    fn payments_sheet(&self, rows: &[PaymentExportRow]) -> Result<DocumentFile, DocumentError>;
}

/// Default renderer: plain-text letters and CSV sheets. The binary layout of
/// "real" PDF/Excel output is an external concern; only the content fields
/// carried here are contractual.
#[derive(Debug, Clone, Default)]
pub struct TextDocumentRenderer;

impl TextDocumentRenderer {
    fn sheet<T: Serialize>(
        kind: &'static str,
        filename: &str,
        rows: &[T],
    ) -> Result<DocumentFile, DocumentError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer
                .serialize(row)
                .map_err(|source| DocumentError::csv(kind, source))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|source| DocumentError::Render {
                kind,
                reason: source.to_string(),
            })?;
        Ok(DocumentFile {
            filename: filename.to_string(),
            content_type: "text/csv".to_string(),
            bytes,
        })
    }
}

impl DocumentGenerator for TextDocumentRenderer {
    fn acceptance_letter(&self, letter: &AcceptanceLetter) -> Result<DocumentFile, DocumentError> {
        let mut body = String::new();
        let _ = writeln!(body, "{}", letter.school_name);
        let _ = writeln!(body, "Date: {}", letter.issued_on.format("%B %d, %Y"));
        let _ = writeln!(body, "Reference: {}", letter.application_number);
        let _ = writeln!(body);
        let _ = writeln!(body, "LETTER OF ACCEPTANCE");
        let _ = writeln!(body);
        let _ = writeln!(body, "Dear {},", letter.full_name);
        let _ = writeln!(
            body,
            "We are pleased to inform you that your application has been ACCEPTED."
        );
        let _ = writeln!(body);
        let _ = writeln!(body, "Application Number: {}", letter.application_number);
        let _ = writeln!(body, "Course: {}", letter.course_name);
        let _ = writeln!(body, "Branch: {}", letter.branch_name);
        let _ = writeln!(
            body,
            "Course Start Date: {}",
            letter.course_start_date.format("%B %d, %Y")
        );
        let _ = writeln!(
            body,
            "Course Fee: {} {:.2}",
            letter.currency, letter.total_fee
        );
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "Please visit your branch office within 7 days to complete enrollment."
        );

        Ok(DocumentFile {
            filename: format!("acceptance_{}.txt", letter.application_number),
            content_type: "text/plain".to_string(),
            bytes: body.into_bytes(),
        })
    }

    fn invoice(&self, invoice: &InvoiceView) -> Result<DocumentFile, DocumentError> {
        let mut body = String::new();
        let _ = writeln!(body, "{} - PAYMENT RECEIPT", invoice.school_name);
        let _ = writeln!(body, "Payment Number: {}", invoice.payment_number);
        let _ = writeln!(
            body,
            "Date: {}",
            invoice.payment_date.format("%B %d, %Y")
        );
        let _ = writeln!(body, "Student: {} ({})", invoice.student_name, invoice.student_number);
        let _ = writeln!(body, "Course: {}", invoice.course_name);
        let _ = writeln!(body, "Amount: {} {:.2}", invoice.currency, invoice.amount);
        let _ = writeln!(body, "Method: {}", invoice.method);
        let _ = writeln!(
            body,
            "Outstanding Balance: {} {:.2}",
            invoice.currency, invoice.balance
        );

        Ok(DocumentFile {
            filename: format!("invoice_{}.txt", invoice.payment_number),
            content_type: "text/plain".to_string(),
            bytes: body.into_bytes(),
        })
    }

    fn application_summary(
        &self,
        row: &ApplicationExportRow,
    ) -> Result<DocumentFile, DocumentError> {
        let mut body = String::new();
        let _ = writeln!(body, "APPLICATION FORM - {}", row.application_number);
        let _ = writeln!(body, "Name: {} {}", row.first_name, row.last_name);
        let _ = writeln!(body, "Email: {}", row.email);
        let _ = writeln!(body, "Phone: {}", row.phone);
        let _ = writeln!(body, "Date of Birth: {}", row.date_of_birth);
        let _ = writeln!(body, "Gender: {}", row.gender);
        let _ = writeln!(body, "NRC Number: {}", row.nrc_number);
        let _ = writeln!(body, "Address: {}, {}, {}", row.address, row.city, row.province);
        let _ = writeln!(body, "Course: {}", row.course);
        let _ = writeln!(body, "Branch: {}", row.branch);
        let _ = writeln!(body, "Status: {}", row.status);
        if let Some(notes) = &row.admin_notes {
            let _ = writeln!(body, "Administrative Notes: {notes}");
        }

        Ok(DocumentFile {
            filename: format!("application_{}.txt", row.application_number),
            content_type: "text/plain".to_string(),
            bytes: body.into_bytes(),
        })
    }

    fn applications_sheet(
        &self,
        rows: &[ApplicationExportRow],
    ) -> Result<DocumentFile, DocumentError> {
        Self::sheet("applications sheet", "applications.csv", rows)
    }

    fn students_sheet(&self, rows: &[StudentExportRow]) -> Result<DocumentFile, DocumentError> {
        Self::sheet("students sheet", "students.csv", rows)
    }

    fn payments_sheet(&self, rows: &[PaymentExportRow]) -> Result<DocumentFile, DocumentError> {
        Self::sheet("payments sheet", "payments.csv", rows)
    }
}
