pub mod dates;
pub mod decimal;
pub mod errors;
pub mod fine;
pub mod gateway;
pub mod index;
pub mod ledger;
pub mod model;
pub mod obligations;
pub mod payment;
pub mod reminders;
pub mod reports;
pub mod session;
pub mod status;
pub mod types;

// re-export key types
pub use decimal::Money;
pub use errors::{FeeError, Result};
pub use dates::{QuickRange, indian_fiscal_year, parse_date};
pub use fine::FineSchedule;
pub use gateway::{
    BatchItem, BatchPayload, BatchReceipt, MatchingRecord, PaymentCheck, RawFeeHead, RawStudent,
    RawTransaction, SheetGateway,
};
pub use index::{DuplicateCharge, GlobalPaymentIndex, PaidRecord, PaymentIndex};
pub use ledger::FeeLedger;
pub use model::{FeeHeadDefinition, Receipt, ReceiptItem, Student, Transaction};
pub use obligations::{Obligation, ObligationList};
pub use payment::{
    submit_bulk, BulkFailure, BulkHeadChoice, BulkOutcome, BulkRequest, BulkSuccess,
    PaymentWorkflow, SubmitState,
};
pub use reminders::{
    due_items, group_by_student, normalize_phone, render_group_message, render_item_message,
    DueItem, DueLine, ReminderFilter, StudentDueGroup, DEFAULT_TEMPLATE,
};
pub use reports::{
    build_rows, filter_rows, group, summarize, GroupBy, GroupSummary, ReportFilter, ReportRow,
    StatusFilter, Summary,
};
pub use session::{SessionContext, SessionStore};
pub use status::{student_fee_status, FeeStatusLine, FeeStatusReport, FeeStatusSummary};
pub use types::Role;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
