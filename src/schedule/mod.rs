//! Installment schedules: discounted cashflow tables and payment dates

mod cashflows;
mod dates;

pub use cashflows::{cashflow_table, CashflowRow, CashflowTable};
pub use dates::{payment_dates, Periodicity};
