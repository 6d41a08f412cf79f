use serde::{Deserialize, Serialize};

use crate::dates::parse_date;
use crate::decimal::Money;

/// late-fee schedule: a flat amount per started block of late days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineSchedule {
    /// size of one lateness block in days
    pub step_days: u32,
    /// amount charged per started block
    pub step_amount: Money,
}

impl Default for FineSchedule {
    fn default() -> Self {
        Self {
            step_days: 15,
            step_amount: Money::from_major(25),
        }
    }
}

impl FineSchedule {
    /// fine for paying `pay_date` against `due_date`. Fails soft: a missing
    /// or unparseable date on either side means no fine, and paying on or
    /// before the due date is always free. The fine grows in discrete
    /// steps, one `step_amount` per started `step_days` block.
    pub fn fine_for(&self, due_date: &str, pay_date: &str) -> Money {
        let (Some(due), Some(pay)) = (parse_date(due_date), parse_date(pay_date)) else {
            return Money::ZERO;
        };
        if pay <= due {
            return Money::ZERO;
        }
        let days_late = (pay - due).num_days() as u32;
        let blocks = days_late.div_ceil(self.step_days.max(1));
        Money::from_decimal(self.step_amount.as_decimal() * rust_decimal::Decimal::from(blocks))
    }
}
