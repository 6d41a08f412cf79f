//! Payment reminder computation: which heads are still due per student,
//! and the share-message text built from a user-editable template.

use chrono::NaiveDate;

use crate::dates::{format_display, parse_date};
use crate::decimal::Money;
use crate::index::GlobalPaymentIndex;
use crate::model::{FeeHeadDefinition, Student};
use crate::types::same_class;

pub const DEFAULT_TEMPLATE: &str = "Reminder: School Fee Due\n\
Student: {name} (Adm {admNo}), Class {class}\n\
{lines}\n\
Please pay at the earliest. Thank you.";

/// one unpaid head for one student
#[derive(Debug, Clone, PartialEq)]
pub struct DueItem {
    pub adm_no: String,
    pub name: String,
    pub class: String,
    pub phone: String,
    pub fee_head: String,
    pub amount: Money,
    pub due_date: String,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderFilter {
    pub class: Option<String>,
    /// role restriction; a teacher only sees their own class
    pub scope_class: Option<String>,
    /// drop heads whose due date has not arrived yet
    pub only_overdue: bool,
}

impl Default for ReminderFilter {
    fn default() -> Self {
        Self {
            class: None,
            scope_class: None,
            only_overdue: true,
        }
    }
}

/// one row per unpaid head, sorted by class, name, head
pub fn due_items(
    students: &[Student],
    schedule: &[FeeHeadDefinition],
    index: &GlobalPaymentIndex,
    filter: &ReminderFilter,
    today: NaiveDate,
) -> Vec<DueItem> {
    let mut rows = Vec::new();
    for student in students {
        if let Some(class) = &filter.class {
            if !same_class(&student.class, class) {
                continue;
            }
        }
        if let Some(scope) = &filter.scope_class {
            if !same_class(&student.class, scope) {
                continue;
            }
        }
        for head in schedule {
            if !same_class(&head.class, &student.class) {
                continue;
            }
            if index.is_paid(&student.adm_no, &head.fee_head) {
                continue;
            }
            // a head due today has already fallen due
            let overdue = parse_date(&head.due_date).is_some_and(|due| due <= today);
            if filter.only_overdue && !overdue {
                continue;
            }
            rows.push(DueItem {
                adm_no: student.adm_no.clone(),
                name: student.name.clone(),
                class: student.class.clone(),
                phone: student.phone.clone(),
                fee_head: head.fee_head.clone(),
                amount: head.amount,
                due_date: head.due_date.clone(),
                overdue,
            });
        }
    }
    rows.sort_by(|a, b| {
        (&a.class, &a.name, &a.fee_head).cmp(&(&b.class, &b.name, &b.fee_head))
    });
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct DueLine {
    pub fee_head: String,
    pub amount: Money,
    pub due_date: String,
}

/// all of one student's unpaid heads folded together
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDueGroup {
    pub adm_no: String,
    pub name: String,
    pub class: String,
    pub phone: String,
    pub items: Vec<DueLine>,
    pub total: Money,
    pub earliest_due: String,
}

/// fold item rows into one group per student, sorted by class then name
pub fn group_by_student(items: &[DueItem]) -> Vec<StudentDueGroup> {
    let mut groups: Vec<StudentDueGroup> = Vec::new();
    for item in items {
        let pos = groups
            .iter()
            .position(|g| g.adm_no == item.adm_no)
            .unwrap_or_else(|| {
                groups.push(StudentDueGroup {
                    adm_no: item.adm_no.clone(),
                    name: item.name.clone(),
                    class: item.class.clone(),
                    phone: item.phone.clone(),
                    items: Vec::new(),
                    total: Money::ZERO,
                    earliest_due: String::new(),
                });
                groups.len() - 1
            });
        let group = &mut groups[pos];
        group.items.push(DueLine {
            fee_head: item.fee_head.clone(),
            amount: item.amount,
            due_date: item.due_date.clone(),
        });
        group.total += item.amount;
        let candidate = parse_date(&item.due_date);
        let current = parse_date(&group.earliest_due);
        let earlier = match (candidate, current) {
            (Some(c), Some(e)) => c < e,
            (Some(_), None) => true,
            _ => group.earliest_due.is_empty() && !item.due_date.is_empty(),
        };
        if earlier {
            group.earliest_due = item.due_date.clone();
        }
    }
    groups.sort_by(|a, b| (&a.class, &a.name).cmp(&(&b.class, &b.name)));
    groups
}

fn fee_line(fee_head: &str, amount: Money, due_date: &str) -> String {
    format!(
        "{}: \u{20b9}{} (Due {})",
        fee_head,
        amount.to_inr(),
        format_display(due_date)
    )
}

/// fill the template for a single unpaid head
pub fn render_item_message(template: &str, item: &DueItem) -> String {
    template
        .replacen("{name}", &item.name, 1)
        .replacen("{admNo}", &item.adm_no, 1)
        .replacen("{class}", &item.class, 1)
        .replacen("{feeHead}", &item.fee_head, 1)
        .replacen("{amount}", &item.amount.to_inr(), 1)
        .replacen("{dueDate}", &format_display(&item.due_date), 1)
        .replacen(
            "{lines}",
            &fee_line(&item.fee_head, item.amount, &item.due_date),
            1,
        )
}

/// fill the template for a whole student; `{lines}` expands to one line per
/// head, the per-head placeholders go blank
pub fn render_group_message(template: &str, group: &StudentDueGroup) -> String {
    let lines: Vec<String> = group
        .items
        .iter()
        .map(|line| fee_line(&line.fee_head, line.amount, &line.due_date))
        .collect();
    template
        .replacen("{name}", &group.name, 1)
        .replacen("{admNo}", &group.adm_no, 1)
        .replacen("{class}", &group.class, 1)
        .replacen("{feeHead}", "", 1)
        .replacen("{amount}", "", 1)
        .replacen("{dueDate}", &format_display(&group.earliest_due), 1)
        .replacen("{lines}", &lines.join("\n"), 1)
}

/// digits-only phone with the Indian country code prefixed onto bare
/// 10-digit numbers; numbers already starting with 91 pass through
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else if digits.starts_with("91") {
        Some(digits)
    } else if digits.len() == 10 {
        Some(format!("91{digits}"))
    } else {
        Some(digits)
    }
}
