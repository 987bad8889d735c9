//! Field-level merge policy shared by the day log and the registry.
//!
//! A policy is a table of `(field, rule)` pairs evaluated uniformly. The day
//! log and the registry use the same table except for the time-in entry.

use crate::excel::{classify_time_in, TimeInKind};

use super::types::{AttendanceRecord, EmployeeProfile};

/// Descriptive fields subject to merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SecondaryCode,
    FullName,
    GenderFlag,
    BirthDate,
    DepartmentCode,
    DepartmentName,
    Shift,
    TimeIn,
    TimeOut,
    TimeKeepingCode,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::SecondaryCode,
        Field::FullName,
        Field::GenderFlag,
        Field::BirthDate,
        Field::DepartmentCode,
        Field::DepartmentName,
        Field::Shift,
        Field::TimeIn,
        Field::TimeOut,
        Field::TimeKeepingCode,
    ];
}

/// How an incoming value combines with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Incoming wins unless it is blank
    KeepWhenBlank,
    /// Leave codes, clock times and any other non-empty time-in win
    EagerTimeIn,
}

impl FieldRule {
    pub fn merge<'a>(self, existing: &'a str, incoming: &'a str) -> &'a str {
        match self {
            FieldRule::KeepWhenBlank => {
                if incoming.trim().is_empty() {
                    existing
                } else {
                    incoming
                }
            }
            FieldRule::EagerTimeIn => match classify_time_in(incoming) {
                TimeInKind::Empty => existing,
                TimeInKind::Leave | TimeInKind::Clock | TimeInKind::Other => incoming,
            },
        }
    }
}

/// Records whose descriptive fields can be merged
pub trait MergeTarget {
    fn field(&self, field: Field) -> &str;
    fn field_mut(&mut self, field: Field) -> &mut String;
}

impl MergeTarget for AttendanceRecord {
    fn field(&self, field: Field) -> &str {
        match field {
            Field::SecondaryCode => &self.secondary_code,
            Field::FullName => &self.full_name,
            Field::GenderFlag => &self.gender_flag,
            Field::BirthDate => &self.birth_date,
            Field::DepartmentCode => &self.department_code,
            Field::DepartmentName => &self.department_name,
            Field::Shift => &self.shift,
            Field::TimeIn => &self.time_in,
            Field::TimeOut => &self.time_out,
            Field::TimeKeepingCode => &self.time_keeping_code,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::SecondaryCode => &mut self.secondary_code,
            Field::FullName => &mut self.full_name,
            Field::GenderFlag => &mut self.gender_flag,
            Field::BirthDate => &mut self.birth_date,
            Field::DepartmentCode => &mut self.department_code,
            Field::DepartmentName => &mut self.department_name,
            Field::Shift => &mut self.shift,
            Field::TimeIn => &mut self.time_in,
            Field::TimeOut => &mut self.time_out,
            Field::TimeKeepingCode => &mut self.time_keeping_code,
        }
    }
}

impl MergeTarget for EmployeeProfile {
    fn field(&self, field: Field) -> &str {
        match field {
            Field::SecondaryCode => &self.secondary_code,
            Field::FullName => &self.full_name,
            Field::GenderFlag => &self.gender_flag,
            Field::BirthDate => &self.birth_date,
            Field::DepartmentCode => &self.department_code,
            Field::DepartmentName => &self.department_name,
            Field::Shift => &self.shift,
            Field::TimeIn => &self.time_in,
            Field::TimeOut => &self.time_out,
            Field::TimeKeepingCode => &self.time_keeping_code,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::SecondaryCode => &mut self.secondary_code,
            Field::FullName => &mut self.full_name,
            Field::GenderFlag => &mut self.gender_flag,
            Field::BirthDate => &mut self.birth_date,
            Field::DepartmentCode => &mut self.department_code,
            Field::DepartmentName => &mut self.department_name,
            Field::Shift => &mut self.shift,
            Field::TimeIn => &mut self.time_in,
            Field::TimeOut => &mut self.time_out,
            Field::TimeKeepingCode => &mut self.time_keeping_code,
        }
    }
}

/// Per-field merge table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    rules: Vec<(Field, FieldRule)>,
}

impl MergePolicy {
    /// Policy for the per-date attendance log
    pub fn day_log() -> Self {
        MergePolicy {
            rules: Field::ALL.iter().map(|f| (*f, FieldRule::KeepWhenBlank)).collect(),
        }
    }

    /// Policy for the employee registry
    pub fn registry() -> Self {
        Self::day_log().override_rule(Field::TimeIn, FieldRule::EagerTimeIn)
    }

    pub fn override_rule(mut self, field: Field, rule: FieldRule) -> Self {
        match self.rules.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = rule,
            None => self.rules.push((field, rule)),
        }
        self
    }

    pub fn rule_for(&self, field: Field) -> Option<FieldRule> {
        self.rules.iter().find(|(f, _)| *f == field).map(|(_, r)| *r)
    }

    /// Merge `incoming` into `existing`, returning how many fields changed
    pub fn apply<T: MergeTarget, S: MergeTarget>(&self, existing: &mut T, incoming: &S) -> usize {
        let mut changed = 0;
        for (field, rule) in &self.rules {
            let merged = rule.merge(existing.field(*field), incoming.field(*field));
            if merged != existing.field(*field) {
                let merged = merged.to_string();
                *existing.field_mut(*field) = merged;
                changed += 1;
            }
        }
        changed
    }
}
