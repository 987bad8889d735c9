//! Projects a candidate batch onto the employee registry.

use chrono::NaiveDate;

use super::merge::MergePolicy;
use super::reconcile::collapse_batch;
use super::types::*;

/// Merge a batch into the registry, keyed directly by employee code.
///
/// Profiles without a matching candidate are left untouched.
pub fn update_registry(
    registry: RecordSet<EmployeeProfile>,
    candidates: &[CandidateRow],
    target_date: NaiveDate,
    policy: &MergePolicy,
) -> RegistryUpdate {
    let (batch, _) = collapse_batch(candidates);
    let date = target_date.format("%Y-%m-%d").to_string();

    let mut profiles = registry;
    let mut created = 0;
    let mut refreshed = 0;

    for candidate in batch {
        let code = &candidate.record.employee_code;
        if profiles.contains_key(code) {
            refreshed += 1;
        } else {
            created += 1;
        }
        let profile = profiles
            .entry(code.clone())
            .or_insert_with(|| EmployeeProfile::for_code(code));

        policy.apply(profile, &candidate.record);

        // Back-filling an older date must not move the marker backwards
        if date > profile.last_attendance_date {
            profile.last_attendance_date = date.clone();
        }
    }

    RegistryUpdate {
        profiles,
        created,
        refreshed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn candidate(code: &str, time_in: &str) -> CandidateRow {
        CandidateRow {
            row_key: "emp_0".to_string(),
            row_index: 0,
            record: AttendanceRecord {
                employee_code: code.to_string(),
                sequence_number: 1,
                full_name: format!("Employee {}", code),
                department_name: "Molding".to_string(),
                time_in: time_in.to_string(),
                ..Default::default()
            },
        }
    }

    fn registry_with(code: &str, time_in: &str) -> RecordSet<EmployeeProfile> {
        let mut profile = EmployeeProfile::for_code(code);
        profile.full_name = "Known Name".to_string();
        profile.shift = "A".to_string();
        profile.time_in = time_in.to_string();
        profile.last_attendance_date = "2025-09-13".to_string();

        let mut registry = RecordSet::new();
        registry.insert(code.to_string(), profile);
        registry
    }

    #[test]
    fn test_leave_code_overwrites_clock_time() {
        let result = update_registry(
            registry_with("1001", "07:30"),
            &[candidate("1001", "PN")],
            date("2025-09-14"),
            &MergePolicy::registry(),
        );

        let profile = &result.profiles["1001"];
        assert_eq!(profile.time_in, "PN");
        assert_eq!(profile.full_name, "Employee 1001");
        assert_eq!(profile.shift, "A");
        assert_eq!(profile.last_attendance_date, "2025-09-14");
        assert_eq!(result.refreshed, 1);
        assert_eq!(result.created, 0);
    }

    #[test]
    fn test_empty_time_in_is_ignored() {
        let result = update_registry(
            registry_with("1001", "PN"),
            &[candidate("1001", "")],
            date("2025-09-14"),
            &MergePolicy::registry(),
        );
        assert_eq!(result.profiles["1001"].time_in, "PN");
    }

    #[test]
    fn test_new_employee_is_created_and_others_untouched() {
        let result = update_registry(
            registry_with("1001", "07:30"),
            &[candidate("1002", "08:00")],
            date("2025-09-14"),
            &MergePolicy::registry(),
        );

        assert_eq!(result.created, 1);
        assert_eq!(result.profiles.len(), 2);
        assert_eq!(result.profiles["1002"].employee_code, "1002");
        assert_eq!(result.profiles["1002"].time_in, "08:00");
        assert_eq!(result.profiles["1001"], registry_with("1001", "07:30")["1001"]);
    }

    #[test]
    fn test_older_date_keeps_latest_marker() {
        let result = update_registry(
            registry_with("1001", "07:30"),
            &[candidate("1001", "07:10")],
            date("2025-09-01"),
            &MergePolicy::registry(),
        );
        let profile = &result.profiles["1001"];
        assert_eq!(profile.time_in, "07:10");
        assert_eq!(profile.last_attendance_date, "2025-09-13");
    }
}
