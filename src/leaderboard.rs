use crate::models::{CohortMember, RankedUser};

#[derive(Debug, Clone, Default)]
pub struct LeaderboardQuery {
    pub batch: String,
    pub subject: Option<String>,
    pub limit: Option<usize>,
}

fn keeps(member: &CohortMember, query: &LeaderboardQuery) -> bool {
    let in_batch = member
        .user
        .username
        .to_ascii_uppercase()
        .starts_with(&query.batch.to_ascii_uppercase());
    if !in_batch || member.subjects.is_empty() {
        return false;
    }

    match &query.subject {
        Some(code) => member
            .subjects
            .iter()
            .any(|subject| subject.subject_code.eq_ignore_ascii_case(code)),
        None => true,
    }
}

/// Ranks batch members by overall percentage, highest first.
///
/// The sort is stable, so members with equal percentages keep the order
/// they were fetched in.
pub fn rank(members: Vec<CohortMember>, query: &LeaderboardQuery) -> Vec<RankedUser> {
    let mut kept: Vec<CohortMember> = members
        .into_iter()
        .filter(|member| keeps(member, query))
        .collect();

    kept.sort_by(|a, b| {
        b.user
            .overall_percentage
            .total_cmp(&a.user.overall_percentage)
    });

    kept.into_iter()
        .take(query.limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(index, member)| RankedUser {
            rank: index + 1,
            user: member.user,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubjectRecord, User};
    use uuid::Uuid;

    fn member(username: &str, percentage: f64, codes: &[&str]) -> CohortMember {
        CohortMember {
            user: User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                batch: "2023UGCSME".to_string(),
                overall_percentage: percentage,
            },
            subjects: codes
                .iter()
                .map(|code| SubjectRecord::new(*code, "Subject", "Dr. Rao", 1, 1).unwrap())
                .collect(),
        }
    }

    fn query(batch: &str, subject: Option<&str>) -> LeaderboardQuery {
        LeaderboardQuery {
            batch: batch.to_string(),
            subject: subject.map(str::to_string),
            limit: None,
        }
    }

    fn percentages(ranked: &[RankedUser]) -> Vec<f64> {
        ranked.iter().map(|entry| entry.user.overall_percentage).collect()
    }

    #[test]
    fn orders_by_percentage_descending() {
        let members = vec![
            member("2023UGCSME001", 90.0, &["CS1201"]),
            member("2023UGCSME002", 95.0, &["CS1201"]),
            member("2023UGCSME003", 80.0, &["CS1201"]),
        ];
        let ranked = rank(members, &query("2023UGCSME", None));
        assert_eq!(percentages(&ranked), vec![95.0, 90.0, 80.0]);
        assert_eq!(
            ranked.iter().map(|entry| entry.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn ties_keep_fetch_order() {
        let members = vec![
            member("2023UGCSME001", 90.0, &["CS1201"]),
            member("2023UGCSME002", 95.0, &["CS1201"]),
            member("2023UGCSME003", 90.0, &["CS1201"]),
        ];
        let ranked = rank(members, &query("2023UGCSME", None));
        let names: Vec<&str> = ranked.iter().map(|entry| entry.user.username.as_str()).collect();
        assert_eq!(names, vec!["2023UGCSME002", "2023UGCSME001", "2023UGCSME003"]);
    }

    #[test]
    fn drops_other_batches_and_members_without_subjects() {
        let members = vec![
            member("2023UGCSME001", 70.0, &["CS1201"]),
            member("2022UGCSME001", 99.0, &["CS1201"]),
            member("2023UGCSME002", 100.0, &[]),
        ];
        let ranked = rank(members, &query("2023ugcsme", None));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user.username, "2023UGCSME001");
    }

    #[test]
    fn subject_filter_keeps_members_with_that_subject() {
        let members = vec![
            member("2023UGCSME001", 70.0, &["CS1201", "MA1202"]),
            member("2023UGCSME002", 85.0, &["CS1201"]),
            member("2023UGCSME003", 60.0, &["MA1202"]),
        ];
        let ranked = rank(members, &query("2023UGCSME", Some("ma1202")));
        assert_eq!(percentages(&ranked), vec![70.0, 60.0]);
    }

    #[test]
    fn output_is_non_increasing_and_limited() {
        let members: Vec<CohortMember> = [42.0, 88.5, 63.0, 100.0, 0.0, 88.5]
            .iter()
            .enumerate()
            .map(|(i, pct)| member(&format!("2023UGCSME{i:03}"), *pct, &["CS1201"]))
            .collect();
        let mut limited = query("2023UGCSME", None);
        limited.limit = Some(4);

        let ranked = rank(members.clone(), &query("2023UGCSME", None));
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].user.overall_percentage >= pair[1].user.overall_percentage));
        assert_eq!(rank(members, &limited).len(), 4);
    }
}
