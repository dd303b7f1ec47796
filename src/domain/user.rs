use super::{check_non_negative, check_text, Group, Violation};

/// A participant enrolled in an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub id: i64,
    pub experiment_id: i64,
    /// External identifier of the participant.
    pub user_id: String,
    pub group_name: String,
}

impl User {
    pub fn validate(&self) -> Result<(), Violation> {
        check_non_negative("id", self.id)?;
        check_non_negative("experiment id", self.experiment_id)?;
        check_text("user id", &self.user_id)?;
        check_text("group name", &self.group_name)?;
        self.group()?;
        Ok(())
    }

    pub fn group(&self) -> Result<Group, Violation> {
        self.group_name.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 3,
            experiment_id: 1,
            user_id: "visitor-17".into(),
            group_name: "A".into(),
        }
    }

    #[test]
    fn valid_user() {
        assert!(user().validate().is_ok());
        assert_eq!(user().group(), Ok(Group::A));
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = [
            (User { id: -1, ..user() }, Violation::Negative { field: "id" }),
            (
                User { experiment_id: -4, ..user() },
                Violation::Negative { field: "experiment id" },
            ),
            (
                User { user_id: "".into(), ..user() },
                Violation::Empty { field: "user id" },
            ),
            (
                User { group_name: "".into(), ..user() },
                Violation::Empty { field: "group name" },
            ),
            (
                User { group_name: "control".into(), ..user() },
                Violation::UnknownGroup("control".into()),
            ),
        ];
        for (candidate, expected) in cases {
            assert_eq!(candidate.validate(), Err(expected));
        }
    }
}
