use chrono::{DateTime, Utc};

use super::{check_non_negative, check_range, check_text, Violation};

/// One recommendation shown to a user, and how they reacted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultRecord {
    pub id: i64,
    /// Row id of the [`super::User`] the recommendation was shown to.
    pub user_id: i64,
    pub recommendation_id: String,
    /// 0 for no rating, otherwise 1 to 5.
    pub rating: i32,
    pub clicked: bool,
    pub clicked_at: Option<DateTime<Utc>>,
}

impl ResultRecord {
    pub fn validate(&self) -> Result<(), Violation> {
        check_non_negative("id", self.id)?;
        if self.user_id <= 0 {
            return Err(Violation::NotPositive { field: "user id" });
        }
        check_text("recommendation id", &self.recommendation_id)?;
        check_range("rating", self.rating as i64, 0, 5)?;

        if self.rating > 0 && !self.clicked {
            return Err(Violation::RatingWithoutClick);
        }
        match (self.clicked, self.click_time().is_some()) {
            (true, false) => Err(Violation::ClickWithoutTimestamp),
            (false, true) => Err(Violation::TimestampWithoutClick),
            _ => Ok(()),
        }
    }

    /// The click timestamp, with the Unix epoch standing in for "unset".
    pub fn click_time(&self) -> Option<DateTime<Utc>> {
        self.clicked_at.filter(|at| at.timestamp() != 0 || at.timestamp_subsec_nanos() != 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn clicked_result() -> ResultRecord {
        ResultRecord {
            id: 0,
            user_id: 3,
            recommendation_id: "rec-42".into(),
            rating: 4,
            clicked: true,
            clicked_at: Some(Utc.with_ymd_and_hms(2023, 4, 1, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn valid_results() {
        assert!(clicked_result().validate().is_ok());

        let unclicked = ResultRecord {
            rating: 0,
            clicked: false,
            clicked_at: None,
            ..clicked_result()
        };
        assert!(unclicked.validate().is_ok());
    }

    #[test]
    fn rating_without_click() {
        let r = ResultRecord {
            rating: 4,
            clicked: false,
            clicked_at: None,
            ..clicked_result()
        };
        assert_eq!(r.validate(), Err(Violation::RatingWithoutClick));
    }

    #[test]
    fn click_without_timestamp() {
        let missing = ResultRecord {
            clicked_at: None,
            ..clicked_result()
        };
        assert_eq!(missing.validate(), Err(Violation::ClickWithoutTimestamp));

        let epoch = ResultRecord {
            clicked_at: Some(Utc.timestamp_opt(0, 0).unwrap()),
            ..clicked_result()
        };
        assert_eq!(epoch.validate(), Err(Violation::ClickWithoutTimestamp));
    }

    #[test]
    fn timestamp_without_click() {
        let r = ResultRecord {
            rating: 0,
            clicked: false,
            ..clicked_result()
        };
        assert_eq!(r.validate(), Err(Violation::TimestampWithoutClick));
    }

    #[test]
    fn numeric_bounds() {
        assert_eq!(
            ResultRecord { user_id: 0, ..clicked_result() }.validate(),
            Err(Violation::NotPositive { field: "user id" })
        );
        assert_eq!(
            ResultRecord { id: -1, ..clicked_result() }.validate(),
            Err(Violation::Negative { field: "id" })
        );
        assert!(ResultRecord { rating: 6, ..clicked_result() }.validate().is_err());
        assert!(ResultRecord { rating: -1, ..clicked_result() }.validate().is_err());
        assert!(ResultRecord { rating: 5, ..clicked_result() }.validate().is_ok());
    }
}
