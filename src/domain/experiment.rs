use super::{check_non_negative, check_range, check_text, Violation};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Experiment {
    /// Zero until the store assigns one.
    pub id: i64,
    pub name: String,
    /// Share of traffic enrolled, in percent.
    pub user_percent: i32,
    pub algorithm_a: String,
    pub algorithm_b: String,
}

impl Experiment {
    pub fn validate(&self) -> Result<(), Violation> {
        check_non_negative("id", self.id)?;
        check_text("name", &self.name)?;
        check_range("user percent", self.user_percent as i64, 1, 100)?;
        check_text("algorithm A", &self.algorithm_a)?;
        check_text("algorithm B", &self.algorithm_b)?;
        if self.algorithm_a.trim() == self.algorithm_b.trim() {
            return Err(Violation::IdenticalAlgorithms);
        }
        Ok(())
    }
}
