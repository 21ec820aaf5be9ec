use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed offset between two salary steps.
///
/// Months are added first and clamp to the last valid day of the target
/// month, then days are added. A base date of 29 February advanced by two
/// years therefore lands on 28 February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIncrement {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl ServiceIncrement {
    /// Two years, no months, no days.
    pub const KGB: ServiceIncrement = ServiceIncrement { years: 2, months: 0, days: 0 };

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }

    /// Advance `base` by this increment. `None` only when the result leaves chrono's date range.
    pub fn apply(&self, base: NaiveDate) -> Option<NaiveDate> {
        let months = self.years.checked_mul(12)?.checked_add(self.months)?;
        base.checked_add_months(Months::new(months))?
            .checked_add_days(Days::new(u64::from(self.days)))
    }
}

impl Default for ServiceIncrement {
    fn default() -> Self {
        Self::KGB
    }
}

/// The dedup-relevant unit: two events are the same iff all three fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationEvent {
    pub nip: String,
    pub base_date: NaiveDate,
    pub derived_date: NaiveDate,
}

impl NotificationEvent {
    /// Derive the next KGB event for `nip` from its base date.
    pub fn derive(nip: &str, base_date: NaiveDate, increment: ServiceIncrement) -> Option<Self> {
        let derived_date = increment.apply(base_date)?;
        Some(Self {
            nip: nip.to_string(),
            base_date,
            derived_date,
        })
    }
}
