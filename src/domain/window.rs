use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Which side the notification window is anchored on.
///
/// `Anchored` opens the window `months` before the event date and closes it
/// on the event date: `event - months < today < event`. The eligible set only
/// grows as days pass, which is what a polling scheduler needs.
///
/// `Forward` measures from today instead: `today < event < today + months`.
/// It is kept for rosters configured against the older behaviour and should
/// not be chosen for new deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    #[default]
    Anchored,
    Forward,
}

/// Decides whether an event date is currently actionable.
///
/// Comparisons are made on calendar dates in the scan's timezone; both bounds
/// are open. Month arithmetic clamps to the last valid day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationWindow {
    pub policy: WindowPolicy,
    pub months: u32,
}

impl NotificationWindow {
    pub fn new(policy: WindowPolicy, months: u32) -> Self {
        Self { policy, months }
    }

    pub fn is_eligible(&self, today: NaiveDate, event_date: NaiveDate) -> bool {
        let span = Months::new(self.months);
        match self.policy {
            WindowPolicy::Anchored => match event_date.checked_sub_months(span) {
                Some(opens) => opens < today && today < event_date,
                None => false,
            },
            WindowPolicy::Forward => match today.checked_add_months(span) {
                Some(limit) => today < event_date && event_date < limit,
                None => today < event_date,
            },
        }
    }
}

impl Default for NotificationWindow {
    fn default() -> Self {
        Self::new(WindowPolicy::Anchored, crate::constants::DEFAULT_WINDOW_MONTHS)
    }
}
