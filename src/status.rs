use chrono::{DateTime, Utc};

/// Save status shown next to the document title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// When the content was last changed
    pub last_change_time: Option<DateTime<Utc>>,
    /// When the content was last explicitly saved
    pub last_save_time: Option<DateTime<Utc>>,
}

impl SaveStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_changed(&mut self) {
        self.last_change_time = Some(Utc::now());
    }

    pub fn mark_saved(&mut self) {
        self.last_save_time = Some(Utc::now());
    }

    pub fn text(&self, saved: bool, exporting: bool) -> String {
        self.text_at(saved, exporting, Utc::now())
    }

    /// Status text as seen at `now`
    pub fn text_at(&self, saved: bool, exporting: bool, now: DateTime<Utc>) -> String {
        if exporting {
            return "Exporting...".to_string();
        }
        if !saved {
            return if self.last_change_time.is_some() || self.last_save_time.is_some() {
                "not saved".to_string()
            } else {
                String::new()
            };
        }
        match self.last_save_time {
            Some(time) => format_time_since(time, now),
            None => String::new(),
        }
    }
}

/// Format the time since a save as a human-readable string
pub fn format_time_since(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - time).num_seconds();
    if secs < 0 {
        return "saved (time error)".to_string();
    }

    if secs < 60 {
        "saved just now".to_string()
    } else if secs < 3600 {
        plural("saved", secs / 60, "min")
    } else if secs < 86400 {
        plural("saved", secs / 3600, "hour")
    } else if secs < 604800 {
        plural("saved", secs / 86400, "day")
    } else {
        format!("saved {}", time.format("%Y-%m-%d"))
    }
}

fn plural(prefix: &str, n: i64, unit: &str) -> String {
    if n == 1 || unit == "min" {
        format!("{prefix} {n} {unit} ago")
    } else {
        format!("{prefix} {n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_format_time_since() {
        let t = base();
        assert_eq!(format_time_since(t, t + Duration::seconds(5)), "saved just now");
        assert_eq!(format_time_since(t, t + Duration::minutes(1)), "saved 1 min ago");
        assert_eq!(format_time_since(t, t + Duration::minutes(42)), "saved 42 min ago");
        assert_eq!(format_time_since(t, t + Duration::hours(1)), "saved 1 hour ago");
        assert_eq!(format_time_since(t, t + Duration::hours(5)), "saved 5 hours ago");
        assert_eq!(format_time_since(t, t + Duration::days(1)), "saved 1 day ago");
        assert_eq!(format_time_since(t, t + Duration::days(3)), "saved 3 days ago");
        assert_eq!(format_time_since(t, t + Duration::days(30)), "saved 2024-03-08");
        assert_eq!(format_time_since(t, t - Duration::seconds(1)), "saved (time error)");
    }

    #[test]
    fn test_status_text() {
        let mut status = SaveStatus::new();
        assert_eq!(status.text_at(true, false, base()), "");

        status.last_change_time = Some(base());
        assert_eq!(status.text_at(false, false, base()), "not saved");

        status.last_save_time = Some(base());
        assert_eq!(
            status.text_at(true, false, base() + Duration::minutes(3)),
            "saved 3 min ago"
        );
        assert_eq!(status.text_at(true, true, base()), "Exporting...");
    }
}
