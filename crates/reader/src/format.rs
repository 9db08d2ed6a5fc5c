//! Transport display formatting

/// `m:ss`; negative or non-finite input reads as `0:00`
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// `"0:42 / 1:30"`, or a loading hint until the duration is known
pub fn time_label(has_metadata: bool, current_time: f64, duration: f64) -> String {
    if has_metadata {
        format!("{} / {}", format_time(current_time), format_time(duration))
    } else {
        "Loading audio…".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(61.2), "1:01");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(-2.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn test_time_label() {
        assert_eq!(time_label(false, 3.0, 10.0), "Loading audio…");
        assert_eq!(time_label(true, 42.0, 90.0), "0:42 / 1:30");
    }
}
