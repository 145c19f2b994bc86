//! Millisecond duration formatting for race displays

/// Format a millisecond duration as `HH:MM:SS`.
///
/// Hours are not bounded at 24; long races simply grow the hour field past
/// two digits. Sub-second remainder is truncated, matching the one-second
/// display resolution of the timing surface.
///
/// ```
/// use splitwall::format_hms;
///
/// assert_eq!(format_hms(0), "00:00:00");
/// assert_eq!(format_hms(3661000), "01:01:01");
/// ```
pub fn format_hms(duration_ms: u64) -> String {
    let seconds = duration_ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    format!("{:02}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn formats_exact_literals() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(1000), "00:00:01");
        assert_eq!(format_hms(60000), "00:01:00");
        assert_eq!(format_hms(61000), "00:01:01");
        assert_eq!(format_hms(3600000), "01:00:00");
        assert_eq!(format_hms(3661000), "01:01:01");
    }

    #[test]
    fn truncates_sub_second_remainder() {
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(1999), "00:00:01");
    }

    #[test]
    fn hours_grow_past_two_digits() {
        // 100 hours
        assert_eq!(format_hms(100 * 3_600_000), "100:00:00");
    }

    proptest! {
        #[test]
        fn prop_fields_are_zero_padded_and_in_range(ms in 0u64..(1000 * 3_600_000)) {
            let formatted = format_hms(ms);
            let parts: Vec<&str> = formatted.split(':').collect();
            prop_assert_eq!(parts.len(), 3);

            prop_assert!(parts[0].len() >= 2);
            prop_assert_eq!(parts[1].len(), 2);
            prop_assert_eq!(parts[2].len(), 2);

            let minutes: u64 = parts[1].parse().unwrap();
            let seconds: u64 = parts[2].parse().unwrap();
            prop_assert!(minutes < 60);
            prop_assert!(seconds < 60);
        }

        #[test]
        fn prop_round_trips_to_whole_seconds(ms in 0u64..(1000 * 3_600_000)) {
            let formatted = format_hms(ms);
            let parts: Vec<u64> =
                formatted.split(':').map(|p| p.parse().unwrap()).collect();
            let reconstructed = (parts[0] * 3600 + parts[1] * 60 + parts[2]) * 1000;
            prop_assert_eq!(reconstructed, ms / 1000 * 1000);
        }
    }
}
