/// Candle width. Any positive duration works; the label is the step in its
/// largest whole unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeframe {
    pub label: String,
    pub step_seconds: i64,
}

impl Timeframe {
    pub fn parse(value: &str) -> Result<Self, String> {
        let step_seconds = parse_duration_like_seconds(value)?;
        if step_seconds <= 0 {
            return Err(format!("timeframe must be positive: {value}"));
        }
        Ok(Self {
            label: step_label(step_seconds),
            step_seconds,
        })
    }
}

fn step_label(step_seconds: i64) -> String {
    const UNITS: [(i64, &str); 4] = [(604_800, "w"), (86_400, "d"), (3_600, "h"), (60, "m")];
    UNITS
        .iter()
        .find(|(size, _)| step_seconds % size == 0)
        .map(|(size, unit)| format!("{}{unit}", step_seconds / size))
        .unwrap_or_else(|| format!("{step_seconds}s"))
}

/// Parses `90`, `90s`, `5m`, `5min`, `2h`, `1day`, `1w` and similar into seconds.
pub fn parse_duration_like_seconds(value: &str) -> Result<i64, String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Ok(seconds);
    }

    let (number_part, unit) = if let Some(stripped) = trimmed.strip_suffix("sec") {
        (stripped, "sec")
    } else if let Some(stripped) = trimmed.strip_suffix("min") {
        (stripped, "min")
    } else if let Some(stripped) = trimmed.strip_suffix("hour") {
        (stripped, "hour")
    } else if let Some(stripped) = trimmed.strip_suffix("day") {
        (stripped, "day")
    } else if let Some(stripped) = trimmed.strip_suffix("week") {
        (stripped, "week")
    } else {
        trimmed.split_at(trimmed.len().saturating_sub(1))
    };

    let multiplier = match unit {
        "s" | "sec" => 1,
        "m" | "min" => 60,
        "h" | "hour" => 3600,
        "d" | "day" => 86400,
        "w" | "week" => 604800,
        _ => return Err(format!("unsupported duration unit: {unit}")),
    };

    let number: i64 = number_part
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {value}"))?;
    Ok(number * multiplier)
}

#[cfg(test)]
mod tests {
    use super::{parse_duration_like_seconds, Timeframe};

    #[test]
    fn timeframe_label_uses_largest_whole_unit() {
        let tf = Timeframe::parse("1min").unwrap();
        assert_eq!((tf.label.as_str(), tf.step_seconds), ("1m", 60));
        assert_eq!(Timeframe::parse("4H").unwrap().label, "4h");
        assert_eq!(Timeframe::parse("120m").unwrap().label, "2h");
        assert_eq!(Timeframe::parse("90").unwrap().label, "90s");
        assert_eq!(Timeframe::parse("7d").unwrap().label, "1w");
        assert!(Timeframe::parse("0").is_err());
        assert!(Timeframe::parse("-5m").is_err());
    }

    #[test]
    fn durations_accept_units() {
        assert_eq!(parse_duration_like_seconds("90").unwrap(), 90);
        assert_eq!(parse_duration_like_seconds("45s").unwrap(), 45);
        assert_eq!(parse_duration_like_seconds("2hour").unwrap(), 7200);
        assert_eq!(parse_duration_like_seconds("1d").unwrap(), 86_400);
        assert!(parse_duration_like_seconds("3y").is_err());
    }
}
