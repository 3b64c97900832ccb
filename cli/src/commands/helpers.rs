use anyhow::{Context, Result, bail};
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use pace_core::calculators::{cm_to_feet_inches, feet_inches_to_cm, kg_to_lb};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    parse_date_from(date_str.as_deref(), Local::now().date_naive())
}

pub(crate) fn parse_date_from(date_str: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match date_str {
        None | Some("today") => Ok(today),
        Some("yesterday") => Ok(today - Duration::days(1)),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
    }
}

/// Parse a height as centimetres (`178`, `178cm`) or feet and inches (`5'10"`, `5ft10`, `5'`).
pub(crate) fn parse_height_cm(s: &str) -> Result<f64> {
    let s = s.trim().trim_end_matches('"').trim();

    let split = s
        .split_once('\'')
        .or_else(|| s.split_once("ft"))
        .map(|(f, i)| (f.trim(), i.trim().trim_end_matches("in").trim()));

    let cm = if let Some((feet, inches)) = split {
        let feet: f64 = feet
            .parse()
            .with_context(|| format!("Invalid height '{s}'"))?;
        let inches: f64 = if inches.is_empty() {
            0.0
        } else {
            inches
                .parse()
                .with_context(|| format!("Invalid height '{s}'"))?
        };
        if !(0.0..12.0).contains(&inches) {
            bail!("Inches must be between 0 and 11");
        }
        feet_inches_to_cm(feet, inches)
    } else {
        s.trim_end_matches("cm")
            .trim()
            .parse()
            .with_context(|| format!("Invalid height '{s}'. Use '178cm' or 5'10\""))?
    };

    if cm <= 0.0 {
        bail!("Height must be greater than 0");
    }
    Ok(cm)
}

/// Convert a weight in `unit` (lb or kg) to pounds.
pub(crate) fn weight_to_lb(value: f64, unit: &str) -> Result<f64> {
    match unit.to_lowercase().as_str() {
        "lb" | "lbs" => Ok(value),
        "kg" => Ok(kg_to_lb(value)),
        _ => bail!("Invalid unit '{unit}'. Use 'lb' or 'kg'"),
    }
}

pub(crate) fn format_height(cm: f64) -> String {
    let (feet, inches) = cm_to_feet_inches(cm);
    format!("{cm:.0} cm ({feet}'{inches}\")")
}

/// Signed kcal delta for display; `-` when calories were not logged.
pub(crate) fn format_delta(delta: Option<f64>) -> String {
    match delta.map(no_neg_zero) {
        Some(d) if d > 0.0 => format!("+{d:.0}"),
        Some(d) => format!("{d:.0}"),
        None => "-".to_string(),
    }
}

pub(crate) fn format_optional_weight(weight_lb: Option<f64>) -> String {
    weight_lb.map_or("-".into(), |w| format!("{w:.1}"))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = day(2025, 3, 1);
        assert_eq!(parse_date_from(Some("today"), today).unwrap(), today);
        assert_eq!(
            parse_date_from(Some("yesterday"), today).unwrap(),
            day(2025, 2, 28)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, day(2024, 1, 15));
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
        assert!(parse_date(Some("tomorrow".to_string())).is_err());
    }

    #[test]
    fn test_parse_height_cm() {
        assert!((parse_height_cm("178").unwrap() - 178.0).abs() < f64::EPSILON);
        assert!((parse_height_cm("178cm").unwrap() - 178.0).abs() < f64::EPSILON);
        assert!((parse_height_cm("165.5 cm").unwrap() - 165.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_height_feet_inches() {
        // 5'10" = 177.8 cm, rounded to whole cm
        assert!((parse_height_cm("5'10\"").unwrap() - 178.0).abs() < f64::EPSILON);
        assert!((parse_height_cm("5ft10").unwrap() - 178.0).abs() < f64::EPSILON);
        assert!((parse_height_cm("6'").unwrap() - 183.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_height_invalid() {
        assert!(parse_height_cm("tall").is_err());
        assert!(parse_height_cm("0").is_err());
        assert!(parse_height_cm("5'13").is_err());
    }

    #[test]
    fn test_weight_to_lb() {
        assert!((weight_to_lb(180.0, "lb").unwrap() - 180.0).abs() < f64::EPSILON);
        assert!((weight_to_lb(100.0, "KG").unwrap() - 220.462).abs() < 1e-9);
        assert!(weight_to_lb(100.0, "stone").is_err());
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(Some(250.4)), "+250");
        assert_eq!(format_delta(Some(-120.0)), "-120");
        assert_eq!(format_delta(Some(-0.0)), "0");
        assert_eq!(format_delta(None), "-");
    }

    #[test]
    fn test_format_height() {
        assert_eq!(format_height(178.0), "178 cm (5'10\")");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("boom"), r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
        assert_eq!(no_neg_zero(-3.0), -3.0);
    }
}
