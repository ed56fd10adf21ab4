//! 时间戳适配（基于 chrono）
//!
//! 把校验通过的字符串/数值解析为带时区偏移的时间点，并提供 JSON 输出所需的
//! 微秒精度 UTC ISO-8601 渲染。
//!
//! 时区可以是数值偏移、常见缩写或 IANA 名称（`America/New_York`），
//! IANA 名称按所在日期计算夏令时偏移。
//!
use crate::error::{DtoError, DtoResult};
use crate::value::DtoValue;
use chrono::{
    DateTime, Datelike, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// 常见时区缩写 → 相对 UTC 的秒数（缩写本身即表示固定偏移，优先于 IANA 同名区）
const ZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("UT", 0),
    ("GMT", 0),
    ("Z", 0),
    ("WET", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("AKST", -9 * 3600),
    ("AKDT", -8 * 3600),
    ("HST", -10 * 3600),
    ("WEST", 3600),
    ("BST", 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
    ("EET", 2 * 3600),
    ("EEST", 3 * 3600),
    ("IST", 5 * 3600 + 1800),
    ("JST", 9 * 3600),
    ("KST", 9 * 3600),
    ("AEST", 10 * 3600),
    ("AEDT", 11 * 3600),
];

/// 解析时间值
///
/// - 字符串：RFC 3339、RFC 2822，或 `Y-m-d[ H:M[:S[.f]]]` 加可选的结尾时区；
/// - 数值：unix 秒；
/// - 已是时间戳则原样返回。
///
/// 字符串不带时区时使用 `timezone`（缩写、`±HH:MM` 或 IANA 名称），缺省为 UTC。
/// 数值同样按 `timezone` 表示结果的偏移。
pub fn parse(value: &DtoValue, timezone: Option<&str>) -> DtoResult<DateTime<FixedOffset>> {
    let fallback = match timezone {
        Some(tz) => Zone::resolve(tz).ok_or_else(|| DtoError::InvalidInput {
            reason: format!("unknown timezone: {tz}"),
        })?,
        None => Zone::Fixed(utc_offset()),
    };

    match value {
        DtoValue::Timestamp(ts) => Ok(*ts),
        DtoValue::String(text) => parse_str(text, fallback),
        DtoValue::Int(secs) => from_unix(*secs, 0, fallback),
        DtoValue::Float(secs) if secs.is_finite() => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            from_unix(whole as i64, nanos.min(999_999_999), fallback)
        }
        other => Err(DtoError::InvalidInput {
            reason: format!("cannot parse {} as timestamp", other.kind()),
        }),
    }
}

fn parse_str(text: &str, fallback: Zone) -> DtoResult<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Ok(ts);
    }

    let (local, zone) = match text.rsplit_once(' ') {
        Some((rest, name)) => match Zone::resolve(name) {
            Some(zone) => (rest.trim_end(), zone),
            None => (text, fallback),
        },
        None => (text, fallback),
    };

    let naive = parse_naive(local).ok_or_else(|| DtoError::InvalidInput {
        reason: format!("unparsable timestamp: {text}"),
    })?;

    // 夏令时回拨造成的重复时刻取较早者
    zone.localize(&naive)
        .earliest()
        .ok_or_else(|| DtoError::InvalidInput {
            reason: format!("nonexistent local time: {text}"),
        })
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn from_unix(secs: i64, nanos: u32, zone: Zone) -> DtoResult<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|ts| zone.at(ts))
        .ok_or_else(|| DtoError::InvalidInput {
            reason: format!("timestamp out of range: {secs}"),
        })
}

#[derive(Debug, Clone, Copy)]
enum Zone {
    Fixed(FixedOffset),
    /// IANA 时区，偏移随日期变化
    Named(Tz),
}

impl Zone {
    fn resolve(name: &str) -> Option<Self> {
        let name = name.trim();
        fixed_offset(name)
            .map(Zone::Fixed)
            .or_else(|| name.parse::<Tz>().ok().map(Zone::Named))
    }

    fn localize(self, naive: &NaiveDateTime) -> LocalResult<DateTime<FixedOffset>> {
        match self {
            Zone::Fixed(offset) => offset.from_local_datetime(naive),
            Zone::Named(tz) => tz.from_local_datetime(naive).map(|ts| ts.fixed_offset()),
        }
    }

    fn at(self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Zone::Fixed(offset) => instant.with_timezone(&offset),
            Zone::Named(tz) => instant.with_timezone(&tz).fixed_offset(),
        }
    }
}

/// 时区缩写或数值偏移（`+05:00`、`-0500`、`+05`）
fn fixed_offset(zone: &str) -> Option<FixedOffset> {
    let upper = zone.trim().to_ascii_uppercase();
    if let Some((_, secs)) = ZONE_ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == upper) {
        return FixedOffset::east_opt(*secs);
    }

    let (sign, digits) = match upper.as_bytes().first()? {
        b'+' => (1, &upper[1..]),
        b'-' => (-1, &upper[1..]),
        _ => return None,
    };
    let digits = digits.replace(':', "");
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// 微秒精度、UTC、以 `Z` 结尾的 ISO-8601 字符串
pub fn to_iso_string(ts: &DateTime<FixedOffset>) -> String {
    ts.with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

/// 「月 日序数, 年」，例如 `September 11th, 2001`
pub fn long_date<Tz>(ts: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let day = ts.day();
    format!(
        "{} {}{}, {}",
        ts.format("%B"),
        day,
        ordinal_suffix(day),
        ts.year()
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
