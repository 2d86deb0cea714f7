//! Tests for RRULE parsing, serialization and description.

use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use scheduling_engine::rule::{describe, Frequency, RecurrenceRule, Until, WeekdayNum};
use scheduling_engine::EngineError;

fn parse(text: &str) -> RecurrenceRule {
    RecurrenceRule::parse(text).unwrap_or_else(|e| panic!("'{text}' should parse: {e}"))
}

fn assert_invalid(text: &str) {
    match RecurrenceRule::parse(text) {
        Err(EngineError::InvalidRuleSyntax(_)) => {}
        other => panic!("'{text}' should be rejected, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parses_every_supported_part() {
    let rule = parse("FREQ=MONTHLY;INTERVAL=2;COUNT=10;BYDAY=MO,-1FR;BYMONTH=1,6;BYMONTHDAY=1,-1;BYSETPOS=1,-1");
    assert_eq!(rule.frequency, Frequency::Monthly);
    assert_eq!(rule.interval, 2);
    assert_eq!(rule.count, Some(10));
    assert_eq!(
        rule.by_day,
        vec![WeekdayNum::every(Weekday::Mon), WeekdayNum::nth(-1, Weekday::Fri)]
    );
    assert_eq!(rule.by_month, vec![1, 6]);
    assert_eq!(rule.by_month_day, vec![1, -1]);
    assert_eq!(rule.by_set_pos, vec![1, -1]);
}

#[test]
fn defaults_when_parts_missing() {
    let rule = parse("FREQ=DAILY");
    assert_eq!(rule, RecurrenceRule::new(Frequency::Daily));
    assert!(!rule.is_bounded());
}

#[test]
fn accepts_prefix_case_and_whitespace() {
    let rule = parse("  rrule:freq=weekly; byday=tu,th ;count=4;");
    assert_eq!(rule.frequency, Frequency::Weekly);
    assert_eq!(rule.by_day.len(), 2);
    assert_eq!(rule.count, Some(4));
}

#[test]
fn accepts_default_week_start() {
    assert_eq!(parse("FREQ=WEEKLY;WKST=MO"), parse("FREQ=WEEKLY"));
}

#[test]
fn parses_until_forms() {
    assert_eq!(
        parse("FREQ=DAILY;UNTIL=20260305T090000Z").until,
        Some(Until::Utc(Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap()))
    );
    assert_eq!(
        parse("FREQ=DAILY;UNTIL=20260305T090000").until,
        Some(Until::Floating(
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap().and_hms_opt(9, 0, 0).unwrap()
        ))
    );
    // Date-only covers the whole day.
    assert_eq!(
        parse("FREQ=DAILY;UNTIL=20260305").until,
        Some(Until::Floating(
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap().and_hms_opt(23, 59, 59).unwrap()
        ))
    );
}

#[test]
fn count_and_until_may_coexist() {
    let rule = parse("FREQ=DAILY;COUNT=3;UNTIL=20261231T000000Z");
    assert_eq!(rule.count, Some(3));
    assert!(rule.until.is_some());
}

#[test]
fn from_str_matches_parse() {
    let rule: RecurrenceRule = "FREQ=YEARLY;BYMONTH=3".parse().unwrap();
    assert_eq!(rule, parse("FREQ=YEARLY;BYMONTH=3"));
}

#[test]
fn rejects_malformed_rules() {
    for text in [
        "",
        "RRULE:",
        "COUNT=5",
        "FREQ=DAILY;FREQ=WEEKLY",
        "FREQ=FORTNIGHTLY",
        "FREQ=HOURLY",
        "FREQ=DAILY;COUNT",
        "FREQ=DAILY;COUNT=abc",
        "FREQ=DAILY;INTERVAL=0",
        "FREQ=DAILY;COUNT=0",
        "FREQ=DAILY;INTERVAL=-2",
        "FREQ=DAILY;UNTIL=2026-03-05",
        "FREQ=DAILY;BYHOUR=9",
        "FREQ=DAILY;X-CUSTOM=1",
        "FREQ=WEEKLY;WKST=SU",
        "FREQ=YEARLY;BYMONTH=13",
        "FREQ=YEARLY;BYMONTH=0",
        "FREQ=MONTHLY;BYMONTHDAY=0",
        "FREQ=MONTHLY;BYMONTHDAY=32",
        "FREQ=MONTHLY;BYMONTHDAY=-32",
        "FREQ=MONTHLY;BYDAY=XX",
        "FREQ=MONTHLY;BYDAY=",
        "FREQ=MONTHLY;BYDAY=0MO",
        "FREQ=MONTHLY;BYSETPOS=1",
        "FREQ=MONTHLY;BYDAY=MO;BYSETPOS=0",
        "FREQ=WEEKLY;BYDAY=2MO",
        "FREQ=DAILY;BYDAY=-1FR",
        "FREQ=WEEKLY;BYMONTHDAY=1",
    ] {
        assert_invalid(text);
    }
}

// ---------------------------------------------------------------------------
// Display / serde
// ---------------------------------------------------------------------------

#[test]
fn display_is_canonical() {
    let rule = parse("byday=tu,th;count=8;freq=weekly;interval=2");
    assert_eq!(rule.to_string(), "FREQ=WEEKLY;INTERVAL=2;COUNT=8;BYDAY=TU,TH");
}

#[test]
fn display_round_trips() {
    for text in [
        "FREQ=DAILY",
        "FREQ=MONTHLY;BYDAY=-1FR;BYSETPOS=1",
        "FREQ=YEARLY;BYMONTH=11;BYDAY=4TH",
        "FREQ=DAILY;UNTIL=20260305",
        "FREQ=DAILY;COUNT=3;UNTIL=20261231T000000Z",
        "FREQ=MONTHLY;INTERVAL=3;BYMONTHDAY=1,15,-1",
    ] {
        let rule = parse(text);
        assert_eq!(parse(&rule.to_string()), rule, "round trip of {text}");
    }
}

#[test]
fn serde_uses_rrule_text() {
    let rule = parse("FREQ=DAILY;COUNT=3");
    let json = serde_json::to_string(&rule).unwrap();
    assert_eq!(json, "\"FREQ=DAILY;COUNT=3\"");
    let back: RecurrenceRule = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rule);
    assert!(serde_json::from_str::<RecurrenceRule>("\"FREQ=NEVER\"").is_err());
}

// ---------------------------------------------------------------------------
// describe
// ---------------------------------------------------------------------------

#[test]
fn describes_common_rules() {
    let cases = [
        ("FREQ=DAILY", "Daily"),
        ("FREQ=DAILY;INTERVAL=3", "Every 3 days"),
        ("FREQ=DAILY;COUNT=1", "Daily, once"),
        ("FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH;COUNT=8", "Every 2 weeks on Tuesday and Thursday, 8 times"),
        ("FREQ=MONTHLY;BYDAY=2TU;COUNT=3", "Monthly on the 2nd Tuesday, 3 times"),
        ("FREQ=MONTHLY;BYMONTHDAY=-1", "Monthly on the last day"),
        ("FREQ=YEARLY;BYMONTH=1,7;BYMONTHDAY=15", "Yearly on the 15th in January and July"),
        (
            "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1",
            "Monthly on Monday, Tuesday, Wednesday, Thursday and Friday, taking the last match each month",
        ),
        ("FREQ=DAILY;UNTIL=20261231", "Daily, until 2026-12-31"),
        ("FREQ=WEEKLY;UNTIL=20261231T170000Z", "Weekly, until 2026-12-31 17:00 UTC"),
    ];
    for (text, expected) in cases {
        assert_eq!(describe(&parse(text)), expected, "describe({text})");
    }
}
