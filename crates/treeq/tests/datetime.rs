mod common;

use chrono::DateTime;
use common::{eval, eval_err, eval_with, run_with};
use rstest::rstest;
use treeq::{EngineConfig, ErrorCode, ScalarTag};

fn tag_of(doc: &str, expr: &str) -> ScalarTag {
    let (tree, _, results) = run_with(EngineConfig::default(), doc, expr).unwrap();
    tree.scalar(results.matches[0].node).map(|s| s.tag).unwrap()
}

#[rstest]
#[case("2001-12-15T02:59:43.1Z", "format_datetime(\"%A, %d-%b-%y at %-I:%M%p\")", "Saturday, 15-Dec-01 at 2:59AM")]
#[case("2001-12-15T02:59:43.1Z", "format_datetime(\"%Y-%m-%d\")", "2001-12-15")]
#[case("2001-12-15T02:59:43+02:00", "format_datetime(\"rfc3339\")", "2001-12-15T02:59:43+02:00")]
#[case("Saturday, 15-Dec-01 at 2:59AM", "format_datetime(\"%A, %d-%b-%y at %-I:%M%p\"; \"%Y-%m-%d %H:%M\")", "2001-12-15 02:59")]
#[case("2001-12-15", "format_datetime(\"%Y-%m-%d\"; \"%d.%m.%Y\")", "15.12.2001")]
fn formats_datetimes(#[case] doc: &str, #[case] expr: &str, #[case] expected: &str) {
    assert_eq!(eval(doc, expr), [expected]);
}

#[rstest]
#[case("format_datetime(\"%Y-%m-%d\")", ScalarTag::Timestamp)]
#[case("format_datetime(\"%d/%m/%Y\")", ScalarTag::Str)]
fn formatted_text_is_retagged(#[case] expr: &str, #[case] tag: ScalarTag) {
    assert_eq!(tag_of("2001-12-15T02:59:43Z", expr), tag);
}

#[rstest]
fn formats_every_candidate() {
    let doc = "- 2001-12-15T02:59:43Z\n- 2002-01-01T00:00:00Z";
    assert_eq!(eval(doc, ".[] | format_datetime(\"%Y\")"), ["'2001'", "'2002'"]);
}

#[rstest]
fn format_can_come_from_the_document() {
    let doc = "when: 2001-12-15T02:59:43Z\nfmt: \"%m/%Y\"";
    let err = eval_err(doc, ".when | format_datetime(.fmt)");
    assert_eq!(err.code, ErrorCode::EvaluationPrecondition);
    assert_eq!(eval(doc, ".fmt as $f | .when | format_datetime($f)"), ["12/2001"]);
}

#[rstest]
#[case("2001-12-15T02:59:43Z", "tz(\"Australia/Sydney\")", "2001-12-15T13:59:43+11:00")]
#[case("2001-12-15T02:59:43Z", "tz(\"UTC\")", "2001-12-15T02:59:43Z")]
#[case("2001-12-15 02:59", "tz(\"%Y-%m-%d %H:%M\"; \"Asia/Tokyo\")", "2001-12-15 11:59")]
fn converts_time_zones(#[case] doc: &str, #[case] expr: &str, #[case] expected: &str) {
    assert_eq!(eval(doc, expr), [expected]);
}

#[rstest]
fn time_zone_keeps_the_tag() {
    assert_eq!(tag_of("2001-12-15T02:59:43Z", "tz(\"Europe/Berlin\")"), ScalarTag::Timestamp);
}

#[rstest]
fn now_uses_the_configured_clock() {
    let clock = DateTime::parse_from_rfc3339("2021-05-19T01:02:03Z").unwrap();
    let config = EngineConfig::builder().with_clock(clock).build();
    assert_eq!(eval_with(config.clone(), "a: 1", "now").unwrap(), ["2021-05-19T01:02:03Z"]);
    assert_eq!(eval_with(config, "a: 1", "now | tz(\"Asia/Kolkata\")").unwrap(), ["2021-05-19T06:32:03+05:30"]);
}

#[rstest]
fn configured_layout_is_the_default() {
    let config = EngineConfig::builder().with_datetime_layout("%d/%m/%Y").build();
    assert_eq!(eval_with(config, "15/12/2001", "format_datetime(\"%Y\")").unwrap(), ["2001"]);
}

#[rstest]
#[case("not a date", "format_datetime(\"%Y\")", ErrorCode::ParseDelegation)]
#[case("2001-12-15T02:59:43Z", "format_datetime(\"%Y-%m-%d\"; \"%Y\")", ErrorCode::ParseDelegation)]
#[case("2001-12-15T02:59:43Z", "tz(\"Mars/Olympus\")", ErrorCode::Environment)]
#[case("2001-12-15T02:59:43Z", "format_datetime(empty)", ErrorCode::EvaluationPrecondition)]
fn datetime_failures(#[case] doc: &str, #[case] expr: &str, #[case] code: ErrorCode) {
    assert_eq!(eval_err(doc, expr).code, code);
}

#[rstest]
fn parse_failure_names_the_path() {
    let err = eval_err("a: nope", ".a | format_datetime(\"%Y\")");
    assert!(err.message.contains("[a]"), "{}", err.message);
    assert!(std::error::Error::source(&err).is_some());
}
