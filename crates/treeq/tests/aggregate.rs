mod common;

use common::{document_after, eval, eval_err, run_with};
use rstest::rstest;
use treeq::{EngineConfig, ErrorCode, NodeKind};

#[rstest]
#[case("[]")]
#[case("[empty]")]
#[case("[.a[]]")]
fn collect_of_nothing_is_one_empty_sequence(#[case] expr: &str) {
    let (tree, _, results) = run_with(EngineConfig::default(), "a: []", expr).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(tree.kind(results.matches[0].node), NodeKind::Sequence);
    assert_eq!(tree.render(results.matches[0].node), "[]");
}

#[rstest]
fn collect_then_splat_recovers_the_values() {
    let doc = "a: [3, {b: 1}, x]";
    assert_eq!(eval(doc, "[.a[]] | .[]"), eval(doc, ".a[]"));
    assert_eq!(eval(doc, "[.a[]]"), ["[3, {b: 1}, x]"]);
}

#[rstest]
fn collect_shares_nodes_with_the_document() {
    assert_eq!(document_after("a: [1]", "[.a[]] | .[0] = 5"), "{a: [5]}");
}

#[rstest]
#[case("[3, 1, 2, 1, 3]", "unique", &["[3, 1, 2]"])]
#[case("[a, b, a]", "unique", &["[a, b]"])]
#[case("[1, 1.0, \"1\"]", "unique", &["[1, 1.0, '1']"])]
#[case("[1, \"1\", 1, \"1\"]", "unique", &["[1, '1']"])]
#[case("[[1], [\"1\"], [1]]", "unique", &["[[1], ['1']]"])]
#[case("[{k: 1}, {k: \"1\"}]", "unique_by(.k)", &["[{k: 1}, {k: '1'}]"])]
#[case("[{n: a, v: 1}, {n: b, v: 2}, {n: a, v: 3}]", "unique_by(.n)", &["[{n: a, v: 1}, {n: b, v: 2}]"])]
#[case("[{n: a}, {v: 2}, {v: 3}]", "unique_by(.n)", &["[{n: a}, {v: 2}]"])]
#[case("[]", "unique", &["[]"])]
fn unique_keeps_first_occurrences(#[case] doc: &str, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(eval(doc, expr), expected);
}

#[rstest]
fn unique_does_not_touch_the_input() {
    assert_eq!(document_after("a: [2, 2]", ".a | unique"), "{a: [2, 2]}");
}

#[rstest]
#[case("a: 1", "unique")]
#[case("x", "unique")]
fn unique_rejects_non_sequences(#[case] doc: &str, #[case] expr: &str) {
    let err = eval_err(doc, expr);
    assert_eq!(err.code, ErrorCode::StructuralType);
    assert!(err.message.contains("only arrays"), "{}", err.message);
}

#[rstest]
#[case("name: Mike\nage: 3", "{name: .name, years: .age}", &["{name: Mike, years: 3}"])]
#[case("name: Mike\npets: [cat, dog]", "{name: .name, pet: .pets[]}", &["{name: Mike, pet: cat}", "{name: Mike, pet: dog}"])]
#[case("a: 1", "{}", &["{}"])]
#[case("k: key\nv: 1", "{(.k): .v}", &["{key: 1}"])]
#[case("name: Mike", "{name}", &["{name: Mike}"])]
#[case("a: 1", "{\"quoted key\": .a}", &["{quoted key: 1}"])]
fn builds_objects(#[case] doc: &str, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(eval(doc, expr), expected);
}

#[rstest]
fn object_per_input_candidate() {
    let doc = "people: [{n: a}, {n: b}]";
    assert_eq!(eval(doc, ".people[] | {name: .n}"), ["{name: a}", "{name: b}"]);
}

#[rstest]
fn object_values_are_copies() {
    assert_eq!(document_after("a: {b: 1}", "{x: .a} | .x.b = 2"), "{a: {b: 1}}");
}

#[rstest]
#[case("a: {x: 1, n: {p: 1}}\nb: {y: 2, n: {q: 2}}", ".a * .b", &["{x: 1, n: {p: 1, q: 2}, y: 2}"])]
#[case("a: {x: 1}\nb: {x: 2}", ".a * .b", &["{x: 2}"])]
#[case("a: 3\nb: 4", ".a * .b", &["12"])]
#[case("a: 1.5\nb: 2", ".a * .b", &["3.0"])]
#[case("a: [1]\nb: [2]", ".a * .b", &["[2]"])]
fn multiplies(#[case] doc: &str, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(eval(doc, expr), expected);
}

#[rstest]
#[case("a: 1", ".a = 2", "{a: 2}")]
#[case("a: {b: 5}", ".a |= .b", "{a: 5}")]
#[case("a: {b: 5}", ".a = .a.b", "{a: 5}")]
#[case("a: [1, 2]", ".a[] |= \"x\"", "{a: [x, x]}")]
#[case("a: 1\nb: 2", ".a as $x | .b = $x", "{a: 1, b: 1}")]
#[case("a: 1", ".c = {d: .a}", "{a: 1, c: {d: 1}}")]
fn assigns_in_place(#[case] doc: &str, #[case] expr: &str, #[case] expected: &str) {
    assert_eq!(document_after(doc, expr), expected);
}

#[rstest]
fn assignment_returns_the_context() {
    assert_eq!(eval("a: 1", ".a = 2"), ["{a: 2}"]);
}

#[rstest]
fn update_rejects_map_keys() {
    let err = eval_err("a: 1", "... |= 3");
    assert_eq!(err.code, ErrorCode::UnsupportedMutation);
}

#[rstest]
#[case("[1, 2, 3]", ".[] | select(. == 2)", &["2"])]
#[case("[1, 2, 3]", ".[] | select(. != 2)", &["1", "3"])]
#[case("[{a: x}, {a: y}]", ".[] | select(.a == \"y\")", &["{a: y}"])]
#[case("a: 1", ".a == 1", &["true"])]
#[case("a: 1", ".b == null", &["true"])]
#[case("a: true", ".a and false", &["false"])]
#[case("a: true", ".a or false", &["true"])]
#[case("a: true", ".a | not", &["false"])]
#[case("a: 1", ".a, .a", &["1", "1"])]
fn compares_and_filters(#[case] doc: &str, #[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(eval(doc, expr), expected);
}

#[rstest]
fn variables_bind_each_value() {
    assert_eq!(eval("a: [1, 2]", ".a[] as $x | [$x, $x]"), ["[1, 1]", "[2, 2]"]);
}
