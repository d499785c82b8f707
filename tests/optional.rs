//! End-to-end: an optional local compared against `none`.

mod common;

#[test]
fn none_comparison_lowers_to_a_has_value_check() {
    let (root, dotted) = common::single_module_project(
        "main",
        r#"fn main() { int? x = none; if x is none { print("empty"); } }"#,
    );

    let unit = common::compile(root.path(), &dotted).unwrap();
    assert!(!unit.messages.has_errors());
    assert!(unit.emitted_source.contains("std::optional<int> x = std::nullopt;"));
    assert!(unit.emitted_source.contains("if ((!x.has_value()))"));
    assert!(unit.emitted_source.contains("std::cout << std::string(\"empty\") << std::endl;"));
}
