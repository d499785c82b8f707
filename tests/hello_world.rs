//! End-to-end: a single `print` call.

mod common;

#[test]
fn hello_world_emits_a_cout_call_and_exits_zero() {
    let (root, dotted) = common::single_module_project(
        "main",
        r#"fn main() { print("Hello, World!"); }"#,
    );

    let unit = common::compile(root.path(), &dotted).unwrap();
    assert!(!unit.messages.has_errors());
    assert!(unit.emitted_source.contains("std::cout << std::string(\"Hello, World!\") << std::endl;"));
    assert!(unit.emitted_source.contains("int main("));
    assert!(unit.link_dependencies.is_empty());
}
