//! End-to-end: a struct with an owned method.

mod common;

#[test]
fn struct_method_call_lowers_to_a_member_function_call() {
    let (root, dotted) = common::single_module_project(
        "main",
        "Pt :: struct { x int, y int }\n\
         Pt :: sum(self) -> int { return self.x + self.y; }\n\
         fn main() { p := Pt { x: 3, y: 4 }; print(p.sum()); }",
    );

    let unit = common::compile(root.path(), &dotted).unwrap();
    assert!(!unit.messages.has_errors());
    assert!(unit.emitted_source.contains("struct Pt {"));
    assert!(unit.emitted_source.contains("int sum("));
    assert!(unit.emitted_source.contains("p.sum()"));
    assert!(unit.emitted_source.contains("Pt{.x = 3, .y = 4}"));
}
