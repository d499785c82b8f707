//! End-to-end: a fallible call propagated with `or return`
//! out of a non-fallible caller.

mod common;

#[test]
fn or_return_bails_out_of_a_plain_function_on_failure() {
    let (root, dotted) = common::single_module_project(
        "main",
        "ParseErr :: err { message str }\n\
         fn parse(str s) -> int err ParseErr {\n\
         \tif s == \"\" {\n\
         \t\tfail ParseErr { message: \"empty\" };\n\
         \t}\n\
         \treturn 1;\n\
         }\n\
         fn main() {\n\
         \tn := parse(\"abc\") or return;\n\
         \tprint(n);\n\
         }",
    );

    let unit = common::compile(root.path(), &dotted).unwrap();
    assert!(!unit.messages.has_errors());
    assert!(unit.emitted_source.contains("glint::rt::Result<int> parse(std::string s)"));
    assert!(unit.emitted_source.contains("return glint::rt::fail("));
    assert!(unit.emitted_source.contains("return glint::rt::ok(1);"));
    assert!(unit.emitted_source.contains(".is_error()"));
    assert!(unit.emitted_source.contains("return;"));
    assert!(unit.emitted_source.contains(".value();"));
    assert!(!unit.emitted_source.contains("co_return"));
}
