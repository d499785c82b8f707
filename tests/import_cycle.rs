//! End-to-end: two modules importing each other.

mod common;

#[test]
fn a_cycle_between_two_modules_is_reported_rather_than_overflowing_the_stack() {
    let root = tempfile::tempdir().unwrap();
    common::write_module(root.path(), "a", "import b;\nfn a_fn() { }");
    common::write_module(root.path(), "b", "import a;\nfn b_fn() { }");

    let err = common::compile(root.path(), "a").unwrap_err();
    assert!(err.message.contains("circular import"));
}
