//! End-to-end: a channel producer spawned with `go`.

mod common;

#[test]
fn channel_send_recv_and_go_spawn_lower_to_coroutine_and_fiber_calls() {
    let (root, dotted) = common::single_module_project(
        "main",
        "fn main() { c := Channel<int>(); go produce(c); v := c.recv(); print(v); }\n\
         fn produce(Channel<int> c) { c.send(42); }",
    );

    let unit = common::compile(root.path(), &dotted).unwrap();
    assert!(!unit.messages.has_errors());
    assert!(unit.emitted_source.contains("glint::rt::Channel<int>()"));
    assert!(unit.emitted_source.contains("boost::fibers::fiber([&]()"));
    assert!(unit.emitted_source.contains("co_await c.recv()"));
    assert!(unit.emitted_source.contains("co_await c.send(42)"));
    assert!(unit.emitted_source.contains("#include <boost/fiber/all.hpp>"));
    assert!(unit.emitted_source.contains("#include <boost/asio.hpp>"));
}
