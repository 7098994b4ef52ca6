#[test]
fn rego_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/rego_error_pass.rs");
    t.pass("tests/ui/rego_error_context.rs");
    t.compile_fail("tests/ui/rego_error_no_context.rs");
    t.compile_fail("tests/ui/rego_error_bad_context_type.rs");
    t.compile_fail("tests/ui/rego_error_tuple_variant.rs");
}
