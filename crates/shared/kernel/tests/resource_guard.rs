use rego_kernel::ServiceError;
use rego_kernel::domain::constants::Collection;
use rego_kernel::security::resource::ResourceGuard;

#[test]
fn accepts_bare_and_qualified_ids() {
    assert_eq!(ResourceGuard::verify("abc123", Collection::Registrations).unwrap(), "abc123");
    assert_eq!(
        ResourceGuard::verify("registrations/abc123", Collection::Registrations).unwrap(),
        "abc123"
    );
}

#[test]
fn rejects_ids_from_other_collections() {
    assert!(ResourceGuard::verify("inspections/abc123", Collection::Registrations).is_err());
}

#[test]
fn rejects_malformed_ids() {
    for raw in ["", "registrations/", "registrations/a/b", "/abc"] {
        assert!(ResourceGuard::verify(raw, Collection::Registrations).is_err(), "id {raw:?}");
    }
}

#[test]
fn rejection_is_a_validation_error_on_id() {
    let err: ServiceError = ResourceGuard::verify("users/u1", Collection::Inspections)
        .unwrap_err()
        .into();
    let ServiceError::Validation { fields, .. } = err else {
        panic!("expected validation error");
    };
    assert_eq!(fields.as_slice()[0].field, "id");
}
