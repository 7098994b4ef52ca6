use rego_kernel::{NUMBER_ALPHABET, SAFE_ALPHABET, record_number, safe_nanoid};

#[test]
fn safe_nanoid_uses_the_safe_alphabet() {
    let id = safe_nanoid!();
    assert_eq!(id.len(), 12);
    assert!(id.chars().all(|c| SAFE_ALPHABET.contains(&c)));

    assert_eq!(safe_nanoid!(20).len(), 20);
}

#[test]
fn record_numbers_carry_prefix_and_year() {
    let number = record_number!("RC", 2026);
    let parts: Vec<&str> = number.split('-').collect();

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "RC");
    assert_eq!(parts[1], "2026");
    assert_eq!(parts[2].len(), 8);
    assert!(parts[2].chars().all(|c| NUMBER_ALPHABET.contains(&c)));
}

#[test]
fn record_numbers_differ() {
    assert_ne!(record_number!("OL", 2026), record_number!("OL", 2026));
}
