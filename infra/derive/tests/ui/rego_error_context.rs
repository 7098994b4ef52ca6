use rego_derive::rego_error;
use std::borrow::Cow;

#[rego_error]
pub enum LoadError {
    #[error("Read failed{}: {source}", format_context(.context))]
    Read { source: std::io::Error, context: Option<Cow<'static, str>> },
}

fn read() -> Result<String, LoadError> {
    let raw: Result<String, std::io::Error> =
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
    raw.context("Reading fixture")
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.kind(), "read");
    assert!(err.to_string().contains("(Reading fixture)"));
}
