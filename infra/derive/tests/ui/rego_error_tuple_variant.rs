use rego_derive::rego_error;

#[rego_error]
pub enum DemoError {
    Io(std::io::Error),
}

fn main() {}
