#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros shared by every RegoCraft crate: domain error enums,
//! API data models, documented Axum handlers and feature slices.
//!
//! The expansions refer to `::thiserror`, `::serde`, `::utoipa` and
//! `::rego_domain` by absolute path, so consuming crates must depend on the
//! crates they use.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Turns an enum into a domain error type.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already present.
/// * `<Name>Ext` with `.context(...)` for `Result<T, Name>` and for
///   `Result<T, Source>` of every variant that wraps a `source`.
/// * `From<Source>` for every source-carrying variant.
/// * `From<&'static str>` / `From<String>` when an `Internal` variant exists.
/// * `Name::kind()` returning the snake-cased variant name, used as a stable
///   machine-readable error code.
/// * A module-level `format_context` helper for `#[error(...)]` strings, so
///   declare one error enum per module.
///
/// # Requirements
///
/// Variants use named fields. A variant with a `source` field (or a field
/// marked `#[source]`/`#[from]`) must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[rego_derive::rego_error]
/// pub enum StoreError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<String, StoreError> {
///     std::fs::read_to_string("data.json").context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn rego_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}

/// Declares an API data model.
///
/// Adds `Debug`, `Serialize` and `Deserialize` when missing, a camelCase
/// rename policy, and `utoipa::ToSchema` behind the consuming crate's
/// `openapi` feature. Request bodies can opt into strict field checking with
/// `deny_unknown_fields = true`.
///
/// ```rust,ignore
/// #[rego_derive::api_model(deny_unknown_fields = true)]
/// pub struct RejectRequest {
///     pub reason: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as syn::Item);
    macros::api::expand_model(attr.into(), input).into()
}

/// Wraps an Axum handler with `utoipa::path` documentation.
///
/// The path attribute is only emitted when the consuming crate's `server`
/// feature is on. All arguments are forwarded to `utoipa::path` verbatim.
///
/// ```rust,ignore
/// #[rego_derive::api_handler(
///     get,
///     path = "/api/registrations/{id}",
///     responses((status = OK, body = RegistrationView)),
///     tag = REGISTRATION_TAG,
/// )]
/// pub(crate) async fn get_registration() -> impl IntoResponse { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_handler(args.into(), input).into()
}

/// Declares a feature slice handle.
///
/// The annotated struct becomes `<Name>Inner`. `Name` becomes a cheap
/// `Arc` wrapper that derefs to it and implements
/// `rego_domain::registry::FeatureSlice` under the given `name`.
///
/// ```rust,ignore
/// #[rego_derive::rego_slice(name = "registrations")]
/// pub struct Registrations {
///     repository: Repository,
/// }
///
/// let slice = Registrations::new(RegistrationsInner { repository });
/// ```
#[proc_macro_attribute]
pub fn rego_slice(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::slice::expand(attr.into(), input).into()
}
