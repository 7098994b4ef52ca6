use super::derived_traits;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Item, ItemFn, Lit, LitStr, Meta, MetaNameValue, Token};

#[derive(Default)]
struct ModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

/// Expands `#[api_model]` for structs and enums.
///
/// Structs get `rename_all = "camelCase"` unless told otherwise. Enums keep
/// their variant names unless `rename_all` is passed explicitly, because
/// status and role strings are persisted verbatim.
pub fn expand_model(args: TokenStream, item: Item) -> TokenStream {
    let args = match parse_model_args(args) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };

    let (attrs, is_struct) = match &item {
        Item::Struct(s) => (&s.attrs, true),
        Item::Enum(e) => (&e.attrs, false),
        other => {
            return syn::Error::new_spanned(other, "api_model supports structs and enums only")
                .to_compile_error();
        }
    };

    let derives = model_derives(attrs);
    let existing_rename = serde_rename_all(attrs);
    let rename = match (args.rename_all, existing_rename, is_struct) {
        (Some(_), Some(existing), _) => {
            return syn::Error::new_spanned(
                existing,
                "rename_all is set twice; drop either the serde attribute or the api_model argument",
            )
            .to_compile_error();
        }
        (Some(value), None, _) => quote! { #[serde(rename_all = #value)] },
        (None, None, true) => quote! { #[serde(rename_all = "camelCase")] },
        (None, _, _) => quote! {},
    };
    let deny = if args.deny_unknown_fields && is_struct {
        quote! { #[serde(deny_unknown_fields)] }
    } else {
        quote! {}
    };

    quote! {
        #derives
        #[cfg_attr(feature = "openapi", derive(::utoipa::ToSchema))]
        #rename
        #deny
        #item
    }
}

/// Expands `#[api_handler]` by forwarding its arguments to `utoipa::path`.
pub fn expand_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn parse_model_args(args: TokenStream) -> Result<ModelArgs, syn::Error> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        let Meta::NameValue(MetaNameValue { path, value, .. }) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `key = value` arguments"));
        };
        let Expr::Lit(lit) = &value else {
            return Err(syn::Error::new_spanned(value, "expected a literal value"));
        };
        match (&lit.lit, path.get_ident().map(ToString::to_string).as_deref()) {
            (Lit::Str(s), Some("rename_all")) => parsed.rename_all = Some(s.clone()),
            (Lit::Bool(b), Some("deny_unknown_fields")) => parsed.deny_unknown_fields = b.value,
            _ => {
                return Err(syn::Error::new_spanned(
                    path,
                    "supported arguments: rename_all = \"...\", deny_unknown_fields = bool",
                ));
            }
        }
    }

    Ok(parsed)
}

fn model_derives(attrs: &[Attribute]) -> TokenStream {
    let existing = derived_traits(attrs);
    let wanted = [
        ("Debug", quote! { Debug }),
        ("Serialize", quote! { ::serde::Serialize }),
        ("Deserialize", quote! { ::serde::Deserialize }),
    ];
    let missing: Vec<_> =
        wanted.into_iter().filter(|(name, _)| !existing.contains(*name)).map(|(_, t)| t).collect();

    if missing.is_empty() { quote! {} } else { quote! { #[derive(#(#missing),*)] } }
}

fn serde_rename_all(attrs: &[Attribute]) -> Option<LitStr> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                found = Some(meta.value()?.parse::<LitStr>()?);
            } else if meta.input.peek(Token![=]) {
                let _ = meta.value()?.parse::<Expr>()?;
            }
            Ok(())
        });
    }
    found
}
