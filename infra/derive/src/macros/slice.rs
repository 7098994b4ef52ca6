use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Expr, ItemStruct, Lit, Meta, Token};

pub fn expand(args: TokenStream, input: ItemStruct) -> TokenStream {
    let name = match slice_name(args) {
        Ok(name) => name,
        Err(err) => return err.to_compile_error(),
    };

    let ItemStruct { attrs, vis, ident, generics, fields, semi_token, .. } = input;
    if !generics.params.is_empty() {
        return syn::Error::new_spanned(generics, "feature slices cannot be generic")
            .to_compile_error();
    }
    let name = name.unwrap_or_else(|| ident.to_string().to_lowercase());
    let inner = format_ident!("{ident}Inner");

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #vis struct #inner #fields #semi_token

        #[derive(Debug, Clone)]
        #vis struct #ident {
            inner: std::sync::Arc<#inner>,
        }

        impl #ident {
            /// Name under which the slice is registered.
            pub const NAME: &'static str = #name;

            pub fn new(inner: #inner) -> Self {
                Self { inner: std::sync::Arc::new(inner) }
            }
        }

        impl std::ops::Deref for #ident {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl ::rego_domain::registry::FeatureSlice for #ident {
            fn name(&self) -> &'static str {
                Self::NAME
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    }
}

fn slice_name(args: TokenStream) -> Result<Option<String>, syn::Error> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut name = None;
    for meta in metas {
        match &meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => match &nv.value {
                Expr::Lit(lit) => match &lit.lit {
                    Lit::Str(s) => name = Some(s.value()),
                    other => return Err(syn::Error::new_spanned(other, "name must be a string")),
                },
                other => return Err(syn::Error::new_spanned(other, "name must be a string")),
            },
            other => return Err(syn::Error::new_spanned(other, "expected `name = \"...\"`")),
        }
    }
    Ok(name)
}
