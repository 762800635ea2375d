extern crate proc_macro;

use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::Data::Enum;
use syn::{DeriveInput, LitStr};

/// Implement `std::fmt::Display` and `std::str::FromStr` for a fieldless
/// enum of hardware names.
///
/// The display label defaults to the variant name and can be overridden
/// with `#[label("...")]`. Parsing is forgiving: it is case-insensitive
/// and ignores everything that is not a letter or digit, so
/// `"Simons' Basic"`, `"simons basic"` and `"simonsbasic"` all resolve to
/// the same variant. Labels are also matched by variant name, and
/// `FromStr::Err` is a `String` describing the failure.
#[proc_macro_derive(HardwareLabel, attributes(label))]
pub fn hardware_label(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(input).expect("unable to parse input");

    let name = &ast.ident;

    let Enum(data) = &ast.data else {
        panic!("HardwareLabel derive macro can only be applied to enums; {name} is not an enum")
    };

    let mut display_arms = Vec::new();
    let mut parse_arms = Vec::new();
    let mut seen_keys = HashSet::new();

    for variant in &data.variants {
        let variant_name = &variant.ident;
        if !variant.fields.is_empty() {
            panic!(
                "HardwareLabel only supports enums with only fieldless variants; \
                 {name}::{variant_name} has fields"
            );
        }

        let label = variant
            .attrs
            .iter()
            .find(|attr| attr.path().is_ident("label"))
            .map(|attr| {
                attr.parse_args::<LitStr>()
                    .expect("label attribute takes a single string literal")
                    .value()
            })
            .unwrap_or_else(|| variant_name.to_string());

        display_arms.push(quote! {
            Self::#variant_name => f.write_str(#label)
        });

        // Both the label and the bare variant name parse back.
        for key in [normalize(&label), normalize(&variant_name.to_string())] {
            if seen_keys.insert(key.clone()) {
                parse_arms.push(quote! {
                    #key => Ok(Self::#variant_name)
                });
            }
        }
    }

    let err_fmt_string = format!("unknown {name}: '{{}}'");
    let gen = quote! {
        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    #(#display_arms,)*
                }
            }
        }

        impl std::str::FromStr for #name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key: String = s
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                match key.as_str() {
                    #(#parse_arms,)*
                    _ => Err(format!(#err_fmt_string, s)),
                }
            }
        }
    };

    gen.into()
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
