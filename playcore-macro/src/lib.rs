extern crate proc_macro;

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

/// Derives a closed-alphabet `&'static str` mapping for a unit-variant enum (§4.3 invariant
/// iii: "every enum output has a closed alphabet and unknown values are forbidden").
///
/// Generates `as_str(&self) -> &'static str` (the variant name in `snake_case`) and an
/// associated `ALL: &'static [Self]` constant listing every variant in declaration order, so a
/// structure/indicator output-field enum can both render its own key and enumerate its closed
/// alphabet for Play-compile-time field validation (§9 design note: "the rule compiler verifies
/// that every `{feature_id, field}` reference matches a declared field").
#[proc_macro_derive(FieldKey)]
pub fn field_key_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput =
        syn::parse(input).expect("field_key_derive() failed to parse input TokenStream");

    let name = &ast.ident;
    let Data::Enum(data) = &ast.data else {
        panic!("FieldKey can only be derived for enums");
    };

    let mut variant_idents = Vec::new();
    let mut variant_strs = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            panic!("FieldKey can only be derived for enums with unit variants");
        }
        let ident = &variant.ident;
        let snake = ident.to_string().from_case(Case::Pascal).to_case(Case::Snake);
        variant_idents.push(ident);
        variant_strs.push(snake);
    }

    let generated = quote! {
        impl #name {
            /// The `snake_case` field key the rule evaluator / structure cache key this
            /// variant's value under.
            pub fn as_str(&self) -> &'static str {
                match self {
                    #(Self::#variant_idents => #variant_strs,)*
                }
            }

            /// Every variant, in declaration order — the enum's closed alphabet.
            pub const ALL: &'static [Self] = &[#(Self::#variant_idents),*];

            /// The `snake_case` field key of every variant, in declaration order.
            pub fn all_keys() -> &'static [&'static str] {
                &[#(#variant_strs),*]
            }
        }
    };

    TokenStream::from(generated)
}
