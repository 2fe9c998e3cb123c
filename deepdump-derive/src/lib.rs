use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Derive macro for `ToPyValue`.
///
/// Walks a struct's fields and generates an `Instance` value whose state
/// mirrors the struct's fields, reconstructed through `ReduceKind::Default`
/// (the facade's analogue of the standard object constructor).
///
/// Unit structs produce an instance with empty state. Tuple structs use
/// their field index (`"0"`, `"1"`, ...) as the state key since they have
/// no field names to borrow. Enums are rejected: the reduce protocol this
/// macro targets has no single notion of "the fields" for a sum type.
#[proc_macro_derive(ToPyValue)]
pub fn derive_to_py_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let type_name = name.to_string();

    let state_entries = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .map(|f| {
                    let ident = f.ident.as_ref().unwrap();
                    let key = ident.to_string();
                    quote! { (#key.to_string(), deepdump::value::ToPyValue::to_py_value(&self.#ident)) }
                })
                .collect::<Vec<_>>(),
            Fields::Unnamed(fields) => fields
                .unnamed
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    let index = syn::Index::from(i);
                    let key = i.to_string();
                    quote! { (#key.to_string(), deepdump::value::ToPyValue::to_py_value(&self.#index)) }
                })
                .collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
        },
        Data::Enum(_) | Data::Union(_) => {
            return syn::Error::new_spanned(
                &input.ident,
                "ToPyValue can only be derived for structs; enums have no single field set to reify",
            )
            .to_compile_error()
            .into();
        }
    };

    let expanded = quote! {
        impl #impl_generics deepdump::value::ToPyValue for #name #ty_generics #where_clause {
            fn to_py_value(&self) -> deepdump::value::PyValue {
                let fields: ::std::vec::Vec<(::std::string::String, deepdump::value::PyValue)> = ::std::vec![
                    #(#state_entries),*
                ];
                deepdump::value::PyValue::instance_with_state(
                    deepdump::typeinfo::TypeInfo::new(::std::module_path!(), #type_name),
                    fields,
                )
            }
        }
    };

    TokenStream::from(expanded)
}
