mod decode_field;
mod decode_type;
mod table_name;
mod util;

use decode_field::{FieldParsed, decode_field};
use decode_type::kind_tokens;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Fields, ItemStruct, parse_macro_input, spanned::Spanned};
use table_name::table_name;

/// Registers a struct as a record.
///
/// Every named field becomes a column unless tagged `#[sql("-")]`. The tag
/// carries the column modifiers (`name`, `where`, `primary_key`,
/// `auto_increment`, `default`, `size`, `index`, `inline`, ...), the
/// struct attribute `#[keel(table = "...")]` overrides the table name.
#[proc_macro_derive(Record, attributes(sql, keel))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    match record(&item) {
        Ok(v) => v.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn record(item: &ItemStruct) -> syn::Result<TokenStream2> {
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "Records cannot have generic parameters",
        ));
    }
    let Fields::Named(named) = &item.fields else {
        return Err(syn::Error::new(
            item.span(),
            "Records must be structs with named fields",
        ));
    };
    let table = table_name(item)?;
    let fields = named
        .named
        .iter()
        .map(decode_field)
        .filter_map(Result::transpose)
        .collect::<syn::Result<Vec<_>>>()?;
    let shape_name = name.to_string();
    let field_defs = fields.iter().map(field_def);
    let getters = fields.iter().enumerate().map(|(i, f)| getter(i, f));
    let setters = fields.iter().enumerate().map(|(i, f)| setter(i, f));
    Ok(quote! {
        impl ::keel::Record for #name {
            fn shape() -> &'static ::keel::Shape {
                static SHAPE: ::keel::Shape = ::keel::Shape {
                    name: #shape_name,
                    table: #table,
                    fields: &[#(#field_defs),*],
                };
                &SHAPE
            }

            fn column_value(&self, path: &[usize]) -> ::keel::Result<::keel::Value> {
                match path.first() {
                    #(#getters)*
                    _ => Err(::keel::Error::msg(format!(
                        "Field path {:?} does not exist in `{}`",
                        path, #shape_name
                    ))),
                }
            }

            fn set_column_value(
                &mut self,
                path: &[usize],
                value: ::keel::Value,
            ) -> ::keel::Result<()> {
                match path.first() {
                    #(#setters)*
                    _ => {
                        return Err(::keel::Error::msg(format!(
                            "Field path {:?} does not exist in `{}`",
                            path, #shape_name
                        )));
                    }
                }
                Ok(())
            }
        }

        impl ::keel::FromRow for #name {
            fn from_row(
                row: ::keel::RowLabeled,
                writer: &dyn ::keel::SqlWriter,
            ) -> ::keel::Result<Self> {
                ::keel::bind_record::<Self>(row, &<Self as ::keel::Record>::columns(writer))
            }
        }
    })
}

fn field_def(field: &FieldParsed) -> TokenStream2 {
    let ident = field.ident.to_string();
    let tag = &field.tag;
    let kind = kind_tokens(field.decoded.kind);
    let json = field.decoded.json;
    let nullable = field.decoded.nullable;
    let bits = field.decoded.bits;
    let inline = if field.inline {
        let ty = &field.ty;
        quote!(Some(<#ty as ::keel::Record>::shape))
    } else {
        quote!(None)
    };
    quote! {
        ::keel::FieldDef {
            ident: #ident,
            tag: #tag,
            kind: #kind,
            json: #json,
            nullable: #nullable,
            bits: #bits,
            inline: #inline,
        }
    }
}

fn getter(index: usize, field: &FieldParsed) -> TokenStream2 {
    let ident = &field.ident;
    let ty = &field.ty;
    let body = if field.inline {
        quote!(::keel::Record::column_value(&self.#ident, &path[1..]))
    } else if field.decoded.json && field.decoded.nullable {
        quote! {
            match &self.#ident {
                Some(v) => ::keel::json::encode(v),
                None => Ok(::keel::Value::Blob(None)),
            }
        }
    } else if field.decoded.json {
        quote!(::keel::json::encode(&self.#ident))
    } else {
        quote!(Ok(<#ty as ::keel::AsValue>::as_value(&self.#ident)))
    };
    quote!(Some(#index) => #body,)
}

fn setter(index: usize, field: &FieldParsed) -> TokenStream2 {
    let ident = &field.ident;
    let ty = &field.ty;
    let body = if field.inline {
        quote!(::keel::Record::set_column_value(&mut self.#ident, &path[1..], value)?)
    } else if field.decoded.nullable {
        let assign = if field.decoded.json {
            quote!(Some(::keel::json::decode(value)?))
        } else {
            quote!(<#ty as ::keel::AsValue>::try_from_value(value)?)
        };
        quote! {
            self.#ident = if value.is_null() { None } else { #assign }
        }
    } else if field.decoded.json {
        quote! {
            if !value.is_null() {
                self.#ident = ::keel::json::decode(value)?;
            }
        }
    } else {
        // NULL keeps the current value
        quote! {
            if !value.is_null() {
                self.#ident = <#ty as ::keel::AsValue>::try_from_value(value)?;
            }
        }
    };
    quote!(Some(#index) => { #body; })
}
