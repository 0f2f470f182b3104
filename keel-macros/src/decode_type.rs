use crate::util::matches_path;
use proc_macro2::Span;
use quote::{ToTokens, quote};
use syn::{GenericArgument, PathArguments, Type, TypePath, spanned::Spanned};

/// What the derive needs to know about a field type.
pub(crate) struct TypeDecoded {
    /// Variant name of `keel::DataKind`.
    pub kind: &'static str,
    pub bits: u8,
    /// Declared as `Option<T>`.
    pub nullable: bool,
    /// Persisted as a JSON document.
    pub json: bool,
}

impl TypeDecoded {
    fn scalar(kind: &'static str, bits: u8) -> Self {
        Self {
            kind,
            bits,
            nullable: false,
            json: false,
        }
    }

    fn json() -> Self {
        Self {
            kind: "Bytes",
            bits: 0,
            nullable: false,
            json: true,
        }
    }
}

fn unsupported(ty: &Type, reason: &str) -> syn::Error {
    syn::Error::new(
        ty.span(),
        format!(
            "Unsupported field type `{}`: {}",
            ty.to_token_stream(),
            reason
        ),
    )
}

fn first_generic(path: &syn::Path) -> Option<&Type> {
    let PathArguments::AngleBracketed(arguments) = &path.segments.last()?.arguments else {
        return None;
    };
    arguments.args.iter().find_map(|v| match v {
        GenericArgument::Type(v) => Some(v),
        _ => None,
    })
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(TypePath { path, qself: None }) if path.is_ident("u8"))
}

/// Maps a field type to its data kind. Collections, maps and other structs
/// are stored as JSON, types that cannot be persisted are compile errors.
pub(crate) fn decode_type(ty: &Type) -> syn::Result<TypeDecoded> {
    let decoded = 'decoded: {
        match ty {
            Type::Path(TypePath { path, qself: None }) => {
                if let Some(ident) = path.get_ident() {
                    let ident = ident.to_string();
                    break 'decoded match ident.as_str() {
                        "bool" => TypeDecoded::scalar("Bool", 1),
                        "i8" => TypeDecoded::scalar("Int", 8),
                        "i16" => TypeDecoded::scalar("Int", 16),
                        "i32" => TypeDecoded::scalar("Int", 32),
                        "i64" | "isize" => TypeDecoded::scalar("Int", 64),
                        "u8" => TypeDecoded::scalar("Uint", 8),
                        "u16" => TypeDecoded::scalar("Uint", 16),
                        "u32" => TypeDecoded::scalar("Uint", 32),
                        "u64" | "usize" => TypeDecoded::scalar("Uint", 64),
                        "f32" => TypeDecoded::scalar("Float", 32),
                        "f64" => TypeDecoded::scalar("Float", 64),
                        "i128" | "u128" => {
                            return Err(unsupported(ty, "128 bit integers cannot be stored"));
                        }
                        "String" => TypeDecoded::scalar("String", 0),
                        "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime" => {
                            TypeDecoded::scalar("Time", 0)
                        }
                        _ => TypeDecoded::json(),
                    };
                }
                if matches_path(path, &["std", "string", "String"]) {
                    break 'decoded TypeDecoded::scalar("String", 0);
                }
                if matches_path(path, &["time", "OffsetDateTime"])
                    || matches_path(path, &["time", "PrimitiveDateTime"])
                    || matches_path(path, &["std", "time", "SystemTime"])
                {
                    break 'decoded TypeDecoded::scalar("Time", 0);
                }
                if matches_path(path, &["std", "borrow", "Cow"]) {
                    break 'decoded TypeDecoded::scalar("String", 0);
                }
                let is_option = matches_path(path, &["std", "option", "Option"]);
                let is_wrapper = is_option
                    || matches_path(path, &["std", "boxed", "Box"])
                    || matches_path(path, &["std", "sync", "Arc"]);
                let is_vec = matches_path(path, &["std", "vec", "Vec"]);
                if is_wrapper || is_vec {
                    let Some(inner) = first_generic(path) else {
                        return Err(unsupported(ty, "a generic argument is expected"));
                    };
                    if is_vec && is_u8(inner) {
                        break 'decoded TypeDecoded::scalar("Bytes", 0);
                    }
                    if is_vec {
                        break 'decoded TypeDecoded::json();
                    }
                    if let Type::Slice(slice) = inner {
                        if is_u8(&slice.elem) {
                            break 'decoded TypeDecoded::scalar("Bytes", 0);
                        }
                        return Err(unsupported(ty, "only byte slices can be stored"));
                    }
                    let mut decoded = decode_type(inner)?;
                    if is_option {
                        if decoded.nullable {
                            return Err(unsupported(ty, "nested options cannot be stored"));
                        }
                        decoded.nullable = true;
                    }
                    break 'decoded decoded;
                }
                TypeDecoded::json()
            }
            Type::Array(..) => TypeDecoded::json(),
            Type::Paren(v) => return decode_type(&v.elem),
            Type::Group(v) => return decode_type(&v.elem),
            Type::Reference(..) => {
                return Err(unsupported(ty, "references cannot be stored, use an owned type"));
            }
            Type::Ptr(..) => return Err(unsupported(ty, "raw pointers cannot be stored")),
            Type::BareFn(..) => return Err(unsupported(ty, "function pointers cannot be stored")),
            Type::Tuple(..) => return Err(unsupported(ty, "tuples cannot be stored")),
            Type::TraitObject(..) | Type::ImplTrait(..) => {
                return Err(unsupported(ty, "trait objects cannot be stored"));
            }
            _ => return Err(unsupported(ty, "the type cannot be stored")),
        }
    };
    Ok(decoded)
}

/// `keel::DataKind::<kind>` tokens.
pub(crate) fn kind_tokens(kind: &str) -> proc_macro2::TokenStream {
    let kind = syn::Ident::new(kind, Span::call_site());
    quote!(::keel::DataKind::#kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn decoded(ty: Type) -> (&'static str, u8, bool, bool) {
        let v = decode_type(&ty).unwrap();
        (v.kind, v.bits, v.nullable, v.json)
    }

    #[test]
    fn scalars() {
        assert_eq!(decoded(parse_quote!(i16)), ("Int", 16, false, false));
        assert_eq!(decoded(parse_quote!(u32)), ("Uint", 32, false, false));
        assert_eq!(decoded(parse_quote!(f32)), ("Float", 32, false, false));
        assert_eq!(decoded(parse_quote!(std::string::String)), ("String", 0, false, false));
        assert_eq!(decoded(parse_quote!(time::OffsetDateTime)), ("Time", 0, false, false));
        assert_eq!(decoded(parse_quote!(Vec<u8>)), ("Bytes", 0, false, false));
        assert_eq!(decoded(parse_quote!(Box<[u8]>)), ("Bytes", 0, false, false));
    }

    #[test]
    fn wrappers() {
        assert_eq!(decoded(parse_quote!(Option<i64>)), ("Int", 64, true, false));
        assert_eq!(decoded(parse_quote!(Box<bool>)), ("Bool", 1, false, false));
        assert_eq!(decoded(parse_quote!(Option<Vec<String>>)), ("Bytes", 0, true, true));
        assert!(decode_type(&parse_quote!(Option<Option<i32>>)).is_err());
    }

    #[test]
    fn json() {
        assert!(decoded(parse_quote!(Vec<String>)).3);
        assert!(decoded(parse_quote!(HashMap<String, i32>)).3);
        assert!(decoded(parse_quote!(Address)).3);
        assert!(decoded(parse_quote!([i32; 4])).3);
    }

    #[test]
    fn rejected() {
        for ty in [
            parse_quote!(&'static str),
            parse_quote!(*const u8),
            parse_quote!(fn() -> i32),
            parse_quote!((i32, i32)),
            parse_quote!(Box<dyn Send>),
            parse_quote!(u128),
        ] {
            assert!(decode_type(&ty).is_err(), "{}", ty.to_token_stream());
        }
    }
}
