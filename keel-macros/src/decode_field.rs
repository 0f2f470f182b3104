use crate::decode_type::{TypeDecoded, decode_type};
use syn::{Field, Ident, LitStr, Type, spanned::Spanned};

/// A field registered in the record shape.
pub(crate) struct FieldParsed {
    pub ident: Ident,
    pub ty: Type,
    /// Raw `#[sql("...")]` content.
    pub tag: String,
    pub decoded: TypeDecoded,
    pub inline: bool,
}

fn sql_tag(field: &Field) -> syn::Result<String> {
    let mut result = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("sql") {
            continue;
        }
        if result.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "Only one `sql` attribute is allowed per field",
            ));
        }
        let value = attr.parse_args::<LitStr>().map_err(|_| {
            syn::Error::new(
                attr.span(),
                "Error while parsing `sql`, use it like #[sql(\"size=64,not_null\")]",
            )
        })?;
        result = Some(value.value());
    }
    Ok(result.unwrap_or_default())
}

fn has_modifier(tag: &str, modifier: &str) -> bool {
    tag.split(',').any(|v| v.trim() == modifier)
}

/// `None` for the fields tagged `-`, which are not persisted.
pub(crate) fn decode_field(field: &Field) -> syn::Result<Option<FieldParsed>> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new(field.span(), "Record fields must be named"));
    };
    let tag = sql_tag(field)?;
    if tag.trim() == "-" {
        return Ok(None);
    }
    let inline = has_modifier(&tag, "inline");
    let decoded = if inline {
        TypeDecoded {
            kind: "Bytes",
            bits: 0,
            nullable: false,
            json: false,
        }
    } else {
        decode_type(&field.ty)?
    };
    Ok(Some(FieldParsed {
        ident,
        ty: field.ty.clone(),
        tag,
        decoded,
        inline,
    }))
}
