use syn::{ItemStruct, LitStr};

/// Table override from `#[keel(table = "...")]`, empty when absent.
pub(crate) fn table_name(item: &ItemStruct) -> syn::Result<String> {
    let mut result = String::new();
    for attr in item.attrs.iter().filter(|v| v.path().is_ident("keel")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                result = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("Unknown `keel` argument, use it like #[keel(table = \"users\")]"))
            }
        })?;
    }
    Ok(result)
}
