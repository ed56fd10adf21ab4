use quote::format_ident;
use std::collections::HashSet;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Ident, Path, Result, Token};

/// 补齐 `#[dto]` 结构体所需的 derive
///
/// 隐藏的 `SimpleDto` 字段实现了 `Debug` 与 `Clone`，生成的 getter 与
/// `from_value` 依赖这两项。用户写的 derive 原样保留，只为缺少的项追加一条
/// `#[derive(..)]`。`generated` 中的 trait 由宏自行实现，用户再 derive 会冲突，
/// 直接报错。
pub(crate) fn ensure_derives(
    attrs: &mut Vec<Attribute>,
    required: &[&str],
    generated: &[&str],
) -> Result<()> {
    let mut present = HashSet::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let paths = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?;
        for path in paths {
            let name = trait_name(&path);
            if generated.contains(&name.as_str()) {
                return Err(syn::Error::new(
                    path.span(),
                    format!("#[dto] implements {name} itself; remove it from derive"),
                ));
            }
            present.insert(name);
        }
    }

    let missing: Vec<Ident> = required
        .iter()
        .filter(|name| !present.contains(**name))
        .map(|name| format_ident!("{}", name))
        .collect();
    if !missing.is_empty() {
        attrs.insert(0, syn::parse_quote!(#[derive(#(#missing),*)]));
    }
    Ok(())
}

// `Clone` 与 `std::clone::Clone` 按末段视为同一项
fn trait_name(path: &Path) -> String {
    path.segments
        .last()
        .map(|last| last.ident.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;
    use syn::ItemStruct;

    fn derives_of(item: &ItemStruct) -> Vec<String> {
        item.attrs
            .iter()
            .map(|attr| attr.to_token_stream().to_string())
            .collect()
    }

    #[test]
    fn adds_only_missing_derives() {
        let mut item: ItemStruct = syn::parse_quote! {
            #[derive(std::clone::Clone, Default)]
            #[serde(rename_all = "camelCase")]
            struct Person { name: String }
        };
        ensure_derives(&mut item.attrs, &["Debug", "Clone"], &["PartialEq"]).unwrap();

        let attrs = derives_of(&item);
        assert_eq!(attrs.len(), 3);
        assert!(attrs[0].contains("Debug"));
        assert!(!attrs[0].contains("Clone"));
        assert!(attrs[1].contains("Default"));
    }

    #[test]
    fn leaves_attrs_alone_when_nothing_is_missing() {
        let mut item: ItemStruct = syn::parse_quote! {
            #[derive(Clone, Debug)]
            struct Person { name: String }
        };
        ensure_derives(&mut item.attrs, &["Debug", "Clone"], &["PartialEq"]).unwrap();
        assert_eq!(derives_of(&item).len(), 1);
    }

    #[test]
    fn rejects_derives_the_macro_generates() {
        let mut item: ItemStruct = syn::parse_quote! {
            #[derive(Clone, PartialEq)]
            struct Person { name: String }
        };
        let err =
            ensure_derives(&mut item.attrs, &["Debug", "Clone"], &["PartialEq"]).unwrap_err();
        assert!(err.to_string().contains("implements PartialEq itself"));
    }
}
