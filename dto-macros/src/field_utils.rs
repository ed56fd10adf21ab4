use syn::spanned::Spanned;
use syn::{Field, FieldsNamed, Ident, Result, Type};

fn has_field_named(fields_named: &FieldsNamed, name: &str) -> bool {
    fields_named
        .named
        .iter()
        .any(|f| f.ident.as_ref().is_some_and(|i| i == name))
}

/// 在字段末尾追加一个由宏管理的字段；同名字段已存在时报错
pub(crate) fn append_hidden_field(
    fields_named: &mut FieldsNamed,
    name: &str,
    ty: &Type,
) -> Result<Ident> {
    if has_field_named(fields_named, name) {
        return Err(syn::Error::new(
            fields_named.span(),
            format!("field name '{name}' is reserved by #[dto]"),
        ));
    }
    let ident = Ident::new(name, proc_macro2::Span::call_site());
    let field: Field = syn::parse_quote! { #ident: #ty };
    fields_named.named.push(field);
    Ok(ident)
}
