use crate::derive_utils::ensure_derives;
use crate::field_utils::append_hidden_field;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Expr, Field, Fields, Ident, Item, ItemStruct, LitStr, Path, Result, Token, Type, Visibility,
    parse::Parse, parse::ParseStream, parse_macro_input,
};

const BACKING_FIELD: &str = "__dto";

/// #[dto] 宏实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as DtoAttrConfig);
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[dto] only on struct")
                .to_compile_error()
                .into();
        }
    };

    match expand_struct(cfg, st) {
        Ok(out) => TokenStream::from(out),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(cfg: DtoAttrConfig, mut st: ItemStruct) -> Result<TokenStream2> {
    // 类元数据按类型缓存在 static 中，泛型结构体会共享同一份
    if !st.generics.params.is_empty() {
        return Err(syn::Error::new(
            st.generics.span(),
            "#[dto] does not support generic structs",
        ));
    }

    let fields_named = match &mut st.fields {
        Fields::Named(f) => f,
        _ => {
            return Err(syn::Error::new(
                st.span(),
                "only supports named-field struct",
            ));
        }
    };

    let specs = fields_named
        .named
        .iter_mut()
        .map(FieldSpec::take)
        .collect::<Result<Vec<_>>>()?;

    let backing_ty: Type = syn::parse_quote!(::dto_core::SimpleDto);
    let backing = append_hidden_field(fields_named, BACKING_FIELD, &backing_ty)?;

    ensure_derives(&mut st.attrs, &["Debug", "Clone"], &["PartialEq"])?;

    let ident = &st.ident;
    let class_name = cfg
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let extra_validation = cfg
        .extra_validation
        .map(|path| quote! { .extra_validation(#path) });

    let decls = specs.iter().map(FieldSpec::property_decl);
    let inits = specs.iter().map(FieldSpec::init);
    let getters = specs.iter().filter_map(FieldSpec::getter);

    let out = quote! {
        #st

        impl #ident {
            #( #getters )*
        }

        impl ::dto_core::TypedDto for #ident {
            fn class() -> ::std::sync::Arc<::dto_core::DtoClass> {
                static CLASS: ::std::sync::OnceLock<::std::sync::Arc<::dto_core::DtoClass>> =
                    ::std::sync::OnceLock::new();
                CLASS
                    .get_or_init(|| {
                        ::dto_core::DtoClass::builder()
                            .name(#class_name)
                            .properties(::std::vec![ #( #decls ),* ])
                            #extra_validation
                            .build()
                            .register()
                    })
                    .clone()
            }

            fn from_dto(dto: ::dto_core::SimpleDto) -> ::dto_core::DtoResult<Self> {
                ::std::result::Result::Ok(Self {
                    #( #inits, )*
                    #backing: dto,
                })
            }

            fn as_dto(&self) -> &::dto_core::SimpleDto {
                &self.#backing
            }
        }

        impl ::dto_core::DtoField for #ident {
            fn type_expr() -> ::dto_core::TypeExpr {
                ::dto_core::TypeExpr::Dto(::dto_core::DtoClassRef::Lazy(
                    <Self as ::dto_core::TypedDto>::class,
                ))
            }

            fn from_value(
                field: &str,
                value: &::dto_core::DtoValue,
            ) -> ::dto_core::DtoResult<Self> {
                match value {
                    ::dto_core::DtoValue::Dto(dto) if dto.class_name() == #class_name => {
                        <Self as ::dto_core::TypedDto>::from_dto(::std::clone::Clone::clone(
                            ::std::convert::AsRef::<::dto_core::SimpleDto>::as_ref(dto),
                        ))
                    }
                    _ => ::std::result::Result::Err(::dto_core::DtoError::invalid_field(
                        field,
                        ::std::format!("{} is not a valid {}", field, #class_name),
                    )),
                }
            }
        }

        impl ::std::cmp::PartialEq for #ident {
            fn eq(&self, other: &Self) -> bool {
                self.#backing == other.#backing
            }
        }

        impl ::std::convert::From<#ident> for ::dto_core::DtoValue {
            fn from(value: #ident) -> Self {
                ::dto_core::DtoValue::from(value.#backing)
            }
        }
    };

    Ok(out)
}

enum FieldRole {
    /// 参与契约
    Protected,
    Public,
    Ignored,
}

struct FieldSpec {
    ident: Ident,
    ty: Type,
    property: LitStr,
    role: FieldRole,
    default: Option<Expr>,
    annotation: Option<LitStr>,
}

impl FieldSpec {
    // 解析并移除字段上的 #[dto(...)]
    fn take(field: &mut Field) -> Result<Self> {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new(field.span(), "expected named field"));
        };

        let mut ignore = false;
        let mut rename: Option<LitStr> = None;
        let mut default: Option<Expr> = None;
        let mut annotation: Option<LitStr> = None;
        let mut retained = Vec::new();

        for attr in std::mem::take(&mut field.attrs) {
            if !attr.path().is_ident("dto") {
                retained.push(attr);
                continue;
            }
            let elems = attr.parse_args_with(
                Punctuated::<FieldAttrElem, Token![,]>::parse_terminated,
            )?;
            for elem in elems {
                let duplicate = match elem {
                    FieldAttrElem::Ignore(key) => std::mem::replace(&mut ignore, true)
                        .then_some(key),
                    FieldAttrElem::Rename(key, lit) => rename.replace(lit).map(|_| key),
                    FieldAttrElem::Default(key, expr) => default.replace(expr).map(|_| key),
                    FieldAttrElem::Ty(key, lit) => annotation.replace(lit).map(|_| key),
                };
                if let Some(key) = duplicate {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("duplicate key '{key}' in attribute"),
                    ));
                }
            }
        }
        field.attrs = retained;

        let role = if ignore {
            FieldRole::Ignored
        } else if matches!(field.vis, Visibility::Inherited) {
            FieldRole::Protected
        } else {
            FieldRole::Public
        };

        if !matches!(role, FieldRole::Protected) && (default.is_some() || annotation.is_some()) {
            return Err(syn::Error::new(
                ident.span(),
                "'default' and 'ty' only apply to non-pub, non-ignored fields",
            ));
        }

        let property = rename.unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));

        Ok(Self {
            ident,
            ty: field.ty.clone(),
            property,
            role,
            default,
            annotation,
        })
    }

    fn property_decl(&self) -> TokenStream2 {
        let property = &self.property;
        match self.role {
            FieldRole::Protected => {
                let ty = &self.ty;
                let annotation = self.annotation.as_ref().map(|a| quote! { .annotation(#a) });
                let default = self
                    .default
                    .as_ref()
                    .map(|d| quote! { .default(::dto_core::serde_json::json!(#d)) });
                quote! {
                    ::dto_core::PropertyDecl::builder()
                        .name(#property)
                        .declared(<#ty as ::dto_core::DtoField>::type_expr())
                        #annotation
                        #default
                        .build()
                }
            }
            FieldRole::Public => quote! {
                ::dto_core::PropertyDecl::builder()
                    .name(#property)
                    .visibility(::dto_core::Visibility::Public)
                    .build()
            },
            FieldRole::Ignored => quote! {
                ::dto_core::PropertyDecl::builder()
                    .name(#property)
                    .ignored(true)
                    .build()
            },
        }
    }

    fn init(&self) -> TokenStream2 {
        let ident = &self.ident;
        let property = &self.property;
        match self.role {
            FieldRole::Protected => quote! {
                #ident: ::dto_core::typed::extract(&dto, #property)?
            },
            FieldRole::Public | FieldRole::Ignored => quote! {
                #ident: ::std::default::Default::default()
            },
        }
    }

    // pub 字段本身可读，无需 getter
    fn getter(&self) -> Option<TokenStream2> {
        if matches!(self.role, FieldRole::Public) {
            return None;
        }
        let ident = &self.ident;
        let ty = &self.ty;
        Some(quote! {
            pub fn #ident(&self) -> &#ty {
                &self.#ident
            }
        })
    }
}

// -------- parsing --------

struct DtoAttrConfig {
    name: Option<LitStr>,
    extra_validation: Option<Path>,
}

impl Parse for DtoAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut name: Option<LitStr> = None;
        let mut extra_validation: Option<Path> = None;

        if input.is_empty() {
            return Ok(Self {
                name,
                extra_validation,
            });
        }

        let pairs: Punctuated<StructAttrElem, Token![,]> = Punctuated::parse_terminated(input)?;
        for elem in pairs {
            let duplicate = match elem {
                StructAttrElem::Name(key, lit) => name.replace(lit).map(|_| key),
                StructAttrElem::ExtraValidation(key, path) => {
                    extra_validation.replace(path).map(|_| key)
                }
            };
            if let Some(key) = duplicate {
                return Err(syn::Error::new(
                    key.span(),
                    format!("duplicate key '{key}' in attribute"),
                ));
            }
        }

        Ok(Self {
            name,
            extra_validation,
        })
    }
}

enum StructAttrElem {
    Name(Ident, LitStr),
    ExtraValidation(Ident, Path),
}

impl Parse for StructAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        match key.to_string().as_str() {
            "name" => Ok(Self::Name(key, input.parse()?)),
            "extra_validation" => Ok(Self::ExtraValidation(key, input.parse()?)),
            _ => Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'name' | 'extra_validation'",
            )),
        }
    }
}

enum FieldAttrElem {
    Ignore(Ident),
    Rename(Ident, LitStr),
    Default(Ident, Expr),
    Ty(Ident, LitStr),
}

impl Parse for FieldAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        if key == "ignore" {
            return Ok(Self::Ignore(key));
        }
        let _eq: Token![=] = input.parse()?;
        match key.to_string().as_str() {
            "rename" => Ok(Self::Rename(key, input.parse()?)),
            "default" => Ok(Self::Default(key, input.parse()?)),
            "ty" => Ok(Self::Ty(key, input.parse()?)),
            _ => Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'ignore' | 'rename' | 'default' | 'ty'",
            )),
        }
    }
}
