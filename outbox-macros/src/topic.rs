use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::spanned::Spanned;
use syn::{Expr, Ident, Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};
use syn::punctuated::Punctuated;

/// #[topic] 宏实现
/// - 仅支持非泛型、至少一个单元变体的枚举
/// - 变体可覆写主题名：`#[topic(name = "...")]`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::TokenStream::from(attr).span(),
            "#[topic] takes no arguments; rename variants with #[topic(name = \"...\")]",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(other.span(), "#[topic] can only be used on enum types")
                .to_compile_error()
                .into();
        }
    };

    if !enum_item.generics.params.is_empty() {
        return syn::Error::new(enum_item.generics.span(), "#[topic] enums cannot be generic")
            .to_compile_error()
            .into();
    }
    if enum_item.variants.is_empty() {
        return syn::Error::new(enum_item.span(), "#[topic] needs at least one variant")
            .to_compile_error()
            .into();
    }

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(Copy),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
        syn::parse_quote!(Hash),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut enum_item.attrs, required);

    // 变体 -> 主题名
    let mut names: Vec<(Ident, syn::LitStr)> = Vec::with_capacity(enum_item.variants.len());
    let mut seen: HashMap<String, Ident> = HashMap::new();

    for v in &mut enum_item.variants {
        if !matches!(v.fields, syn::Fields::Unit) {
            return syn::Error::new(
                v.span(),
                "#[topic] supports only unit variants; payloads live in TopicPayload types",
            )
            .to_compile_error()
            .into();
        }

        let mut retained_attrs = Vec::new();
        let mut name_lit: Option<syn::LitStr> = None;

        for attr in v.attrs.iter() {
            if attr.path().is_ident("topic") {
                if name_lit.is_some() {
                    return syn::Error::new(attr.span(), "duplicate #[topic] on this variant")
                        .to_compile_error()
                        .into();
                }
                match parse_variant_topic_attr(attr) {
                    Ok(lit) => name_lit = Some(lit),
                    Err(err) => return err.to_compile_error().into(),
                }
            } else if attr.path().is_ident("serde") {
                return syn::Error::new(
                    attr.span(),
                    "#[serde] is managed by #[topic]; use #[topic(name = \"...\")] instead",
                )
                .to_compile_error()
                .into();
            } else {
                retained_attrs.push(attr.clone());
            }
        }

        let lit = match name_lit {
            Some(lit) => {
                retained_attrs.push(syn::parse_quote!(#[serde(rename = #lit)]));
                lit
            }
            None => syn::LitStr::new(&v.ident.to_string(), v.ident.span()),
        };
        v.attrs = retained_attrs;

        if let Some(previous) = seen.insert(lit.value(), v.ident.clone()) {
            return syn::Error::new(
                lit.span(),
                format!("topic name \"{}\" already used by {}", lit.value(), previous),
            )
            .to_compile_error()
            .into();
        }
        names.push((v.ident.clone(), lit));
    }

    let enum_ident = &enum_item.ident;

    let as_str_arms = names.iter().map(|(ident, lit)| quote! { Self::#ident => #lit });
    let from_name_arms = names
        .iter()
        .map(|(ident, lit)| quote! { #lit => ::core::option::Option::Some(Self::#ident) });
    let all_variants = names.iter().map(|(ident, _)| quote! { Self::#ident });

    let out = quote! {
        #enum_item

        impl ::outbox_domain::event::Topic for #enum_ident {
            fn as_str(&self) -> &'static str {
                match *self { #( #as_str_arms, )* }
            }

            fn from_name(name: &str) -> ::core::option::Option<Self> {
                match name {
                    #( #from_name_arms, )*
                    _ => ::core::option::Option::None,
                }
            }

            fn all() -> &'static [Self] {
                &[ #( #all_variants ),* ]
            }
        }

        impl ::core::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(::outbox_domain::event::Topic::as_str(self))
            }
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

fn parse_variant_topic_attr(attr: &syn::Attribute) -> Result<syn::LitStr> {
    let pairs: Punctuated<TopicAttrKv, Token![,]> =
        attr.parse_args_with(Punctuated::<TopicAttrKv, Token![,]>::parse_terminated)?;

    let mut name: Option<syn::LitStr> = None;
    for kv in pairs {
        match kv.key.to_string().as_str() {
            "name" => {
                if name.is_some() {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "duplicate key 'name' in attribute",
                    ));
                }
                match kv.value {
                    Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(lit),
                        ..
                    }) if !lit.value().is_empty() => name = Some(lit),
                    other => {
                        return Err(syn::Error::new(
                            other.span(),
                            "'name' must be a non-empty string literal",
                        ));
                    }
                }
            }
            _ => {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key in #[topic(...)]; supported: name",
                ));
            }
        }
    }

    name.ok_or_else(|| syn::Error::new(attr.span(), "expected #[topic(name = \"...\")]"))
}

struct TopicAttrKv {
    key: Ident,
    value: Expr,
}

impl Parse for TopicAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}
