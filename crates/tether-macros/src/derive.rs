// #[derive(Reflect)] implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Result, Visibility};

#[derive(Default)]
struct ReflectAttrs {
    methods: bool,
    opaque: bool,
}

fn parse_attrs(input: &DeriveInput) -> Result<ReflectAttrs> {
    let mut attrs = ReflectAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("methods") {
                attrs.methods = true;
                Ok(())
            } else if meta.path.is_ident("opaque") {
                attrs.opaque = true;
                Ok(())
            } else {
                Err(meta.error("expected `methods` or `opaque`"))
            }
        })?;
    }
    Ok(attrs)
}

/// Expands #[derive(Reflect)].
///
/// ```ignore
/// // Input:
/// #[derive(Reflect, Default, Clone)]
/// pub struct Point { pub x: i64, pub y: i64 }
///
/// // Output:
/// impl ::tether::Reflect for Point {
///     fn type_desc() -> &'static ::tether::TypeDesc {
///         ::tether::describe::<Point>("Point", || ::tether::Kind::Struct(::tether::StructDesc {
///             name: "Point",
///             fields: vec![/* FieldDesc { name, offset, ty } per pub field */],
///             methods: ::tether::no_methods,
///         }))
///     }
/// }
/// ```
pub fn expand_reflect(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "#[derive(Reflect)] does not support generic types",
        ));
    }
    let attrs = parse_attrs(&input)?;

    if attrs.opaque {
        return Ok(quote! {
            impl ::tether::Reflect for #name {
                fn type_desc() -> &'static ::tether::TypeDesc {
                    ::tether::describe::<#name>(#name_str, || ::tether::Kind::Opaque)
                }
            }
        });
    }

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            name,
            "#[derive(Reflect)] only supports structs; use #[reflect(opaque)] for other types",
        ));
    };

    let mut fields = Vec::new();
    match &data.fields {
        Fields::Named(named) => {
            for field in &named.named {
                if !matches!(field.vis, Visibility::Public(_)) {
                    continue;
                }
                let Some(ident) = &field.ident else {
                    continue;
                };
                let field_name = ident.to_string().trim_start_matches("r#").to_string();
                let ty = &field.ty;
                fields.push(quote! {
                    ::tether::FieldDesc {
                        name: #field_name,
                        offset: ::tether::__private::memoffset::offset_of!(#name, #ident),
                        ty: <#ty as ::tether::Reflect>::type_desc,
                    }
                });
            }
        }
        Fields::Unit => {}
        Fields::Unnamed(_) => {
            return Err(Error::new_spanned(
                name,
                "#[derive(Reflect)] needs named fields",
            ));
        }
    }

    let methods = if attrs.methods {
        quote! { <#name as ::tether::Methods>::methods }
    } else {
        quote! { ::tether::no_methods }
    };

    Ok(quote! {
        impl ::tether::Reflect for #name {
            fn type_desc() -> &'static ::tether::TypeDesc {
                ::tether::describe::<#name>(#name_str, || {
                    ::tether::Kind::Struct(::tether::StructDesc {
                        name: #name_str,
                        fields: ::std::vec![#(#fields),*],
                        methods: #methods,
                    })
                })
            }
        }
    })
}
