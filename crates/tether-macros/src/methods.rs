// #[methods] implementation
//
// Leaves the impl block as written (minus #[tether(...)] attributes) and adds
// an `impl ::tether::Methods` listing one MethodDesc per exported method.

use proc_macro2::TokenStream;
use quote::quote;
use syn::visit_mut::{self, VisitMut};
use syn::{
    Attribute, Error, Expr, ExprLit, FnArg, ImplItem, ImplItemFn, ItemImpl, Lit, Meta, Result,
    ReturnType, Type, TypePath, Visibility,
};

/// Replaces `Self` with the concrete implementing type.
///
/// The generated thunks are nested functions, which cannot name `Self`.
struct ReplaceSelf<'a> {
    self_ty: &'a Type,
}

impl VisitMut for ReplaceSelf<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        if let Type::Path(TypePath { qself: None, path }) = ty {
            if path.is_ident("Self") {
                *ty = self.self_ty.clone();
                return;
            }
        }
        visit_mut::visit_type_mut(self, ty);
    }
}

/// Removes `#[tether(skip)]` and reports whether it was present
fn take_skip(attrs: &mut Vec<Attribute>) -> Result<bool> {
    let mut skip = false;
    let mut error = None;
    attrs.retain(|attr| {
        if !attr.path().is_ident("tether") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        });
        if let Err(e) = parsed {
            error.get_or_insert(e);
        }
        false
    });
    match error {
        Some(e) => Err(e),
        None => Ok(skip),
    }
}

fn doc_string(attrs: &[Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(nv) = &attr.meta {
            if let Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) = &nv.value
            {
                lines.push(s.value().trim().to_string());
            }
        }
    }
    lines.join("\n")
}

fn method_entry(method: &ImplItemFn, self_ty: &Type) -> Result<Option<TokenStream>> {
    let sig = &method.sig;
    let Some(FnArg::Receiver(receiver)) = sig.inputs.first() else {
        return Ok(None);
    };
    if receiver.colon_token.is_some() {
        return Err(Error::new_spanned(
            receiver,
            "#[methods] supports `self`, `&self` and `&mut self` receivers only",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(Error::new_spanned(sig, "async methods cannot be exported"));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &sig.generics,
            "generic methods cannot be exported; mark them #[tether(skip)]",
        ));
    }

    let mut replace = ReplaceSelf { self_ty };
    let mut params = Vec::new();
    for arg in sig.inputs.iter().skip(1) {
        let FnArg::Typed(pat_type) = arg else {
            continue;
        };
        let mut ty = (*pat_type.ty).clone();
        replace.visit_type_mut(&mut ty);
        params.push(ty);
    }
    let ret = match &sig.output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => {
            let mut ty = (**ty).clone();
            replace.visit_type_mut(&mut ty);
            quote! { #ty }
        }
    };

    let ident = &sig.ident;
    let name = ident.to_string();
    let doc = doc_string(&method.attrs);
    let takes = params
        .iter()
        .enumerate()
        .map(|(i, ty)| quote! { args[#i].take::<#ty>() });
    let (kind, call) = match (&receiver.reference, &receiver.mutability) {
        (Some(_), Some(_)) => (
            quote! { Mut },
            quote! { (&mut *(this as *mut #self_ty)).#ident(#(#takes),*) },
        ),
        (Some(_), None) => (
            quote! { Ref },
            quote! { (&*(this as *const #self_ty)).#ident(#(#takes),*) },
        ),
        (None, _) => (
            quote! { Value },
            quote! {
                ::core::clone::Clone::clone(&*(this as *const #self_ty)).#ident(#(#takes),*)
            },
        ),
    };

    Ok(Some(quote! {
        ::tether::MethodDesc {
            name: #name,
            doc: #doc,
            receiver: ::tether::Receiver::#kind,
            params: ::std::vec![#(<#params as ::tether::Reflect>::type_desc),*],
            ret: <#ret as ::tether::Reflect>::type_desc,
            call: {
                unsafe fn __tether_thunk(
                    this: *mut u8,
                    args: &mut [::tether::OwnedValue],
                ) -> ::tether::OwnedValue {
                    let _ = &args;
                    ::tether::OwnedValue::new(#call)
                }
                __tether_thunk
            },
        }
    }))
}

/// Expands #[methods] on an inherent impl block.
pub fn expand_methods(mut item: ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[methods] goes on inherent impl blocks, not trait impls",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[methods] does not support generic impl blocks",
        ));
    }
    let self_ty = (*item.self_ty).clone();

    let mut entries = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let skip = take_skip(&mut method.attrs)?;
        if skip || !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }
        if let Some(entry) = method_entry(method, &self_ty)? {
            entries.push(entry);
        }
    }

    Ok(quote! {
        #item

        impl ::tether::Methods for #self_ty {
            fn methods() -> ::std::vec::Vec<::tether::MethodDesc> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}
