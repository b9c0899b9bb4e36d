use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, spanned::Spanned, Expr, ExprLit, FnArg, ItemFn, Lit, LitStr, Meta, Pat,
    ReturnType, Token,
};

struct TrackArgs {
    operation: Option<LitStr>,
    target: Option<LitStr>,
    counter: Option<LitStr>,
}

fn expect_str(value: Expr, what: &str) -> syn::Result<LitStr> {
    let span = value.span();
    match value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s),
        _ => Err(syn::Error::new(
            span,
            format!("{what} must be a string literal"),
        )),
    }
}

impl Parse for TrackArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let metas: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;
        let mut operation: Option<LitStr> = None;
        let mut target: Option<LitStr> = None;
        let mut counter: Option<LitStr> = None;
        for meta in metas {
            match meta {
                Meta::NameValue(nv) => {
                    let key = nv.path;
                    if key.is_ident("operation") {
                        operation = Some(expect_str(nv.value, "operation")?);
                    } else if key.is_ident("target") {
                        target = Some(expect_str(nv.value, "target")?);
                    } else if key.is_ident("counter") {
                        counter = Some(expect_str(nv.value, "counter")?);
                    } else {
                        return Err(syn::Error::new(
                            key.span(),
                            "expected `operation = \"...\"`, `target = \"...\"` or `counter = \"...\"`",
                        ));
                    }
                }
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "expected `operation = \"...\"`, `target = \"...\"` or `counter = \"...\"`",
                    ))
                }
            }
        }
        Ok(Self {
            operation,
            target,
            counter,
        })
    }
}

/// Attribute macro that logs how many modular exponentiations a function issued.
///
/// The counter is a parameter passed by reference whose type implements
/// `zk_mixnet::batching::ModExp`. By default the first typed parameter is used
/// (any receiver is skipped); name another one with `counter = "..."`.
///
/// Usage:
///   #[track_modexps]
///   #[track_modexps(target = "zk_mixnet::proof")]
///   #[track_modexps(operation = "...", target = "...", counter = "engine")]
#[proc_macro_attribute]
pub fn track_modexps(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as TrackArgs);
    let func = parse_macro_input!(item as ItemFn);
    let fn_name = func.sig.ident.clone();

    let counter_ident: syn::Ident = match &args.counter {
        Some(name) => syn::Ident::new(&name.value(), name.span()),
        None => match func.sig.inputs.iter().find_map(|arg| match arg {
            FnArg::Typed(pat_type) => match &*pat_type.pat {
                Pat::Ident(p) => Some(p.ident.clone()),
                _ => None,
            },
            FnArg::Receiver(_) => None,
        }) {
            Some(id) => id,
            None => {
                return syn::Error::new(
                    func.sig.span(),
                    "#[track_modexps] could not find a typed parameter to read the exponentiation count from",
                )
                .to_compile_error()
                .into()
            }
        },
    };

    wrap_function(func, counter_ident, args.operation, args.target, fn_name)
}

fn wrap_function(
    mut func: ItemFn,
    counter_ident: syn::Ident,
    operation: Option<LitStr>,
    target: Option<LitStr>,
    fn_name: syn::Ident,
) -> TokenStream {
    let op_tokens = if let Some(s) = operation {
        quote!(#s)
    } else {
        quote!(::core::concat!(
            ::core::module_path!(),
            "::",
            stringify!(#fn_name)
        ))
    };
    let target_tokens = if let Some(s) = target {
        quote!(#s)
    } else {
        quote!("modexp")
    };
    let ret_tokens = match &func.sig.output {
        ReturnType::Default => quote!(()),
        ReturnType::Type(_, ty) => quote!(#ty),
    };

    let orig_block = func.block.clone();
    let new_block_ts = quote!({
        let __tm_initial = ::zk_mixnet::batching::ModExp::modexp_count(&*#counter_ident);

        let __tm_result = (|| -> #ret_tokens #orig_block)();

        let __tm_issued = ::zk_mixnet::batching::ModExp::modexp_count(&*#counter_ident)
            .saturating_sub(__tm_initial);

        ::tracing::info!(
            target: #target_tokens,
            operation = #op_tokens,
            modexps_issued = __tm_issued,
            "Exponentiation tracking"
        );

        __tm_result
    });

    match syn::parse2(new_block_ts) {
        Ok(block) => {
            func.block = block;
            quote!(#func).into()
        }
        Err(e) => e.to_compile_error().into(),
    }
}
