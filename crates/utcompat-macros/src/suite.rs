//! Implementation of the `#[unit_test]` attribute.
//!
//! The legacy vocabulary opens and closes suites with flat, statement-like
//! markers:
//!
//! ```ignore
//! boost_auto_test_suite!(parsing);
//! boost_auto_test_case!(empty_input, { ... });
//! boost_auto_test_suite_end!();
//! ```
//!
//! A declarative macro cannot open a module in one invocation and close it in
//! another, so the attribute rewrites the whole module body: marker pairs
//! become nested modules, and test case names are collected on the way.

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{ParseStream, Parser};
use syn::{Error, Ident, Item, ItemMod, Token, parse_quote};

use crate::util::{leading_ident, macro_name, unique_ident};

const SUITE_OPEN: &str = "boost_auto_test_suite";
const SUITE_CLOSE: &str = "boost_auto_test_suite_end";
const TEST_CASE: &str = "boost_auto_test_case";
const SUITE_MODULE_PREFIX: &str = "boost_catch_auto_test_suite";

/// Attribute arguments.
#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    /// The program provides its own `main`.
    custom_main: bool,
}

impl Options {
    fn parse(attr: TokenStream) -> syn::Result<Self> {
        let parser = |input: ParseStream| -> syn::Result<Self> {
            let mut options = Self::default();
            while !input.is_empty() {
                let ident: Ident = input.parse()?;
                if ident == "custom_main" {
                    options.custom_main = true;
                } else {
                    return Err(Error::new(
                        ident.span(),
                        format!("unknown unit_test option `{ident}` (expected `custom_main`)"),
                    ));
                }
                if !input.is_empty() {
                    input.parse::<Token![,]>()?;
                }
            }
            Ok(options)
        };
        parser.parse2(attr)
    }
}

/// An open suite.
struct Suite {
    name: Ident,
    module: Ident,
}

struct Frame {
    suite: Option<Suite>,
    items: Vec<Item>,
}

impl Frame {
    fn into_item(self) -> Option<Item> {
        let Suite { name, module } = self.suite?;
        let doc = format!(" Test suite `{name}`.");
        let items = self.items;
        Some(parse_quote! {
            #[doc = #doc]
            pub mod #module {
                #[allow(unused_imports)]
                use super::*;

                #(#items)*
            }
        })
    }
}

/// Module body after restructuring.
struct Restructured {
    items: Vec<Item>,
    /// Paths of test case constructors relative to the module root.
    cases: Vec<Vec<Ident>>,
}

fn restructure(items: Vec<Item>) -> syn::Result<Restructured> {
    let mut stack = vec![Frame {
        suite: None,
        items: Vec::new(),
    }];
    let mut cases = Vec::new();
    let mut next_suite = 0usize;

    for item in items {
        let mac = match item {
            Item::Macro(mac) => mac,
            other => {
                push_item(&mut stack, other);
                continue;
            }
        };

        match macro_name(&mac).as_deref() {
            Some(SUITE_OPEN) => {
                let name = leading_ident(mac.mac.tokens.clone()).map_err(|_| {
                    Error::new_spanned(&mac.mac, "boost_auto_test_suite! expects a suite name")
                })?;
                let module = unique_ident(SUITE_MODULE_PREFIX, next_suite);
                next_suite += 1;
                stack.push(Frame {
                    suite: Some(Suite { name, module }),
                    items: Vec::new(),
                });
            }
            Some(SUITE_CLOSE) => {
                if stack.len() == 1 {
                    return Err(Error::new_spanned(
                        &mac.mac,
                        "boost_auto_test_suite_end!() without a matching boost_auto_test_suite!()",
                    ));
                }
                if let Some(module) = stack.pop().and_then(Frame::into_item) {
                    push_item(&mut stack, module);
                }
            }
            Some(TEST_CASE) => {
                let name = leading_ident(mac.mac.tokens.clone()).map_err(|_| {
                    Error::new_spanned(&mac.mac, "boost_auto_test_case! expects a test name first")
                })?;
                let mut path: Vec<Ident> = stack
                    .iter()
                    .filter_map(|frame| frame.suite.as_ref().map(|s| s.module.clone()))
                    .collect();
                path.push(name);
                cases.push(path);
                push_item(&mut stack, Item::Macro(mac));
            }
            _ => push_item(&mut stack, Item::Macro(mac)),
        }
    }

    if stack.len() > 1
        && let Some(Suite { name, .. }) = stack.pop().and_then(|frame| frame.suite)
    {
        return Err(Error::new(
            name.span(),
            format!("boost_auto_test_suite!({name}) is never closed with boost_auto_test_suite_end!()"),
        ));
    }

    let items = stack.pop().map(|frame| frame.items).unwrap_or_default();
    Ok(Restructured { items, cases })
}

fn push_item(stack: &mut [Frame], item: Item) {
    if let Some(frame) = stack.last_mut() {
        frame.items.push(item);
    }
}

fn registry_fn(cases: &[Vec<Ident>]) -> Item {
    let calls = cases.iter().map(|path| quote! { #(#path)::*() });
    parse_quote! {
        /// Every test case declared in this module, in declaration order.
        #[allow(dead_code)]
        pub fn registered_test_cases() -> ::std::vec::Vec<::utcompat::TestCase> {
            ::std::vec![#(#calls),*]
        }
    }
}

pub fn expand(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let options = Options::parse(attr)?;
    let mut module: ItemMod = syn::parse2(item)?;
    let Some((brace, items)) = module.content.take() else {
        return Err(Error::new_spanned(
            &module,
            "#[unit_test] needs a module with an inline body",
        ));
    };

    let Restructured { mut items, cases } = restructure(items)?;
    items.push(registry_fn(&cases));
    module.content = Some((brace, items));

    let main = (!options.custom_main).then(|| {
        let ident = &module.ident;
        quote! {
            fn main() {
                ::std::process::exit(::utcompat::default_main(#ident::registered_test_cases()));
            }
        }
    });

    Ok(quote! {
        #module
        #main
    })
}
