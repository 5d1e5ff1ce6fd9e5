//! Shared helpers for utcompat proc macros.

use proc_macro2::{Span, TokenStream};
use syn::parse::{ParseStream, Parser};
use syn::{Ident, ItemMacro};

/// Generates a numbered identifier, e.g. `boost_catch_auto_test_suite_3`.
pub fn unique_ident(prefix: &str, index: usize) -> Ident {
    Ident::new(&format!("{prefix}_{index}"), Span::call_site())
}

/// Name of the invoked macro: last segment of its path.
pub fn macro_name(item: &ItemMacro) -> Option<String> {
    item.mac
        .path
        .segments
        .last()
        .map(|segment| segment.ident.to_string())
}

/// Parses the leading identifier of a macro's arguments, ignoring the rest.
pub fn leading_ident(tokens: TokenStream) -> syn::Result<Ident> {
    let parser = |input: ParseStream| -> syn::Result<Ident> {
        let ident: Ident = input.parse()?;
        let _rest: TokenStream = input.parse()?;
        Ok(ident)
    };
    parser.parse2(tokens)
}
