//! Proc macros for utcompat test modules.
//!
//! # Available Macros
//!
//! - [`macro@unit_test`] - Turn a module of legacy-style tests into a runnable
//!   test program
//!
//! # Example
//!
//! ```ignore
//! use utcompat::prelude::*;
//!
//! #[utcompat::unit_test]
//! mod tests {
//!     use super::*;
//!
//!     boost_auto_test_suite!(arithmetic);
//!
//!     boost_auto_test_case!(adds, "[math]", {
//!         boost_check!(1 + 1 == 2);
//!     });
//!
//!     boost_auto_test_suite_end!();
//! }
//! ```

mod suite;
mod util;

use proc_macro::TokenStream;

/// Expands a module of legacy-style tests.
///
/// Inside the module:
///
/// - every `boost_auto_test_suite!(name);` ... `boost_auto_test_suite_end!();`
///   pair becomes `pub mod boost_catch_auto_test_suite_<N> { use super::*; ... }`
///   with `<N>` counting up from 0 in order of appearance, so suites sharing a
///   name never collide;
/// - every `boost_auto_test_case!(name, ...)` is collected into a generated
///   `pub fn registered_test_cases() -> Vec<utcompat::TestCase>`, in
///   declaration order.
///
/// Next to the module, a `fn main()` is generated that runs the collected
/// cases through `utcompat::default_main` and exits with its status.
///
/// # Arguments
///
/// - `custom_main` - Do not generate `fn main()`; the program supplies its
///   own entry point.
///
/// Unbalanced suite markers are reported as compile errors.
#[proc_macro_attribute]
pub fn unit_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    suite::expand(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
