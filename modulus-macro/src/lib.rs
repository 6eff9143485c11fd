use proc_macro::TokenStream;

mod register;

/// Derive macro generating the module metadata of a struct
///
/// # Example
/// ```ignore
/// use modulus::RegisterModule;
///
/// #[derive(Default, RegisterModule)]
/// #[module(
///     id = "web",
///     name = "Web Server",
///     description = "Serves the HTTP API",
///     dependencies = ["database"],
///     soft_dependencies = ["metrics"],
/// )]
/// pub struct WebModule;
/// ```
///
/// `id` is mandatory. `name` defaults to the struct name. A bare `required`
/// (or `required = true`) marks a module that can never be disabled.
#[proc_macro_derive(RegisterModule, attributes(module))]
pub fn derive_register_module(input: TokenStream) -> TokenStream {
    register::derive_register_module(input)
}
