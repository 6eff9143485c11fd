use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    DeriveInput, Ident, LitBool, LitStr, Token, parse::Parse, parse::ParseStream,
    parse_macro_input,
};

#[derive(Default)]
struct ModuleArgs {
    id: Option<LitStr>,
    name: Option<LitStr>,
    description: Option<LitStr>,
    dependencies: Vec<LitStr>,
    soft_dependencies: Vec<LitStr>,
    required: bool,
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs::default();

        while !input.is_empty() {
            let key: Ident = input.parse()?;

            if key == "required" {
                // Bare flag or `required = true`
                if input.peek(Token![=]) {
                    input.parse::<Token![=]>()?;
                    args.required = input.parse::<LitBool>()?.value;
                } else {
                    args.required = true;
                }
            } else {
                input.parse::<Token![=]>()?;

                if key == "id" {
                    args.id = Some(input.parse()?);
                } else if key == "name" {
                    args.name = Some(input.parse()?);
                } else if key == "description" {
                    args.description = Some(input.parse()?);
                } else if key == "dependencies" {
                    args.dependencies = parse_id_list(input)?;
                } else if key == "soft_dependencies" {
                    args.soft_dependencies = parse_id_list(input)?;
                } else {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown module attribute `{key}`"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

/// Parse array: ["a", "b", ...]
fn parse_id_list(input: ParseStream) -> syn::Result<Vec<LitStr>> {
    let content;
    syn::bracketed!(content in input);
    let items = content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
    Ok(items.into_iter().collect())
}

pub fn derive_register_module(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_register_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn generate_register_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attr = input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("module"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                struct_name,
                "#[derive(RegisterModule)] requires a #[module(id = \"...\")] attribute",
            )
        })?;
    let args: ModuleArgs = attr.parse_args()?;

    let id = args
        .id
        .ok_or_else(|| syn::Error::new_spanned(attr, "missing `id` in #[module(...)]"))?;
    if id.value().trim().is_empty() {
        return Err(syn::Error::new_spanned(&id, "module id must not be empty"));
    }

    let name = args
        .name
        .unwrap_or_else(|| LitStr::new(&struct_name.to_string(), struct_name.span()));
    let description = args
        .description
        .map(|d| quote!(.description(#d)))
        .unwrap_or_default();
    let dependencies = &args.dependencies;
    let soft_dependencies = &args.soft_dependencies;
    let required = args.required;

    Ok(quote! {
        impl #impl_generics ::modulus::RegisterModule for #struct_name #ty_generics #where_clause {
            fn module_meta() -> ::modulus::ModuleMeta {
                ::modulus::ModuleMeta::new(#id, #name)
                    #description
                    #(.dependency(#dependencies))*
                    #(.soft_dependency(#soft_dependencies))*
                    .required(#required)
            }
        }
    })
}
