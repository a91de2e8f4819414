//! Procedural macros for dashboard_db
//!
//! This crate provides the `Table` derive macro, which turns a model struct into
//! a static `dashboard_db::schema::Table` descriptor.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, GenericArgument, LitInt, LitStr,
    PathArguments, Token, Type,
};

/// Derive macro for table models
///
/// ```ignore
/// #[derive(Table)]
/// #[table(name = "users")]
/// pub struct User {
///     #[column(primary_key, identity)]
///     pub id: i32,
///     #[column(length = 255, unique)]
///     pub email: String,
/// }
/// ```
///
/// `identity` alone means `GENERATED ALWAYS AS IDENTITY`; use
/// `identity = "by_default"` to let inserts supply their own values.
#[proc_macro_derive(Table, attributes(table, column))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_table(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

/// Arguments of the struct-level `#[table(...)]` attribute
#[derive(Default)]
struct TableArgs {
    name: Option<LitStr>,
}

/// Arguments of a field-level `#[column(...)]` attribute
#[derive(Default)]
struct ColumnArgs {
    name: Option<LitStr>,
    primary_key: bool,
    identity: Option<Identity>,
    unique: bool,
    length: Option<LitInt>,
    default: Option<LitStr>,
}

#[derive(Clone, Copy)]
enum Identity {
    Always,
    ByDefault,
}

fn expand_table(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Table can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Table can only be derived for structs",
            ))
        }
    };

    let table_args = parse_table_args(input)?;
    let table_name = match &table_args.name {
        Some(lit) => quote! { #lit },
        None => {
            let struct_name = name.to_string();
            quote! {
                &::dashboard_db::utils::naming::get_table_name(#struct_name, true)
            }
        }
    };

    let columns = fields
        .iter()
        .map(expand_column)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::dashboard_db::schema::TableModel for #name #ty_generics #where_clause {
            fn table() -> &'static ::dashboard_db::schema::Table {
                static TABLE: ::dashboard_db::__private::Lazy<::dashboard_db::schema::Table> =
                    ::dashboard_db::__private::Lazy::new(|| {
                        let mut table = ::dashboard_db::schema::Table::new(#table_name);
                        #( table.add_column(#columns); )*
                        table.finalize()
                    });
                &TABLE
            }
        }
    })
}

fn parse_table_args(input: &DeriveInput) -> syn::Result<TableArgs> {
    let mut args = TableArgs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("table") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute, expected `name`"))
            }
        })?;
    }

    Ok(args)
}

fn parse_column_args(field: &Field) -> syn::Result<ColumnArgs> {
    let mut args = ColumnArgs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("column") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("primary_key") {
                args.primary_key = true;
            } else if meta.path.is_ident("identity") {
                args.identity = Some(if meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    match lit.value().as_str() {
                        "always" => Identity::Always,
                        "by_default" => Identity::ByDefault,
                        _ => {
                            return Err(syn::Error::new_spanned(
                                lit,
                                "expected `identity = \"always\"` or `identity = \"by_default\"`",
                            ))
                        }
                    }
                } else {
                    Identity::Always
                });
            } else if meta.path.is_ident("unique") {
                args.unique = true;
            } else if meta.path.is_ident("length") {
                args.length = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default") {
                args.default = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(args)
}

/// Build the `Column` constructor expression for one struct field
fn expand_column(field: &Field) -> syn::Result<TokenStream2> {
    let args = parse_column_args(field)?;

    let column_name = match (&args.name, &field.ident) {
        (Some(lit), _) => lit.value(),
        (None, Some(ident)) => ident.to_string().trim_start_matches("r#").to_string(),
        (None, None) => {
            return Err(syn::Error::new_spanned(field, "column fields must be named"));
        }
    };

    let (inner_ty, nullable) = match option_inner(&field.ty) {
        Some(inner) => (inner, true),
        None => (&field.ty, false),
    };
    let data_type = map_column_type(inner_ty, args.length.as_ref())?;

    let primary_key = args.primary_key.then(|| quote! { .primary_key() });
    let identity = args.identity.map(|identity| match identity {
        Identity::Always => quote! { .identity() },
        Identity::ByDefault => quote! { .identity_by_default() },
    });
    let unique = args.unique.then(|| quote! { .unique() });
    let default = args.default.as_ref().map(|lit| quote! { .default(#lit) });

    Ok(quote! {
        ::dashboard_db::schema::Column::new(#column_name, #data_type)
            .nullable(#nullable)
            #primary_key
            #identity
            #unique
            #default
    })
}

/// Returns `T` when the type is `Option<T>`
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Map a Rust field type to a `ColumnType` expression
fn map_column_type(ty: &Type, length: Option<&LitInt>) -> syn::Result<TokenStream2> {
    let ident = match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        _ => None,
    };

    let unsupported = || {
        syn::Error::new_spanned(
            ty,
            "unsupported column type, expected one of i16, i32, i64, f32, f64, bool, String",
        )
    };

    let Some(ident) = ident else {
        return Err(unsupported());
    };

    if length.is_some() && ident != "String" {
        return Err(syn::Error::new_spanned(
            ty,
            "`length` is only supported on String columns",
        ));
    }

    let tokens = match ident.as_str() {
        "i16" => quote! { ::dashboard_db::schema::ColumnType::SmallInt },
        "i32" => quote! { ::dashboard_db::schema::ColumnType::Integer },
        "i64" => quote! { ::dashboard_db::schema::ColumnType::BigInt },
        "f32" => quote! { ::dashboard_db::schema::ColumnType::Real },
        "f64" => quote! { ::dashboard_db::schema::ColumnType::DoublePrecision },
        "bool" => quote! { ::dashboard_db::schema::ColumnType::Boolean },
        "String" => match length {
            Some(length) => quote! { ::dashboard_db::schema::ColumnType::Varchar { length: #length } },
            None => quote! { ::dashboard_db::schema::ColumnType::Text },
        },
        _ => return Err(unsupported()),
    };

    Ok(tokens)
}
