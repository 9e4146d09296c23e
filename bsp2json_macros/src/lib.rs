use quote::quote;
use syn::*;

/// Automatically implements `BspValue` on structs with named fields, reading each field in declaration order.
///
/// The on-disk size of the struct is the sum of the sizes of its fields, there is no padding.
#[proc_macro_derive(BspValue)]
pub fn bsp_value_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	let ident = input.ident;
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

	let fields = match input.data {
		Data::Struct(data) => match data.fields {
			Fields::Named(fields) => fields.named,
			Fields::Unnamed(_) => panic!("Tuple structs not supported"),
			Fields::Unit => panic!("Unit structs not supported"),
		},
		_ => panic!("Only structs with named fields are supported"),
	};

	let types = fields.iter().map(|field| &field.ty);
	let field_names = fields.iter().map(|field| field.ident.as_ref().expect("Ident required"));

	let bsp_parse_contents = quote! {
		Ok(Self {
			#(
				#field_names: ::bsp2json::BspParseResultDoingJobExt::job(::bsp2json::reader::BspValue::bsp_parse(reader), concat!(
					"Reading field \"",
					stringify!(#field_names),
					"\" on type ",
					stringify!(#ident)
				))?,
			)*
		})
	};
	let bsp_struct_size_contents = quote! { #(<#types as ::bsp2json::reader::BspValue>::BSP_STRUCT_SIZE + )* 0 };

	quote! {
		impl #impl_generics ::bsp2json::reader::BspValue for #ident #ty_generics #where_clause {
			const BSP_STRUCT_SIZE: usize = #bsp_struct_size_contents;

			fn bsp_parse(reader: &mut ::bsp2json::reader::BspByteReader) -> ::bsp2json::BspResult<Self> {
				#bsp_parse_contents
			}
		}
	}
	.into()
}
