//! `define_port_error!`: adapter-facing error enums for the ports.
//!
//! Every variant carries named fields and renders through `thiserror`. Each
//! variant also gets a snake_case constructor whose parameters accept
//! anything convertible into the field types, so adapters can write
//! `DocumentStoreError::query("bad filter")` or pass an owned `String`.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),+ $(,)? } => $message:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field: $ty),+ },
            )+
        }

        ::paste::paste! {
            impl $name {
                $(
                    #[doc = "Build [`" $name "::" $variant "`]."]
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),+) -> Self {
                        Self::$variant { $($field: $field.into()),+ }
                    }
                )+
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use super::super::{BlobCleanupError, DocumentStoreError};
    use rstest::rstest;

    #[rstest]
    #[case(
        DocumentStoreError::connection("refused"),
        "document store connection failed: refused"
    )]
    #[case(
        DocumentStoreError::query(String::from("unsupported filter")),
        "document store query failed: unsupported filter"
    )]
    #[case(
        DocumentStoreError::persistence("disk full"),
        "document store persistence failed: disk full"
    )]
    fn document_store_errors_render_their_message(
        #[case] error: DocumentStoreError,
        #[case] expected: &str,
    ) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn constructors_build_the_named_variant() {
        assert_eq!(
            DocumentStoreError::query("x"),
            DocumentStoreError::Query {
                message: "x".to_owned()
            }
        );
        assert_ne!(
            DocumentStoreError::query("x"),
            DocumentStoreError::connection("x")
        );
    }

    #[rstest]
    fn multi_field_constructors_take_fields_in_declaration_order() {
        let error = BlobCleanupError::removal("uploads/nf.pdf", "permission denied");
        assert_eq!(
            error,
            BlobCleanupError::Removal {
                reference: "uploads/nf.pdf".to_owned(),
                message: "permission denied".to_owned(),
            }
        );
        assert_eq!(
            error.to_string(),
            "failed to remove blob uploads/nf.pdf: permission denied"
        );
    }
}
